//! Package cache management.
//!
//! Manages the global package cache where extracted packages are stored.
//! Entries are keyed by name+version, not by archive content: the cache
//! assumes a published (name, version) never changes its bytes.

use super::error::PkgError;
use crate::paths;
use dalkey_util::hash::blake3_short;
use std::fs;
use std::path::{Path, PathBuf};

/// Separator used when encoding scoped package names into directory names.
const SCOPE_ENCODING: &str = "%2F";

/// Package cache manager.
#[derive(Debug, Clone)]
pub struct PackageCache {
    /// Root directory for the package cache.
    root: PathBuf,
}

/// A cached package, parsed back from its directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheInfo {
    pub size_bytes: u64,
    pub package_count: usize,
}

impl Default for PackageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageCache {
    /// Create a cache rooted at the platform cache directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: paths::cache_dir(),
        }
    }

    /// Create a cache rooted at an explicit directory.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic on-disk location for a (name, version) entry.
    ///
    /// The directory name is `{name}-{version}-{hash12}`: human-readable
    /// prefix plus a short BLAKE3 digest of `name@version` for collision
    /// avoidance. Scoped names encode `/` so the whole entry stays a single
    /// top-level directory.
    #[must_use]
    pub fn entry_path(&self, name: &str, version: &str) -> PathBuf {
        let hash = blake3_short(format!("{name}@{version}").as_bytes());
        let encoded = name.replace('/', SCOPE_ENCODING);
        self.root.join(format!("{encoded}-{version}-{hash}"))
    }

    /// Check if a package version is cached.
    #[must_use]
    pub fn has(&self, name: &str, version: &str) -> bool {
        let path = self.entry_path(name, version);
        path.is_dir()
    }

    /// Copy a cached package tree into `dest`.
    ///
    /// # Errors
    /// Fails if the entry is absent or unreadable. Callers treat this as a
    /// cache miss and fall back to a network fetch, not a hard error.
    pub fn restore(&self, name: &str, version: &str, dest: &Path) -> Result<(), PkgError> {
        let path = self.entry_path(name, version);
        if !path.is_dir() {
            return Err(PkgError::cache_error(format!(
                "{name}@{version} is not in the cache"
            )));
        }

        dalkey_util::fs::copy_dir_all(&path, dest)
            .map_err(|e| PkgError::cache_error(format!("Failed to restore {name}@{version}: {e}")))
    }

    /// Remove the entire cache root.
    ///
    /// # Errors
    /// Returns an error if removal fails; an absent root is not an error.
    pub fn clear(&self) -> Result<(), PkgError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PkgError::cache_error(format!("Failed to clear cache: {e}"))),
        }
    }

    /// Total byte size and top-level package directory count.
    ///
    /// # Errors
    /// Returns an error if the cache root cannot be walked.
    pub fn info(&self) -> Result<CacheInfo, PkgError> {
        if !self.root.exists() {
            return Ok(CacheInfo::default());
        }

        let size_bytes = dalkey_util::fs::dir_size(&self.root)
            .map_err(|e| PkgError::cache_error(format!("Failed to measure cache: {e}")))?;

        let package_count = fs::read_dir(&self.root)
            .map_err(|e| PkgError::cache_error(format!("Failed to read cache: {e}")))?
            .flatten()
            .filter(|e| e.path().is_dir())
            .count();

        Ok(CacheInfo {
            size_bytes,
            package_count,
        })
    }

    /// List cached packages by parsing entry directory names.
    ///
    /// The name is everything before the trailing `-{version}-{hash}` pair;
    /// directories that do not follow the convention are skipped.
    ///
    /// # Errors
    /// Returns an error if the cache root cannot be read.
    pub fn list(&self) -> Result<Vec<CacheEntry>, PkgError> {
        let mut entries = Vec::new();

        if !self.root.exists() {
            return Ok(entries);
        }

        let dir = fs::read_dir(&self.root)
            .map_err(|e| PkgError::cache_error(format!("Failed to read cache: {e}")))?;

        for entry in dir.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(parsed) = parse_entry_name(&file_name.to_string_lossy()) else {
                continue;
            };

            entries.push(CacheEntry {
                name: parsed.0,
                version: parsed.1,
                path,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
        Ok(entries)
    }
}

/// Parse a `{name}-{version}-{hash}` directory name back into (name, version).
fn parse_entry_name(dir_name: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = dir_name.split('-').collect();
    if parts.len() < 3 {
        return None;
    }

    let version = parts[parts.len() - 2];
    let name = parts[..parts.len() - 2].join("-");
    if name.is_empty() || version.is_empty() {
        return None;
    }

    Some((name.replace(SCOPE_ENCODING, "/"), version.to_string()))
}
