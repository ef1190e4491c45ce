//! The persisted lock store.
//!
//! Records every installed package under its `name@version` key together
//! with the original user-facing specifier, so repeat installs can be
//! satisfied without touching the network.
//!
//! ## File format
//!
//! `dalkey.lock` at the project root, JSON:
//!
//! ```json
//! {
//!   "lockfile_version": "1.0",
//!   "created_at": "2024-01-15T12:30:00Z",
//!   "packages": { "lodash@4.17.21": { ... } },
//!   "specifiers": { "lodash": "lodash@^4.17.0" },
//!   "dev_specifiers": {}
//! }
//! ```
//!
//! The whole structure sits behind one coarse `RwLock`; entries number in
//! the tens to low hundreds.

use super::deps;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Lockfile filename.
pub const LOCKFILE_NAME: &str = "dalkey.lock";

/// Format version tag written into every lock document.
pub const LOCKFILE_VERSION: &str = "1.0";

/// Lockfile error codes.
pub mod codes {
    /// Lockfile exists but cannot be read.
    pub const LOCK_READ_FAILED: &str = "LOCK_READ_FAILED";
    /// Lockfile has invalid JSON.
    pub const LOCK_INVALID_JSON: &str = "LOCK_INVALID_JSON";
    /// Lockfile write failed.
    pub const LOCK_WRITE_FAILED: &str = "LOCK_WRITE_FAILED";
}

/// A locked package entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPackage {
    pub name: String,
    pub version: String,
    /// URL the archive was (or would be) fetched from.
    pub resolved: String,
    /// Integrity digest as published by the registry, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    /// The package's own declared runtime dependencies (name -> range).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    /// Whether this was installed as a dev dependency.
    #[serde(default, skip_serializing_if = "is_false")]
    pub dev: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !b
}

/// The serialized lock document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LockData {
    lockfile_version: String,
    created_at: String,
    /// `BTreeMap` keyed `name@version` for deterministic output.
    #[serde(default)]
    packages: BTreeMap<String, LockPackage>,
    /// Bare name -> original user-facing specifier text.
    #[serde(default)]
    specifiers: BTreeMap<String, String>,
    /// Bare name -> specifier, for dev-flagged installs only.
    #[serde(default)]
    dev_specifiers: BTreeMap<String, String>,
}

impl LockData {
    fn fresh() -> Self {
        Self {
            lockfile_version: LOCKFILE_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            packages: BTreeMap::new(),
            specifiers: BTreeMap::new(),
            dev_specifiers: BTreeMap::new(),
        }
    }
}

/// Concurrency-safe store over lock entries, persisted as `dalkey.lock`.
#[derive(Debug)]
pub struct LockStore {
    project_root: PathBuf,
    inner: RwLock<LockData>,
}

impl LockStore {
    /// Load the lock store for a project.
    ///
    /// An absent lockfile yields a fresh empty store, not an error.
    ///
    /// # Errors
    /// Returns an error if an existing lockfile cannot be read or parsed.
    pub fn load(project_root: &Path) -> Result<Self, LockfileError> {
        let path = project_root.join(LOCKFILE_NAME);

        let data = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                LockfileError::new(
                    codes::LOCK_INVALID_JSON,
                    format!("Invalid lockfile JSON: {e}"),
                )
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => LockData::fresh(),
            Err(e) => {
                return Err(LockfileError::new(
                    codes::LOCK_READ_FAILED,
                    format!("Failed to read lockfile: {e}"),
                ))
            }
        };

        Ok(Self {
            project_root: project_root.to_path_buf(),
            inner: RwLock::new(data),
        })
    }

    /// The entry key for a name and version.
    #[must_use]
    pub fn package_key(name: &str, version: &str) -> String {
        format!("{name}@{version}")
    }

    /// Upsert the entry for a freshly installed package.
    ///
    /// The package's own declared dependencies are read from its extracted
    /// manifest, best-effort: an unreadable manifest yields an empty set.
    /// The specifier side-table row for `name` is replaced; under concurrent
    /// installs of the same name, last writer wins.
    pub fn add_or_replace(
        &self,
        name: &str,
        version: &str,
        resolved: &str,
        integrity: Option<&str>,
        specifier: &str,
        dev: bool,
    ) {
        let node_modules = self.project_root.join("node_modules");
        let dependencies = deps::installed_dependencies(&node_modules, name);

        let entry = LockPackage {
            name: name.to_string(),
            version: version.to_string(),
            resolved: resolved.to_string(),
            integrity: integrity.map(String::from),
            dependencies,
            dev,
        };

        let mut data = self.inner.write().expect("lock poisoned");
        data.packages
            .insert(Self::package_key(name, version), entry);
        data.specifiers
            .insert(name.to_string(), specifier.to_string());
        if dev {
            data.dev_specifiers
                .insert(name.to_string(), specifier.to_string());
        }
    }

    /// Version of the first entry matching `name`, if any.
    ///
    /// Linear scan; entry counts stay in the tens to low hundreds.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let data = self.inner.read().expect("lock poisoned");
        data.packages
            .values()
            .find(|p| p.name == name)
            .map(|p| p.version.clone())
    }

    /// Whether an exact (name, version) entry exists.
    #[must_use]
    pub fn has(&self, name: &str, version: &str) -> bool {
        let data = self.inner.read().expect("lock poisoned");
        data.packages
            .contains_key(&Self::package_key(name, version))
    }

    /// The recorded specifier for a name, if any.
    #[must_use]
    pub fn specifier(&self, name: &str) -> Option<String> {
        let data = self.inner.read().expect("lock poisoned");
        data.specifiers.get(name).cloned()
    }

    /// Remove every entry for `name`, plus its specifier-table rows.
    pub fn remove(&self, name: &str) {
        let mut data = self.inner.write().expect("lock poisoned");
        data.packages.retain(|_, p| p.name != name);
        data.specifiers.remove(name);
        data.dev_specifiers.remove(name);
    }

    /// Number of lock entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").packages.len()
    }

    /// Whether the store has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the store to `dalkey.lock`, refreshing the creation timestamp.
    ///
    /// Serialization happens under the read lock so concurrent writers cannot
    /// tear the snapshot; the file write itself is atomic.
    ///
    /// # Errors
    /// Returns an error if serialization or the file write fails.
    pub fn persist(&self) -> Result<(), LockfileError> {
        let mut snapshot = {
            let data = self.inner.read().expect("lock poisoned");
            data.clone()
        };
        snapshot.created_at = chrono::Utc::now().to_rfc3339();

        let content = serde_json::to_string_pretty(&snapshot).map_err(|e| {
            LockfileError::new(
                codes::LOCK_WRITE_FAILED,
                format!("Failed to serialize lockfile: {e}"),
            )
        })?;

        let path = self.project_root.join(LOCKFILE_NAME);
        dalkey_util::fs::atomic_write(&path, content.as_bytes()).map_err(|e| {
            LockfileError::new(
                codes::LOCK_WRITE_FAILED,
                format!("Failed to write lockfile: {e}"),
            )
        })
    }
}

/// Lockfile error.
#[derive(Debug)]
pub struct LockfileError {
    code: &'static str,
    message: String,
}

impl LockfileError {
    /// Create a new error.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LockfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for LockfileError {}
