use crate::version::SCHEMA_VERSION;
use std::path::{Path, PathBuf};

/// Environment variable to override the cache directory (for testing).
pub const CACHE_DIR_ENV: &str = "DALKEY_CACHE_DIR";

/// Get the package cache directory for dalkey.
///
/// Respects `DALKEY_CACHE_DIR` for testing. Otherwise uses
/// platform-appropriate locations with versioning:
/// - Linux: `$XDG_CACHE_HOME/dalkey/v{N}` or `~/.cache/dalkey/v{N}`
/// - macOS: `~/Library/Caches/dalkey/v{N}`
/// - Windows: `%LOCALAPPDATA%\dalkey\v{N}`
#[must_use]
pub fn cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        return PathBuf::from(dir);
    }

    let base = dirs_next::cache_dir().map_or_else(
        || {
            dirs_next::home_dir().map_or_else(
                || PathBuf::from(".dalkey-cache"),
                |p| p.join(".cache").join("dalkey"),
            )
        },
        |p| p.join("dalkey"),
    );

    base.join(format!("v{SCHEMA_VERSION}"))
}

/// Path to a project's manifest file.
#[must_use]
pub fn project_manifest(project_root: &Path) -> PathBuf {
    project_root.join("package.json")
}

/// Path to a project's dependency tree directory.
#[must_use]
pub fn node_modules_dir(project_root: &Path) -> PathBuf {
    project_root.join("node_modules")
}
