use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema version for cache directories.
/// Bump this when changing formats that would break compatibility.
pub const SCHEMA_VERSION: u32 = 1;

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("dalkey {VERSION}");

    if let Some(hash) = option_env!("DALKEY_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}
