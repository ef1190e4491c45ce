//! Version range resolution against registry metadata.
//!
//! This resolver deliberately implements a simplified comparison scheme
//! rather than full semver precedence: version components are compared as
//! integers after truncating any `-` or `+` suffix, so pre-release tags are
//! discarded instead of ordered lexically. Consumers depend on this exact
//! behavior; do not replace it with a semver library.

use super::error::PkgError;
use super::registry::VersionInfo;
use std::cmp::Ordering;

/// Resolve a version range against registry metadata.
///
/// # Rules
/// - `None` or `"latest"` uses the `latest` dist-tag
/// - OR ranges (`^1.0.0 || ^2.0.0`) evaluate alternatives left-to-right and
///   take the first that matches
/// - `x` wildcards (`1.x`) select the highest version with that prefix
/// - `^` selects the highest version with the same major
/// - `~` selects the highest version with the same major.minor
/// - anything else is an exact match against the version set
///
/// A range that matches nothing falls back to the `latest` dist-tag instead
/// of failing. This leniency means an unsatisfiable range silently installs
/// the latest version; it is preserved for compatibility (see DESIGN.md).
///
/// # Errors
/// Returns `PKG_VERSION_NOT_FOUND` only when the fallback itself is
/// impossible because the registry has no `latest` dist-tag.
pub fn resolve(name: &str, range: Option<&str>, info: &VersionInfo) -> Result<String, PkgError> {
    let range = range.unwrap_or("latest").trim();

    if range == "latest" {
        return latest_tag(name, info);
    }

    let resolved = if range.contains("||") {
        range
            .split("||")
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .find_map(|alt| resolve_single(alt, info))
    } else {
        resolve_single(range, info)
    };

    match resolved {
        Some(version) => Ok(version),
        None => latest_tag(name, info),
    }
}

fn latest_tag(name: &str, info: &VersionInfo) -> Result<String, PkgError> {
    info.dist_tags
        .get("latest")
        .cloned()
        .ok_or_else(|| PkgError::version_not_found(name, "latest"))
}

/// Resolve one alternative of a range (no `||`).
fn resolve_single(range: &str, info: &VersionInfo) -> Option<String> {
    let range = range.trim();

    if range.contains('x') {
        let pattern: String = range.replace('x', "");
        let pattern = pattern.trim_end_matches('.');
        return highest_matching(info, |v| v.starts_with(pattern));
    }

    if let Some(base) = range.strip_prefix('^') {
        let major = base.split('.').next()?;
        return highest_matching(info, |v| v.split('.').next() == Some(major));
    }

    if let Some(base) = range.strip_prefix('~') {
        let mut parts = base.split('.');
        let (major, minor) = (parts.next()?, parts.next()?);
        let prefix = format!("{major}.{minor}.");
        return highest_matching(info, |v| v.starts_with(&prefix));
    }

    if info.versions.contains_key(range) {
        return Some(range.to_string());
    }

    None
}

fn highest_matching(info: &VersionInfo, matches: impl Fn(&str) -> bool) -> Option<String> {
    let mut best: Option<&str> = None;
    for v in info.versions.keys() {
        if !matches(v) {
            continue;
        }
        match best {
            Some(b) if compare_versions(v, b) != Ordering::Greater => {}
            _ => best = Some(v),
        }
    }
    best.map(String::from)
}

/// Compare two version strings component-wise as integers.
///
/// Components are truncated at the first `-` or `+`; non-numeric components
/// compare as 0. Shorter versions are implicitly zero-padded.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts_a: Vec<&str> = a.split('.').collect();
    let parts_b: Vec<&str> = b.split('.').collect();
    let len = parts_a.len().max(parts_b.len());

    for i in 0..len {
        let na = parts_a.get(i).copied().map_or(0, numeric_part);
        let nb = parts_b.get(i).copied().map_or(0, numeric_part);
        match na.cmp(&nb) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    Ordering::Equal
}

fn numeric_part(part: &str) -> u64 {
    let cleaned = part.split(['-', '+']).next().unwrap_or("");
    cleaned.parse().unwrap_or(0)
}
