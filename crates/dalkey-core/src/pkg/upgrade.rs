//! Upgrade checks: installed version vs. the registry's `latest` dist-tag.

use super::deps;
use super::registry::RegistryClient;
use super::version::compare_versions;
use std::cmp::Ordering;
use std::path::Path;
use tracing::debug;

/// One package's upgrade status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeInfo {
    pub name: String,
    pub current: String,
    pub latest: String,
    pub needs_upgrade: bool,
    pub dev: bool,
}

/// Check a list of packages against the registry.
///
/// Packages that are not installed, or whose registry lookup fails, are
/// skipped silently; an upgrade check is advisory, not load-bearing.
pub async fn check_upgrades(
    registry: &RegistryClient,
    node_modules: &Path,
    names: &[(String, bool)],
) -> Vec<UpgradeInfo> {
    let mut upgrades = Vec::new();

    for (name, dev) in names {
        let Some(current) = deps::installed_manifest_version(node_modules, name) else {
            debug!(name = %name, "Not installed, skipping upgrade check");
            continue;
        };

        let latest = match registry.get_version_info(name).await {
            Ok(info) => match info.dist_tags.get("latest") {
                Some(latest) => latest.clone(),
                None => continue,
            },
            Err(e) => {
                debug!(name = %name, error = %e, "Upgrade check failed, skipping");
                continue;
            }
        };

        let needs_upgrade = compare_versions(&current, &latest) == Ordering::Less;

        upgrades.push(UpgradeInfo {
            name: name.clone(),
            current,
            latest,
            needs_upgrade,
            dev: *dev,
        });
    }

    upgrades
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_upgrade_ordering() {
        // the comparator drives the decision; sanity-check the boundary
        assert_eq!(compare_versions("1.0.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.0.1", "1.0.1"), Ordering::Equal);
        assert_eq!(compare_versions("1.10.0", "1.2.0"), Ordering::Greater);
    }
}
