//! Manifest (package.json) dependency extraction.
//!
//! Two consumers: the project manifest feeds the install scheduler its job
//! list, and installed packages' manifests feed the one-level nested
//! dependency pass and the lockfile's declared-dependency records.

use super::error::PkgError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Dependencies declared by a project manifest, runtime and dev kept apart.
#[derive(Debug, Clone, Default)]
pub struct ManifestDeps {
    /// (name, range) pairs from `dependencies`, sorted by name.
    pub deps: Vec<(String, String)>,
    /// (name, range) pairs from `devDependencies`, sorted by name.
    pub dev_deps: Vec<(String, String)>,
}

/// Read the project manifest's dependency tables.
///
/// # Errors
/// Returns an error if the file is missing, unreadable, or not JSON.
pub fn read_project_deps(manifest_path: &Path) -> Result<ManifestDeps, PkgError> {
    if !manifest_path.exists() {
        return Err(PkgError::manifest_invalid(format!(
            "package.json not found: {}",
            manifest_path.display()
        )));
    }

    let content = fs::read_to_string(manifest_path)
        .map_err(|e| PkgError::manifest_invalid(format!("Failed to read: {e}")))?;

    let doc: Value = serde_json::from_str(&content)
        .map_err(|e| PkgError::manifest_invalid(format!("Invalid JSON: {e}")))?;

    let root = doc
        .as_object()
        .ok_or_else(|| PkgError::manifest_invalid("package.json must be a JSON object"))?;

    Ok(ManifestDeps {
        deps: extract_section(root.get("dependencies")),
        dev_deps: extract_section(root.get("devDependencies")),
    })
}

fn extract_section(section: Option<&Value>) -> Vec<(String, String)> {
    let Some(obj) = section.and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut deps: Vec<(String, String)> = obj
        .iter()
        .filter_map(|(name, range)| range.as_str().map(|r| (name.clone(), r.to_string())))
        .collect();
    deps.sort_by(|a, b| a.0.cmp(&b.0));
    deps
}

/// Version recorded in an installed package's manifest, if readable.
#[must_use]
pub fn installed_manifest_version(node_modules: &Path, name: &str) -> Option<String> {
    let doc = read_installed_manifest(node_modules, name)?;
    doc.get("version")
        .and_then(Value::as_str)
        .map(String::from)
}

/// Runtime dependencies declared by an installed package's manifest.
///
/// Best-effort: an absent or unreadable manifest yields an empty map, never
/// an error.
#[must_use]
pub fn installed_dependencies(node_modules: &Path, name: &str) -> BTreeMap<String, String> {
    let Some(doc) = read_installed_manifest(node_modules, name) else {
        return BTreeMap::new();
    };

    doc.get("dependencies")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn read_installed_manifest(node_modules: &Path, name: &str) -> Option<Value> {
    let path = node_modules.join(name).join("package.json");
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_manifest(dir: &Path, content: &str) -> std::path::PathBuf {
        let path = dir.join("package.json");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_project_deps_split_by_kind() {
        let dir = tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            r#"{
                "name": "test",
                "dependencies": { "b": "^2.0.0", "a": "^1.0.0" },
                "devDependencies": { "c": "~3.0.0" }
            }"#,
        );

        let deps = read_project_deps(&path).unwrap();
        assert_eq!(
            deps.deps,
            vec![
                ("a".to_string(), "^1.0.0".to_string()),
                ("b".to_string(), "^2.0.0".to_string())
            ]
        );
        assert_eq!(deps.dev_deps, vec![("c".to_string(), "~3.0.0".to_string())]);
    }

    #[test]
    fn test_read_project_deps_missing_sections() {
        let dir = tempdir().unwrap();
        let path = write_manifest(dir.path(), r#"{"name": "bare"}"#);

        let deps = read_project_deps(&path).unwrap();
        assert!(deps.deps.is_empty());
        assert!(deps.dev_deps.is_empty());
    }

    #[test]
    fn test_read_project_deps_skips_non_string_ranges() {
        let dir = tempdir().unwrap();
        let path = write_manifest(
            dir.path(),
            r#"{"dependencies": { "good": "1.0.0", "bad": 42 }}"#,
        );

        let deps = read_project_deps(&path).unwrap();
        assert_eq!(deps.deps, vec![("good".to_string(), "1.0.0".to_string())]);
    }

    #[test]
    fn test_read_project_deps_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(read_project_deps(&dir.path().join("package.json")).is_err());
    }

    #[test]
    fn test_read_project_deps_invalid_json_fails() {
        let dir = tempdir().unwrap();
        let path = write_manifest(dir.path(), "not json");
        assert!(read_project_deps(&path).is_err());
    }

    #[test]
    fn test_installed_manifest_version() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("lodash");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join("package.json"),
            r#"{"name": "lodash", "version": "4.17.21"}"#,
        )
        .unwrap();

        assert_eq!(
            installed_manifest_version(dir.path(), "lodash").as_deref(),
            Some("4.17.21")
        );
        assert_eq!(installed_manifest_version(dir.path(), "missing"), None);
    }

    #[test]
    fn test_installed_dependencies_best_effort() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("express");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join("package.json"),
            r#"{"name": "express", "version": "4.18.0", "dependencies": {"accepts": "~1.3.8"}}"#,
        )
        .unwrap();

        let deps = installed_dependencies(dir.path(), "express");
        assert_eq!(deps.get("accepts").map(String::as_str), Some("~1.3.8"));

        // absent package yields empty, not an error
        assert!(installed_dependencies(dir.path(), "missing").is_empty());

        // corrupt manifest yields empty, not an error
        let broken = dir.path().join("broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("package.json"), "{{{").unwrap();
        assert!(installed_dependencies(dir.path(), "broken").is_empty());
    }

    #[test]
    fn test_installed_scoped_package() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("@types").join("node");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join("package.json"),
            r#"{"name": "@types/node", "version": "20.0.0"}"#,
        )
        .unwrap();

        assert_eq!(
            installed_manifest_version(dir.path(), "@types/node").as_deref(),
            Some("20.0.0")
        );
    }
}
