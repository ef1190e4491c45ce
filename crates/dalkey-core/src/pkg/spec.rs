//! Package spec parsing.
//!
//! Parses package specifications like:
//! - `react`
//! - `react@18.2.0`
//! - `react@^18.0.0`
//! - `@types/node`
//! - `@types/node@^20`

use super::error::PkgError;

/// A parsed package specification.
///
/// `original` preserves the user-facing text for the lockfile's specifier
/// table: the full spec when a range was given, the bare name otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Full package name (e.g., "@scope/name" or "name").
    pub name: String,
    /// Version range or tag (None means latest).
    pub range: Option<String>,
    /// Whether this install was requested as a dev dependency.
    pub dev: bool,
    /// The original specifier text as the user or manifest supplied it.
    pub original: String,
}

impl PackageSpec {
    /// Parse a package specification string.
    ///
    /// # Errors
    /// Returns an error if the spec is invalid.
    pub fn parse(input: &str, dev: bool) -> Result<Self, PkgError> {
        let input = input.trim();

        if input.is_empty() {
            return Err(PkgError::spec_invalid("Empty package spec"));
        }

        let (name, range) = if input.starts_with('@') {
            Self::split_scoped(input)?
        } else {
            Self::split_unscoped(input)?
        };

        let original = if range.is_some() {
            input.to_string()
        } else {
            name.clone()
        };

        Ok(Self {
            name,
            range,
            dev,
            original,
        })
    }

    /// Build a spec from a manifest dependency entry (name + declared range).
    ///
    /// An empty or `latest` range is normalized to None.
    #[must_use]
    pub fn from_manifest(name: &str, range: &str, dev: bool) -> Self {
        let range = range.trim();
        if range.is_empty() || range == "latest" {
            Self {
                name: name.to_string(),
                range: None,
                dev,
                original: name.to_string(),
            }
        } else {
            Self {
                name: name.to_string(),
                range: Some(range.to_string()),
                dev,
                original: format!("{name}@{range}"),
            }
        }
    }

    fn split_scoped(input: &str) -> Result<(String, Option<String>), PkgError> {
        // Must have at least @scope/name
        let Some(slash_pos) = input.find('/') else {
            return Err(PkgError::spec_invalid(format!(
                "Invalid scoped package: missing '/' in '{input}'"
            )));
        };

        if slash_pos == 1 {
            return Err(PkgError::spec_invalid(format!(
                "Invalid scoped package: empty scope in '{input}'"
            )));
        }

        let scope = &input[1..slash_pos];
        let after_slash = &input[slash_pos + 1..];

        if after_slash.is_empty() {
            return Err(PkgError::spec_invalid(format!(
                "Invalid scoped package: empty name in '{input}'"
            )));
        }

        // The version delimiter is @ after the package name part
        if let Some(at_pos) = after_slash.find('@') {
            let pkg_name = &after_slash[..at_pos];
            let range = &after_slash[at_pos + 1..];

            if pkg_name.is_empty() {
                return Err(PkgError::spec_invalid(format!(
                    "Invalid scoped package: empty name in '{input}'"
                )));
            }

            if range.is_empty() {
                return Err(PkgError::spec_invalid(format!(
                    "Invalid package spec: empty version range in '{input}'"
                )));
            }

            Ok((format!("@{scope}/{pkg_name}"), Some(range.to_string())))
        } else {
            Ok((input.to_string(), None))
        }
    }

    fn split_unscoped(input: &str) -> Result<(String, Option<String>), PkgError> {
        if let Some(at_pos) = input.find('@') {
            let name = &input[..at_pos];
            let range = &input[at_pos + 1..];

            if name.is_empty() {
                return Err(PkgError::spec_invalid(format!(
                    "Invalid package spec: empty name in '{input}'"
                )));
            }

            if range.is_empty() {
                return Err(PkgError::spec_invalid(format!(
                    "Invalid package spec: empty version range in '{input}'"
                )));
            }

            Self::validate_name(name)?;

            Ok((name.to_string(), Some(range.to_string())))
        } else {
            Self::validate_name(input)?;

            Ok((input.to_string(), None))
        }
    }

    fn validate_name(name: &str) -> Result<(), PkgError> {
        if name.is_empty() {
            return Err(PkgError::spec_invalid("Empty package name"));
        }

        // Basic validation: no spaces, no special chars except - and _
        for c in name.chars() {
            if !c.is_alphanumeric() && c != '-' && c != '_' && c != '.' {
                return Err(PkgError::spec_invalid(format!(
                    "Invalid character '{c}' in package name '{name}'"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let spec = PackageSpec::parse("react", false).unwrap();
        assert_eq!(spec.name, "react");
        assert_eq!(spec.range, None);
        assert_eq!(spec.original, "react");
        assert!(!spec.dev);
    }

    #[test]
    fn test_parse_with_version() {
        let spec = PackageSpec::parse("react@18.2.0", false).unwrap();
        assert_eq!(spec.name, "react");
        assert_eq!(spec.range, Some("18.2.0".to_string()));
        assert_eq!(spec.original, "react@18.2.0");
    }

    #[test]
    fn test_parse_with_range() {
        let spec = PackageSpec::parse("react@^18.0.0", false).unwrap();
        assert_eq!(spec.name, "react");
        assert_eq!(spec.range, Some("^18.0.0".to_string()));
    }

    #[test]
    fn test_parse_dev_flag() {
        let spec = PackageSpec::parse("typescript@^5", true).unwrap();
        assert!(spec.dev);
    }

    #[test]
    fn test_parse_scoped() {
        let spec = PackageSpec::parse("@types/node", false).unwrap();
        assert_eq!(spec.name, "@types/node");
        assert_eq!(spec.range, None);
        assert_eq!(spec.original, "@types/node");
    }

    #[test]
    fn test_parse_scoped_with_range() {
        let spec = PackageSpec::parse("@types/node@^20", false).unwrap();
        assert_eq!(spec.name, "@types/node");
        assert_eq!(spec.range, Some("^20".to_string()));
        assert_eq!(spec.original, "@types/node@^20");
    }

    #[test]
    fn test_parse_empty_fails() {
        assert!(PackageSpec::parse("", false).is_err());
        assert!(PackageSpec::parse("   ", false).is_err());
    }

    #[test]
    fn test_parse_at_only_fails() {
        assert!(PackageSpec::parse("@", false).is_err());
    }

    #[test]
    fn test_parse_scope_only_fails() {
        assert!(PackageSpec::parse("@scope", false).is_err());
        assert!(PackageSpec::parse("@scope/", false).is_err());
    }

    #[test]
    fn test_parse_empty_range_fails() {
        assert!(PackageSpec::parse("react@", false).is_err());
        assert!(PackageSpec::parse("@types/node@", false).is_err());
    }

    #[test]
    fn test_from_manifest_with_range() {
        let spec = PackageSpec::from_manifest("lodash", "^4.17.0", false);
        assert_eq!(spec.name, "lodash");
        assert_eq!(spec.range, Some("^4.17.0".to_string()));
        assert_eq!(spec.original, "lodash@^4.17.0");
    }

    #[test]
    fn test_from_manifest_latest_normalized() {
        let spec = PackageSpec::from_manifest("lodash", "latest", false);
        assert_eq!(spec.range, None);
        assert_eq!(spec.original, "lodash");

        let spec = PackageSpec::from_manifest("lodash", "", true);
        assert_eq!(spec.range, None);
        assert!(spec.dev);
    }
}
