//! npm registry client.

use super::error::PkgError;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Environment variable to override registry URL.
pub const REGISTRY_ENV: &str = "DALKEY_NPM_REGISTRY";

/// Registry metadata for one package: the full version map plus dist-tags.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub versions: HashMap<String, VersionMetadata>,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
}

/// Metadata for a single published version.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionMetadata {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub dist: DistInfo,
}

/// Archive location and checksums for a published version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistInfo {
    #[serde(default)]
    pub tarball: String,
    #[serde(default)]
    pub shasum: Option<String>,
    #[serde(default)]
    pub integrity: Option<String>,
}

/// A registry response narrowed to one concrete version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: String,
    /// URL of the gzip-compressed tar archive.
    pub tarball: String,
    /// Integrity digest as published by the registry, if any.
    pub integrity: Option<String>,
}

impl VersionInfo {
    /// Narrow this metadata to a concrete version.
    ///
    /// Prefers the `integrity` digest, falling back to the legacy `shasum`.
    #[must_use]
    pub fn resolved(&self, name: &str, version: &str) -> Option<ResolvedPackage> {
        let meta = self.versions.get(version)?;
        Some(ResolvedPackage {
            name: name.to_string(),
            version: version.to_string(),
            tarball: meta.dist.tarball.clone(),
            integrity: meta
                .dist
                .integrity
                .clone()
                .or_else(|| meta.dist.shasum.clone()),
        })
    }
}

/// The registry tarball URL convention for a package version.
///
/// Used when recording a lock entry for a package whose install was skipped
/// (already on disk), where no fresh registry response is available.
#[must_use]
pub fn conventional_tarball_url(name: &str, version: &str) -> String {
    let base = std::env::var(REGISTRY_ENV).unwrap_or_else(|_| DEFAULT_REGISTRY.to_string());
    let base = base.trim_end_matches('/');
    let bare = name.rsplit('/').next().unwrap_or(name);
    format!("{base}/{name}/-/{bare}-{version}.tgz")
}

/// Registry client for fetching package metadata.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: &str) -> Result<Self, PkgError> {
        // A trailing slash makes Url::join treat the last segment as a directory.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let base_url = Url::parse(&normalized)
            .map_err(|e| PkgError::registry(format!("Invalid registry URL '{normalized}': {e}")))?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("dalkey/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PkgError::registry(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Create a client using the registry URL from environment or default.
    ///
    /// # Errors
    /// Returns an error if the client cannot be created.
    pub fn from_env() -> Result<Self, PkgError> {
        let url = std::env::var(REGISTRY_ENV).unwrap_or_else(|_| DEFAULT_REGISTRY.to_string());
        Self::new(&url)
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the HTTP client (for reuse in tarball downloads).
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Fetch the version metadata for a package.
    ///
    /// # Errors
    /// Returns an error if the request fails or the package is not found.
    pub async fn get_version_info(&self, name: &str) -> Result<VersionInfo, PkgError> {
        // URL-encode the name for scoped packages
        let encoded_name = if name.starts_with('@') {
            name.replace('/', "%2F")
        } else {
            name.to_string()
        };

        let url = self
            .base_url
            .join(&encoded_name)
            .map_err(|e| PkgError::registry(format!("Failed to build URL for '{name}': {e}")))?;

        let response = self.http.get(url.as_str()).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PkgError::not_found(name));
        }

        if !response.status().is_success() {
            return Err(PkgError::registry(format!(
                "Registry returned status {} for '{name}'",
                response.status()
            )));
        }

        let info: VersionInfo = response.json().await?;
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> VersionInfo {
        serde_json::from_value(serde_json::json!({
            "name": "react",
            "dist-tags": {
                "latest": "18.2.0",
                "next": "19.0.0-rc.0"
            },
            "versions": {
                "18.2.0": {
                    "version": "18.2.0",
                    "dist": {
                        "tarball": "https://registry.npmjs.org/react/-/react-18.2.0.tgz",
                        "shasum": "abc123",
                        "integrity": "sha512-xyz"
                    }
                },
                "17.0.2": {
                    "version": "17.0.2",
                    "dist": {
                        "tarball": "https://registry.npmjs.org/react/-/react-17.0.2.tgz",
                        "shasum": "def456"
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_version_info() {
        let info = sample_info();
        assert_eq!(info.dist_tags.get("latest").map(String::as_str), Some("18.2.0"));
        assert_eq!(info.versions.len(), 2);
        assert_eq!(
            info.versions["18.2.0"].dist.tarball,
            "https://registry.npmjs.org/react/-/react-18.2.0.tgz"
        );
    }

    #[test]
    fn test_resolved_prefers_integrity() {
        let info = sample_info();
        let resolved = info.resolved("react", "18.2.0").unwrap();
        assert_eq!(resolved.integrity.as_deref(), Some("sha512-xyz"));
    }

    #[test]
    fn test_resolved_falls_back_to_shasum() {
        let info = sample_info();
        let resolved = info.resolved("react", "17.0.2").unwrap();
        assert_eq!(resolved.integrity.as_deref(), Some("def456"));
    }

    #[test]
    fn test_resolved_missing_version() {
        let info = sample_info();
        assert!(info.resolved("react", "16.0.0").is_none());
    }

    #[test]
    fn test_conventional_tarball_url_scoped() {
        let url = conventional_tarball_url("@types/node", "20.0.0");
        assert!(url.ends_with("/@types/node/-/node-20.0.0.tgz"));
    }

    #[test]
    fn test_client_creation() {
        let client = RegistryClient::new(DEFAULT_REGISTRY);
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_invalid_url() {
        let client = RegistryClient::new("not-a-url");
        assert!(client.is_err());
    }

    #[test]
    fn test_client_normalizes_trailing_slash() {
        let client = RegistryClient::new("https://registry.example.com").unwrap();
        let url = client.base_url().join("lodash").unwrap();
        assert_eq!(url.as_str(), "https://registry.example.com/lodash");
    }
}
