//! Package manager functionality.
//!
//! Provides the install engine and its parts:
//! - Parsing package specifications (name@range)
//! - Fetching package metadata from the npm registry
//! - Resolving version ranges (simplified, not full semver)
//! - Downloading tarballs and fan-out extraction into tree + cache
//! - Managing the global package cache
//! - The persisted lockfile
//! - The worker-pool install scheduler
//! - Upgrade checks against the `latest` dist-tag

pub mod cache;
pub mod deps;
pub mod error;
pub mod installer;
pub mod lockfile;
pub mod registry;
pub mod spec;
pub mod tarball;
pub mod upgrade;
pub mod version;

pub use cache::{CacheEntry, CacheInfo, PackageCache};
pub use deps::{
    installed_dependencies, installed_manifest_version, read_project_deps, ManifestDeps,
};
pub use error::{codes as pkg_codes, PkgError};
pub use installer::{InstallEvent, InstallReport, Installer, WORKER_COUNT};
pub use lockfile::{
    codes as lockfile_codes, LockPackage, LockStore, LockfileError, LOCKFILE_NAME,
    LOCKFILE_VERSION,
};
pub use registry::{
    conventional_tarball_url, RegistryClient, ResolvedPackage, VersionInfo, DEFAULT_REGISTRY,
    REGISTRY_ENV,
};
pub use spec::PackageSpec;
pub use tarball::{download_tarball, extract_fanout, MAX_TARBALL_SIZE};
pub use upgrade::{check_upgrades, UpgradeInfo};
pub use version::{compare_versions, resolve};
