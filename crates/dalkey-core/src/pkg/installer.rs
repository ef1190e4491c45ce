//! The install scheduler.
//!
//! A fixed pool of workers drains a shared job queue, each running the
//! sequential pipeline resolve -> cache check -> fetch -> extract for one
//! package. A single aggregator consumes the result channel, applies lock
//! updates, and tallies statistics. No error inside one worker's pipeline
//! ever aborts the pool; a failing job is just a failed result.
//!
//! The core emits structured [`InstallEvent`]s and owns no display state;
//! rendering belongs entirely to the consumer of the event channel.

use super::cache::PackageCache;
use super::deps;
use super::error::PkgError;
use super::lockfile::LockStore;
use super::registry::{conventional_tarball_url, RegistryClient};
use super::spec::PackageSpec;
use super::tarball::{download_tarball, extract_fanout, MAX_TARBALL_SIZE};
use super::version;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Fixed worker pool size. Not adaptive; enough to overlap network and disk
/// latency without flooding the registry.
pub const WORKER_COUNT: usize = 4;

/// Structured progress event emitted by the scheduler.
#[derive(Debug, Clone)]
pub enum InstallEvent {
    /// A worker picked up the job for `name`.
    Started { name: String },
    /// The job finished; `from_cache` is true when no archive transfer
    /// happened (already installed, or restored from the local cache).
    Completed {
        name: String,
        version: String,
        from_cache: bool,
    },
    /// The job failed; siblings are unaffected.
    Failed { name: String, message: String },
    /// A nested dependency of `name` failed to install. Warning only.
    DepWarning {
        name: String,
        dep: String,
        message: String,
    },
}

/// Aggregate result of one scheduler run.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub installed: usize,
    pub failed: usize,
    pub cached: usize,
    pub downloaded: usize,
    /// (package name, error message) for each failed job.
    pub failures: Vec<(String, String)>,
}

#[derive(Debug)]
struct JobSuccess {
    version: String,
    from_cache: bool,
    resolved: String,
    integrity: Option<String>,
}

#[derive(Debug)]
struct JobOutcome {
    spec: PackageSpec,
    result: Result<JobSuccess, PkgError>,
}

/// The install scheduler. Cheap to clone; workers share the lock store and
/// cache through it.
#[derive(Debug, Clone)]
pub struct Installer {
    registry: RegistryClient,
    cache: PackageCache,
    lock: Arc<LockStore>,
    node_modules: PathBuf,
    workers: usize,
}

impl Installer {
    /// Create a scheduler targeting `project_root`'s dependency tree.
    #[must_use]
    pub fn new(
        registry: RegistryClient,
        cache: PackageCache,
        lock: Arc<LockStore>,
        project_root: &Path,
    ) -> Self {
        Self {
            registry,
            cache,
            lock,
            node_modules: crate::paths::node_modules_dir(project_root),
            workers: WORKER_COUNT,
        }
    }

    /// Override the worker pool size (primarily for tests).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Run every job to completion and return the aggregate report.
    ///
    /// Each job is attempted exactly once; the call returns only after all
    /// jobs have produced a result and every lock update for a successful
    /// job has been applied. Individual job failures are recorded in the
    /// report, never propagated.
    ///
    /// # Errors
    /// Fails outright only when the destination root cannot be created.
    pub async fn run(
        &self,
        jobs: Vec<PackageSpec>,
        events: mpsc::UnboundedSender<InstallEvent>,
    ) -> Result<InstallReport, PkgError> {
        // One job per package name: the destination tree for a name must
        // never be contended within a run.
        let mut seen = HashSet::new();
        let jobs: Vec<PackageSpec> = jobs
            .into_iter()
            .filter(|spec| seen.insert(spec.name.clone()))
            .collect();

        if jobs.is_empty() {
            return Ok(InstallReport::default());
        }

        fs::create_dir_all(&self.node_modules).map_err(|e| {
            PkgError::node_modules_write_failed(format!(
                "Failed to create {}: {e}",
                self.node_modules.display()
            ))
        })?;

        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
        let (tx, mut rx) = mpsc::channel::<JobOutcome>(self.workers * 4);

        let mut handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            let worker = self.clone();
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let events = events.clone();
            handles.push(tokio::spawn(async move {
                worker.worker_loop(queue, tx, events).await;
            }));
        }
        // The aggregator's recv loop ends when the last worker drops its
        // sender clone.
        drop(tx);

        let mut report = InstallReport::default();
        while let Some(outcome) = rx.recv().await {
            match outcome.result {
                Ok(success) => {
                    self.lock.add_or_replace(
                        &outcome.spec.name,
                        &success.version,
                        &success.resolved,
                        success.integrity.as_deref(),
                        &outcome.spec.original,
                        outcome.spec.dev,
                    );

                    report.installed += 1;
                    if success.from_cache {
                        report.cached += 1;
                    } else {
                        report.downloaded += 1;
                    }

                    let _ = events.send(InstallEvent::Completed {
                        name: outcome.spec.name,
                        version: success.version,
                        from_cache: success.from_cache,
                    });
                }
                Err(e) => {
                    report.failed += 1;
                    let _ = events.send(InstallEvent::Failed {
                        name: outcome.spec.name.clone(),
                        message: e.to_string(),
                    });
                    report.failures.push((outcome.spec.name, e.to_string()));
                }
            }
        }

        for handle in handles {
            let _ = handle.await;
        }

        Ok(report)
    }

    async fn worker_loop(
        &self,
        queue: Arc<Mutex<VecDeque<PackageSpec>>>,
        tx: mpsc::Sender<JobOutcome>,
        events: mpsc::UnboundedSender<InstallEvent>,
    ) {
        loop {
            let job = queue.lock().expect("queue poisoned").pop_front();
            let Some(spec) = job else { break };

            let _ = events.send(InstallEvent::Started {
                name: spec.name.clone(),
            });

            let result = self.install_one(&spec).await;

            // One level of the new package's own dependencies, within this
            // worker. Only after a fresh extraction; a hit was handled when
            // the package first arrived.
            if let Ok(success) = &result {
                if !success.from_cache {
                    self.install_nested_deps(&spec.name, &events).await;
                }
            }

            if tx.send(JobOutcome { spec, result }).await.is_err() {
                break;
            }
        }
    }

    /// The per-package pipeline. Strictly sequential within one job.
    async fn install_one(&self, spec: &PackageSpec) -> Result<JobSuccess, PkgError> {
        // Lock entry plus matching tree on disk: nothing to do, no network.
        if let Some(locked) = self.lock.get(&spec.name) {
            if deps::installed_manifest_version(&self.node_modules, &spec.name).as_deref()
                == Some(locked.as_str())
            {
                debug!(name = %spec.name, version = %locked, "Already installed");
                return Ok(JobSuccess {
                    resolved: conventional_tarball_url(&spec.name, &locked),
                    version: locked,
                    from_cache: true,
                    integrity: None,
                });
            }
        }

        let info = self.registry.get_version_info(&spec.name).await?;
        let version = version::resolve(&spec.name, spec.range.as_deref(), &info)?;
        let resolved = info
            .resolved(&spec.name, &version)
            .ok_or_else(|| PkgError::version_not_found(&spec.name, &version))?;

        debug!(name = %spec.name, version = %version, "Resolved version");

        // The tree may already hold the resolved version from a prior run
        // that never made it into this lockfile.
        if deps::installed_manifest_version(&self.node_modules, &spec.name).as_deref()
            == Some(version.as_str())
        {
            return Ok(JobSuccess {
                version,
                from_cache: true,
                resolved: resolved.tarball,
                integrity: resolved.integrity,
            });
        }

        let dest = self.node_modules.join(&spec.name);

        if self.cache.has(&spec.name, &version) {
            match self.cache.restore(&spec.name, &version, &dest) {
                Ok(()) => {
                    debug!(name = %spec.name, version = %version, "Restored from cache");
                    return Ok(JobSuccess {
                        version,
                        from_cache: true,
                        resolved: resolved.tarball,
                        integrity: resolved.integrity,
                    });
                }
                Err(e) => {
                    // Unreadable cache entry counts as a miss.
                    debug!(name = %spec.name, error = %e, "Cache restore failed, fetching");
                }
            }
        }

        if resolved.tarball.is_empty() {
            return Err(PkgError::download_failed(format!(
                "No tarball URL for {}@{}",
                spec.name, version
            )));
        }

        let bytes =
            download_tarball(self.registry.http(), &resolved.tarball, MAX_TARBALL_SIZE).await?;
        debug!(name = %spec.name, size = bytes.len(), "Downloaded tarball");

        extract_fanout(
            &bytes,
            &dest,
            &self.cache.entry_path(&spec.name, &version),
        )?;
        debug!(path = %dest.display(), "Extracted");

        Ok(JobSuccess {
            version,
            from_cache: false,
            resolved: resolved.tarball,
            integrity: resolved.integrity,
        })
    }

    /// Install one level of a freshly extracted package's runtime
    /// dependencies, sequentially. Dependencies of dependencies are not
    /// followed. Nested installs resolve at `latest`, and their failures are
    /// warnings that never fail the parent job.
    async fn install_nested_deps(
        &self,
        parent: &str,
        events: &mpsc::UnboundedSender<InstallEvent>,
    ) {
        let declared = deps::installed_dependencies(&self.node_modules, parent);

        for dep_name in declared.keys() {
            if self.node_modules.join(dep_name).exists() {
                continue;
            }

            let dep_spec = PackageSpec {
                name: dep_name.clone(),
                range: None,
                dev: false,
                original: dep_name.clone(),
            };

            match self.install_one(&dep_spec).await {
                Ok(success) => {
                    self.lock.add_or_replace(
                        dep_name,
                        &success.version,
                        &success.resolved,
                        success.integrity.as_deref(),
                        dep_name,
                        false,
                    );
                }
                Err(e) => {
                    warn!(parent = %parent, dep = %dep_name, error = %e, "Failed to install dependency");
                    let _ = events.send(InstallEvent::DepWarning {
                        name: parent.to_string(),
                        dep: dep_name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}
