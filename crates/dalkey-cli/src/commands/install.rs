//! `dalkey install` command implementation.

use crate::presenter;
use dalkey_core::paths;
use dalkey_core::pkg::{
    read_project_deps, InstallReport, Installer, LockStore, PackageCache, PackageSpec,
    RegistryClient,
};
use miette::{IntoDiagnostic, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::warn;

pub async fn run(cwd: &Path, specs: &[String], save_dev: bool) -> Result<()> {
    let manifest = paths::project_manifest(cwd);
    if !manifest.exists() {
        miette::bail!(
            "package.json not found in {}; run dalkey inside a project",
            cwd.display()
        );
    }

    let jobs = if specs.is_empty() {
        jobs_from_manifest(&manifest)?
    } else {
        specs
            .iter()
            .map(|s| PackageSpec::parse(s, save_dev))
            .collect::<Result<Vec<_>, _>>()
            .into_diagnostic()?
    };

    if jobs.is_empty() {
        println!("No dependencies to install");
        return Ok(());
    }

    let registry = RegistryClient::from_env().into_diagnostic()?;
    let cache = PackageCache::new();
    let lock = Arc::new(LockStore::load(cwd).into_diagnostic()?);
    let installer = Installer::new(registry, cache, Arc::clone(&lock), cwd);

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(presenter::render(events_rx));

    let started = Instant::now();
    let report = installer.run(jobs, events_tx).await.into_diagnostic()?;
    let _ = renderer.await;

    // Lock write failure is a warning; the installed trees are already on disk.
    if let Err(e) = lock.persist() {
        warn!(error = %e, "Failed to write lockfile");
    }

    print_summary(&report, started.elapsed());
    Ok(())
}

/// Turn the project manifest's dependency tables into install jobs.
fn jobs_from_manifest(manifest: &Path) -> Result<Vec<PackageSpec>> {
    let deps = read_project_deps(manifest).into_diagnostic()?;

    let mut jobs: Vec<PackageSpec> = deps
        .deps
        .iter()
        .map(|(name, range)| PackageSpec::from_manifest(name, range, false))
        .collect();
    jobs.extend(
        deps.dev_deps
            .iter()
            .map(|(name, range)| PackageSpec::from_manifest(name, range, true)),
    );

    Ok(jobs)
}

fn print_summary(report: &InstallReport, elapsed: Duration) {
    if report.failed > 0 {
        println!(
            "{}/{} packages installed, {} failed",
            report.installed,
            report.installed + report.failed,
            report.failed
        );
        for (name, message) in &report.failures {
            eprintln!("  ! {name}: {message}");
        }
    } else {
        println!("All {} packages installed", report.installed);
    }

    println!("  {} cached, {} downloaded", report.cached, report.downloaded);
    println!("Done in {}", super::format_duration(elapsed));
}
