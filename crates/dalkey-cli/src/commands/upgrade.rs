//! `dalkey upgrade` command implementation.
//!
//! Non-interactive: checks the named packages (or everything in the project
//! manifest) against the registry's `latest` dist-tag and reinstalls the
//! outdated ones.

use crate::presenter;
use dalkey_core::paths;
use dalkey_core::pkg::{
    check_upgrades, read_project_deps, Installer, LockStore, PackageCache, PackageSpec,
    RegistryClient, UpgradeInfo,
};
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::warn;

pub async fn run(cwd: &Path, packages: &[String]) -> Result<()> {
    let manifest = paths::project_manifest(cwd);
    if !manifest.exists() {
        miette::bail!(
            "package.json not found in {}; run dalkey inside a project",
            cwd.display()
        );
    }

    let deps = read_project_deps(&manifest).into_diagnostic()?;
    let names: Vec<(String, bool)> = if packages.is_empty() {
        deps.deps
            .iter()
            .map(|(name, _)| (name.clone(), false))
            .chain(deps.dev_deps.iter().map(|(name, _)| (name.clone(), true)))
            .collect()
    } else {
        packages
            .iter()
            .map(|name| {
                let dev = deps.dev_deps.iter().any(|(n, _)| n == name);
                (name.clone(), dev)
            })
            .collect()
    };

    if names.is_empty() {
        println!("No packages to upgrade");
        return Ok(());
    }

    let registry = RegistryClient::from_env().into_diagnostic()?;
    let node_modules = paths::node_modules_dir(cwd);

    let upgrades = check_upgrades(&registry, &node_modules, &names).await;
    let outdated: Vec<&UpgradeInfo> = upgrades.iter().filter(|u| u.needs_upgrade).collect();

    if outdated.is_empty() {
        println!("All packages are up to date");
        return Ok(());
    }

    println!("{} package(s) to upgrade:", outdated.len());
    for u in &outdated {
        let dev_tag = if u.dev { " (dev)" } else { "" };
        println!("  {} {} -> {}{}", u.name, u.current, u.latest, dev_tag);
    }

    let lock = Arc::new(LockStore::load(cwd).into_diagnostic()?);

    // Clear the old trees and lock rows so the scheduler sees these as fresh
    // installs rather than already-satisfied hits.
    for u in &outdated {
        let path = node_modules.join(&u.name);
        if path.exists() {
            fs::remove_dir_all(&path).into_diagnostic()?;
        }
        lock.remove(&u.name);
    }

    let jobs: Vec<PackageSpec> = outdated
        .iter()
        .map(|u| PackageSpec::from_manifest(&u.name, "latest", u.dev))
        .collect();

    let cache = PackageCache::new();
    let installer = Installer::new(registry, cache, Arc::clone(&lock), cwd);

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(presenter::render(events_rx));

    let started = Instant::now();
    let report = installer.run(jobs, events_tx).await.into_diagnostic()?;
    let _ = renderer.await;

    if let Err(e) = lock.persist() {
        warn!(error = %e, "Failed to write lockfile");
    }

    println!(
        "Upgraded {} package(s) in {}",
        report.installed,
        super::format_duration(started.elapsed())
    );
    Ok(())
}
