//! `dalkey remove` command implementation.
//!
//! Removes the installed tree and lock rows. The project manifest is never
//! edited.

use dalkey_core::paths;
use dalkey_core::pkg::LockStore;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::Path;
use tracing::warn;

pub fn run(cwd: &Path, packages: &[String]) -> Result<()> {
    if packages.is_empty() {
        miette::bail!("Specify at least one package to remove");
    }

    let lock = LockStore::load(cwd).into_diagnostic()?;
    let node_modules = paths::node_modules_dir(cwd);

    let mut removed = 0usize;
    for name in packages {
        let path = node_modules.join(name);
        if !path.exists() {
            println!("{name} is not installed");
            continue;
        }

        fs::remove_dir_all(&path).into_diagnostic()?;
        lock.remove(name);
        println!("- {name}");
        removed += 1;
    }

    if let Err(e) = lock.persist() {
        warn!(error = %e, "Failed to write lockfile");
    }

    println!("Removed {removed} package(s)");
    Ok(())
}
