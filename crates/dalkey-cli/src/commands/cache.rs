//! `dalkey cache` command implementation.

use dalkey_core::pkg::PackageCache;
use miette::{IntoDiagnostic, Result};

pub fn info() -> Result<()> {
    let cache = PackageCache::new();
    let info = cache.info().into_diagnostic()?;

    println!("Cache location: {}", cache.root().display());
    println!("Size: {}", format_bytes(info.size_bytes));
    println!("Packages: {}", info.package_count);
    Ok(())
}

pub fn clear() -> Result<()> {
    let cache = PackageCache::new();
    cache.clear().into_diagnostic()?;
    println!("Cache cleared");
    Ok(())
}

pub fn ls() -> Result<()> {
    let cache = PackageCache::new();
    let entries = cache.list().into_diagnostic()?;

    if entries.is_empty() {
        println!("Cache is empty");
        return Ok(());
    }

    println!("Cached packages ({})", entries.len());
    for entry in entries {
        println!("  {}@{}", entry.name, entry.version);
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut div = UNIT;
    let mut exp = 0usize;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    let units = ["KB", "MB", "GB", "TB", "PB", "EB"];
    format!("{:.1} {}", bytes as f64 / div as f64, units[exp])
}
