//! Integration tests for the dalkey CLI surface.
//!
//! These exercise argument handling and the offline-safe commands; the
//! install pipeline itself is covered by dalkey-core's integration tests.

use std::process::Command;
use tempfile::tempdir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "dalkey-cli", "--bin", "dalkey", "--"]);
    cmd
}

#[test]
fn test_help_lists_commands() {
    let output = cargo_bin()
        .arg("--help")
        .output()
        .expect("Failed to run dalkey --help");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for cmd in ["install", "remove", "upgrade", "cache"] {
        assert!(stdout.contains(cmd), "help should mention '{cmd}': {stdout}");
    }
}

#[test]
fn test_install_requires_a_project() {
    let dir = tempdir().unwrap();

    let output = cargo_bin()
        .args(["install", "lodash", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run dalkey install");

    assert!(
        !output.status.success(),
        "install without package.json should fail"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("package.json"),
        "error should mention package.json: {stderr}"
    );
}

#[test]
fn test_remove_requires_package_names() {
    let dir = tempdir().unwrap();

    let output = cargo_bin()
        .args(["remove", "--cwd"])
        .arg(dir.path())
        .output()
        .expect("Failed to run dalkey remove");

    assert!(!output.status.success(), "bare remove should fail");
}

#[test]
fn test_cache_info_empty_cache() {
    let cache_dir = tempdir().unwrap();

    let output = cargo_bin()
        .args(["cache", "info"])
        .env("DALKEY_CACHE_DIR", cache_dir.path())
        .output()
        .expect("Failed to run dalkey cache info");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Packages: 0"), "empty cache: {stdout}");
}

#[test]
fn test_cache_ls_empty_cache() {
    let cache_dir = tempdir().unwrap();

    let output = cargo_bin()
        .args(["cache", "ls"])
        .env("DALKEY_CACHE_DIR", cache_dir.path())
        .output()
        .expect("Failed to run dalkey cache ls");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Cache is empty"), "{stdout}");
}
