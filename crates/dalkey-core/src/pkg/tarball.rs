//! Tarball download and fan-out extraction.
//!
//! npm archives nest their contents under a single `package/` directory.
//! Extraction strips that prefix and writes each file to the install
//! destination and the package cache in one pass over the stream, so the
//! archive is never read twice.

use super::error::PkgError;
use bytes::Bytes;
use flate2::read::GzDecoder;
use reqwest::Client;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tar::Archive;

/// Maximum tarball size (200 MB).
pub const MAX_TARBALL_SIZE: u64 = 200 * 1024 * 1024;

/// Download timeout in seconds. Archive transfers get far more time than
/// metadata lookups.
const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Leading path segment stripped from every archive entry.
const ARCHIVE_PREFIX: &str = "package";

/// Download a tarball from a URL.
///
/// # Errors
/// Returns an error if the download fails or exceeds the size limit.
pub async fn download_tarball(
    client: &Client,
    url: &str,
    max_bytes: u64,
) -> Result<Bytes, PkgError> {
    let response = client
        .get(url)
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| PkgError::download_failed(format!("Failed to download '{url}': {e}")))?;

    if !response.status().is_success() {
        return Err(PkgError::download_failed(format!(
            "Download failed with status {} for '{url}'",
            response.status()
        )));
    }

    // Check content length if available
    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(PkgError::download_failed(format!(
                "Tarball too large: {len} bytes (max: {max_bytes})"
            )));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PkgError::download_failed(format!("Failed to read response body: {e}")))?;

    if bytes.len() as u64 > max_bytes {
        return Err(PkgError::download_failed(format!(
            "Tarball too large: {} bytes (max: {max_bytes})",
            bytes.len()
        )));
    }

    Ok(bytes)
}

/// Extract a gzip-compressed tar archive into a destination tree and a cache
/// tree simultaneously.
///
/// Any pre-existing destination or cache directory for this package is
/// removed first, so extraction always starts from a clean slate. Writes go
/// to temporary sibling directories which are renamed into place on success;
/// a crash mid-extraction leaves no half-written tree behind a presence
/// check.
///
/// Entries whose paths would escape the destination root are skipped, not
/// fatal: a hostile archive loses its hostile entries and keeps the rest.
/// Symlinks and other special entry types are skipped as well.
///
/// # Errors
/// Returns an error if the archive cannot be read or the filesystem writes
/// fail.
pub fn extract_fanout(bytes: &[u8], dest_dir: &Path, cache_dir: &Path) -> Result<(), PkgError> {
    remove_existing(dest_dir)?;
    remove_existing(cache_dir)?;

    if let Some(parent) = dest_dir.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Some(parent) = cache_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let dest_tmp = temp_sibling(dest_dir);
    let cache_tmp = temp_sibling(cache_dir);
    fs::create_dir_all(&dest_tmp)?;
    fs::create_dir_all(&cache_tmp)?;

    let result = extract_entries(bytes, &dest_tmp, &cache_tmp)
        .and_then(|()| rename_into_place(&dest_tmp, dest_dir))
        .and_then(|()| rename_into_place(&cache_tmp, cache_dir));

    if result.is_err() {
        let _ = fs::remove_dir_all(&dest_tmp);
        let _ = fs::remove_dir_all(&cache_tmp);
    }

    result
}

fn extract_entries(bytes: &[u8], dest_root: &Path, cache_root: &Path) -> Result<(), PkgError> {
    let gz = GzDecoder::new(bytes);
    let mut archive = Archive::new(gz);

    for entry in archive
        .entries()
        .map_err(|e| PkgError::extract_failed(format!("Failed to read tarball entries: {e}")))?
    {
        let mut entry = entry
            .map_err(|e| PkgError::extract_failed(format!("Failed to read tarball entry: {e}")))?;

        let path = entry
            .path()
            .map_err(|e| PkgError::extract_failed(format!("Failed to read entry path: {e}")))?
            .into_owned();

        // Entries outside the conventional archive root (including absolute
        // paths) carry nothing we want; skip them.
        let Ok(rel) = path.strip_prefix(ARCHIVE_PREFIX) else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }

        // Path traversal defense: resolve the target lexically and require it
        // to stay strictly under the extraction root. Offending entries are
        // skipped, the rest of the archive still extracts.
        let Some(target) = join_checked(dest_root, rel) else {
            continue;
        };
        // Same relative path, so the cache side is safe iff the dest side is.
        let cache_target = cache_root.join(rel);

        let entry_type = entry.header().entry_type();
        let mode = entry.header().mode().unwrap_or(0o644);

        if entry_type.is_dir() {
            fs::create_dir_all(&target)?;
            fs::create_dir_all(&cache_target)?;
            set_mode(&target, mode);
            set_mode(&cache_target, mode);
        } else if entry_type.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            if let Some(parent) = cache_target.parent() {
                fs::create_dir_all(parent)?;
            }

            write_fanout(&mut entry, &target, &cache_target)?;
            set_mode(&target, mode);
            set_mode(&cache_target, mode);
        }
        // Skip symlinks and other special entries
    }

    Ok(())
}

/// Write one archive entry to both trees in a single read pass.
fn write_fanout(reader: &mut impl Read, a: &Path, b: &Path) -> Result<(), PkgError> {
    let mut file_a = File::create(a)?;
    let mut file_b = File::create(b)?;

    let mut tee = TeeWriter {
        a: &mut file_a,
        b: &mut file_b,
    };
    io::copy(reader, &mut tee)
        .map_err(|e| PkgError::extract_failed(format!("Failed to write {}: {e}", a.display())))?;

    Ok(())
}

/// Writer that duplicates every byte into two underlying files.
struct TeeWriter<'a> {
    a: &'a mut File,
    b: &'a mut File,
}

impl Write for TeeWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.a.write_all(buf)?;
        self.b.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}

/// Lexically join `rel` onto `root`, refusing any path that would land
/// outside `root`.
fn join_checked(root: &Path, rel: &Path) -> Option<PathBuf> {
    let mut out = root.to_path_buf();

    for comp in rel.components() {
        match comp {
            Component::Normal(c) => out.push(c),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() || !out.starts_with(root) {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if out.starts_with(root) && out != root {
        Some(out)
    } else {
        None
    }
}

fn remove_existing(path: &Path) -> Result<(), PkgError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PkgError::extract_failed(format!(
            "Failed to remove {}: {e}",
            path.display()
        ))),
    }
}

fn rename_into_place(tmp: &Path, dest: &Path) -> Result<(), PkgError> {
    match fs::rename(tmp, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Another writer may have won the rename race; their tree is as
            // good as ours.
            if dest.is_dir() {
                let _ = fs::remove_dir_all(tmp);
                return Ok(());
            }
            Err(PkgError::extract_failed(format!(
                "Failed to move extracted tree into {}: {e}",
                dest.display()
            )))
        }
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("pkg");
    path.with_file_name(format!(".tmp-{}-{}", std::process::id(), name))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode));
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::tempdir;

    fn tgz_from(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut tar_bytes = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_bytes);
            for (path, data) in entries {
                let mut header = tar::Header::new_gnu();
                // Write the name bytes directly: set_path() refuses `..` and
                // absolute paths, which is exactly what a hostile archive
                // would contain.
                header.as_gnu_mut().unwrap().name[..path.len()]
                    .copy_from_slice(path.as_bytes());
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append(&header, *data).unwrap();
            }
            builder.finish().unwrap();
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn create_test_tarball() -> Vec<u8> {
        tgz_from(&[
            (
                "package/package.json",
                br#"{"name":"test","version":"1.0.0"}"#,
            ),
            ("package/index.js", b"module.exports = 42;"),
            ("package/lib/util.js", b"exports.id = (x) => x;"),
        ])
    }

    #[test]
    fn test_extract_writes_both_trees() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("node_modules").join("test");
        let cache = dir.path().join("cache").join("test-1.0.0-abc");

        extract_fanout(&create_test_tarball(), &dest, &cache).unwrap();

        for root in [&dest, &cache] {
            assert!(root.join("package.json").exists());
            assert!(root.join("index.js").exists());
            assert!(root.join("lib").join("util.js").exists());
        }

        assert_eq!(
            fs::read(dest.join("index.js")).unwrap(),
            fs::read(cache.join("index.js")).unwrap()
        );
    }

    #[test]
    fn test_extract_replaces_existing_trees() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        let cache = dir.path().join("cache");

        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.js"), "old").unwrap();

        extract_fanout(&create_test_tarball(), &dest, &cache).unwrap();

        assert!(!dest.join("stale.js").exists());
        assert!(dest.join("index.js").exists());
    }

    #[test]
    fn test_extract_leaves_no_temp_dirs() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        let cache = dir.path().join("cache");

        extract_fanout(&create_test_tarball(), &dest, &cache).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_traversal_entry_is_skipped_not_fatal() {
        let tgz = tgz_from(&[
            ("package/../../evil.js", b"boom"),
            ("package/index.js", b"ok"),
        ]);

        let dir = tempdir().unwrap();
        let dest = dir.path().join("node_modules").join("test");
        let cache = dir.path().join("cache").join("entry");

        extract_fanout(&tgz, &dest, &cache).unwrap();

        // The hostile entry never lands outside the destination root...
        assert!(!dir.path().join("evil.js").exists());
        assert!(!dir.path().join("node_modules").join("evil.js").exists());
        // ...and the well-formed entries still extract.
        assert!(dest.join("index.js").exists());
        assert!(cache.join("index.js").exists());
    }

    #[test]
    fn test_entries_outside_archive_root_are_skipped() {
        let tgz = tgz_from(&[
            ("other/loose.js", b"loose"),
            ("/abs/evil.js", b"boom"),
            ("package/index.js", b"ok"),
        ]);

        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        let cache = dir.path().join("cache");

        extract_fanout(&tgz, &dest, &cache).unwrap();

        assert!(dest.join("index.js").exists());
        assert!(!dest.join("loose.js").exists());
        assert!(!dir.path().join("other").exists());
    }

    #[test]
    fn test_extract_preserves_mode_bits() {
        let mut tar_bytes = Vec::new();
        {
            let mut builder = tar::Builder::new(&mut tar_bytes);
            let data = b"#!/bin/sh\necho hi\n";
            let mut header = tar::Header::new_gnu();
            header.set_path("package/bin/run.sh").unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append(&header, &data[..]).unwrap();
            builder.finish().unwrap();
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar_bytes).unwrap();
        let tgz = encoder.finish().unwrap();

        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        let cache = dir.path().join("cache");

        extract_fanout(&tgz, &dest, &cache).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dest.join("bin").join("run.sh"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }
        #[cfg(not(unix))]
        assert!(dest.join("bin").join("run.sh").exists());
    }

    #[test]
    fn test_join_checked_rejects_escapes() {
        let root = Path::new("/safe/root");
        assert!(join_checked(root, Path::new("../../evil")).is_none());
        assert!(join_checked(root, Path::new("a/../../..")).is_none());
        assert!(join_checked(root, Path::new("/abs")).is_none());
        assert_eq!(
            join_checked(root, Path::new("a/../b")),
            Some(PathBuf::from("/safe/root/b"))
        );
        assert_eq!(
            join_checked(root, Path::new("lib/index.js")),
            Some(PathBuf::from("/safe/root/lib/index.js"))
        );
    }
}
