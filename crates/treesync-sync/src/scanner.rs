//! Content-addressed directory scanning
//!
//! A scan walks a tree without following symbolic links and records every
//! regular file under its path relative to the root. Each file is hashed by
//! streaming its full content through SHA-256.

use sha2::{Digest, Sha256};
use std::fs::{File, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use treesync_types::{Error, FileRecord, Manifest, Result, ScanError};
use walkdir::WalkDir;

/// Directory scanner producing [`Manifest`]s
#[derive(Debug, Clone, Default)]
pub struct Scanner;

impl Scanner {
    /// Create a new scanner
    pub fn new() -> Self {
        Self
    }

    /// Scan a directory tree on the blocking pool
    ///
    /// Fails with [`Error::Scan`] on the first traversal, open, stat or read
    /// failure; no partial manifest is returned.
    pub async fn scan<P: AsRef<Path>>(&self, root: P) -> Result<Manifest> {
        let root = root.as_ref().to_path_buf();
        let manifest = tokio::task::spawn_blocking(move || scan_blocking(&root))
            .await
            .map_err(|e| Error::task(format!("scan task failed: {}", e)))??;
        Ok(manifest)
    }
}

/// Scan a directory tree on the current thread
pub fn scan_blocking(root: &Path) -> std::result::Result<Manifest, ScanError> {
    let mut manifest = Manifest::new(root);

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
            ScanError::Traverse {
                path,
                source: io::Error::from(e),
            }
        })?;

        // Symlinks, directories, sockets and devices are not synchronized
        if !entry.file_type().is_file() {
            continue;
        }

        let record = hash_file(root, entry.path())?;
        debug!("Scanned {} ({} bytes)", record.name.display(), record.size);
        manifest.insert(record);
    }

    info!(
        "Scanned {} files ({} bytes) in '{}'",
        manifest.len(),
        manifest.total_bytes(),
        root.display()
    );
    Ok(manifest)
}

/// Hash one file and capture its metadata from the open handle
fn hash_file(root: &Path, path: &Path) -> std::result::Result<FileRecord, ScanError> {
    let mut file = File::open(path).map_err(|source| ScanError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let metadata = file.metadata().map_err(|source| ScanError::Metadata {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = metadata.modified().map_err(|source| ScanError::Metadata {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let checksum = format!("{:x}", hasher.finalize());

    Ok(FileRecord::new(
        relative_name(root, path),
        checksum,
        metadata.len(),
        modified,
        permission_bits(&metadata),
    ))
}

fn relative_name(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[tokio::test]
    async fn test_scan_single_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("f.txt"), b"abc").unwrap();

        let manifest = Scanner::new().scan(temp_dir.path()).await.unwrap();

        assert_eq!(manifest.len(), 1);
        let record = manifest.get("f.txt").unwrap();
        assert_eq!(record.checksum, ABC_SHA256);
        assert_eq!(record.size, 3);
        assert_eq!(manifest.root(), temp_dir.path());
    }

    #[test]
    fn test_scan_keys_by_relative_path() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("a/nested")).unwrap();
        fs::create_dir_all(temp_dir.path().join("b")).unwrap();
        fs::write(temp_dir.path().join("a/nested/same.txt"), b"one").unwrap();
        fs::write(temp_dir.path().join("b/same.txt"), b"two").unwrap();

        let manifest = scan_blocking(temp_dir.path()).unwrap();

        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains(Path::new("a").join("nested").join("same.txt")));
        assert!(manifest.contains(Path::new("b").join("same.txt")));
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("empty")).unwrap();

        let manifest = scan_blocking(temp_dir.path()).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_scan_missing_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");

        let error = scan_blocking(&missing).unwrap_err();
        assert!(matches!(error, ScanError::Traverse { .. }));
        assert_eq!(error.path(), missing.as_path());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_captures_permissions_and_skips_symlinks() {
        use std::os::unix::fs::{symlink, PermissionsExt};

        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("script.sh");
        fs::write(&file, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o750)).unwrap();
        symlink(&file, temp_dir.path().join("link.sh")).unwrap();

        let manifest = scan_blocking(temp_dir.path()).unwrap();

        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("script.sh").unwrap().permissions, 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_unreadable_file_aborts() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("ok.txt"), b"ok").unwrap();
        let locked = temp_dir.path().join("locked.txt");
        fs::write(&locked, b"secret").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users bypass permission bits
        if File::open(&locked).is_ok() {
            return;
        }

        let error = scan_blocking(temp_dir.path()).unwrap_err();
        assert!(matches!(error, ScanError::Open { .. }));
        assert_eq!(error.path(), locked.as_path());
        assert_eq!(error.io_error().kind(), io::ErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_special_files() {
        use std::os::unix::net::UnixListener;

        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("regular.txt"), b"abc").unwrap();
        let _listener = UnixListener::bind(temp_dir.path().join("daemon.sock")).unwrap();
        let fifo = std::process::Command::new("mkfifo")
            .arg(temp_dir.path().join("pipe"))
            .status()
            .is_ok_and(|status| status.success());

        // Opening a FIFO without a writer would block the scan
        let manifest = scan_blocking(temp_dir.path()).unwrap();

        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("regular.txt").unwrap().checksum, ABC_SHA256);
        assert_eq!(temp_dir.path().join("pipe").exists(), fifo);
    }

    #[test]
    fn test_scan_captures_modification_time() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("dated.txt");
        fs::write(&file, b"dated").unwrap();
        let mtime = filetime::FileTime::from_unix_time(1_600_000_000, 123_456_789);
        filetime::set_file_mtime(&file, mtime).unwrap();

        let manifest = scan_blocking(temp_dir.path()).unwrap();
        let record = manifest.get("dated.txt").unwrap();

        let expected = fs::metadata(&file).unwrap().modified().unwrap();
        assert_eq!(record.modified, expected);
    }
}
