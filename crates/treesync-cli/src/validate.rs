//! Directory checks run before any scan

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use tracing::debug;

/// Name of the probe file created by [`is_writable`]
pub const PROBE_FILE_NAME: &str = ".perm_check.tmp";

/// Check that `path` exists and is a directory
pub fn is_directory(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// Check that a file can be created inside `path`
pub fn is_writable(path: &Path) -> bool {
    match probe_writable(path) {
        Ok(()) => true,
        Err(e) => {
            debug!("Write probe in '{}' failed: {}", path.display(), e);
            false
        }
    }
}

/// Create and remove a probe file inside `path`
pub fn probe_writable(path: &Path) -> io::Result<()> {
    let probe = path.join(PROBE_FILE_NAME);
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&probe)?;
    fs::remove_file(&probe)
}
