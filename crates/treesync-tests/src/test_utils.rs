//! Fixtures for treesync integration tests

use filetime::FileTime;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// A temporary directory tree removed on drop
#[derive(Debug)]
pub struct TestTree {
    dir: TempDir,
}

impl TestTree {
    /// Create an empty tree
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Root of the tree
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a relative name
    pub fn join<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a file, creating parent directories
    pub fn write<P: AsRef<Path>>(&self, name: P, content: &[u8]) -> io::Result<PathBuf> {
        let path = self.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Write a file with explicit permission bits
    #[cfg(unix)]
    pub fn write_with_mode<P: AsRef<Path>>(
        &self,
        name: P,
        content: &[u8],
        mode: u32,
    ) -> io::Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let path = self.write(name, content)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(mode))?;
        Ok(path)
    }

    /// Set a file's modification time
    pub fn set_mtime<P: AsRef<Path>>(&self, name: P, unix_secs: i64, nanos: u32) -> io::Result<()> {
        filetime::set_file_mtime(self.join(name), FileTime::from_unix_time(unix_secs, nanos))
    }

    /// Read a file's content
    pub fn read<P: AsRef<Path>>(&self, name: P) -> io::Result<Vec<u8>> {
        fs::read(self.join(name))
    }

    /// Check whether a relative name exists
    pub fn exists<P: AsRef<Path>>(&self, name: P) -> bool {
        self.join(name).exists()
    }

    /// Relative name to content of every regular file in the tree
    pub fn snapshot(&self) -> io::Result<BTreeMap<PathBuf, Vec<u8>>> {
        snapshot_dir(self.path())
    }
}

/// Relative name to content of every regular file under `root`
pub fn snapshot_dir(root: &Path) -> io::Result<BTreeMap<PathBuf, Vec<u8>>> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        files.insert(name, fs::read(entry.path())?);
    }
    Ok(files)
}

/// Fill a tree with `count` files spread over a few nested directories
pub fn populate(tree: &TestTree, count: usize) -> io::Result<Vec<PathBuf>> {
    let mut names = Vec::with_capacity(count);
    for i in 0..count {
        let name = PathBuf::from(format!("level{}/sub{}/file{:04}.txt", i % 3, i % 5, i));
        tree.write(&name, format!("content of file {}", i).as_bytes())?;
        names.push(name);
    }
    Ok(names)
}
