//! Core data types for treesync
//!
//! This module provides the records produced by a directory scan, the manifest
//! that collects them, and the actions the differ derives from two manifests.

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Unique identifier for an apply run
pub type RunId = uuid::Uuid;

/// File size in bytes
pub type FileSize = u64;

/// Metadata and content digest of one regular file
///
/// `name` is the path relative to the scanned root and is the identity key
/// used when two manifests are compared.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileRecord {
    /// Path relative to the scanned root
    pub name: PathBuf,
    /// Lowercase hex SHA-256 of the file content
    pub checksum: String,
    /// Size in bytes
    pub size: FileSize,
    /// Last modification time
    pub modified: SystemTime,
    /// POSIX permission bits (`mode & 0o7777`)
    pub permissions: u32,
}

impl FileRecord {
    /// Create a new file record
    pub fn new(
        name: impl Into<PathBuf>,
        checksum: impl Into<String>,
        size: FileSize,
        modified: SystemTime,
        permissions: u32,
    ) -> Self {
        Self {
            name: name.into(),
            checksum: checksum.into(),
            size,
            modified,
            permissions: permissions & 0o7777,
        }
    }

    /// Fields whose values differ between `self` and `other`
    ///
    /// The modification time is compared exactly, without truncation.
    pub fn changed_fields(&self, other: &Self) -> Vec<ChangedField> {
        let mut fields = Vec::new();
        if self.checksum != other.checksum {
            fields.push(ChangedField::Checksum);
        }
        if self.size != other.size {
            fields.push(ChangedField::Size);
        }
        if self.modified != other.modified {
            fields.push(ChangedField::Modified);
        }
        if self.permissions != other.permissions {
            fields.push(ChangedField::Permissions);
        }
        fields
    }

    /// Check whether any compared field differs from `other`
    pub fn differs_from(&self, other: &Self) -> bool {
        !self.changed_fields(other).is_empty()
    }

    /// Modification time normalized to UTC
    pub fn modified_utc(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.modified)
    }
}

/// A compared attribute of a [`FileRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChangedField {
    /// Content digest
    Checksum,
    /// Byte count
    Size,
    /// Modification time
    Modified,
    /// Permission bits
    Permissions,
}

impl fmt::Display for ChangedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Checksum => "checksum",
            Self::Size => "size",
            Self::Modified => "modified time",
            Self::Permissions => "permissions",
        };
        f.write_str(label)
    }
}

/// The set of file records describing one directory tree at scan time
///
/// Records are unique by name. Inserting a record whose name is already
/// present replaces the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Manifest {
    root: PathBuf,
    records: BTreeMap<PathBuf, FileRecord>,
}

impl Manifest {
    /// Create an empty manifest for the given root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            records: BTreeMap::new(),
        }
    }

    /// Build a manifest from records, last record wins on duplicate names
    pub fn from_records<I>(root: impl Into<PathBuf>, records: I) -> Self
    where
        I: IntoIterator<Item = FileRecord>,
    {
        let mut manifest = Self::new(root);
        for record in records {
            manifest.insert(record);
        }
        manifest
    }

    /// Root directory this manifest was scanned from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Insert a record, returning the record it replaced
    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.records.insert(record.name.clone(), record)
    }

    /// Look up a record by relative name
    pub fn get(&self, name: impl AsRef<Path>) -> Option<&FileRecord> {
        self.records.get(name.as_ref())
    }

    /// Check whether a name is present
    pub fn contains(&self, name: impl AsRef<Path>) -> bool {
        self.records.contains_key(name.as_ref())
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check whether the manifest has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in name order
    pub fn iter(&self) -> btree_map::Values<'_, PathBuf, FileRecord> {
        self.records.values()
    }

    /// Iterate names in order
    pub fn names(&self) -> btree_map::Keys<'_, PathBuf, FileRecord> {
        self.records.keys()
    }

    /// Sum of all record sizes
    pub fn total_bytes(&self) -> u64 {
        self.records.values().map(|r| r.size).sum()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a FileRecord;
    type IntoIter = btree_map::Values<'a, PathBuf, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Kind of a [`SyncAction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActionKind {
    /// File exists only in the source tree
    Add,
    /// File exists in both trees with differing content or metadata
    Modify,
    /// File exists only in the target tree
    Missing,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Add => "Add",
            Self::Modify => "Modify",
            Self::Missing => "Missing",
        };
        f.write_str(label)
    }
}

/// A unit of required change between a source and a target manifest
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SyncAction {
    /// Copy a file that has no counterpart in the target
    Add {
        /// Source-side record
        source: FileRecord,
    },
    /// Overwrite a target file whose content or metadata differs
    Modify {
        /// Source-side record
        source: FileRecord,
        /// Target-side record that will be overwritten
        target: FileRecord,
    },
    /// A target file that has no counterpart in the source
    Missing {
        /// Target-side record describing what would be deleted
        target: FileRecord,
    },
}

impl SyncAction {
    /// Get the action kind
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Add { .. } => ActionKind::Add,
            Self::Modify { .. } => ActionKind::Modify,
            Self::Missing { .. } => ActionKind::Missing,
        }
    }

    /// Relative name the action applies to
    pub fn name(&self) -> &Path {
        match self {
            Self::Add { source } | Self::Modify { source, .. } => &source.name,
            Self::Missing { target } => &target.name,
        }
    }

    /// The record describing the file this action acts on
    pub fn record(&self) -> &FileRecord {
        match self {
            Self::Add { source } | Self::Modify { source, .. } => source,
            Self::Missing { target } => target,
        }
    }

    /// Fields that differ for a `Modify`, empty otherwise
    pub fn changed_fields(&self) -> Vec<ChangedField> {
        match self {
            Self::Modify { source, target } => target.changed_fields(source),
            Self::Add { .. } | Self::Missing { .. } => Vec::new(),
        }
    }
}

/// Outcome summary of an apply run
///
/// Per-action failures are counted here and logged; they are never raised
/// as an error for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApplyReport {
    /// Run identifier used in log spans
    pub run_id: RunId,
    /// Number of actions dispatched
    pub total: u64,
    /// Files copied for `Add` and `Modify`
    pub copied: u64,
    /// Files removed for `Missing`
    pub deleted: u64,
    /// `Missing` actions left alone because deletion was disabled
    pub skipped: u64,
    /// Actions whose filesystem operation failed
    pub failed: u64,
    /// Bytes written to the target tree
    pub bytes_copied: u64,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl ApplyReport {
    /// Create an empty report for a run
    pub fn new(run_id: RunId, total: u64) -> Self {
        Self {
            run_id,
            total,
            ..Self::default()
        }
    }

    /// Number of actions attempted, successfully or not
    pub fn attempted(&self) -> u64 {
        self.copied + self.deleted + self.skipped + self.failed
    }

    /// Check whether every action succeeded
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Average throughput in bytes per second
    pub fn transfer_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.bytes_copied as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}
