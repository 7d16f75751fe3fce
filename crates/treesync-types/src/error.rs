//! Error types and handling for treesync
//!
//! Two failure classes exist. A [`ScanError`] is fatal and aborts the run
//! before any diff or apply happens. An [`ApplyActionError`] is isolated to a
//! single action; the applier logs it and carries on with the rest.

use std::io;
use std::path::PathBuf;

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Medium severity - the current action failed, siblings continue
    Medium,
    /// High severity - operation should be aborted
    High,
    /// Critical severity - entire process should be terminated
    Critical,
}

/// Failure while building a manifest
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The directory tree could not be traversed
    #[error("cannot traverse '{path}': {source}")]
    Traverse {
        /// Path at which traversal failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A regular file could not be opened
    #[error("cannot open file '{path}': {source}")]
    Open {
        /// File that could not be opened
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// File metadata could not be read
    #[error("cannot stat file '{path}': {source}")]
    Metadata {
        /// File whose metadata was unavailable
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// File content could not be fully read
    #[error("error reading file '{path}': {source}")]
    Read {
        /// File whose content could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Path that caused the failure
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Traverse { path, .. }
            | Self::Open { path, .. }
            | Self::Metadata { path, .. }
            | Self::Read { path, .. } => path,
        }
    }

    /// Underlying I/O error
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::Traverse { source, .. }
            | Self::Open { source, .. }
            | Self::Metadata { source, .. }
            | Self::Read { source, .. } => source,
        }
    }
}

/// Failure of a single copy or delete during apply
#[derive(thiserror::Error, Debug)]
pub enum ApplyActionError {
    /// Copying the file or restoring its metadata failed
    #[error("failed to copy '{source_path}' to '{target_path}': {source}")]
    Copy {
        /// File being read
        source_path: PathBuf,
        /// File being written
        target_path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Removing a target file failed
    #[error("failed to delete '{path}': {source}")]
    Delete {
        /// File being removed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ApplyActionError {
    /// Target-side path the failed action was working on
    pub fn target_path(&self) -> &std::path::Path {
        match self {
            Self::Copy { target_path, .. } => target_path,
            Self::Delete { path, .. } => path,
        }
    }
}

/// Main error type for treesync operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Manifest construction failed
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A single apply action failed
    #[error(transparent)]
    Apply(#[from] ApplyActionError),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// A background task panicked or was aborted
    #[error("Task failed: {message}")]
    Task {
        /// Error message from the join handle
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Scan errors
    Scan,
    /// Apply errors
    Apply,
    /// Configuration errors
    Config,
    /// Background task errors
    Task,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Scan(_) => ErrorKind::Scan,
            Self::Apply(_) => ErrorKind::Apply,
            Self::Config { .. } => ErrorKind::Config,
            Self::Task { .. } => ErrorKind::Task,
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Scan(_) => ErrorSeverity::Critical,
            Self::Apply(_) => ErrorSeverity::Medium,
            Self::Config { .. } => ErrorSeverity::High,
            Self::Task { .. } => ErrorSeverity::Critical,
        }
    }

    /// Check whether this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        self.severity() >= ErrorSeverity::High
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new task error
    pub fn task<S: Into<String>>(message: S) -> Self {
        Self::Task {
            message: message.into(),
        }
    }
}
