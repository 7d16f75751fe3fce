//! Core data model and error handling for treesync
//!
//! This crate provides the types shared by every stage of a one-way
//! directory synchronization:
//!
//! - **Records**: [`FileRecord`] and the name-keyed [`Manifest`] a scan produces
//! - **Actions**: the [`SyncAction`] variants the differ emits
//! - **Errors**: fatal [`ScanError`] and per-action [`ApplyActionError`]
//! - **Configuration**: validated [`WorkerCount`] and [`ProgressInterval`]
//!
//! # Features
//!
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use std::time::SystemTime;
//! use treesync_types::{FileRecord, Manifest};
//!
//! let record = FileRecord::new("docs/readme.md", "00ff", 2, SystemTime::UNIX_EPOCH, 0o644);
//! let manifest = Manifest::from_records("/srv/data", [record]);
//! assert!(manifest.contains("docs/readme.md"));
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use config::{ProgressInterval, WorkerCount};
pub use error::{ApplyActionError, Error, ErrorKind, ErrorSeverity, ScanError};
pub use result::Result;
pub use types::*;
