//! Scan, diff and concurrent apply engine for treesync
//!
//! This crate implements the three stages of a one-way directory
//! synchronization:
//!
//! - **Scan**: [`Scanner`] hashes every regular file of a tree with SHA-256
//! - **Diff**: [`diff`] turns two manifests into [`SyncAction`]s, and
//!   [`is_sync_required`] decides whether any of them need work
//! - **Apply**: [`Applier`] runs the actions on a bounded worker pool while a
//!   [`ProgressReporter`] reports on a fixed cadence
//!
//! [`explain`] renders actions for humans and [`SyncEngine`] ties the stages
//! together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use treesync_sync::{SyncEngine, SyncOptions, SyncRequest};
//!
//! # async fn example() -> treesync_types::Result<()> {
//! let engine = SyncEngine::new(SyncOptions::default());
//! let plan = engine.plan(&SyncRequest::new("photos", "/mnt/backup/photos")).await?;
//! print!("{}", plan.explain());
//! if plan.is_sync_required() {
//!     let report = engine.execute(plan).await?;
//!     println!("Copied {} files", report.copied);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`SyncAction`]: treesync_types::SyncAction

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod apply;
pub mod diff;
pub mod engine;
pub mod explain;
pub mod progress;
pub mod scanner;

pub use apply::{apply, Applier, ApplyOptions};
pub use diff::{diff, is_sync_required, DiffSummary};
pub use engine::{SyncEngine, SyncOptions, SyncPlan, SyncRequest};
pub use explain::{explain, format_mode, write_explanation};
pub use progress::{
    format_progress, LogSink, NullSink, ProgressReporter, ProgressSink, ProgressSnapshot,
    RecordingSink,
};
pub use scanner::{scan_blocking, Scanner};
