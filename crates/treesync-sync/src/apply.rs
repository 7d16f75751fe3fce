//! Concurrent application of sync actions
//!
//! The applier dispatches actions over a bounded channel to a fixed pool of
//! worker tasks that share the receiving end. Each worker bumps a shared
//! counter once per finished action, whether it succeeded or not. A
//! [`ProgressReporter`] samples that counter until every worker has been
//! joined, then emits the single terminal report.

use crate::progress::{LogSink, ProgressReporter, ProgressSink};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};
use treesync_types::{
    ApplyActionError, ApplyReport, Error, ProgressInterval, Result, RunId, SyncAction,
    WorkerCount,
};

/// Name prefix of the temporary files copies are staged in
const STAGING_PREFIX: &str = ".treesync-";

/// Tuning for an apply run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Worker pool size
    pub workers: WorkerCount,
    /// Progress report cadence
    pub progress_interval: ProgressInterval,
}

impl ApplyOptions {
    /// Options with an explicit worker count, clamped to the valid range
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: WorkerCount::clamped(workers),
            ..Self::default()
        }
    }
}

/// Executes sync actions against the filesystem
pub struct Applier {
    options: ApplyOptions,
    sink: Arc<dyn ProgressSink>,
}

impl Applier {
    /// Create an applier reporting progress through `tracing`
    pub fn new(options: ApplyOptions) -> Self {
        Self::with_sink(options, Arc::new(LogSink))
    }

    /// Create an applier reporting progress to a custom sink
    pub fn with_sink(options: ApplyOptions, sink: Arc<dyn ProgressSink>) -> Self {
        Self { options, sink }
    }

    /// Get the run options
    pub fn options(&self) -> ApplyOptions {
        self.options
    }

    /// Apply every action and wait for all of them to finish
    ///
    /// `Add` and `Modify` copy `source_root/name` to `target_root/name`,
    /// creating parent directories and restoring permission bits and
    /// modification time. `Missing` removes `target_root/name` only when
    /// `delete_missing` is set. A failing action is logged and counted in the
    /// report; it never stops the others.
    pub async fn apply(
        &self,
        actions: Vec<SyncAction>,
        source_root: &Path,
        target_root: &Path,
        delete_missing: bool,
    ) -> Result<ApplyReport> {
        let run_id = RunId::new_v4();
        let start = Instant::now();
        let total = actions.len() as u64;
        let workers = self.options.workers.get();

        info!(
            "Applying {} actions with {} workers (run {})",
            total, workers, run_id
        );

        let context = Arc::new(WorkerContext {
            source_root: source_root.to_path_buf(),
            target_root: target_root.to_path_buf(),
            delete_missing,
            completed: Arc::new(AtomicU64::new(0)),
            tally: Tally::default(),
        });

        let reporter = ProgressReporter::spawn(
            Arc::clone(&context.completed),
            total,
            self.options.progress_interval.get(),
            Arc::clone(&self.sink),
        );

        let mut handles = Vec::new();
        if !actions.is_empty() {
            let (tx, rx) = mpsc::channel::<SyncAction>(workers * 2);
            let rx = Arc::new(Mutex::new(rx));

            for worker_id in 0..workers {
                let rx = Arc::clone(&rx);
                let context = Arc::clone(&context);
                handles.push(tokio::spawn(run_worker(worker_id, rx, context)));
            }

            for action in actions {
                if tx.send(action).await.is_err() {
                    error!("All apply workers exited before dispatch finished");
                    break;
                }
            }
            // Closing the channel lets idle workers exit
            drop(tx);
        }

        let joined = futures::future::join_all(handles).await;
        reporter.finish().await?;

        for result in joined {
            result.map_err(|e| Error::task(format!("apply worker failed: {}", e)))?;
        }

        let report = context.tally.report(run_id, total, start);
        info!(
            "Applied {} actions: {} copied, {} deleted, {} skipped, {} failed in {:?}",
            report.attempted(),
            report.copied,
            report.deleted,
            report.skipped,
            report.failed,
            report.duration
        );
        Ok(report)
    }
}

impl std::fmt::Debug for Applier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Applier")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Apply actions with default options, logging progress through `tracing`
pub async fn apply(
    actions: Vec<SyncAction>,
    source_root: &Path,
    target_root: &Path,
    delete_missing: bool,
) -> Result<ApplyReport> {
    Applier::new(ApplyOptions::default())
        .apply(actions, source_root, target_root, delete_missing)
        .await
}

struct WorkerContext {
    source_root: PathBuf,
    target_root: PathBuf,
    delete_missing: bool,
    completed: Arc<AtomicU64>,
    tally: Tally,
}

#[derive(Default)]
struct Tally {
    copied: AtomicU64,
    deleted: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    bytes_copied: AtomicU64,
}

impl Tally {
    fn record(&self, outcome: &std::result::Result<Outcome, ApplyActionError>) {
        match outcome {
            Ok(Outcome::Copied(bytes)) => {
                self.copied.fetch_add(1, Ordering::Relaxed);
                self.bytes_copied.fetch_add(*bytes, Ordering::Relaxed);
            }
            Ok(Outcome::Deleted) => {
                self.deleted.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Outcome::Skipped) => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn report(&self, run_id: RunId, total: u64, start: Instant) -> ApplyReport {
        ApplyReport {
            copied: self.copied.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
            duration: start.elapsed(),
            ..ApplyReport::new(run_id, total)
        }
    }
}

enum Outcome {
    Copied(u64),
    Deleted,
    Skipped,
}

async fn run_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<SyncAction>>>,
    context: Arc<WorkerContext>,
) {
    loop {
        // The lock is released before the action runs
        let next = { rx.lock().await.recv().await };
        let Some(action) = next else {
            break;
        };

        let outcome = execute_action(&context, &action).await;
        match &outcome {
            Ok(Outcome::Copied(bytes)) => {
                debug!(
                    "Worker {} copied {} ({} bytes)",
                    worker_id,
                    action.name().display(),
                    bytes
                );
            }
            Ok(Outcome::Deleted) => {
                debug!("Worker {} deleted {}", worker_id, action.name().display());
            }
            Ok(Outcome::Skipped) => {
                debug!("Worker {} left {} in place", worker_id, action.name().display());
            }
            Err(e) => error!("{}", e),
        }
        context.tally.record(&outcome);
        context.completed.fetch_add(1, Ordering::AcqRel);
    }
    debug!("Worker {} finished", worker_id);
}

async fn execute_action(
    context: &WorkerContext,
    action: &SyncAction,
) -> std::result::Result<Outcome, ApplyActionError> {
    let target_path = context.target_root.join(action.name());

    match action {
        SyncAction::Add { .. } | SyncAction::Modify { .. } => {
            let source_path = context.source_root.join(action.name());
            copy_preserving(&source_path, &target_path)
                .await
                .map(Outcome::Copied)
                .map_err(|source| ApplyActionError::Copy {
                    source_path,
                    target_path,
                    source,
                })
        }
        SyncAction::Missing { .. } if context.delete_missing => fs::remove_file(&target_path)
            .await
            .map(|()| Outcome::Deleted)
            .map_err(|source| ApplyActionError::Delete {
                path: target_path,
                source,
            }),
        SyncAction::Missing { .. } => Ok(Outcome::Skipped),
    }
}

/// Copy a file and restore the source's permission bits and mtime
///
/// Content is staged in a temporary file beside the destination and renamed
/// over it, which replaces a symlink or read-only file at `target_path`
/// instead of writing through it. Metadata is read from the open source
/// handle so the restored values match the content that was streamed.
async fn copy_preserving(source_path: &Path, target_path: &Path) -> io::Result<u64> {
    let mut reader = File::open(source_path).await?;
    let metadata = reader.metadata().await?;

    let parent = target_path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    fs::create_dir_all(&parent).await?;

    let staged = tokio::task::spawn_blocking(move || {
        tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(parent)
    })
    .await
    .map_err(io::Error::other)??;
    let (file, staged_path) = staged.into_parts();

    let mut writer = File::from_std(file);
    let bytes = tokio::io::copy(&mut reader, &mut writer).await?;
    writer.flush().await?;
    writer.set_permissions(metadata.permissions()).await?;

    let mtime = filetime::FileTime::from_last_modification_time(&metadata);
    let writer = writer.into_std().await;
    filetime::set_file_handle_times(&writer, None, Some(mtime))?;
    drop(writer);

    // The staged file is removed on drop unless the rename succeeds
    let target_path = target_path.to_path_buf();
    tokio::task::spawn_blocking(move || staged_path.persist(target_path))
        .await
        .map_err(io::Error::other)??;

    Ok(bytes)
}
