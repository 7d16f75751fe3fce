//! Scan, diff and apply orchestration

use crate::apply::{Applier, ApplyOptions};
use crate::diff::{diff, is_sync_required, DiffSummary};
use crate::explain::explain;
use crate::progress::{LogSink, ProgressSink};
use crate::scanner::Scanner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use treesync_config::SyncConfig;
use treesync_types::{ApplyReport, Manifest, ProgressInterval, Result, SyncAction, WorkerCount};

/// Behavior switches for one synchronization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Remove target files absent from the source
    pub delete_missing: bool,
    /// Worker pool size for apply
    pub workers: WorkerCount,
    /// Progress report cadence
    pub progress_interval: ProgressInterval,
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            delete_missing: config.delete_missing,
            workers: config.worker_count(),
            progress_interval: config.progress_interval(),
        }
    }
}

impl SyncOptions {
    fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            workers: self.workers,
            progress_interval: self.progress_interval,
        }
    }
}

/// Source and target trees for one synchronization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Tree to copy from
    pub source: PathBuf,
    /// Tree to bring in line with the source
    pub target: PathBuf,
}

impl SyncRequest {
    /// Create a new request
    pub fn new<S: AsRef<Path>, T: AsRef<Path>>(source: S, target: T) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            target: target.as_ref().to_path_buf(),
        }
    }
}

/// Result of scanning and diffing both trees
#[derive(Debug, Clone)]
pub struct SyncPlan {
    /// Manifest of the source tree
    pub source: Manifest,
    /// Manifest of the target tree
    pub target: Manifest,
    /// Actions that would bring the target in line
    pub actions: Vec<SyncAction>,
    /// Whether `Missing` actions will delete
    pub delete_missing: bool,
}

impl SyncPlan {
    /// Check whether applying the plan would touch the filesystem
    pub fn is_sync_required(&self) -> bool {
        is_sync_required(self.delete_missing, &self.actions)
    }

    /// Per-kind action counts
    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_actions(&self.actions)
    }

    /// Human-readable report of the actions
    pub fn explain(&self) -> String {
        explain(&self.actions)
    }
}

/// Orchestrates scanning, diffing and applying
pub struct SyncEngine {
    scanner: Scanner,
    options: SyncOptions,
    sink: Arc<dyn ProgressSink>,
}

impl SyncEngine {
    /// Create an engine reporting progress through `tracing`
    pub fn new(options: SyncOptions) -> Self {
        Self::with_sink(options, Arc::new(LogSink))
    }

    /// Create an engine reporting progress to a custom sink
    pub fn with_sink(options: SyncOptions, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            scanner: Scanner::new(),
            options,
            sink,
        }
    }

    /// Get the engine options
    pub fn options(&self) -> SyncOptions {
        self.options
    }

    /// Scan both trees concurrently and diff them
    pub async fn plan(&self, request: &SyncRequest) -> Result<SyncPlan> {
        let (source, target) = tokio::try_join!(
            self.scanner.scan(&request.source),
            self.scanner.scan(&request.target)
        )?;

        let actions = diff(&source, &target);
        let plan = SyncPlan {
            source,
            target,
            actions,
            delete_missing: self.options.delete_missing,
        };
        info!(
            "Planned sync '{}' -> '{}': {}",
            request.source.display(),
            request.target.display(),
            plan.summary()
        );
        Ok(plan)
    }

    /// Apply a plan to the target tree
    pub async fn execute(&self, plan: SyncPlan) -> Result<ApplyReport> {
        self.execute_with_sink(plan, Arc::clone(&self.sink)).await
    }

    /// Apply a plan, reporting progress to `sink` instead of the engine's sink
    ///
    /// Useful when the sink needs the action count, which is only known once
    /// the plan exists.
    pub async fn execute_with_sink(
        &self,
        plan: SyncPlan,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<ApplyReport> {
        Applier::with_sink(self.options.apply_options(), sink)
            .apply(
                plan.actions,
                plan.source.root(),
                plan.target.root(),
                plan.delete_missing,
            )
            .await
    }

    /// Plan and apply in one step, skipping apply when nothing is required
    pub async fn sync(&self, request: &SyncRequest) -> Result<Option<ApplyReport>> {
        let plan = self.plan(request).await?;
        if !plan.is_sync_required() {
            info!("No sync required");
            return Ok(None);
        }
        self.execute(plan).await.map(Some)
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
