//! Progress reporting for apply runs
//!
//! A [`ProgressReporter`] owns a background task that samples the shared
//! completion counter on a fixed cadence and forwards snapshots to a
//! [`ProgressSink`]. The terminal report is raised by an explicit completion
//! signal, never by the counter reaching its total.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use treesync_types::{Error, Result};

/// Point-in-time view of apply progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Actions finished so far
    pub completed: u64,
    /// Actions dispatched in this run
    pub total: u64,
}

impl ProgressSnapshot {
    /// Create a new snapshot
    pub fn new(completed: u64, total: u64) -> Self {
        Self { completed, total }
    }

    /// Completion percentage, 100 for an empty run
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    /// Check whether every action has finished
    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}% ({}/{})",
            self.percent(),
            self.completed,
            self.total
        )
    }
}

/// Render a snapshot as a status line
pub fn format_progress(snapshot: ProgressSnapshot) -> String {
    format!("Progress: {}", snapshot)
}

/// Receiver of progress reports
///
/// `on_tick` is called once per interval while workers run. `on_complete` is
/// called exactly once per run, after every worker has been joined.
pub trait ProgressSink: Send + Sync {
    /// Periodic report
    fn on_tick(&self, snapshot: ProgressSnapshot);

    /// Terminal report
    fn on_complete(&self, snapshot: ProgressSnapshot);
}

/// Sink writing progress lines through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_tick(&self, snapshot: ProgressSnapshot) {
        debug!("{}", format_progress(snapshot));
    }

    fn on_complete(&self, snapshot: ProgressSnapshot) {
        info!("{}", format_progress(snapshot));
    }
}

/// Sink discarding every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_tick(&self, _snapshot: ProgressSnapshot) {}

    fn on_complete(&self, _snapshot: ProgressSnapshot) {}
}

/// Sink collecting every report in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    ticks: Mutex<Vec<ProgressSnapshot>>,
    completions: Mutex<Vec<ProgressSnapshot>>,
}

impl RecordingSink {
    /// Create an empty recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Periodic reports received so far
    pub fn ticks(&self) -> Vec<ProgressSnapshot> {
        self.ticks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Terminal reports received so far
    pub fn completions(&self) -> Vec<ProgressSnapshot> {
        self.completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressSink for RecordingSink {
    fn on_tick(&self, snapshot: ProgressSnapshot) {
        self.ticks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot);
    }

    fn on_complete(&self, snapshot: ProgressSnapshot) {
        self.completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot);
    }
}

/// Handle to a running progress reporter task
#[derive(Debug)]
pub struct ProgressReporter {
    done_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    /// Spawn a reporter sampling `completed` every `interval`
    pub fn spawn(
        completed: Arc<AtomicU64>,
        total: u64,
        interval: Duration,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let (done_tx, mut done_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = &mut done_rx => {
                        sink.on_complete(ProgressSnapshot::new(total, total));
                        return;
                    }
                    _ = ticker.tick() => {
                        let done = completed.load(Ordering::Acquire);
                        sink.on_tick(ProgressSnapshot::new(done, total));
                    }
                }
            }
        });

        Self { done_tx, handle }
    }

    /// Signal completion and wait for the terminal report
    ///
    /// Must only be called once every worker has been joined.
    pub async fn finish(self) -> Result<()> {
        // A send error means the reporter already exited; the join below
        // surfaces why.
        let _ = self.done_tx.send(());
        self.handle
            .await
            .map_err(|e| Error::task(format!("progress reporter failed: {}", e)))
    }
}
