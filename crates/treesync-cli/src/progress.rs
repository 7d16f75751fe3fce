//! Terminal progress bar for apply runs

use indicatif::{ProgressBar, ProgressStyle};
use treesync_sync::{format_progress, ProgressSink, ProgressSnapshot};

const BAR_TEMPLATE: &str = "{spinner:.green} [{wide_bar:.cyan/blue}] {msg}";

/// Progress sink drawing an `indicatif` bar
pub struct BarSink {
    progress_bar: ProgressBar,
}

impl BarSink {
    /// Create a bar for a run of `total` actions
    pub fn new(total: u64) -> Self {
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ");

        let progress_bar = ProgressBar::new(total);
        progress_bar.set_style(style);
        progress_bar.set_message(format_progress(ProgressSnapshot::new(0, total)));

        Self { progress_bar }
    }

    /// Create a sink that draws nothing
    pub fn hidden(total: u64) -> Self {
        let progress_bar = ProgressBar::hidden();
        progress_bar.set_length(total);
        Self { progress_bar }
    }

    fn update(&self, snapshot: ProgressSnapshot) {
        self.progress_bar.set_length(snapshot.total);
        self.progress_bar.set_position(snapshot.completed);
        self.progress_bar.set_message(format_progress(snapshot));
    }

    /// Last position drawn
    pub fn position(&self) -> u64 {
        self.progress_bar.position()
    }

    /// Check whether the terminal report has been drawn
    pub fn is_finished(&self) -> bool {
        self.progress_bar.is_finished()
    }
}

impl ProgressSink for BarSink {
    fn on_tick(&self, snapshot: ProgressSnapshot) {
        self.update(snapshot);
    }

    fn on_complete(&self, snapshot: ProgressSnapshot) {
        self.update(snapshot);
        self.progress_bar
            .finish_with_message(format_progress(snapshot));
    }
}

/// Progress sink printing one status line per report
///
/// Used when stdout is not a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineSink;

impl ProgressSink for LineSink {
    fn on_tick(&self, snapshot: ProgressSnapshot) {
        println!("{}", format_progress(snapshot));
    }

    fn on_complete(&self, snapshot: ProgressSnapshot) {
        println!("{}", format_progress(snapshot));
    }
}
