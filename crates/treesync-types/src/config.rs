//! Configuration types for treesync
//!
//! Validated newtypes shared by the configuration layer and the applier.

use std::time::Duration;

/// Size of the apply worker pool
///
/// Always between [`WorkerCount::MIN`] and [`WorkerCount::MAX`] so that the
/// pool is concurrent on single-core hosts and bounded on large ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkerCount(usize);

impl WorkerCount {
    /// Minimum worker count
    pub const MIN: usize = 2;
    /// Maximum worker count
    pub const MAX: usize = 8;

    /// Create a new worker count with validation
    pub fn new(count: usize) -> Result<Self, String> {
        if count < Self::MIN {
            Err(format!("Worker count {} is below minimum {}", count, Self::MIN))
        } else if count > Self::MAX {
            Err(format!("Worker count {} exceeds maximum {}", count, Self::MAX))
        } else {
            Ok(Self(count))
        }
    }

    /// Create a worker count, clamping out-of-range values
    pub fn clamped(count: usize) -> Self {
        Self(count.clamp(Self::MIN, Self::MAX))
    }

    /// Get the worker count value
    pub fn get(self) -> usize {
        self.0
    }

    /// Worker count derived from the host's available parallelism
    pub fn optimal() -> Self {
        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(Self::MIN);
        Self::clamped(cpu_count)
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self::optimal()
    }
}

/// Cadence of progress reports during apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressInterval(Duration);

impl ProgressInterval {
    /// Default cadence (200ms)
    pub const DEFAULT: Duration = Duration::from_millis(200);

    /// Create a new interval with validation
    pub fn new(interval: Duration) -> Result<Self, String> {
        if interval.is_zero() {
            Err("Progress interval must be greater than zero".to_string())
        } else {
            Ok(Self(interval))
        }
    }

    /// Create an interval from milliseconds
    pub fn from_millis(millis: u64) -> Result<Self, String> {
        Self::new(Duration::from_millis(millis))
    }

    /// Get the interval value
    pub fn get(self) -> Duration {
        self.0
    }
}

impl Default for ProgressInterval {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}
