//! Configuration management for treesync
//!
//! Configuration is layered: built-in defaults, then an optional file (YAML,
//! TOML or JSON), then environment variables prefixed with `TREESYNC_`.
//! Nested keys use `__` as separator, e.g. `TREESYNC_SYNC__DELETE_MISSING=true`.
//! No configuration file is required; command-line flags override all layers.
//!
//! # Examples
//!
//! ```rust
//! use treesync_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .build()
//!     .expect("defaults are valid");
//!
//! assert!(!config.sync.delete_missing);
//! assert_eq!(config.sync.progress_interval_ms, 200);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use treesync_types::{ProgressInterval, WorkerCount};

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Environment variable prefix used by the default loaders
pub const ENV_PREFIX: &str = "TREESYNC";

/// Main configuration structure for treesync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Synchronization behavior
    #[serde(default)]
    pub sync: SyncConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Synchronization behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remove target files that are absent from the source
    pub delete_missing: bool,
    /// Worker pool override, clamped to 2..=8 when used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Progress report cadence in milliseconds
    pub progress_interval_ms: u64,
}

impl SyncConfig {
    /// Worker pool size, falling back to the host's parallelism
    pub fn worker_count(&self) -> WorkerCount {
        self.workers
            .map_or_else(WorkerCount::optimal, WorkerCount::clamped)
    }

    /// Progress cadence, falling back to the default for a zero value
    pub fn progress_interval(&self) -> ProgressInterval {
        ProgressInterval::from_millis(self.progress_interval_ms).unwrap_or_default()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            delete_missing: false,
            workers: None,
            progress_interval_ms: 200,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable JSON formatting
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json_format: false,
        }
    }
}
