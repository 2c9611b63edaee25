//! Configuration settings and validation.

use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default quiet window between the last observed change and the drain.
pub const DEFAULT_QUIET_WINDOW: Duration = Duration::from_millis(200);

/// Quiet-window settings for the change pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How long the tree must stay quiet before pending actions run.
    pub quiet_window: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            quiet_window: DEFAULT_QUIET_WINDOW,
        }
    }
}

/// Which part of the file system to observe.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Root of the directory tree to observe.
    pub root: PathBuf,

    /// Optional glob selecting which file names are forwarded.
    pub pattern: Option<String>,

    /// Whether to observe subdirectories.
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            pattern: None,
            recursive: true,
        }
    }
}

/// Main configuration for the quiesce binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// What to watch.
    pub watch: WatchConfig,

    /// Coalescing behavior.
    pub pipeline: PipelineConfig,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch: WatchConfig::default(),
            pipeline: PipelineConfig::default(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.watch.root.as_os_str().is_empty() {
            return Err(Error::config("watch root cannot be empty"));
        }

        if self.pipeline.quiet_window.is_zero() {
            return Err(Error::config("quiet window cannot be zero"));
        }

        if self.pipeline.quiet_window > Duration::from_secs(3600) {
            return Err(Error::config("quiet window cannot exceed 3600 seconds"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }
}
