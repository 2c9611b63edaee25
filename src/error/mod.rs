//! Error types and Result aliases for quiesce.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`. Failures
//! that occur inside the pipeline (factory calls, action execution) never
//! propagate out of it; they are delivered to the registered failure
//! handler as [`PipelineError`] values instead.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using quiesce's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for quiesce operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Directory watching error.
    #[error("watch error: {0}")]
    Watch(#[from] WatchError),

    /// Pipeline error (also delivered to the failure handler).
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised while setting up or running the directory watcher.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Failed to subscribe to (or unsubscribe from) a path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// The name filter pattern could not be compiled.
    #[error("invalid name filter pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Failures surfaced by the coalescing pipeline.
///
/// These are the values handed to the failure handler registered via
/// [`ChangePipeline::on_failure`](crate::ChangePipeline::on_failure).
/// Exactly one is produced per originating failure.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The action factory failed while deriving an action; the submission
    /// was dropped.
    #[error("action factory failed for '{}': {cause}", path.display())]
    Factory { path: PathBuf, cause: anyhow::Error },

    /// A drained action returned an error. Remaining actions in the same
    /// batch still run.
    #[error("action failed for '{}': {cause}", path.display())]
    Action { path: PathBuf, cause: anyhow::Error },

    /// A drained action panicked. The panic is contained per action.
    #[error("action panicked for '{}': {detail}", path.display())]
    ActionPanic { path: PathBuf, detail: String },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl PipelineError {
    /// Path of the change this failure originated from.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Factory { path, .. }
            | Self::Action { path, .. }
            | Self::ActionPanic { path, .. } => path,
        }
    }
}
