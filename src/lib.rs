//! Quiesce
//!
//! Coalesces bursts of file-system change notifications into deduplicated
//! batches of deferred actions, executed once the tree has been quiet for a
//! configurable window.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod watcher;

pub use error::{Error, Result};
pub use pipeline::{Action, ActionFactory, ChangePipeline, FileChange};
pub use watcher::DirectoryWatcher;
