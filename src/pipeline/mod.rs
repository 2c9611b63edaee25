//! Change coalescing and debounced execution.
//!
//! This module provides:
//! - File-change and fingerprint types
//! - A pending-action store holding one action per fingerprint
//! - A quiet-window drain worker with at most one batch in flight
//! - The [`ChangePipeline`] facade tying them together

mod change;
mod debounce;
mod engine;
mod factory;
mod stats;
mod store;

pub use change::{ChangeKind, FileChange, Fingerprint};
pub use engine::ChangePipeline;
pub use factory::{Action, ActionFactory, FailureHandler};
pub use stats::{PipelineStats, PipelineStatsSnapshot};
pub use store::PendingActions;
