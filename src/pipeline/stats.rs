//! Pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for the change pipeline.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub changes_submitted: AtomicU64,
    pub changes_ignored: AtomicU64,
    pub actions_superseded: AtomicU64,
    pub actions_executed: AtomicU64,
    pub failures: AtomicU64,
    pub drains: AtomicU64,
}

impl PipelineStats {
    /// Create new stats tracker.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            changes_submitted: self.changes_submitted.load(Ordering::Relaxed),
            changes_ignored: self.changes_ignored.load(Ordering::Relaxed),
            actions_superseded: self.actions_superseded.load(Ordering::Relaxed),
            actions_executed: self.actions_executed.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pipeline stats.
#[derive(Debug, Clone, Copy)]
pub struct PipelineStatsSnapshot {
    pub changes_submitted: u64,
    pub changes_ignored: u64,
    pub actions_superseded: u64,
    pub actions_executed: u64,
    pub failures: u64,
    pub drains: u64,
}
