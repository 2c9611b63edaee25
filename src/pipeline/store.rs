//! Pending-action store keyed by coalescing fingerprint.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::change::Fingerprint;
use super::factory::Action;

/// Holds at most one deferred action per fingerprint.
///
/// Submitting threads upsert concurrently while the drain worker swaps the
/// whole map out, so every operation takes the lock exactly once and holds
/// it only for the map operation itself. Actions are never run under the
/// lock.
pub struct PendingActions {
    inner: Mutex<HashMap<Fingerprint, Action>>,
}

impl PendingActions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Insert `action` under `fingerprint`, replacing any pending action
    /// with the same fingerprint.
    ///
    /// Returns `true` when an older action was superseded. The superseded
    /// action is dropped without running.
    pub fn upsert(&self, fingerprint: Fingerprint, action: Action) -> bool {
        self.inner.lock().insert(fingerprint, action).is_some()
    }

    /// Take every pending action, leaving the store empty.
    ///
    /// Changes submitted after the swap land in the fresh map and wait for
    /// the next drain.
    pub fn drain_all(&self) -> Vec<(Fingerprint, Action)> {
        let drained = std::mem::take(&mut *self.inner.lock());
        drained.into_iter().collect()
    }

    /// Number of distinct fingerprints currently pending.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for PendingActions {
    fn default() -> Self {
        Self::new()
    }
}
