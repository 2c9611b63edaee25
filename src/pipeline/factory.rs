//! Pluggable translation of changes into deferred actions.

use std::sync::Arc;

use super::change::FileChange;
use crate::error::PipelineError;

/// A deferred unit of work produced by an [`ActionFactory`].
///
/// Runs at most once, on the drain worker. An action that is superseded by
/// a newer change with the same fingerprint is dropped without running.
pub type Action = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// Callback invoked with every pipeline failure.
pub type FailureHandler = Arc<dyn Fn(PipelineError) + Send + Sync>;

/// Translates an observed change into the action that should eventually run.
///
/// Implementations are shared across the submitting threads, so they must be
/// `Send + Sync`. Returning `Ok(None)` declines the change; it is counted as
/// ignored and nothing is enqueued.
///
/// Called eagerly at submission time, so building the action must be free of
/// side effects; the action itself performs them when the batch drains, and
/// may be dropped unexecuted if a newer change supersedes it first.
pub trait ActionFactory: Send + Sync + 'static {
    /// Build the deferred action for `change`, or `None` to ignore it.
    ///
    /// # Errors
    ///
    /// Returns an error when the change cannot be translated; the pipeline
    /// reports it as a factory failure and drops the change.
    fn create_action(&self, change: &FileChange) -> anyhow::Result<Option<Action>>;
}

impl<F> ActionFactory for F
where
    F: Fn(&FileChange) -> anyhow::Result<Option<Action>> + Send + Sync + 'static,
{
    fn create_action(&self, change: &FileChange) -> anyhow::Result<Option<Action>> {
        self(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingFactory {
        calls: Arc<AtomicUsize>,
    }

    impl ActionFactory for CountingFactory {
        fn create_action(&self, _change: &FileChange) -> anyhow::Result<Option<Action>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Box::new(|| Ok(()))))
        }
    }

    #[test]
    fn test_struct_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = CountingFactory {
            calls: Arc::clone(&calls),
        };

        let action = factory
            .create_action(&FileChange::Created(PathBuf::from("/tmp/a")))
            .unwrap();
        assert!(action.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_closure_factory() {
        let factory = |change: &FileChange| -> anyhow::Result<Option<Action>> {
            let path = change.path().to_path_buf();
            Ok(Some(Box::new(move || {
                let _ = path;
                Ok(())
            })))
        };

        let action = factory
            .create_action(&FileChange::Modified(PathBuf::from("/tmp/b")))
            .unwrap();
        assert!(action.is_some());
    }

    #[test]
    fn test_factory_can_decline() {
        let factory =
            |_change: &FileChange| -> anyhow::Result<Option<Action>> { Ok(None) };

        let action = factory
            .create_action(&FileChange::Deleted(PathBuf::from("/tmp/c")))
            .unwrap();
        assert!(action.is_none());
    }

    #[test]
    fn test_factory_error_propagates() {
        let factory = |_change: &FileChange| -> anyhow::Result<Option<Action>> {
            anyhow::bail!("unsupported change")
        };

        let result = factory.create_action(&FileChange::Created(PathBuf::from("/tmp/d")));
        assert!(result.is_err());
    }

    #[test]
    fn test_action_runs_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_clone = Arc::clone(&runs);
        let action: Action = Box::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        action().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
