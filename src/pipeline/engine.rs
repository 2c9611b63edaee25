//! Coalescing, debounced execution pipeline.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::change::{FileChange, Fingerprint};
use super::debounce::spawn_drain_worker;
use super::factory::{ActionFactory, FailureHandler};
use super::stats::{PipelineStats, PipelineStatsSnapshot};
use super::store::PendingActions;
use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// State shared between pipeline handles and the drain worker.
pub(crate) struct Shared {
    pub(crate) store: PendingActions,
    pub(crate) stats: Arc<PipelineStats>,
    pub(crate) failure_handler: RwLock<Option<FailureHandler>>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            store: PendingActions::new(),
            stats: PipelineStats::new(),
            failure_handler: RwLock::new(None),
        }
    }

    /// Count and log the failure, then hand it to the registered handler.
    pub(crate) fn report_failure(&self, error: PipelineError) {
        self.stats.failures.fetch_add(1, Ordering::Relaxed);
        warn!(path = %error.path().display(), error = %error, "Pipeline failure");

        // Clone the handler out so it runs without the lock held.
        let handler = self.failure_handler.read().clone();
        if let Some(handler) = handler {
            handler(error);
        }
    }
}

/// Debounced execution pipeline for file-system changes.
///
/// Changes submitted from any thread are translated into actions by the
/// factory, coalesced by fingerprint, and executed in a batch once the
/// quiet window elapses with no further activity. Cloning yields another
/// handle to the same engine.
///
/// Dropping the last handle without calling [`shutdown`](Self::shutdown)
/// closes the wake channel; the drain worker flushes what is pending and
/// exits in the background.
#[derive(Clone)]
pub struct ChangePipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    shared: Arc<Shared>,
    factory: Arc<dyn ActionFactory>,
    wake_tx: Mutex<Option<mpsc::UnboundedSender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    quiet_window: Duration,
}

impl ChangePipeline {
    /// Start a pipeline with the given quiet window and action factory.
    ///
    /// Must be called from within a tokio runtime; the drain worker is
    /// spawned onto it.
    #[must_use]
    pub fn start(quiet_window: Duration, factory: impl ActionFactory) -> Self {
        let shared = Arc::new(Shared::new());
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        let worker = spawn_drain_worker(Arc::clone(&shared), quiet_window, wake_rx);

        info!(
            quiet_ms = u64::try_from(quiet_window.as_millis()).unwrap_or(u64::MAX),
            "Change pipeline started"
        );

        Self {
            inner: Arc::new(PipelineInner {
                shared,
                factory: Arc::new(factory),
                wake_tx: Mutex::new(Some(wake_tx)),
                worker: Mutex::new(Some(worker)),
                quiet_window,
            }),
        }
    }

    /// Start a pipeline from configuration.
    #[must_use]
    pub fn with_config(config: &PipelineConfig, factory: impl ActionFactory) -> Self {
        Self::start(config.quiet_window, factory)
    }

    /// Submit one observed change.
    ///
    /// Safe to call from any thread, including watcher callbacks. A change
    /// whose fingerprint matches one already pending replaces it, so only
    /// the most recent action for that fingerprint will run.
    pub fn submit(&self, change: FileChange) {
        let shared = &self.inner.shared;
        shared.stats.changes_submitted.fetch_add(1, Ordering::Relaxed);
        debug!(
            path = %change.path().display(),
            kind = %change.kind(),
            "Change submitted"
        );

        let action = match self.inner.factory.create_action(&change) {
            Ok(Some(action)) => action,
            Ok(None) => {
                shared.stats.changes_ignored.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(cause) => {
                shared.report_failure(PipelineError::Factory {
                    path: change.into_path(),
                    cause,
                });
                return;
            }
        };

        let superseded = shared.store.upsert(Fingerprint::from(change), action);
        if superseded {
            shared.stats.actions_superseded.fetch_add(1, Ordering::Relaxed);
        }

        // Wake only after the upsert so the record is already visible to
        // the drain this wake triggers.
        if let Some(tx) = self.inner.wake_tx.lock().as_ref() {
            let _ = tx.send(());
        } else {
            warn!("Change submitted after shutdown");
        }
    }

    /// Register the callback that receives every pipeline failure.
    ///
    /// Replaces any previously registered handler. Failures are logged
    /// whether or not a handler is registered.
    pub fn on_failure(&self, handler: impl Fn(PipelineError) + Send + Sync + 'static) {
        *self.inner.shared.failure_handler.write() = Some(Arc::new(handler));
    }

    /// Snapshot of the pipeline counters.
    #[must_use]
    pub fn stats(&self) -> PipelineStatsSnapshot {
        self.inner.shared.stats.snapshot()
    }

    /// Number of changes currently waiting out the quiet window.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.inner.shared.store.len()
    }

    /// The quiet window this pipeline was started with.
    #[must_use]
    pub fn quiet_window(&self) -> Duration {
        self.inner.quiet_window
    }

    /// Stop the pipeline, flushing pending actions first.
    ///
    /// Closes the wake channel, then waits for the drain worker to run its
    /// final drain and exit. Calling it again returns immediately.
    pub async fn shutdown(&self) {
        let Some(wake_tx) = self.inner.wake_tx.lock().take() else {
            return;
        };
        drop(wake_tx);

        let worker = self.inner.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Drain worker exited abnormally");
            }
        }

        let remaining = self.inner.shared.store.len();
        if remaining > 0 {
            warn!(remaining, "Changes submitted during shutdown were dropped");
        }
        info!("Change pipeline stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::factory::Action;
    use std::path::PathBuf;

    fn recording_factory() -> (impl ActionFactory, Arc<Mutex<Vec<PathBuf>>>) {
        let executed = Arc::new(Mutex::new(Vec::new()));
        let executed_clone = Arc::clone(&executed);
        let factory = move |change: &FileChange| -> anyhow::Result<Option<Action>> {
            let executed = Arc::clone(&executed_clone);
            let path = change.path().to_path_buf();
            Ok(Some(Box::new(move || {
                executed.lock().push(path);
                Ok(())
            })))
        };
        (factory, executed)
    }

    #[tokio::test]
    async fn test_submit_executes_after_quiet_window() {
        let (factory, executed) = recording_factory();
        let pipeline = ChangePipeline::start(Duration::from_millis(25), factory);

        pipeline.submit(FileChange::Modified(PathBuf::from("/tmp/a.txt")));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(executed.lock().len(), 1);
        assert_eq!(pipeline.pending_len(), 0);
        assert_eq!(pipeline.stats().actions_executed, 1);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_changes_coalesce() {
        let (factory, executed) = recording_factory();
        let pipeline = ChangePipeline::start(Duration::from_millis(50), factory);

        for _ in 0..3 {
            pipeline.submit(FileChange::Modified(PathBuf::from("/tmp/a.txt")));
        }
        pipeline.submit(FileChange::Modified(PathBuf::from("/tmp/b.txt")));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(executed.lock().len(), 2);

        let stats = pipeline.stats();
        assert_eq!(stats.changes_submitted, 4);
        assert_eq!(stats.actions_superseded, 2);
        assert_eq!(stats.actions_executed, 2);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_factory_can_ignore_changes() {
        let factory = |change: &FileChange| -> anyhow::Result<Option<Action>> {
            if change.path().extension().is_some_and(|ext| ext == "tmp") {
                return Ok(None);
            }
            Ok(Some(Box::new(|| Ok(()))))
        };
        let pipeline = ChangePipeline::start(Duration::from_millis(25), factory);

        pipeline.submit(FileChange::Created(PathBuf::from("/tmp/scratch.tmp")));
        pipeline.submit(FileChange::Created(PathBuf::from("/tmp/kept.txt")));

        tokio::time::sleep(Duration::from_millis(300)).await;
        let stats = pipeline.stats();
        assert_eq!(stats.changes_ignored, 1);
        assert_eq!(stats.actions_executed, 1);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_factory_error_reaches_handler() {
        let factory = |_change: &FileChange| -> anyhow::Result<Option<Action>> {
            anyhow::bail!("cannot translate")
        };
        let pipeline = ChangePipeline::start(Duration::from_millis(25), factory);

        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            pipeline.on_failure(move |e| seen.lock().push(e.to_string()));
        }

        pipeline.submit(FileChange::Modified(PathBuf::from("/tmp/a.txt")));

        {
            let reported = seen.lock();
            assert_eq!(reported.len(), 1);
            assert!(reported[0].contains("cannot translate"));
        }
        assert_eq!(pipeline.stats().failures, 1);
        assert_eq!(pipeline.pending_len(), 0);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_flushes_pending() {
        let (factory, executed) = recording_factory();
        // Window far longer than the test; only shutdown can run the action.
        let pipeline = ChangePipeline::start(Duration::from_secs(60), factory);

        pipeline.submit(FileChange::Modified(PathBuf::from("/tmp/a.txt")));
        assert_eq!(pipeline.pending_len(), 1);

        pipeline.shutdown().await;
        assert_eq!(executed.lock().len(), 1);

        // Second shutdown is a no-op.
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_clones_share_the_engine() {
        let (factory, executed) = recording_factory();
        let pipeline = ChangePipeline::start(Duration::from_millis(25), factory);
        let clone = pipeline.clone();

        clone.submit(FileChange::Modified(PathBuf::from("/tmp/a.txt")));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(executed.lock().len(), 1);
        assert_eq!(pipeline.stats().changes_submitted, 1);

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_from_plain_threads() {
        let (factory, executed) = recording_factory();
        let pipeline = ChangePipeline::start(Duration::from_millis(50), factory);

        let mut handles = Vec::new();
        for t in 0..4 {
            let pipeline = pipeline.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..25 {
                    pipeline.submit(FileChange::Modified(PathBuf::from(format!(
                        "/tmp/{}/{i}.txt",
                        t % 2
                    ))));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        pipeline.shutdown().await;

        // 4 threads x 25 paths collapse onto 50 distinct fingerprints. Every
        // submission either executed or was superseded by a newer duplicate;
        // none may be lost.
        let stats = pipeline.stats();
        assert_eq!(stats.changes_submitted, 100);
        assert_eq!(stats.actions_executed + stats.actions_superseded, 100);
        assert!(stats.actions_executed >= 50);
        assert_eq!(
            executed.lock().len(),
            usize::try_from(stats.actions_executed).unwrap()
        );
    }
}
