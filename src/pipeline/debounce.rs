//! Quiet-window drain worker.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::change::Fingerprint;
use super::engine::Shared;
use super::factory::Action;
use crate::error::PipelineError;

/// Spawn the background task that waits out the quiet window and drains.
///
/// The worker idles until a wake arrives, then restarts the quiet window on
/// every further wake. Once `quiet_window` elapses with no activity it swaps
/// the pending map out and runs the batch on a blocking thread, so drains
/// never overlap. Closing the wake channel triggers one final drain before
/// the task exits.
pub(crate) fn spawn_drain_worker(
    shared: Arc<Shared>,
    quiet_window: Duration,
    mut wake_rx: mpsc::UnboundedReceiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(
            quiet_ms = u64::try_from(quiet_window.as_millis()).unwrap_or(u64::MAX),
            "Drain worker started"
        );

        loop {
            // Idle until something is submitted.
            if wake_rx.recv().await.is_none() {
                break;
            }

            let mut channel_closed = false;
            loop {
                match tokio::time::timeout(quiet_window, wake_rx.recv()).await {
                    // More activity, restart the window.
                    Ok(Some(())) => {}
                    Ok(None) => {
                        channel_closed = true;
                        break;
                    }
                    // Window elapsed without activity.
                    Err(_) => break,
                }
            }

            drain_pending(&shared).await;

            if channel_closed {
                break;
            }
        }

        // Flush anything that landed between the last drain and channel close.
        drain_pending(&shared).await;
        debug!("Drain worker stopped");
    })
}

/// Swap out the pending map and run every action in the batch.
///
/// An empty store is a no-op. Failures and panics are reported per action;
/// the rest of the batch still runs.
pub(crate) async fn drain_pending(shared: &Arc<Shared>) {
    let batch = shared.store.drain_all();
    if batch.is_empty() {
        return;
    }

    shared.stats.drains.fetch_add(1, Ordering::Relaxed);
    debug!(actions = batch.len(), "Draining pending actions");

    let worker = Arc::clone(shared);
    let result = tokio::task::spawn_blocking(move || {
        let span = crate::observability::spans::drain_span(batch.len());
        let _guard = span.enter();
        for (fingerprint, action) in batch {
            run_action(&worker, fingerprint, action);
        }
    })
    .await;

    if let Err(e) = result {
        shared.stats.failures.fetch_add(1, Ordering::Relaxed);
        error!(error = %e, "Drain task aborted");
    }
}

fn run_action(shared: &Shared, fingerprint: Fingerprint, action: Action) {
    let path = fingerprint.into_path();
    match std::panic::catch_unwind(AssertUnwindSafe(action)) {
        Ok(Ok(())) => {
            shared.stats.actions_executed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Err(cause)) => {
            shared.report_failure(PipelineError::Action { path, cause });
        }
        Err(panic) => {
            shared.report_failure(PipelineError::ActionPanic {
                path,
                detail: panic_message(panic.as_ref()),
            });
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
