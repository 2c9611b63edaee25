//! Bridge from OS file notifications to the change pipeline.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{error, info, trace};

use super::filter::NameFilter;
use crate::config::WatchConfig;
use crate::error::WatchError;
use crate::pipeline::{ChangePipeline, FileChange};
use crate::Result;

/// Subscribes to OS notifications for one directory tree and submits the
/// translated changes to a [`ChangePipeline`].
///
/// Translation happens synchronously on whatever threads the OS watcher
/// delivers notifications on; submission is thread-safe so no hand-off is
/// needed. Dropping the watcher releases the OS subscription;
/// [`stop`](Self::stop) does the same with explicit error reporting.
pub struct DirectoryWatcher {
    watcher: RecommendedWatcher,
    root: PathBuf,
}

impl DirectoryWatcher {
    /// Start observing `config.root` and feed matching changes into `pipeline`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root does not exist, the name pattern is
    /// invalid, or the OS watch cannot be established.
    pub fn start(config: &WatchConfig, pipeline: ChangePipeline) -> Result<Self> {
        let root = config.root.clone();
        if !root.is_dir() {
            return Err(WatchError::WatchFailed {
                path: root.display().to_string(),
                reason: "not a directory".to_string(),
            }
            .into());
        }

        let filter = NameFilter::from_config(&root, config.pattern.as_deref())?;

        let mut watcher = RecommendedWatcher::new(
            move |result: std::result::Result<notify::Event, notify::Error>| match result {
                Ok(event) => {
                    if let Some(change) = map_notify_event(&event) {
                        // Renames are selected by their destination name.
                        if filter.selects(change.path()) {
                            pipeline.submit(change);
                        } else {
                            trace!(path = %change.path().display(), "Change filtered out");
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Watch error");
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| WatchError::WatchFailed {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;

        let mode = if config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&root, mode)
            .map_err(|e| WatchError::WatchFailed {
                path: root.display().to_string(),
                reason: e.to_string(),
            })?;

        info!(path = %root.display(), recursive = config.recursive, "Watching directory");

        Ok(Self { watcher, root })
    }

    /// The directory this watcher observes.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop observing and release the OS subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS watch cannot be removed.
    pub fn stop(mut self) -> Result<()> {
        self.watcher
            .unwatch(&self.root)
            .map_err(|e| WatchError::WatchFailed {
                path: self.root.display().to_string(),
                reason: e.to_string(),
            })?;

        info!(path = %self.root.display(), "Stopped watching directory");
        Ok(())
    }
}

/// Translate a raw notification into a [`FileChange`].
///
/// Rename notifications carrying both paths become [`FileChange::Renamed`];
/// one-sided renames and metadata-only modifications degrade to
/// [`FileChange::Modified`]. Access notifications and events without paths
/// are dropped.
fn map_notify_event(event: &notify::Event) -> Option<FileChange> {
    let paths = &event.paths;

    match &event.kind {
        EventKind::Create(_) => Some(FileChange::Created(paths.first()?.clone())),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            Some(FileChange::Renamed {
                from: paths[0].clone(),
                to: paths[1].clone(),
            })
        }
        EventKind::Modify(_) => Some(FileChange::Modified(paths.first()?.clone())),
        EventKind::Remove(_) => Some(FileChange::Deleted(paths.first()?.clone())),
        _ => {
            trace!(kind = ?event.kind, "Ignoring notification kind");
            None
        }
    }
}
