//! Quiesce - Debounced directory mirroring
//!
//! Watches a source tree and mirrors its files into a target directory,
//! coalescing bursts of changes through the change pipeline.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use quiesce::config::{Config, PipelineConfig, WatchConfig};
use quiesce::observability::init_tracing;
use quiesce::pipeline::Action;
use quiesce::{ActionFactory, ChangePipeline, DirectoryWatcher, FileChange, Result};

/// Quiesce - Debounced directory mirroring
#[derive(Parser, Debug)]
#[command(name = "quiesce")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory tree to watch
    #[arg(short, long, env = "QUIESCE_SOURCE")]
    source: PathBuf,

    /// Directory to mirror changed files into
    #[arg(short, long, env = "QUIESCE_MIRROR")]
    mirror: PathBuf,

    /// Glob selecting which file names to mirror (e.g. "*.txt")
    #[arg(long, env = "QUIESCE_PATTERN")]
    pattern: Option<String>,

    /// Quiet window in milliseconds before accumulated changes are applied
    #[arg(long, env = "QUIESCE_QUIET_MS", default_value = "200")]
    quiet_ms: u64,

    /// Watch only the top-level directory, not subdirectories
    #[arg(long, env = "QUIESCE_NO_RECURSIVE")]
    no_recursive: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "QUIESCE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "QUIESCE_LOG_JSON")]
    log_json: bool,
}

/// Derives mirroring actions from observed changes.
///
/// Created and modified files are copied to the corresponding path under
/// the mirror root, deletions remove the mirrored copy, renames move it.
struct MirrorFactory {
    source: PathBuf,
    mirror: PathBuf,
}

impl MirrorFactory {
    fn target_for(&self, path: &Path) -> Option<PathBuf> {
        path.strip_prefix(&self.source)
            .ok()
            .map(|rel| self.mirror.join(rel))
    }
}

impl ActionFactory for MirrorFactory {
    fn create_action(&self, change: &FileChange) -> anyhow::Result<Option<Action>> {
        let action: Action = match change {
            FileChange::Created(path) | FileChange::Modified(path) => {
                let Some(target) = self.target_for(path) else {
                    return Ok(None);
                };
                let source = path.clone();
                Box::new(move || mirror_entry(&source, &target))
            }
            FileChange::Deleted(path) => {
                let Some(target) = self.target_for(path) else {
                    return Ok(None);
                };
                Box::new(move || remove_mirrored(&target))
            }
            FileChange::Renamed { from, to } => {
                let old_target = self.target_for(from);
                let Some(new_target) = self.target_for(to) else {
                    return Ok(None);
                };
                let source = to.clone();
                Box::new(move || {
                    if let Some(old_target) = &old_target {
                        remove_mirrored(old_target)?;
                    }
                    mirror_entry(&source, &new_target)
                })
            }
        };
        Ok(Some(action))
    }
}

/// Copy one file or directory entry into the mirror tree.
fn mirror_entry(source: &Path, target: &Path) -> anyhow::Result<()> {
    if source.is_dir() {
        std::fs::create_dir_all(target)
            .with_context(|| format!("failed to create '{}'", target.display()))?;
        return Ok(());
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create '{}'", parent.display()))?;
    }
    std::fs::copy(source, target).with_context(|| {
        format!(
            "failed to copy '{}' to '{}'",
            source.display(),
            target.display()
        )
    })?;

    tracing::debug!(target = %target.display(), "Mirrored file");
    Ok(())
}

/// Remove a mirrored entry; a missing target is not an error.
fn remove_mirrored(target: &Path) -> anyhow::Result<()> {
    let result = if target.is_dir() {
        std::fs::remove_dir_all(target)
    } else {
        std::fs::remove_file(target)
    };

    match result {
        Ok(()) => {
            tracing::debug!(target = %target.display(), "Removed mirrored entry");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove '{}'", target.display())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    tracing::info!("Quiesce v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config {
        watch: WatchConfig {
            root: cli.source.clone(),
            pattern: cli.pattern,
            recursive: !cli.no_recursive,
        },
        pipeline: PipelineConfig {
            quiet_window: Duration::from_millis(cli.quiet_ms),
        },
        log_level: cli.log_level,
        log_json: cli.log_json,
    };

    tracing::debug!(?config, "Configuration loaded");
    config.validate()?;

    std::fs::create_dir_all(&cli.mirror)?;

    let factory = MirrorFactory {
        source: cli.source.clone(),
        mirror: cli.mirror.clone(),
    };

    let pipeline = ChangePipeline::with_config(&config.pipeline, factory);
    pipeline.on_failure(|e| {
        tracing::error!(path = %e.path().display(), error = %e, "Mirror action failed");
    });

    let watcher = DirectoryWatcher::start(&config.watch, pipeline.clone())?;

    tracing::info!(
        source = %cli.source.display(),
        mirror = %cli.mirror.display(),
        "Mirroring changes; press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down");
    watcher.stop()?;
    pipeline.shutdown().await;

    let stats = pipeline.stats();
    tracing::info!(
        submitted = stats.changes_submitted,
        executed = stats.actions_executed,
        superseded = stats.actions_superseded,
        failures = stats.failures,
        "Final pipeline stats"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn factory(source: &Path, mirror: &Path) -> MirrorFactory {
        MirrorFactory {
            source: source.to_path_buf(),
            mirror: mirror.to_path_buf(),
        }
    }

    #[test]
    fn test_target_for_maps_into_mirror() {
        let f = factory(Path::new("/src"), Path::new("/dst"));
        assert_eq!(
            f.target_for(Path::new("/src/a/b.txt")),
            Some(PathBuf::from("/dst/a/b.txt"))
        );
        assert_eq!(f.target_for(Path::new("/elsewhere/b.txt")), None);
    }

    #[test]
    fn test_mirror_entry_copies_file() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let source = src.path().join("a.txt");
        std::fs::write(&source, "hello").unwrap();

        let target = dst.path().join("nested/a.txt");
        mirror_entry(&source, &target).unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");
    }

    #[test]
    fn test_remove_mirrored_tolerates_missing() {
        let dst = TempDir::new().unwrap();
        remove_mirrored(&dst.path().join("never-existed.txt")).unwrap();
    }

    #[test]
    fn test_delete_action_removes_copy() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let f = factory(src.path(), dst.path());

        let target = dst.path().join("a.txt");
        std::fs::write(&target, "stale").unwrap();

        let action = f
            .create_action(&FileChange::Deleted(src.path().join("a.txt")))
            .unwrap()
            .unwrap();
        action().unwrap();

        assert!(!target.exists());
    }

    #[test]
    fn test_rename_action_moves_copy() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let f = factory(src.path(), dst.path());

        std::fs::write(src.path().join("new.txt"), "fresh").unwrap();
        std::fs::write(dst.path().join("old.txt"), "stale").unwrap();

        let action = f
            .create_action(&FileChange::Renamed {
                from: src.path().join("old.txt"),
                to: src.path().join("new.txt"),
            })
            .unwrap()
            .unwrap();
        action().unwrap();

        assert!(!dst.path().join("old.txt").exists());
        assert_eq!(
            std::fs::read_to_string(dst.path().join("new.txt")).unwrap(),
            "fresh"
        );
    }

    #[test]
    fn test_changes_outside_source_are_ignored() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let f = factory(src.path(), dst.path());

        let action = f
            .create_action(&FileChange::Modified(PathBuf::from("/outside/a.txt")))
            .unwrap();
        assert!(action.is_none());
    }
}
