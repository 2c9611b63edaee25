//! Observed file-system changes and their coalescing identity.

use std::fmt;
use std::path::{Path, PathBuf};

/// One observed file or directory change.
///
/// Built by the watcher adapter from a raw notification (or by callers
/// submitting synthetic changes) and consumed once at submission: the
/// action factory inspects it, then its paths move into the [`Fingerprint`]
/// used to key the pending-action store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// A file or directory was created.
    Created(PathBuf),
    /// A file or directory was modified.
    Modified(PathBuf),
    /// A file or directory was deleted.
    Deleted(PathBuf),
    /// A file or directory was renamed from `from` to `to`.
    Renamed { from: PathBuf, to: PathBuf },
}

impl FileChange {
    /// The primary path of this change (the destination path for renames).
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(p) | Self::Modified(p) | Self::Deleted(p) => p,
            Self::Renamed { to, .. } => to,
        }
    }

    /// The pre-rename path; `None` for anything but a rename.
    #[must_use]
    pub fn previous_path(&self) -> Option<&Path> {
        match self {
            Self::Renamed { from, .. } => Some(from),
            _ => None,
        }
    }

    /// Consume the change, returning its primary path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        match self {
            Self::Created(p) | Self::Modified(p) | Self::Deleted(p) => p,
            Self::Renamed { to, .. } => to,
        }
    }

    /// The kind of this change, for logging and stats labels.
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Created(_) => ChangeKind::Created,
            Self::Modified(_) => ChangeKind::Modified,
            Self::Deleted(_) => ChangeKind::Deleted,
            Self::Renamed { .. } => ChangeKind::Renamed,
        }
    }
}

/// Kind of file-system change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
            Self::Renamed => write!(f, "renamed"),
        }
    }
}

/// Identity key under which logically-equivalent changes coalesce.
///
/// Derived from (path, previous path, kind), where the kind participates
/// only by deciding whether a previous path is present. The kind itself is
/// not part of the identity: a `Deleted` arriving after a pending
/// `Modified` on the same path supersedes it, so only the delete-derived
/// action runs. Renames carry their pre-rename path and therefore never
/// collide with a plain change that shares only the destination path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    path: PathBuf,
    previous_path: Option<PathBuf>,
}

impl Fingerprint {
    /// Derive the fingerprint of a change without consuming it.
    #[must_use]
    pub fn of(change: &FileChange) -> Self {
        Self {
            path: change.path().to_path_buf(),
            previous_path: change.previous_path().map(Path::to_path_buf),
        }
    }

    /// The primary path this fingerprint identifies.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The pre-rename path, if the underlying change was a rename.
    #[must_use]
    pub fn previous_path(&self) -> Option<&Path> {
        self.previous_path.as_deref()
    }

    /// Consume the fingerprint, returning its primary path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

impl From<FileChange> for Fingerprint {
    fn from(change: FileChange) -> Self {
        match change {
            FileChange::Created(p) | FileChange::Modified(p) | FileChange::Deleted(p) => Self {
                path: p,
                previous_path: None,
            },
            FileChange::Renamed { from, to } => Self {
                path: to,
                previous_path: Some(from),
            },
        }
    }
}
