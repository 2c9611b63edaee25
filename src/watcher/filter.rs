//! Name-based selection of watched paths.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::WatchError;
use crate::Result;

/// Selects which paths the watcher forwards into the pipeline.
///
/// Built from a single gitignore-style glob, rooted at the watch
/// directory. A match here means "forward this change", the inverse of the
/// pattern's exclusion role in an ignore file. With no pattern every path
/// is forwarded.
#[derive(Debug)]
pub struct NameFilter {
    matcher: Option<Gitignore>,
}

impl NameFilter {
    /// Filter that forwards everything.
    #[must_use]
    pub fn allow_all() -> Self {
        Self { matcher: None }
    }

    /// Build a filter from a glob pattern, rooted at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern cannot be parsed.
    pub fn from_pattern(base: impl AsRef<Path>, pattern: &str) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(base.as_ref());
        builder
            .add_line(None, pattern)
            .map_err(|e| WatchError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        let matcher = builder.build().map_err(|e| WatchError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            matcher: Some(matcher),
        })
    }

    /// Build from an optional pattern; `None` forwards everything.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern cannot be parsed.
    pub fn from_config(base: impl AsRef<Path>, pattern: Option<&str>) -> Result<Self> {
        match pattern {
            Some(pattern) => Self::from_pattern(base, pattern),
            None => Ok(Self::allow_all()),
        }
    }

    /// Whether changes for `path` should be forwarded.
    #[must_use]
    pub fn selects(&self, path: &Path) -> bool {
        match &self.matcher {
            Some(matcher) => matcher.matched(path, false).is_ignore(),
            None => true,
        }
    }
}
