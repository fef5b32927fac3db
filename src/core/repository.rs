//! Repository capability interface
//!
//! The synchronizer only ever sees a repository through `RepositoryHandle`:
//! read the branch, read or write the message buffer, and list the paths
//! whose changes mean the state may have moved.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Identity of one working copy, keyed by its git directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryId(PathBuf);

impl RepositoryId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Access to a single working copy's branch and message buffer
#[cfg_attr(test, mockall::automock)]
pub trait RepositoryHandle {
    /// Stable identity of the repository
    fn id(&self) -> RepositoryId;

    /// Name of the checked-out branch, `None` when HEAD is detached
    fn current_branch(&self) -> Result<Option<String>>;

    /// Current message buffer contents
    fn read_message(&self) -> Result<String>;

    /// Replace the message buffer contents
    fn write_message(&self, message: &str) -> Result<()>;

    /// Files whose modification signals a branch or message change
    fn watch_paths(&self) -> Vec<PathBuf>;

    /// Whether the working copy still exists
    fn is_open(&self) -> bool {
        true
    }
}

impl<T: RepositoryHandle + ?Sized> RepositoryHandle for Box<T> {
    fn id(&self) -> RepositoryId {
        (**self).id()
    }

    fn current_branch(&self) -> Result<Option<String>> {
        (**self).current_branch()
    }

    fn read_message(&self) -> Result<String> {
        (**self).read_message()
    }

    fn write_message(&self, message: &str) -> Result<()> {
        (**self).write_message(message)
    }

    fn watch_paths(&self) -> Vec<PathBuf> {
        (**self).watch_paths()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
