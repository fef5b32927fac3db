//! Local git repository operations
//!
//! This module provides a wrapper around git2 for the operations the
//! synchronizer needs:
//! - Repository discovery and validation
//! - Current branch lookup from the symbolic HEAD
//! - Reading and writing the message buffer inside the git directory

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use git2::Repository;

use crate::core::message::MessageFile;
use crate::core::repository::{RepositoryHandle, RepositoryId};
use crate::error::{PrefixError, Result};

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Wrapper for local git repository operations
pub struct GitRepository {
    repo: Repository,
    id: RepositoryId,
    message_path: PathBuf,
}

impl GitRepository {
    /// Open the git repository in the current directory
    pub fn open_current_dir(message_file: &str) -> Result<Self> {
        Self::discover(".", message_file)
    }

    /// Discover a git repository from the given path
    ///
    /// `message_file` is resolved relative to the git directory.
    pub fn discover<P: AsRef<Path>>(path: P, message_file: &str) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|_| PrefixError::NotGitRepository)?;

        if repo.is_bare() {
            return Err(PrefixError::BareRepository(repo.path().display().to_string()));
        }

        let git_dir = repo.path().to_path_buf();
        let id = RepositoryId::new(fs::canonicalize(&git_dir).unwrap_or_else(|_| git_dir.clone()));
        let message_path = git_dir.join(message_file);

        Ok(Self {
            repo,
            id,
            message_path,
        })
    }

    /// Get the current branch name
    ///
    /// Reads the symbolic target of HEAD, so a branch without commits still
    /// reports its name. Detached HEAD has no branch.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = self.repo.find_reference("HEAD")?;

        Ok(head
            .symbolic_target()
            .and_then(|target| target.strip_prefix(BRANCH_REF_PREFIX))
            .map(|name| name.to_string()))
    }

    /// Get the git directory (`.git`, or the worktree's private directory)
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Get the repository root directory
    pub fn root_dir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(|p| p.to_path_buf())
            .ok_or(PrefixError::NotGitRepository)
    }

    /// Path of the message buffer file
    pub fn message_path(&self) -> &Path {
        &self.message_path
    }

    /// Read the whole message file, treating a missing file as empty
    fn read_message_file(&self) -> Result<String> {
        match fs::read_to_string(&self.message_path) {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl RepositoryHandle for GitRepository {
    fn id(&self) -> RepositoryId {
        self.id.clone()
    }

    fn current_branch(&self) -> Result<Option<String>> {
        GitRepository::current_branch(self)
    }

    fn read_message(&self) -> Result<String> {
        Ok(MessageFile::parse(&self.read_message_file()?).subject)
    }

    fn write_message(&self, message: &str) -> Result<()> {
        let file = MessageFile::parse(&self.read_message_file()?).with_subject(message);
        fs::write(&self.message_path, file.render())?;
        Ok(())
    }

    fn watch_paths(&self) -> Vec<PathBuf> {
        vec![self.git_dir().join("HEAD"), self.message_path.clone()]
    }

    fn is_open(&self) -> bool {
        self.git_dir().join("HEAD").exists()
    }
}
