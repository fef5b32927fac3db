//! Custom error types for commit-prefix
//!
//! User-friendly error messages for all failure scenarios.

use thiserror::Error;

/// Main error type for the commit-prefix application
#[derive(Error, Debug)]
pub enum PrefixError {
    /// Not running in a git repository
    #[error("This directory is not a git repository.\n\n  → Run 'git init' to create one, or navigate to an existing git project.")]
    NotGitRepository,

    /// Bare repositories have no working copy to tag messages for
    #[error("Repository '{0}' is bare.\n\n  → Point commit-prefix at a working copy instead.")]
    BareRepository(String),

    /// A configured pattern failed to compile
    #[error("Invalid {field}: {source}\n\n  → Fix it with 'cpx config set {field} <VALUE>'.")]
    InvalidPattern {
        /// Which setting produced the pattern
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    /// Git operation error
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    /// File system watcher error
    #[error("Cannot watch for changes: {0}\n\n  → Try 'cpx config set notifier poll' on file systems without change events.")]
    Watch(#[from] notify::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization/deserialization error
    #[error("Configuration file is invalid: {0}")]
    Toml(String),

    /// Invalid input from user
    #[error("{0}")]
    InvalidInput(String),

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),
}

impl From<toml::de::Error> for PrefixError {
    fn from(err: toml::de::Error) -> Self {
        PrefixError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for PrefixError {
    fn from(err: toml::ser::Error) -> Self {
        PrefixError::Toml(err.to_string())
    }
}

/// Result type alias using PrefixError
pub type Result<T> = std::result::Result<T, PrefixError>;
