//! Core functionality for commit-prefix
//!
//! This module contains the shared business logic:
//! - Prefix configuration and message tagging
//! - Git repository access behind the `RepositoryHandle` capability
//! - Application settings
//! - prepare-commit-msg hook management

pub mod config;
pub mod git;
pub mod hooks;
pub mod message;
pub mod pattern;
pub mod repository;

pub use config::Settings;
pub use git::GitRepository;
pub use message::{compute_message, extract_original_message};
pub use pattern::PrefixConfig;
pub use repository::{RepositoryHandle, RepositoryId};
