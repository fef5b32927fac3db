//! commit-prefix - branch-aware commit message tagging
//!
//! Keeps a repository's draft commit message prefixed with the issue id taken
//! from the current branch name, either continuously through the `watch`
//! daemon or once per commit through a prepare-commit-msg hook.

pub mod cli;
pub mod core;
pub mod error;
pub mod fakes;
pub mod sync;

pub use error::{PrefixError, Result};
