//! CLI module for commit-prefix
//!
//! This module contains all CLI command definitions and handlers using clap.

pub mod apply;
pub mod commands;
pub mod config;
pub mod hook;
pub mod refresh;
pub mod watch;

use std::path::PathBuf;

pub use commands::{Cli, Commands};

/// Working copies named on the command line, or the current directory
fn paths_or_current(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths
    }
}
