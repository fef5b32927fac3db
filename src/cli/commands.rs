//! CLI command definitions using clap
//!
//! Defines the command structure for the `commit-prefix` (alias `cpx`) tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// commit-prefix - tag commit messages with the issue id from the branch name
///
/// Keeps the draft commit message of each watched repository prefixed with
/// the id extracted from the current branch, e.g. `ML-42-fix-bug` gives
/// `[ML-42] Fix the bug`.
#[derive(Parser, Debug)]
#[command(name = "commit-prefix", version, about, long_about = None)]
pub struct Cli {
    /// Settings file to use instead of the default location
    #[arg(long, global = true, env = "COMMIT_PREFIX_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Keep message buffers tagged until interrupted
    Watch(WatchArgs),

    /// Synchronize every given repository once
    Refresh(RefreshArgs),

    /// Tag a commit message file (prepare-commit-msg entry point)
    Apply(ApplyArgs),

    /// Print the tagged message for a branch without touching any repository
    Preview(PreviewArgs),

    /// Manage the prepare-commit-msg hook
    Hook(HookArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Sync Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments for `watch`
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Working copies to watch (defaults to the current directory)
    pub paths: Vec<PathBuf>,
}

/// Arguments for `refresh`
#[derive(Parser, Debug)]
pub struct RefreshArgs {
    /// Working copies to synchronize (defaults to the current directory)
    pub paths: Vec<PathBuf>,
}

/// Arguments git passes to prepare-commit-msg
#[derive(Parser, Debug)]
pub struct ApplyArgs {
    /// Commit message file
    pub file: PathBuf,

    /// Message source: message, template, merge, squash or commit
    pub source: Option<String>,

    /// Commit SHA, when amending or reusing a commit
    pub sha: Option<String>,
}

/// Arguments for `preview`
#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Branch name to derive the prefix from
    #[arg(long, short)]
    pub branch: String,

    /// Current message
    #[arg(default_value = "")]
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Hook Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Hook commands
#[derive(Parser, Debug)]
pub struct HookArgs {
    #[command(subcommand)]
    pub command: HookCommand,
}

#[derive(Subcommand, Debug)]
pub enum HookCommand {
    /// Install the hook, keeping any existing hook content
    Install {
        /// Repository path (defaults to the current directory)
        path: Option<PathBuf>,
    },

    /// Remove the hook
    Uninstall {
        /// Repository path (defaults to the current directory)
        path: Option<PathBuf>,
    },

    /// Show whether the hook is installed
    Status {
        /// Repository path (defaults to the current directory)
        path: Option<PathBuf>,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration commands
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set a configuration value
    Set {
        /// Configuration key
        key: ConfigKey,

        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: ConfigKey,
    },

    /// Reset a configuration value to its default
    Remove {
        /// Configuration key
        key: ConfigKey,
    },

    /// Print the settings file location
    Path,
}

/// Available configuration keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    /// Branch pattern with one capture group
    #[value(name = "prefix-pattern")]
    PrefixPattern,

    /// Message template with ${prefix} and ${message}
    #[value(name = "message-format")]
    MessageFormat,

    /// Polling interval in milliseconds
    #[value(name = "watch-interval")]
    WatchInterval,

    /// Change notification strategy (push or poll)
    #[value(name = "notifier")]
    Notifier,

    /// Message buffer file name inside the git directory
    #[value(name = "message-file")]
    MessageFile,
}

impl ConfigKey {
    /// Name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::PrefixPattern => "prefix-pattern",
            ConfigKey::MessageFormat => "message-format",
            ConfigKey::WatchInterval => "watch-interval",
            ConfigKey::Notifier => "notifier",
            ConfigKey::MessageFile => "message-file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply_hook_arguments() {
        let cli = Cli::parse_from([
            "commit-prefix",
            "apply",
            ".git/COMMIT_EDITMSG",
            "message",
        ]);
        match cli.command {
            Commands::Apply(args) => {
                assert_eq!(args.file, PathBuf::from(".git/COMMIT_EDITMSG"));
                assert_eq!(args.source.as_deref(), Some("message"));
                assert_eq!(args.sha, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_config_after_subcommand() {
        let cli = Cli::parse_from(["cpx", "refresh", "a", "b", "--config", "/tmp/c.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        match cli.command {
            Commands::Refresh(args) => assert_eq!(args.paths.len(), 2),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
