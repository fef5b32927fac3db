//! commit-prefix - branch-aware commit message tagging
//!
//! Keeps draft commit messages prefixed with the issue id from the current
//! branch name.
//!
//! Available as the `commit-prefix` and `cpx` commands.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commit_prefix::cli::commands::{Cli, Commands};
use commit_prefix::cli::{apply, config, hook, refresh, watch};
use commit_prefix::core::config::Settings;
use commit_prefix::error::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings_path = Settings::locate(cli.config.as_deref())?;

    match cli.command {
        Commands::Watch(args) => watch::handle_watch(args, settings_path).await,
        Commands::Refresh(args) => refresh::handle_refresh(args, &settings_path),
        Commands::Apply(args) => apply::handle_apply(args, &settings_path),
        Commands::Preview(args) => apply::handle_preview(args, &settings_path),
        Commands::Hook(args) => hook::handle_hook(args.command),
        Commands::Config(args) => config::handle_config(args.command, &settings_path),
    }
}
