//! Hook CLI command handlers

use std::path::PathBuf;

use crate::cli::commands::HookCommand;
use crate::core::hooks::{self, HookStatus};
use crate::error::Result;

/// Handle hook commands
pub fn handle_hook(command: HookCommand) -> Result<()> {
    match command {
        HookCommand::Install { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from("."));
            if hooks::install(&path)? {
                println!("✓ Installed {} hook.", hooks::HOOK_NAME);
                println!("  Commit messages on issue branches will be tagged automatically.");
            } else {
                println!("✓ {} hook is already installed.", hooks::HOOK_NAME);
            }
        }
        HookCommand::Uninstall { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from("."));
            if hooks::uninstall(&path)? {
                println!("✓ Removed {} hook.", hooks::HOOK_NAME);
            } else {
                println!("{} hook was not installed.", hooks::HOOK_NAME);
            }
        }
        HookCommand::Status { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from("."));
            let hook = hooks::hook_path(&path)?;
            match hooks::status(&path)? {
                HookStatus::Installed => println!("Installed: {}", hook.display()),
                HookStatus::Foreign => {
                    println!(
                        "Not installed ({} exists but doesn't call commit-prefix)",
                        hook.display()
                    );
                    println!("  → Run 'cpx hook install' to add it.");
                }
                HookStatus::Missing => {
                    println!("Not installed");
                    println!("  → Run 'cpx hook install' to add it.");
                }
            }
        }
    }
    Ok(())
}
