//! Manual refresh CLI handler

use std::path::Path;
use std::sync::Arc;

use crate::cli::commands::RefreshArgs;
use crate::cli::paths_or_current;
use crate::core::config::Settings;
use crate::core::git::GitRepository;
use crate::core::pattern::PrefixConfig;
use crate::error::{PrefixError, Result};
use crate::sync::watcher::{PassOutcome, Watcher};

/// Run one pass on every given working copy
///
/// Each repository is reported on its own line; a failure in one doesn't stop
/// the others, but makes the command fail at the end.
pub fn handle_refresh(args: RefreshArgs, settings_path: &Path) -> Result<()> {
    let settings = Settings::load_from(settings_path)?;
    let config = Arc::new(settings.resolve()?);

    let paths = paths_or_current(args.paths);
    let mut failed = 0;

    for path in &paths {
        match refresh_one(path, &settings, &config) {
            Ok(PassOutcome::Updated { to, .. }) => println!("✓ {}: {}", path.display(), to),
            Ok(_) => println!("· {}: up to date", path.display()),
            Err(e) => {
                failed += 1;
                println!("✗ {}: {}", path.display(), first_line(&e));
            }
        }
    }

    if failed > 0 {
        return Err(PrefixError::Custom(format!(
            "{} of {} repositories failed to refresh",
            failed,
            paths.len()
        )));
    }

    Ok(())
}

fn refresh_one(
    path: &Path,
    settings: &Settings,
    config: &Arc<PrefixConfig>,
) -> Result<PassOutcome> {
    let repo = GitRepository::discover(path, &settings.message_file)?;
    Watcher::new(repo, config.clone()).activate(None)
}

/// Error messages carry hints on later lines; the summary fits on one
fn first_line(err: &PrefixError) -> String {
    err.to_string().lines().next().unwrap_or_default().to_string()
}
