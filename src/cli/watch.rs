//! Watch daemon CLI handler

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cli::commands::WatchArgs;
use crate::cli::paths_or_current;
use crate::core::config::Settings;
use crate::core::git::GitRepository;
use crate::error::Result;
use crate::sync::daemon::Daemon;
use crate::sync::notifier::notifier_for;

/// Run the daemon over the given working copies until Ctrl-C
pub async fn handle_watch(args: WatchArgs, settings_path: PathBuf) -> Result<()> {
    let settings = Settings::load_from(&settings_path)?;
    let config = Arc::new(settings.resolve()?);
    let notifier = notifier_for(&settings);

    let mut daemon: Daemon<GitRepository> =
        Daemon::new(config, notifier).with_settings(settings_path, settings.clone());

    for path in paths_or_current(args.paths) {
        let repo = GitRepository::discover(&path, &settings.message_file)?;
        let id = repo_label(&repo);
        if daemon.watch_repository(repo)? {
            eprintln!("✓ Watching {}", id);
        }
    }

    #[cfg(unix)]
    forward_refresh_signal(daemon.sender())?;

    eprintln!("Press Ctrl-C to stop.");
    daemon.run_until(shutdown_signal()).await;

    Ok(())
}

/// Working directory if there is one, otherwise the git directory
fn repo_label(repo: &GitRepository) -> String {
    repo.root_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|_| repo.git_dir().display().to_string())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C, stopping"),
    }
}

/// Turn SIGUSR1 into a refresh of every watched repository
#[cfg(unix)]
fn forward_refresh_signal(
    events: tokio::sync::mpsc::UnboundedSender<crate::sync::notifier::ChangeEvent>,
) -> Result<()> {
    use crate::sync::notifier::ChangeEvent;
    use tokio::signal::unix::{signal, SignalKind};

    let mut usr1 = signal(SignalKind::user_defined1())?;

    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            info!("Refresh requested by signal");
            if events.send(ChangeEvent::Refresh).is_err() {
                break;
            }
        }
    });

    Ok(())
}
