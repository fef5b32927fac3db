//! Watch daemon
//!
//! Funnels every change notification through one channel and handles them
//! one at a time, in delivery order. Settings edits are picked up from the
//! settings file; an invalid edit is logged and the last good configuration
//! stays in effect.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::core::config::Settings;
use crate::core::pattern::PrefixConfig;
use crate::core::repository::RepositoryHandle;
use crate::error::Result;
use crate::sync::notifier::{ChangeEvent, ChangeNotifier, Subscription, WatchTarget};
use crate::sync::registry::WatcherRegistry;

/// Settings file the daemon reloads on change
struct SettingsSource {
    path: PathBuf,
    current: Settings,
    _subscription: Option<Subscription>,
}

/// Event loop driving all watchers
pub struct Daemon<R: RepositoryHandle> {
    registry: WatcherRegistry<R>,
    notifier: Box<dyn ChangeNotifier>,
    settings: Option<SettingsSource>,
    events_tx: UnboundedSender<ChangeEvent>,
    events_rx: UnboundedReceiver<ChangeEvent>,
}

impl<R: RepositoryHandle> Daemon<R> {
    /// Create a daemon with a fixed configuration
    pub fn new(config: Arc<PrefixConfig>, notifier: Box<dyn ChangeNotifier>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            registry: WatcherRegistry::new(config),
            notifier,
            settings: None,
            events_tx,
            events_rx,
        }
    }

    /// Reload the prefix configuration whenever `path` changes
    ///
    /// `current` is the settings the daemon was started with. If the file
    /// can't be watched the daemon keeps running with a fixed configuration.
    pub fn with_settings(mut self, path: PathBuf, current: Settings) -> Self {
        let subscription = match self
            .notifier
            .subscribe(WatchTarget::settings(&path), self.events_tx.clone())
        {
            Ok(sub) => Some(sub),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot watch settings file");
                None
            }
        };

        self.settings = Some(SettingsSource {
            path,
            current,
            _subscription: subscription,
        });
        self
    }

    /// Sender for injecting events, e.g. manual refresh requests
    pub fn sender(&self) -> UnboundedSender<ChangeEvent> {
        self.events_tx.clone()
    }

    pub fn registry(&self) -> &WatcherRegistry<R> {
        &self.registry
    }

    /// Start watching a repository
    ///
    /// Returns `Ok(false)` if it is already watched.
    pub fn watch_repository(&mut self, repo: R) -> Result<bool> {
        if self.registry.is_watching(&repo.id()) {
            debug!(repo = %repo.id(), "Repository already watched");
            return Ok(false);
        }

        let subscription = self
            .notifier
            .subscribe(WatchTarget::repository(&repo), self.events_tx.clone())?;

        Ok(self.registry.open(repo, Some(subscription)))
    }

    /// Process one event to completion
    pub fn handle_event(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::Repository(id) => self.registry.notify(&id),
            ChangeEvent::Settings => self.reload_settings(),
            ChangeEvent::Refresh => {
                let results = self.registry.refresh_all();
                let failed = results.iter().filter(|(_, r)| r.is_err()).count();
                info!(repositories = results.len(), failed, "Manual refresh finished");
            }
        }
    }

    /// Re-read the settings file and apply the new configuration if it compiles
    fn reload_settings(&mut self) {
        let Some(source) = self.settings.as_mut() else {
            return;
        };

        let settings = match Settings::load_from(&source.path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %source.path.display(), error = %e, "Keeping previous configuration");
                return;
            }
        };

        if settings.prefix_pattern == source.current.prefix_pattern
            && settings.message_format == source.current.message_format
        {
            if settings != source.current {
                info!("Notifier and message file changes apply after a restart");
                source.current = settings;
            }
            return;
        }

        let config = match settings.resolve() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Keeping previous configuration");
                return;
            }
        };

        info!(
            prefix_pattern = %settings.prefix_pattern,
            message_format = %settings.message_format,
            "Configuration reloaded"
        );
        source.current = settings;
        self.registry.apply_config(Arc::new(config));
    }

    /// Process events until `shutdown` completes, then dispose every watcher
    pub async fn run_until<F: Future<Output = ()>>(mut self, shutdown: F) {
        info!(repositories = self.registry.len(), "Daemon started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }

        self.registry.shutdown();
        info!("Daemon stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{ManualNotifier, MemoryRepository};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn default_config() -> Arc<PrefixConfig> {
        Arc::new(Settings::default().resolve().unwrap())
    }

    fn daemon(notifier: &ManualNotifier) -> Daemon<MemoryRepository> {
        Daemon::new(default_config(), Box::new(notifier.clone()))
    }

    #[test]
    fn test_watch_repository_subscribes_once() {
        let notifier = ManualNotifier::new();
        let mut daemon = daemon(&notifier);
        let repo = MemoryRepository::new("/a/.git", Some("ML-42-fix-bug"), "Fix the bug");

        assert!(daemon.watch_repository(repo.clone()).unwrap());
        assert!(!daemon.watch_repository(repo.clone()).unwrap());

        assert_eq!(notifier.targets().len(), 1);
        assert_eq!(notifier.active(), 1);
        assert_eq!(repo.message(), "[ML-42] Fix the bug");
    }

    #[test]
    fn test_repository_event_runs_pass() {
        let notifier = ManualNotifier::new();
        let mut daemon = daemon(&notifier);
        let repo = MemoryRepository::new("/a/.git", Some("main"), "work");
        daemon.watch_repository(repo.clone()).unwrap();

        repo.checkout(Some("ML-3-x"));
        daemon.handle_event(ChangeEvent::Repository(repo.id()));

        assert_eq!(repo.message(), "[ML-3] work");
    }

    #[test]
    fn test_refresh_event_runs_every_repository() {
        let notifier = ManualNotifier::new();
        let mut daemon = daemon(&notifier);
        let a = MemoryRepository::new("/a/.git", Some("main"), "a");
        let b = MemoryRepository::new("/b/.git", Some("main"), "b");
        daemon.watch_repository(a.clone()).unwrap();
        daemon.watch_repository(b.clone()).unwrap();

        a.checkout(Some("ML-1-x"));
        b.checkout(Some("ML-2-x"));
        daemon.handle_event(ChangeEvent::Refresh);

        assert_eq!(a.message(), "[ML-1] a");
        assert_eq!(b.message(), "[ML-2] b");
    }

    #[test]
    fn test_settings_change_retags_without_compounding() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let notifier = ManualNotifier::new();

        let mut daemon = daemon(&notifier).with_settings(path.clone(), Settings::default());
        let repo = MemoryRepository::new("/a/.git", Some("BY-9-x"), "[ML-1] text");
        daemon.watch_repository(repo.clone()).unwrap();
        assert_eq!(repo.message(), "[ML-1] text");

        let settings = Settings {
            prefix_pattern: r"(BY-\d+)-.*".to_string(),
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        daemon.handle_event(ChangeEvent::Settings);

        assert_eq!(repo.message(), "[BY-9] text");
        assert!(daemon.registry().config().prefix_pattern().is_match("BY-9-x"));
    }

    #[test]
    fn test_invalid_settings_keep_previous_configuration() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let notifier = ManualNotifier::new();

        let mut daemon = daemon(&notifier).with_settings(path.clone(), Settings::default());
        let before = daemon.registry().config().clone();
        let repo = MemoryRepository::new("/a/.git", Some("main"), "work");
        daemon.watch_repository(repo.clone()).unwrap();

        fs::write(&path, "prefix_pattern = \"(BY-\\\\d+\"\n").unwrap();
        daemon.handle_event(ChangeEvent::Settings);
        assert!(Arc::ptr_eq(daemon.registry().config(), &before));

        fs::write(&path, "not toml at all = = =").unwrap();
        daemon.handle_event(ChangeEvent::Settings);
        assert!(Arc::ptr_eq(daemon.registry().config(), &before));

        // The loop keeps working afterwards
        repo.checkout(Some("ML-5-x"));
        daemon.handle_event(ChangeEvent::Repository(repo.id()));
        assert_eq!(repo.message(), "[ML-5] work");
    }

    #[test]
    fn test_settings_subscription_is_registered() {
        let notifier = ManualNotifier::new();
        let path = PathBuf::from("/tmp/commit-prefix-test/config.toml");
        let _daemon = daemon(&notifier).with_settings(path.clone(), Settings::default());

        assert_eq!(notifier.targets(), vec![WatchTarget::settings(&path)]);
    }

    #[tokio::test]
    async fn test_run_processes_events_then_disposes() {
        let notifier = ManualNotifier::new();
        let mut daemon = daemon(&notifier);
        let repo = MemoryRepository::new("/a/.git", Some("main"), "work");
        daemon.watch_repository(repo.clone()).unwrap();

        repo.checkout(Some("ML-11-x"));
        daemon
            .sender()
            .send(ChangeEvent::Repository(repo.id()))
            .unwrap();

        daemon
            .run_until(tokio::time::sleep(Duration::from_millis(100)))
            .await;

        assert_eq!(repo.message(), "[ML-11] work");
        assert_eq!(notifier.active(), 0);
    }
}
