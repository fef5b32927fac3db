//! Change notification sources
//!
//! A `ChangeNotifier` turns file activity into `ChangeEvent`s on the daemon's
//! channel. Two implementations exist:
//! - `PushNotifier` listens for file system events
//! - `PollNotifier` compares file metadata on an interval

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::core::config::{NotifierKind, Settings};
use crate::core::repository::{RepositoryHandle, RepositoryId};
use crate::error::{PrefixError, Result};

/// Events processed by the daemon loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Branch or message of a repository may have changed
    Repository(RepositoryId),
    /// The settings file may have changed
    Settings,
    /// Manual request to synchronize every repository
    Refresh,
}

/// What to watch and which event to emit when it changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub event: ChangeEvent,
    pub paths: Vec<PathBuf>,
}

impl WatchTarget {
    /// Watch a repository's branch and message files
    pub fn repository<R: RepositoryHandle + ?Sized>(repo: &R) -> Self {
        Self {
            event: ChangeEvent::Repository(repo.id()),
            paths: repo.watch_paths(),
        }
    }

    /// Watch the settings file
    pub fn settings(path: &Path) -> Self {
        Self {
            event: ChangeEvent::Settings,
            paths: vec![path.to_path_buf()],
        }
    }
}

/// Keeps a subscription alive; dropping it stops the notifications
pub struct Subscription {
    _guard: Box<dyn Send>,
}

impl Subscription {
    pub fn new<G: Send + 'static>(guard: G) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription")
    }
}

/// Source of change notifications for a set of files
pub trait ChangeNotifier {
    /// Start sending `target.event` on `events` whenever one of the target paths changes
    fn subscribe(
        &self,
        target: WatchTarget,
        events: UnboundedSender<ChangeEvent>,
    ) -> Result<Subscription>;
}

/// Pick the notifier the settings ask for
pub fn notifier_for(settings: &Settings) -> Box<dyn ChangeNotifier> {
    match settings.notifier {
        NotifierKind::Push => Box::new(PushNotifier),
        NotifierKind::Poll => Box::new(PollNotifier::new(settings.watch_interval())),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Push notifications
// ─────────────────────────────────────────────────────────────────────────────

/// File system event notifier
///
/// Git replaces files like HEAD by renaming a lock file over them, which
/// breaks watches on the file itself. The parent directories are watched
/// instead and events are filtered down to the target paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct PushNotifier;

impl ChangeNotifier for PushNotifier {
    fn subscribe(
        &self,
        target: WatchTarget,
        events: UnboundedSender<ChangeEvent>,
    ) -> Result<Subscription> {
        let paths: Vec<PathBuf> = target.paths.iter().filter_map(|p| normalize(p)).collect();
        let wanted: HashSet<PathBuf> = paths.iter().cloned().collect();
        let event = target.event.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(fs_event) if is_relevant(&fs_event, &wanted) => {
                    let _ = events.send(event.clone());
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "File watcher error"),
            },
            Config::default(),
        )?;

        for dir in watch_dirs(&paths) {
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        }

        debug!(event = ?target.event, paths = paths.len(), "Push subscription started");
        Ok(Subscription::new(watcher))
    }
}

/// Canonical parent directory joined with the file name
///
/// Paths whose directory doesn't exist can't be watched and are skipped.
fn normalize(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    match fs::canonicalize(parent) {
        Ok(dir) => Some(dir.join(name)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unwatchable path");
            None
        }
    }
}

/// Distinct parent directories of the given paths
fn watch_dirs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = paths
        .iter()
        .filter_map(|p| p.parent().map(Path::to_path_buf))
        .collect();
    dirs.sort();
    dirs.dedup();
    dirs
}

/// Whether a file system event touches one of the wanted paths
fn is_relevant(event: &Event, wanted: &HashSet<PathBuf>) -> bool {
    !matches!(event.kind, EventKind::Access(_)) && event.paths.iter().any(|p| wanted.contains(p))
}

// ─────────────────────────────────────────────────────────────────────────────
// Polling
// ─────────────────────────────────────────────────────────────────────────────

/// Interval-driven notifier for file systems without change events
#[derive(Debug, Clone, Copy)]
pub struct PollNotifier {
    poll_interval: Duration,
}

impl PollNotifier {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

/// Modification time and length of a file, `None` if it doesn't exist
type Fingerprint = Option<(Option<SystemTime>, u64)>;

fn fingerprint(paths: &[PathBuf]) -> Vec<Fingerprint> {
    paths
        .iter()
        .map(|p| fs::metadata(p).ok().map(|m| (m.modified().ok(), m.len())))
        .collect()
}

/// Aborts the polling task when dropped
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl ChangeNotifier for PollNotifier {
    fn subscribe(
        &self,
        target: WatchTarget,
        events: UnboundedSender<ChangeEvent>,
    ) -> Result<Subscription> {
        let runtime = Handle::try_current().map_err(|_| {
            PrefixError::Custom("Polling for changes requires a running tokio runtime".into())
        })?;

        let period = self.poll_interval;
        let mut last = fingerprint(&target.paths);

        let task = runtime.spawn(async move {
            let mut tick = interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            tick.tick().await;

            loop {
                tick.tick().await;

                let current = fingerprint(&target.paths);
                if current == last {
                    continue;
                }
                last = current;

                if events.send(target.event.clone()).is_err() {
                    break;
                }
            }
        });

        debug!(interval_ms = period.as_millis() as u64, "Poll subscription started");
        Ok(Subscription::new(AbortOnDrop(task)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, ModifyKind};
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[test]
    fn test_is_relevant_filters_paths_and_access() {
        let wanted: HashSet<PathBuf> = [PathBuf::from("/repo/.git/HEAD")].into_iter().collect();

        let modify = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/repo/.git/HEAD"));
        let other = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/repo/.git/index"));
        let access = Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/repo/.git/HEAD"));

        assert!(is_relevant(&modify, &wanted));
        assert!(!is_relevant(&other, &wanted));
        assert!(!is_relevant(&access, &wanted));
    }

    #[test]
    fn test_watch_dirs_dedups_parents() {
        let dirs = watch_dirs(&[
            PathBuf::from("/repo/.git/HEAD"),
            PathBuf::from("/repo/.git/COMMIT_DRAFT"),
            PathBuf::from("/config/config.toml"),
        ]);
        assert_eq!(
            dirs,
            vec![PathBuf::from("/config"), PathBuf::from("/repo/.git")]
        );
    }

    #[test]
    fn test_normalize_skips_missing_directory() {
        let temp = TempDir::new().unwrap();
        assert!(normalize(&temp.path().join("missing").join("file")).is_none());

        let normalized = normalize(&temp.path().join("file")).unwrap();
        assert!(normalized.ends_with("file"));
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_notifier_for_settings() {
        let temp = TempDir::new().unwrap();
        let target = WatchTarget::settings(&temp.path().join("config.toml"));
        let settings = Settings {
            notifier: NotifierKind::Poll,
            ..Default::default()
        };

        // Outside a runtime only the polling notifier refuses to start
        let (tx, _rx) = mpsc::unbounded_channel();
        let poll = notifier_for(&settings).subscribe(target.clone(), tx);
        assert!(matches!(poll, Err(PrefixError::Custom(_))));

        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(notifier_for(&Settings::default())
            .subscribe(target, tx)
            .is_ok());
    }

    #[test]
    fn test_poll_requires_runtime() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let target = WatchTarget::settings(Path::new("/nonexistent/config.toml"));
        let result = PollNotifier::new(Duration::from_millis(10)).subscribe(target, tx);
        assert!(matches!(result, Err(PrefixError::Custom(_))));
    }

    #[tokio::test]
    async fn test_poll_detects_change() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "a").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = PollNotifier::new(Duration::from_millis(20))
            .subscribe(WatchTarget::settings(&path), tx)
            .unwrap();

        fs::write(&path, "longer contents").unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(event, Some(ChangeEvent::Settings));
    }

    #[tokio::test]
    async fn test_poll_detects_creation() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("COMMIT_DRAFT");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = PollNotifier::new(Duration::from_millis(20))
            .subscribe(WatchTarget::settings(&path), tx)
            .unwrap();

        fs::write(&path, "new").unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(event, Some(ChangeEvent::Settings));
    }

    #[tokio::test]
    async fn test_poll_quiet_without_changes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "a").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = PollNotifier::new(Duration::from_millis(10))
            .subscribe(WatchTarget::settings(&path), tx)
            .unwrap();

        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_dropping_poll_subscription_stops_task() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = PollNotifier::new(Duration::from_millis(10))
            .subscribe(WatchTarget::settings(&path), tx)
            .unwrap();
        drop(sub);

        // The aborted task drops the only sender
        let event = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(event, None);
    }

    #[test]
    fn test_push_subscription_starts() {
        let temp = TempDir::new().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let target = WatchTarget::settings(&temp.path().join("config.toml"));

        assert!(PushNotifier.subscribe(target, tx).is_ok());
    }

    #[tokio::test]
    async fn test_push_delivers_on_write() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = PushNotifier
            .subscribe(WatchTarget::settings(&path), tx)
            .unwrap();

        fs::write(&path, "prefix_pattern = \"(BY-\\\\d+)-.*\"\n").unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(event, Some(ChangeEvent::Settings));
    }

    #[tokio::test]
    async fn test_push_delivers_on_rename_over_file() {
        let temp = TempDir::new().unwrap();
        let head = temp.path().join("HEAD");
        let lock = temp.path().join("HEAD.lock");
        fs::write(&head, "ref: refs/heads/main\n").unwrap();

        let id = RepositoryId::new(temp.path());
        let target = WatchTarget {
            event: ChangeEvent::Repository(id.clone()),
            paths: vec![head.clone()],
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = PushNotifier.subscribe(target, tx).unwrap();

        // Same sequence git uses to switch branches
        fs::write(&lock, "ref: refs/heads/ML-1-x\n").unwrap();
        fs::rename(&lock, &head).unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(event, Some(ChangeEvent::Repository(id)));
    }
}
