//! Registry of active watchers
//!
//! Holds at most one `Watcher` per repository plus the single current
//! configuration every watcher works from. Errors from individual passes are
//! logged here and never escape to the event loop.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::pattern::PrefixConfig;
use crate::core::repository::{RepositoryHandle, RepositoryId};
use crate::error::Result;
use crate::sync::notifier::Subscription;
use crate::sync::watcher::{PassOutcome, Watcher};

/// All watched repositories and the configuration they share
pub struct WatcherRegistry<R: RepositoryHandle> {
    config: Arc<PrefixConfig>,
    watchers: BTreeMap<RepositoryId, Watcher<R>>,
}

impl<R: RepositoryHandle> WatcherRegistry<R> {
    pub fn new(config: Arc<PrefixConfig>) -> Self {
        Self {
            config,
            watchers: BTreeMap::new(),
        }
    }

    /// The configuration new watchers start from
    pub fn config(&self) -> &Arc<PrefixConfig> {
        &self.config
    }

    pub fn is_watching(&self, id: &RepositoryId) -> bool {
        self.watchers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Start watching a repository and run its first pass
    ///
    /// Returns `false` without touching anything if the repository is already
    /// watched; the extra subscription is dropped.
    pub fn open(&mut self, repo: R, subscription: Option<Subscription>) -> bool {
        let id = repo.id();
        if self.watchers.contains_key(&id) {
            debug!(repo = %id, "Repository already watched");
            return false;
        }

        let mut watcher = Watcher::new(repo, self.config.clone());
        if let Err(e) = watcher.activate(subscription) {
            warn!(repo = %id, error = %e, "Initial synchronization failed");
        }

        self.watchers.insert(id, watcher);
        true
    }

    /// Stop watching a repository
    pub fn close(&mut self, id: &RepositoryId) -> bool {
        match self.watchers.remove(id) {
            Some(mut watcher) => {
                watcher.dispose();
                true
            }
            None => false,
        }
    }

    /// Handle a change notification for one repository
    pub fn notify(&mut self, id: &RepositoryId) {
        let Some(watcher) = self.watchers.get_mut(id) else {
            debug!(repo = %id, "Change for unknown repository");
            return;
        };

        if !watcher.repository().is_open() {
            info!(repo = %id, "Repository is gone");
            self.close(id);
            return;
        }

        if let Err(e) = watcher.on_change() {
            warn!(repo = %id, error = %e, "Synchronization failed");
        }
    }

    /// Run one pass on every repository, reporting each result separately
    pub fn refresh_all(&mut self) -> Vec<(RepositoryId, Result<PassOutcome>)> {
        self.watchers
            .iter_mut()
            .map(|(id, watcher)| {
                let outcome = watcher.on_change();
                if let Err(e) = &outcome {
                    warn!(repo = %id, error = %e, "Refresh failed");
                }
                (id.clone(), outcome)
            })
            .collect()
    }

    /// Replace the shared configuration and re-tag every repository under it
    pub fn apply_config(&mut self, config: Arc<PrefixConfig>) {
        self.config = config;

        for (id, watcher) in self.watchers.iter_mut() {
            if let Err(e) = watcher.update_config(self.config.clone()) {
                warn!(repo = %id, error = %e, "Synchronization after config change failed");
            }
        }
    }

    /// Dispose every watcher
    pub fn shutdown(&mut self) {
        for (_, mut watcher) in std::mem::take(&mut self.watchers) {
            watcher.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repository::MockRepositoryHandle;
    use crate::error::PrefixError;
    use crate::fakes::{ManualNotifier, MemoryRepository};
    use crate::sync::notifier::{ChangeNotifier, WatchTarget};
    use tokio::sync::mpsc;

    fn config(pattern: &str) -> Arc<PrefixConfig> {
        Arc::new(PrefixConfig::resolve(pattern, "[${prefix}] ${message}").unwrap())
    }

    #[test]
    fn test_open_tags_immediately() {
        let mut registry = WatcherRegistry::new(config(r"(ML-\d+)-.*"));
        let repo = MemoryRepository::new("/a/.git", Some("ML-42-fix-bug"), "Fix the bug");

        assert!(registry.open(repo.clone(), None));
        assert_eq!(repo.message(), "[ML-42] Fix the bug");
        assert!(registry.is_watching(&RepositoryId::new("/a/.git")));
    }

    #[test]
    fn test_second_open_is_a_no_op() {
        let notifier = ManualNotifier::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut registry = WatcherRegistry::new(config(r"(ML-\d+)-.*"));
        let repo = MemoryRepository::new("/a/.git", Some("ML-1-x"), "work");

        let first = notifier
            .subscribe(WatchTarget::repository(&repo), tx.clone())
            .unwrap();
        assert!(registry.open(repo.clone(), Some(first)));

        let second = notifier
            .subscribe(WatchTarget::repository(&repo), tx)
            .unwrap();
        assert!(!registry.open(repo.clone(), Some(second)));

        assert_eq!(registry.len(), 1);
        assert_eq!(notifier.active(), 1);
        assert_eq!(repo.writes(), 1);
    }

    #[test]
    fn test_close_disposes() {
        let notifier = ManualNotifier::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut registry = WatcherRegistry::new(config(r"(ML-\d+)-.*"));
        let repo = MemoryRepository::new("/a/.git", Some("main"), "");
        let sub = notifier
            .subscribe(WatchTarget::repository(&repo), tx)
            .unwrap();
        registry.open(repo.clone(), Some(sub));

        assert!(registry.close(&repo.id()));
        assert!(!registry.close(&repo.id()));
        assert!(registry.is_empty());
        assert_eq!(notifier.active(), 0);

        // Events for closed repositories are ignored
        repo.checkout(Some("ML-5-x"));
        registry.notify(&repo.id());
        assert_eq!(repo.message(), "");
    }

    #[test]
    fn test_notify_runs_pass_for_that_repository_only() {
        let mut registry = WatcherRegistry::new(config(r"(ML-\d+)-.*"));
        let a = MemoryRepository::new("/a/.git", Some("main"), "a");
        let b = MemoryRepository::new("/b/.git", Some("main"), "b");
        registry.open(a.clone(), None);
        registry.open(b.clone(), None);

        a.checkout(Some("ML-1-x"));
        b.checkout(Some("ML-2-x"));
        registry.notify(&a.id());

        assert_eq!(a.message(), "[ML-1] a");
        assert_eq!(b.message(), "b");
    }

    #[test]
    fn test_notify_closes_removed_repository() {
        let mut registry = WatcherRegistry::new(config(r"(ML-\d+)-.*"));
        let repo = MemoryRepository::new("/a/.git", Some("main"), "a");
        registry.open(repo.clone(), None);

        repo.remove();
        registry.notify(&repo.id());

        assert!(!registry.is_watching(&repo.id()));
    }

    #[test]
    fn test_refresh_all_reports_each_repository() {
        let mut registry = WatcherRegistry::new(config(r"(ML-\d+)-.*"));
        let good = MemoryRepository::new("/good/.git", Some("main"), "work");

        let mut broken = MockRepositoryHandle::new();
        broken
            .expect_id()
            .return_const(RepositoryId::new("/broken/.git"));
        broken
            .expect_read_message()
            .returning(|| Err(PrefixError::Custom("unreadable".into())));

        let mut registry_mixed: WatcherRegistry<Box<dyn RepositoryHandle>> =
            WatcherRegistry::new(registry.config().clone());
        registry_mixed.open(Box::new(broken), None);
        registry_mixed.open(Box::new(good.clone()), None);

        good.checkout(Some("ML-8-x"));
        let results = registry_mixed.refresh_all();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, RepositoryId::new("/broken/.git"));
        assert!(results[0].1.is_err());
        assert!(matches!(results[1].1, Ok(PassOutcome::Updated { .. })));
        assert_eq!(good.message(), "[ML-8] work");

        // Plain registries behave the same
        registry.open(good.clone(), None);
        assert_eq!(registry.refresh_all().len(), 1);
    }

    #[test]
    fn test_apply_config_retags_all() {
        let mut registry = WatcherRegistry::new(config(r"(ML-\d+)-.*"));
        let a = MemoryRepository::new("/a/.git", Some("BY-9-x"), "[ML-1] text");
        let b = MemoryRepository::new("/b/.git", Some("BY-3-y"), "[ML-2] other");
        registry.open(a.clone(), None);
        registry.open(b.clone(), None);

        let new = config(r"(BY-\d+)-.*");
        registry.apply_config(new.clone());

        assert!(Arc::ptr_eq(registry.config(), &new));
        assert_eq!(a.message(), "[BY-9] text");
        assert_eq!(b.message(), "[BY-3] other");
    }

    #[test]
    fn test_shutdown_disposes_everything() {
        let notifier = ManualNotifier::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut registry = WatcherRegistry::new(config(r"(ML-\d+)-.*"));

        for path in ["/a/.git", "/b/.git"] {
            let repo = MemoryRepository::new(path, Some("main"), "");
            let sub = notifier
                .subscribe(WatchTarget::repository(&repo), tx.clone())
                .unwrap();
            registry.open(repo, Some(sub));
        }
        assert_eq!(notifier.active(), 2);

        registry.shutdown();
        assert!(registry.is_empty());
        assert_eq!(notifier.active(), 0);
    }
}
