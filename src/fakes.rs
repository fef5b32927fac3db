//! In-memory fakes for the host collaborators (testing only)
//!
//! Provides `MemoryRepository` and `ManualNotifier`, which satisfy the
//! `RepositoryHandle` and `ChangeNotifier` contracts without touching git or
//! the file system.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

use crate::core::repository::{RepositoryHandle, RepositoryId};
use crate::error::Result;
use crate::sync::notifier::{ChangeEvent, ChangeNotifier, Subscription, WatchTarget};

// ---------------------------------------------------------------------------
// MemoryRepository
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RepoState {
    branch: Option<String>,
    message: String,
    writes: usize,
    removed: bool,
}

/// Repository whose branch and message live in memory
///
/// Clones share state, so a test can keep one handle while the registry owns
/// another.
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    id: RepositoryId,
    state: Arc<Mutex<RepoState>>,
}

impl MemoryRepository {
    pub fn new(id: &str, branch: Option<&str>, message: &str) -> Self {
        Self {
            id: RepositoryId::new(id),
            state: Arc::new(Mutex::new(RepoState {
                branch: branch.map(str::to_string),
                message: message.to_string(),
                writes: 0,
                removed: false,
            })),
        }
    }

    /// Simulate a checkout
    pub fn checkout(&self, branch: Option<&str>) {
        self.state.lock().unwrap().branch = branch.map(str::to_string);
    }

    /// Simulate the user typing into the message buffer
    pub fn type_message(&self, message: &str) {
        self.state.lock().unwrap().message = message.to_string();
    }

    /// Simulate the working copy being deleted
    pub fn remove(&self) {
        self.state.lock().unwrap().removed = true;
    }

    pub fn message(&self) -> String {
        self.state.lock().unwrap().message.clone()
    }

    /// Number of writes made through `write_message`
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }
}

impl RepositoryHandle for MemoryRepository {
    fn id(&self) -> RepositoryId {
        self.id.clone()
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().branch.clone())
    }

    fn read_message(&self) -> Result<String> {
        Ok(self.message())
    }

    fn write_message(&self, message: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.message = message.to_string();
        state.writes += 1;
        Ok(())
    }

    fn watch_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    fn is_open(&self) -> bool {
        !self.state.lock().unwrap().removed
    }
}

// ---------------------------------------------------------------------------
// ManualNotifier
// ---------------------------------------------------------------------------

/// Notifier that never fires on its own
///
/// Records every subscription and counts how many are still alive, so tests
/// can check that disposal releases them.
#[derive(Debug, Clone, Default)]
pub struct ManualNotifier {
    targets: Arc<Mutex<Vec<WatchTarget>>>,
    active: Arc<AtomicUsize>,
}

/// Decrements the live-subscription count when dropped
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ManualNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every target subscribed so far
    pub fn targets(&self) -> Vec<WatchTarget> {
        self.targets.lock().unwrap().clone()
    }

    /// Subscriptions not yet dropped
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl ChangeNotifier for ManualNotifier {
    fn subscribe(
        &self,
        target: WatchTarget,
        _events: UnboundedSender<ChangeEvent>,
    ) -> Result<Subscription> {
        self.targets.lock().unwrap().push(target);
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Subscription::new(ActiveGuard(self.active.clone())))
    }
}
