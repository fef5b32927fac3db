//! Per-repository message synchronization
//!
//! A `Watcher` ties one repository to the current prefix configuration and to
//! the subscription that feeds it change events. Lifecycle:
//!
//! `Unwatched` → `Active` (first pass runs on activation) → `Disposed`
//!
//! Nothing leaves `Disposed`; events delivered after disposal are ignored.

use std::sync::Arc;

use tracing::{debug, info};

use crate::core::message::{compute_message, extract_original_message};
use crate::core::pattern::PrefixConfig;
use crate::core::repository::{RepositoryHandle, RepositoryId};
use crate::error::Result;
use crate::sync::notifier::Subscription;

/// Lifecycle state of a watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Unwatched,
    Active,
    Disposed,
}

/// Result of one synchronization pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The message buffer was rewritten
    Updated { from: String, to: String },
    /// The buffer already held the computed message
    Unchanged,
    /// The watcher is not active, nothing was read or written
    Inactive,
}

/// Keeps one repository's message buffer in sync with its branch
pub struct Watcher<R: RepositoryHandle> {
    repo: R,
    config: Arc<PrefixConfig>,
    state: WatcherState,
    subscription: Option<Subscription>,
}

impl<R: RepositoryHandle> Watcher<R> {
    pub fn new(repo: R, config: Arc<PrefixConfig>) -> Self {
        Self {
            repo,
            config,
            state: WatcherState::Unwatched,
            subscription: None,
        }
    }

    pub fn id(&self) -> RepositoryId {
        self.repo.id()
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &Arc<PrefixConfig> {
        &self.config
    }

    /// Start watching and run the first pass
    ///
    /// Only valid from `Unwatched`; otherwise the call is ignored.
    pub fn activate(&mut self, subscription: Option<Subscription>) -> Result<PassOutcome> {
        if self.state != WatcherState::Unwatched {
            return Ok(PassOutcome::Inactive);
        }

        self.subscription = subscription;
        self.state = WatcherState::Active;
        debug!(repo = %self.id(), "Watching repository");

        self.on_change()
    }

    /// Synchronize after a change notification, using the freshly read message
    pub fn on_change(&mut self) -> Result<PassOutcome> {
        if self.state != WatcherState::Active {
            return Ok(PassOutcome::Inactive);
        }

        let current = self.repo.read_message()?;
        self.synchronize(&current, &current)
    }

    /// Swap in a new configuration and re-tag the message under it
    ///
    /// The untagged message is recovered with the old configuration first, so a
    /// changed prefix scheme replaces the stale tag instead of stacking on it.
    pub fn update_config(&mut self, config: Arc<PrefixConfig>) -> Result<PassOutcome> {
        if self.state == WatcherState::Disposed {
            return Ok(PassOutcome::Inactive);
        }

        if self.state == WatcherState::Unwatched {
            self.config = config;
            return Ok(PassOutcome::Inactive);
        }

        let current = match self.repo.read_message() {
            Ok(message) => message,
            Err(e) => {
                self.config = config;
                return Err(e);
            }
        };

        let original = extract_original_message(&current, &self.config);
        self.config = config;
        self.synchronize(&original, &current)
    }

    /// Release the subscription; terminal
    pub fn dispose(&mut self) {
        let was_active = self.state == WatcherState::Active;

        self.subscription = None;
        self.state = WatcherState::Disposed;

        if was_active {
            debug!(repo = %self.id(), "Stopped watching repository");
        }
    }

    /// Compute the message from `base` and write it if it differs from `current`
    fn synchronize(&self, base: &str, current: &str) -> Result<PassOutcome> {
        let branch = self.repo.current_branch()?.unwrap_or_default();
        let updated = compute_message(&branch, base, &self.config);

        if updated == current {
            debug!(repo = %self.id(), branch = %branch, "Message already up to date");
            return Ok(PassOutcome::Unchanged);
        }

        self.repo.write_message(&updated)?;
        info!(repo = %self.id(), branch = %branch, message = %updated, "Updated commit message");

        Ok(PassOutcome::Updated {
            from: current.to_string(),
            to: updated,
        })
    }
}

impl<R: RepositoryHandle> Drop for Watcher<R> {
    fn drop(&mut self) {
        self.dispose();
    }
}
