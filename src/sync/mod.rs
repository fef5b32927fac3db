//! Keeping message buffers in sync with their branches
//!
//! Change notifiers feed events to the daemon, which routes them to one
//! watcher per repository through the registry.

pub mod daemon;
pub mod notifier;
pub mod registry;
pub mod watcher;

pub use daemon::Daemon;
pub use notifier::{notifier_for, ChangeEvent, ChangeNotifier, PollNotifier, PushNotifier};
pub use registry::WatcherRegistry;
pub use watcher::{PassOutcome, Watcher, WatcherState};
