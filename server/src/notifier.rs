//! Team change listeners.
//!
//! Listeners are plain closures keyed by a name chosen by whoever registers
//! them. They run synchronously, in registration order, right after an
//! assignment succeeds. A panicking listener is logged and skipped; the
//! remaining listeners and the roster broadcast still happen.

use log::error;
use parking_lot::RwLock;
use shared::PlayerId;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub type Listener = Arc<dyn Fn(PlayerId, &str) + Send + Sync>;

#[derive(Default)]
pub struct ChangeNotifier {
    listeners: RwLock<Vec<(String, Listener)>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener under `key`. Returns false if the key is already taken.
    pub fn register<F>(&self, key: impl Into<String>, listener: F) -> bool
    where
        F: Fn(PlayerId, &str) + Send + Sync + 'static,
    {
        let key = key.into();
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|(existing, _)| *existing == key) {
            return false;
        }
        listeners.push((key, Arc::new(listener)));
        true
    }

    /// Returns false if nothing was registered under `key`
    pub fn unregister(&self, key: &str) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| existing != key);
        listeners.len() != before
    }

    /// Invokes every listener and returns how many of them panicked.
    ///
    /// Works on a copy of the list, so listeners may (un)register freely.
    pub fn notify(&self, player_id: PlayerId, team_id: &str) -> usize {
        let listeners: Vec<(String, Listener)> = self.listeners.read().clone();
        let mut failures = 0;

        for (key, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(player_id, team_id))).is_err() {
                error!(
                    "Team change listener '{}' panicked for player {} -> {}",
                    key, player_id, team_id
                );
                failures += 1;
            }
        }

        failures
    }

    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}
