//! Client-side mirror of the last roster the server sent.

use parking_lot::RwLock;
use shared::Roster;

/// Last received roster snapshot
///
/// Written by the network receive task and read by the UI loop. Readers only
/// ever get an owned copy, so they can never observe a half-applied roster.
#[derive(Debug, Default)]
pub struct ClientCache {
    roster: RwLock<Roster>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole roster; nothing from the previous one survives
    pub fn replace(&self, roster: Roster) {
        let mut current = self.roster.write();
        current.clear();
        current.extend(roster);
    }

    pub fn snapshot(&self) -> Roster {
        self.roster.read().clone()
    }

    pub fn team_of(&self, player_name: &str) -> Option<String> {
        self.roster.read().get(player_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.roster.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.read().is_empty()
    }
}
