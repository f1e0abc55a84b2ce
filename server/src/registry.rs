//! Authoritative player-to-team map.
//!
//! The registry is the only mutable shared state in the team core. It can be
//! shared across tasks behind an `Arc`: reads and writes for different players
//! never need outside locking, and writes for the same player are serialized
//! so the last writer wins.

use parking_lot::RwLock;
use shared::{PlayerId, TeamAssignment, TeamCatalog, TeamError};
use std::collections::HashMap;
use std::sync::Arc;

pub struct MembershipRegistry {
    catalog: Arc<TeamCatalog>,
    assignments: RwLock<HashMap<PlayerId, TeamAssignment>>,
}

impl MembershipRegistry {
    pub fn new(catalog: Arc<TeamCatalog>) -> Self {
        Self {
            catalog,
            assignments: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &TeamCatalog {
        &self.catalog
    }

    /// Replaces the player's assignment after validating the team id.
    ///
    /// An unknown team leaves the registry untouched.
    pub fn assign(&self, player_id: PlayerId, team_id: &str) -> Result<TeamAssignment, TeamError> {
        if !self.catalog.contains(team_id) {
            return Err(TeamError::UnknownTeam(team_id.to_string()));
        }

        let assignment = TeamAssignment::new(player_id, Some(team_id.to_string()));
        self.assignments
            .write()
            .insert(player_id, assignment.clone());
        Ok(assignment)
    }

    /// Team id of the player, `None` when they have no team
    pub fn get(&self, player_id: PlayerId) -> Option<String> {
        self.assignments
            .read()
            .get(&player_id)
            .and_then(|assignment| assignment.team_id().map(str::to_string))
    }

    pub fn assignment(&self, player_id: PlayerId) -> Option<TeamAssignment> {
        self.assignments.read().get(&player_id).cloned()
    }

    /// Drops any assignment for the player. Removing twice is harmless.
    pub fn remove(&self, player_id: PlayerId) -> Option<TeamAssignment> {
        self.assignments.write().remove(&player_id)
    }

    pub fn assignments(&self) -> Vec<TeamAssignment> {
        self.assignments.read().values().cloned().collect()
    }

    pub fn clear(&self) {
        self.assignments.write().clear();
    }

    pub fn len(&self) -> usize {
        self.assignments.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.read().is_empty()
    }
}
