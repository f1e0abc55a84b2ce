//! World-visible team state.
//!
//! After the registry changes, the server mirrors the assignment into the
//! scoreboard: one scoreboard team per catalog entry, with name tags hidden
//! from other teams. Scoreboard failures are reported but never undo the
//! registry change that triggered them.

use log::{debug, info};
use shared::{PlayerId, TeamCatalog, TeamColor};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VisualError {
    #[error("scoreboard has no team named {0}")]
    MissingTeam(String),
}

/// Applies team membership to whatever players can see in the world
pub trait TeamVisuals: Send {
    fn init_teams(&mut self, catalog: &TeamCatalog);
    fn apply_team_visual(&mut self, player_id: PlayerId, team_id: &str)
        -> Result<(), VisualError>;
    fn clear_player(&mut self, player_id: PlayerId);
    fn clear(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameTagVisibility {
    Always,
    HideForOtherTeams,
}

#[derive(Debug, Clone)]
pub struct ScoreboardTeam {
    pub display_name: String,
    pub color: TeamColor,
    pub name_tag_visibility: NameTagVisibility,
    pub can_fly: bool,
    pub members: BTreeSet<PlayerId>,
}

#[derive(Debug, Default)]
pub struct Scoreboard {
    teams: HashMap<String, ScoreboardTeam>,
    player_teams: HashMap<PlayerId, String>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn team(&self, team_id: &str) -> Option<&ScoreboardTeam> {
        self.teams.get(team_id)
    }

    pub fn team_of(&self, player_id: PlayerId) -> Option<&str> {
        self.player_teams.get(&player_id).map(String::as_str)
    }

    /// Whether the player's team grants flight
    pub fn can_fly(&self, player_id: PlayerId) -> bool {
        self.team_of(player_id)
            .and_then(|team_id| self.teams.get(team_id))
            .map(|team| team.can_fly)
            .unwrap_or(false)
    }

    pub fn remove_team(&mut self, team_id: &str) -> Option<ScoreboardTeam> {
        let team = self.teams.remove(team_id)?;
        self.player_teams.retain(|_, current| current != team_id);
        Some(team)
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }
}

impl TeamVisuals for Scoreboard {
    fn init_teams(&mut self, catalog: &TeamCatalog) {
        for entry in catalog.entries() {
            if self.teams.contains_key(&entry.team_id) {
                continue;
            }
            self.teams.insert(
                entry.team_id.clone(),
                ScoreboardTeam {
                    display_name: entry.display_name.clone(),
                    color: entry.color,
                    name_tag_visibility: NameTagVisibility::HideForOtherTeams,
                    can_fly: entry.can_fly,
                    members: BTreeSet::new(),
                },
            );
        }
        info!("Scoreboard initialized with {} teams", self.teams.len());
    }

    fn apply_team_visual(
        &mut self,
        player_id: PlayerId,
        team_id: &str,
    ) -> Result<(), VisualError> {
        self.clear_player(player_id);

        let team = self
            .teams
            .get_mut(team_id)
            .ok_or_else(|| VisualError::MissingTeam(team_id.to_string()))?;
        team.members.insert(player_id);
        self.player_teams.insert(player_id, team_id.to_string());

        debug!("Scoreboard: player {} joined {}", player_id, team_id);
        Ok(())
    }

    fn clear_player(&mut self, player_id: PlayerId) {
        if let Some(previous) = self.player_teams.remove(&player_id) {
            if let Some(team) = self.teams.get_mut(&previous) {
                team.members.remove(&player_id);
            }
        }
    }

    fn clear(&mut self) {
        self.teams.clear();
        self.player_teams.clear();
    }
}
