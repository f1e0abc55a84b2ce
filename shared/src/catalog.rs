//! Team catalog: the set of valid team ids and how each team is displayed.
//!
//! The catalog is built once from configuration and is read-only afterwards.
//! The two default teams are always present, whatever the configuration says.

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const RED_TEAM: &str = "red";
pub const BLUE_TEAM: &str = "blue";
pub const MAX_TEAM_ID_LEN: usize = 32;

/// The sixteen classic chat colors. `White` is the neutral fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    #[default]
    White,
}

impl TeamColor {
    pub fn name(self) -> &'static str {
        match self {
            TeamColor::Black => "black",
            TeamColor::DarkBlue => "dark_blue",
            TeamColor::DarkGreen => "dark_green",
            TeamColor::DarkAqua => "dark_aqua",
            TeamColor::DarkRed => "dark_red",
            TeamColor::DarkPurple => "dark_purple",
            TeamColor::Gold => "gold",
            TeamColor::Gray => "gray",
            TeamColor::DarkGray => "dark_gray",
            TeamColor::Blue => "blue",
            TeamColor::Green => "green",
            TeamColor::Aqua => "aqua",
            TeamColor::Red => "red",
            TeamColor::LightPurple => "light_purple",
            TeamColor::Yellow => "yellow",
            TeamColor::White => "white",
        }
    }
}

impl fmt::Display for TeamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A team as written in configuration. Everything except the id is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub color: Option<TeamColor>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub can_fly: bool,
}

impl TeamInfo {
    pub fn new(id: &str, display_name: &str, color: TeamColor) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            color: Some(color),
            icon: String::new(),
            can_fly: false,
        }
    }
}

/// A resolved catalog entry, also sent to clients so they can render names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamEntry {
    pub team_id: String,
    pub display_name: String,
    pub color: TeamColor,
    pub icon: Option<String>,
    pub can_fly: bool,
}

impl From<TeamInfo> for TeamEntry {
    fn from(info: TeamInfo) -> Self {
        let display_name = if info.display_name.is_empty() {
            info.id.clone()
        } else {
            info.display_name
        };

        Self {
            team_id: info.id,
            display_name,
            color: info.color.unwrap_or_default(),
            icon: (!info.icon.is_empty()).then_some(info.icon),
            can_fly: info.can_fly,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamCatalog {
    entries: Vec<TeamEntry>,
}

impl TeamCatalog {
    /// Catalog containing only the default red and blue teams
    pub fn defaults() -> Self {
        Self::from_config(Vec::new())
    }

    /// Builds the catalog from configured teams.
    ///
    /// Keeps configuration order, lets a later duplicate id replace an earlier
    /// one, skips ids that are empty or too long, and appends the default
    /// teams when the configuration does not define them.
    pub fn from_config(teams: Vec<TeamInfo>) -> Self {
        let mut catalog = Self::default();

        for info in teams {
            if info.id.is_empty() || info.id.len() > MAX_TEAM_ID_LEN {
                warn!("Skipping team with invalid id {:?}", info.id);
                continue;
            }
            catalog.upsert(info.into());
        }

        for default in [
            TeamInfo::new(RED_TEAM, "Red Team", TeamColor::Red),
            TeamInfo::new(BLUE_TEAM, "Blue Team", TeamColor::Blue),
        ] {
            if !catalog.contains(&default.id) {
                catalog.entries.push(default.into());
            }
        }

        catalog
    }

    /// Wraps entries received from a server as-is
    pub fn from_entries(entries: Vec<TeamEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            catalog.upsert(entry);
        }
        catalog
    }

    fn upsert(&mut self, entry: TeamEntry) {
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.team_id == entry.team_id)
        {
            Some(existing) => {
                warn!("Team {} defined twice, keeping the later one", entry.team_id);
                *existing = entry;
            }
            None => self.entries.push(entry),
        }
    }

    pub fn contains(&self, team_id: &str) -> bool {
        self.get(team_id).is_some()
    }

    pub fn get(&self, team_id: &str) -> Option<&TeamEntry> {
        self.entries.iter().find(|entry| entry.team_id == team_id)
    }

    /// Display name for a team, or the raw id when the team is unknown
    pub fn display_name<'a>(&'a self, team_id: &'a str) -> &'a str {
        self.get(team_id)
            .map(|entry| entry.display_name.as_str())
            .unwrap_or(team_id)
    }

    pub fn entries(&self) -> &[TeamEntry] {
        &self.entries
    }

    pub fn team_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.team_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
