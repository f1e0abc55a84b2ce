//! Wire protocol and data types shared by the team server and its clients.

mod catalog;
mod error;

pub use catalog::{
    TeamCatalog, TeamColor, TeamEntry, TeamInfo, BLUE_TEAM, MAX_TEAM_ID_LEN, RED_TEAM,
};
pub use error::{ProtocolError, TeamError};

use bincode::{deserialize, serialize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_DATAGRAM_SIZE: usize = 65_507;
pub const MAX_ROSTER_ENTRIES: usize = 512;
pub const MAX_NAME_LEN: usize = 32;

/// Player display name to team id, for players that currently have a team
pub type Roster = BTreeMap<String, String>;

/// Stable identifier the server hands out per connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable record of which team a player is on.
///
/// An empty team id is normalized to `None`, so "no team" has exactly one
/// representation and equality stays structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamAssignment {
    player_id: PlayerId,
    team_id: Option<String>,
}

impl TeamAssignment {
    pub fn new(player_id: PlayerId, team_id: Option<String>) -> Self {
        Self {
            player_id,
            team_id: team_id.filter(|id| !id.is_empty()),
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn team_id(&self) -> Option<&str> {
        self.team_id.as_deref()
    }

    pub fn has_team(&self) -> bool {
        self.team_id.is_some()
    }

    /// Returns a new assignment for the same player
    pub fn with_team_id(&self, team_id: Option<String>) -> Self {
        Self::new(self.player_id, team_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub team_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect {
        client_version: u32,
        player_name: String,
        /// Shared secret that proves an operator is who their name says
        operator_token: Option<String>,
    },
    Heartbeat,
    RequestSnapshot,
    TeamChangeRequest {
        target_name: String,
        team_id: String,
    },
    Disconnect,

    Connected {
        client_id: u32,
    },
    Catalog {
        teams: Vec<TeamEntry>,
    },
    RosterSnapshot {
        entries: Vec<RosterEntry>,
    },
    Notice {
        level: NoticeLevel,
        text: String,
    },
    Disconnected {
        reason: String,
    },
}

impl Packet {
    /// Full-replace roster message. Entries come out sorted by name.
    pub fn roster(roster: &Roster) -> Self {
        Packet::RosterSnapshot {
            entries: roster
                .iter()
                .map(|(name, team_id)| RosterEntry {
                    name: name.clone(),
                    team_id: team_id.clone(),
                })
                .collect(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Packet::Notice {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Packet::Notice {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Rebuilds a roster from decoded pairs. A repeated name keeps its last team.
pub fn roster_from_entries(entries: Vec<RosterEntry>) -> Result<Roster, ProtocolError> {
    if entries.len() > MAX_ROSTER_ENTRIES {
        return Err(ProtocolError::RosterTooLarge(
            entries.len(),
            MAX_ROSTER_ENTRIES,
        ));
    }

    Ok(entries
        .into_iter()
        .map(|entry| (entry.name, entry.team_id))
        .collect())
}

pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    let data = serialize(packet)?;
    if data.len() > MAX_DATAGRAM_SIZE {
        return Err(ProtocolError::TooLarge(data.len()));
    }
    Ok(data)
}

/// Decodes one datagram, rejecting anything over the size and roster limits
pub fn decode_packet(data: &[u8]) -> Result<Packet, ProtocolError> {
    if data.len() > MAX_DATAGRAM_SIZE {
        return Err(ProtocolError::TooLarge(data.len()));
    }

    let packet: Packet = deserialize(data)?;
    if let Packet::RosterSnapshot { entries } = &packet {
        if entries.len() > MAX_ROSTER_ENTRIES {
            return Err(ProtocolError::RosterTooLarge(
                entries.len(),
                MAX_ROSTER_ENTRIES,
            ));
        }
    }
    Ok(packet)
}

/// Bounds both fields so neither can outgrow an echoed notice
pub fn check_team_change(target_name: &str, team_id: &str) -> Result<(), ProtocolError> {
    if target_name.len() > MAX_NAME_LEN {
        return Err(ProtocolError::FieldTooLong("target name", MAX_NAME_LEN));
    }
    if team_id.len() > MAX_TEAM_ID_LEN {
        return Err(ProtocolError::FieldTooLong("team id", MAX_TEAM_ID_LEN));
    }
    Ok(())
}

pub fn check_player_name(name: &str) -> Result<(), ProtocolError> {
    if name.trim().is_empty() {
        return Err(ProtocolError::InvalidName("name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ProtocolError::InvalidName("name is too long"));
    }
    if name.chars().any(char::is_control) {
        return Err(ProtocolError::InvalidName("name contains control characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, team_id: &str) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            team_id: team_id.to_string(),
        }
    }

    fn decode_roster(data: &[u8]) -> Result<Roster, ProtocolError> {
        match decode_packet(data)? {
            Packet::RosterSnapshot { entries } => roster_from_entries(entries),
            other => panic!("Expected roster, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_normalizes_empty_team() {
        let empty = TeamAssignment::new(PlayerId(1), Some(String::new()));
        let none = TeamAssignment::new(PlayerId(1), None);

        assert_eq!(empty, none);
        assert!(!empty.has_team());
        assert_eq!(empty.team_id(), None);
    }

    #[test]
    fn test_assignment_equality() {
        let a = TeamAssignment::new(PlayerId(1), Some(RED_TEAM.to_string()));
        let b = TeamAssignment::new(PlayerId(1), Some(RED_TEAM.to_string()));
        let c = TeamAssignment::new(PlayerId(2), Some(RED_TEAM.to_string()));
        let d = a.with_team_id(Some(BLUE_TEAM.to_string()));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(d.player_id(), PlayerId(1));
        assert_eq!(a.team_id(), Some(RED_TEAM));
    }

    #[test]
    fn test_roster_roundtrip() {
        let mut roster = Roster::new();
        roster.insert("alice".to_string(), RED_TEAM.to_string());
        roster.insert("bob".to_string(), BLUE_TEAM.to_string());

        let data = encode_packet(&Packet::roster(&roster)).unwrap();
        assert_eq!(decode_roster(&data).unwrap(), roster);
    }

    #[test]
    fn test_empty_roster_roundtrip() {
        let roster = Roster::new();
        let data = encode_packet(&Packet::roster(&roster)).unwrap();
        assert!(decode_roster(&data).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let packet = Packet::RosterSnapshot {
            entries: vec![
                entry("alice", RED_TEAM),
                entry("bob", RED_TEAM),
                entry("alice", BLUE_TEAM),
            ],
        };
        let data = encode_packet(&packet).unwrap();
        let roster = decode_roster(&data).unwrap();

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get("alice").map(String::as_str), Some(BLUE_TEAM));
        assert_eq!(roster.get("bob").map(String::as_str), Some(RED_TEAM));
    }

    #[test]
    fn test_roster_entries_are_sorted_by_name() {
        let mut roster = Roster::new();
        roster.insert("zed".to_string(), RED_TEAM.to_string());
        roster.insert("amy".to_string(), BLUE_TEAM.to_string());

        match Packet::roster(&roster) {
            Packet::RosterSnapshot { entries } => {
                assert_eq!(entries[0].name, "amy");
                assert_eq!(entries[1].name, "zed");
            }
            _ => panic!("Wrong packet type"),
        }
    }

    #[test]
    fn test_roster_count_over_limit_is_rejected() {
        let entries = (0..=MAX_ROSTER_ENTRIES)
            .map(|i| entry(&format!("p{}", i), RED_TEAM))
            .collect();
        let data = serialize(&Packet::RosterSnapshot { entries }).unwrap();

        assert!(matches!(
            decode_packet(&data),
            Err(ProtocolError::RosterTooLarge(n, MAX_ROSTER_ENTRIES)) if n == MAX_ROSTER_ENTRIES + 1
        ));
    }

    #[test]
    fn test_roster_count_larger_than_payload_is_rejected() {
        let mut data = serialize(&Packet::RosterSnapshot { entries: vec![] }).unwrap();
        // Overwrite the u64 count that follows the u32 variant tag
        let count_offset = data.len() - 8;
        data[count_offset..].copy_from_slice(&u64::MAX.to_le_bytes());

        assert!(matches!(
            decode_packet(&data),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_truncated_packet_is_rejected() {
        let packet = Packet::TeamChangeRequest {
            target_name: "alice".to_string(),
            team_id: RED_TEAM.to_string(),
        };
        let data = encode_packet(&packet).unwrap();

        assert!(decode_packet(&data[..data.len() - 1]).is_err());
        assert!(decode_packet(&[]).is_err());
    }

    #[test]
    fn test_oversized_datagram_is_rejected() {
        let data = vec![0u8; MAX_DATAGRAM_SIZE + 1];
        assert!(matches!(
            decode_packet(&data),
            Err(ProtocolError::TooLarge(_))
        ));
    }

    #[test]
    fn test_packet_serialization_team_change() {
        let packet = Packet::TeamChangeRequest {
            target_name: "alice".to_string(),
            team_id: BLUE_TEAM.to_string(),
        };
        let data = encode_packet(&packet).unwrap();
        assert_eq!(decode_packet(&data).unwrap(), packet);
    }

    #[test]
    fn test_packet_serialization_catalog() {
        let catalog = TeamCatalog::defaults();
        let packet = Packet::Catalog {
            teams: catalog.entries().to_vec(),
        };
        let data = encode_packet(&packet).unwrap();

        match decode_packet(&data).unwrap() {
            Packet::Catalog { teams } => {
                assert_eq!(TeamCatalog::from_entries(teams), catalog);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_notice_helpers() {
        assert_eq!(
            Packet::error("nope"),
            Packet::Notice {
                level: NoticeLevel::Error,
                text: "nope".to_string()
            }
        );
        assert!(matches!(
            Packet::info("ok"),
            Packet::Notice {
                level: NoticeLevel::Info,
                ..
            }
        ));
    }

    #[test]
    fn test_player_name_validation() {
        assert!(check_player_name("alice").is_ok());
        assert!(check_player_name("").is_err());
        assert!(check_player_name("   ").is_err());
        assert!(check_player_name("bad\nname").is_err());
        assert!(check_player_name(&"a".repeat(MAX_NAME_LEN)).is_ok());
        assert!(check_player_name(&"a".repeat(MAX_NAME_LEN + 1)).is_err());
        // Limit is in bytes so any roster fits in one datagram
        assert!(check_player_name(&"é".repeat(MAX_NAME_LEN / 2 + 1)).is_err());
    }

    #[test]
    fn test_team_change_field_limits() {
        assert!(check_team_change("alice", RED_TEAM).is_ok());
        assert!(check_team_change(&"a".repeat(MAX_NAME_LEN), &"b".repeat(MAX_TEAM_ID_LEN)).is_ok());
        assert!(matches!(
            check_team_change(&"a".repeat(MAX_NAME_LEN + 1), RED_TEAM),
            Err(ProtocolError::FieldTooLong("target name", MAX_NAME_LEN))
        ));
        assert!(matches!(
            check_team_change("alice", &"x".repeat(65_000)),
            Err(ProtocolError::FieldTooLong("team id", MAX_TEAM_ID_LEN))
        ));
    }
}
