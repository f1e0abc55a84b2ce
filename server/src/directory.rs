//! Seams between the team core and the rest of the server: who is online,
//! and who is allowed to move other players between teams.

use shared::PlayerId;
use std::collections::HashSet;
use std::net::SocketAddr;

/// A live connection as seen by the team core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedPlayer {
    pub id: PlayerId,
    pub name: String,
    pub addr: SocketAddr,
    /// Presented the operator token when connecting
    pub verified: bool,
}

/// Live player directory
pub trait PlayerDirectory {
    fn connected_players(&self) -> Vec<ConnectedPlayer>;

    /// Case-insensitive lookup by display name
    fn find_by_display_name(&self, name: &str) -> Option<ConnectedPlayer>;
}

pub trait PrivilegeCheck {
    fn has_elevated_privilege(&self, player: &ConnectedPlayer) -> bool;
}

/// Grants elevated privilege to a fixed set of player names.
///
/// A name alone is not enough: the session must also have presented the
/// operator token, otherwise anyone could join under an operator's name.
#[derive(Debug, Clone, Default)]
pub struct OperatorList {
    names: HashSet<String>,
}

impl OperatorList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl PrivilegeCheck for OperatorList {
    fn has_elevated_privilege(&self, player: &ConnectedPlayer) -> bool {
        player.verified && self.names.contains(&player.name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str) -> ConnectedPlayer {
        ConnectedPlayer {
            id: PlayerId(1),
            name: name.to_string(),
            addr: "127.0.0.1:8080".parse().unwrap(),
            verified: true,
        }
    }

    #[test]
    fn test_operator_list_matches_ignoring_case() {
        let operators = OperatorList::new(["Admin"]);
        assert!(operators.has_elevated_privilege(&player("admin")));
        assert!(operators.has_elevated_privilege(&player("ADMIN")));
        assert!(!operators.has_elevated_privilege(&player("guest")));
    }

    #[test]
    fn test_operator_name_without_token_is_refused() {
        let operators = OperatorList::new(["admin"]);
        let impostor = ConnectedPlayer {
            verified: false,
            ..player("ADMIN")
        };
        assert!(!operators.has_elevated_privilege(&impostor));
    }

    #[test]
    fn test_empty_operator_list_denies_everyone() {
        let operators = OperatorList::default();
        assert!(operators.is_empty());
        assert!(!operators.has_elevated_privilege(&player("admin")));
    }
}
