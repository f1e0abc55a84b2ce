use thiserror::Error;

/// Rejections produced while handling a team request.
///
/// All of these are recoverable: the request is dropped, the requester is
/// told why, and nothing in the registry changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeamError {
    #[error("unknown team id: {0}")]
    UnknownTeam(String),

    #[error("player is not online: {0}")]
    PlayerNotFound(String),

    #[error("you do not have permission to change teams")]
    PermissionDenied,
}

/// Wire-level failures. A packet that fails to decode is discarded whole.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("packet of {0} bytes exceeds the datagram limit")]
    TooLarge(usize),

    #[error("roster with {0} entries exceeds the limit of {1}")]
    RosterTooLarge(usize, usize),

    #[error("invalid player name: {0}")]
    InvalidName(&'static str),

    #[error("{0} is longer than {1} bytes")]
    FieldTooLong(&'static str, usize),

    #[error("malformed packet: {0}")]
    Malformed(#[from] bincode::Error),
}
