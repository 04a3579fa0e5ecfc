//! Unified error type for the Partyroom server.

use partyroom_game::GameError;
use partyroom_protocol::{ErrorKind, ProtocolError, RoomCode};
use partyroom_room::RoomError;
use partyroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Clients see it as `{error, code}`: the `Display` text and
/// [`PartyError::kind`].
#[derive(Debug, thiserror::Error)]
pub enum PartyError {
    /// A transport-level error (bind, accept, send, receive).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Game(#[from] GameError),

    /// The request was well-formed but its values are not acceptable.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A host-only action from someone other than the host.
    #[error("only the host of room {0} can do that")]
    NotHost(RoomCode),
}

impl PartyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Internal,
            Self::Protocol(ProtocolError::Encode(_)) => ErrorKind::Internal,
            Self::Protocol(_) | Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Room(err) => err.kind(),
            Self::Game(err) => err.kind(),
            Self::NotHost(_) => ErrorKind::InvalidState,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: PartyError = TransportError::InvalidUtf8.into();
        assert!(matches!(err, PartyError::Transport(_)));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_from_protocol_error_is_bad_request() {
        let err: PartyError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, PartyError::Protocol(_)));
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_from_room_error_keeps_kind() {
        let err: PartyError = RoomError::NotFound("QQQQQQ".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "room QQQQQQ not found");
    }

    #[test]
    fn test_from_game_error_keeps_kind() {
        let err: PartyError =
            GameError::InsufficientPlayers { have: 1, need: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::InsufficientPlayers);
    }

    #[test]
    fn test_not_host_is_invalid_state() {
        let err = PartyError::NotHost(RoomCode::new("abc123"));
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.to_string(), "only the host of room ABC123 can do that");
    }
}
