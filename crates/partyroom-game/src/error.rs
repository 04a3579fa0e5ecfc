//! Error types for the game layer.

use partyroom_protocol::{ErrorKind, PlayerId, RoomId};
use partyroom_room::RoomError;

/// Errors that can occur while coordinating a game.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// A registry operation failed.
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("player {0} is not in this room")]
    PlayerNotFound(PlayerId),

    /// The room's state does not allow this action.
    #[error("invalid game state: {0}")]
    InvalidState(String),

    #[error("need at least {need} players to start, have {have}")]
    InsufficientPlayers { have: usize, need: usize },

    /// The configuration has nothing to draw from.
    #[error("no {0} configured")]
    EmptyPool(&'static str),
}

impl GameError {
    /// The category reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Room(err) => err.kind(),
            Self::RoomNotFound(_) | Self::PlayerNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::InsufficientPlayers { .. } => ErrorKind::InsufficientPlayers,
            Self::EmptyPool(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partyroom_protocol::RoomCode;

    #[test]
    fn test_kind_room_error_passes_through() {
        let err = GameError::from(RoomError::RoomFull(RoomCode::new("ABCDEF")));
        assert_eq!(err.kind(), ErrorKind::RoomFull);
        assert_eq!(err.to_string(), "room ABCDEF is full");
    }

    #[test]
    fn test_kind_insufficient_players() {
        let err = GameError::InsufficientPlayers { have: 2, need: 3 };
        assert_eq!(err.kind(), ErrorKind::InsufficientPlayers);
        assert_eq!(err.to_string(), "need at least 3 players to start, have 2");
    }

    #[test]
    fn test_kind_empty_pool_internal() {
        let err = GameError::EmptyPool("word sets");
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.to_string(), "no word sets configured");
    }
}
