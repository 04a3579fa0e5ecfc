//! Error types for the room layer.

use partyroom_protocol::{ErrorKind, PlayerId, RoomCode};

/// Errors that can occur during registry operations.
///
/// A failed operation never leaves a partial change behind.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room with this code or id.
    #[error("room {0} not found")]
    NotFound(String),

    /// No player in the room matches.
    #[error("player {0} not found")]
    PlayerNotFound(String),

    /// The room is in a state that doesn't allow this operation, or the
    /// connection already belongs to another room.
    #[error("invalid room state: {0}")]
    InvalidState(String),

    /// The room already holds `maxPlayers` players.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The rejoin token does not belong to the player being claimed.
    #[error("rejoin token does not match player {0}")]
    TokenMismatch(PlayerId),

    /// Every attempt to draw an unused room code collided.
    #[error("no free room code after {0} attempts")]
    CodeSpaceExhausted(usize),
}

impl RoomError {
    /// The category reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::PlayerNotFound(_) => ErrorKind::NotFound,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::RoomFull(_) => ErrorKind::RoomFull,
            Self::TokenMismatch(_) => ErrorKind::BadRequest,
            Self::CodeSpaceExhausted(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_maps_every_variant() {
        assert_eq!(RoomError::NotFound("X".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            RoomError::PlayerNotFound("mina".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            RoomError::InvalidState("started".into()).kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            RoomError::RoomFull(RoomCode::new("ABCDEF")).kind(),
            ErrorKind::RoomFull
        );
        assert_eq!(
            RoomError::CodeSpaceExhausted(64).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_display_names_the_room() {
        let err = RoomError::RoomFull(RoomCode::new("abcdef"));
        assert_eq!(err.to_string(), "room ABCDEF is full");
    }
}
