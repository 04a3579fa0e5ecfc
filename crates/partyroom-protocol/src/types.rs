//! Identity types and the small enums every layer shares.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Builds an id from 16 random bytes (a version-4 UUID).
            ///
            /// Callers supply the bytes so that id generation follows
            /// whatever random source they were given.
            pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
                Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

uuid_id!(
    /// Stable identity of a player. Assigned once at create/join and kept
    /// across reconnects; the only safe long-lived key for a player.
    PlayerId
);

uuid_id!(
    /// Internal identity of a room. Unlike the [`RoomCode`], it is never
    /// shown to humans and never re-derived.
    RoomId
);

uuid_id!(
    /// Identity of a mafia-mode mission.
    MissionId
);

/// The short, human-typeable key of a room.
///
/// Always upper-case: anything parsed or deserialized into a `RoomCode`
/// is trimmed and case-normalized, so `"ab12cd"` and `"AB12CD"` name the
/// same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of characters in a generated code.
    pub const LEN: usize = 6;

    /// Characters a generated code is drawn from.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Normalizes user input into a code.
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoomCode {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game vocabulary
// ---------------------------------------------------------------------------

/// Which of the two party games a room plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    /// Hidden mafia among citizens, with per-player missions.
    #[serde(rename = "active-mafia")]
    ActiveMafia,
    /// One liar who does not know (or is misled about) the secret word.
    #[serde(rename = "custom-liar")]
    CustomLiar,
}

/// Sub-mode of the liar game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LiarMode {
    /// The liar gets no word at all.
    #[default]
    Classic,
    /// The liar gets a decoy word and may not realize they are the liar.
    Fool,
}

/// Lifecycle state of a room.
///
/// ```text
/// waiting → night | day → discussion → voting → ended
/// ```
///
/// `game:restart` brings any state back to `waiting` before starting over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    Waiting,
    Night,
    Day,
    Discussion,
    Voting,
    Ended,
}

impl RoomState {
    /// Returns `true` while a game is running (anything but `waiting` and
    /// `ended`).
    pub fn is_in_game(self) -> bool {
        !matches!(self, Self::Waiting | Self::Ended)
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Night => "night",
            Self::Day => "day",
            Self::Discussion => "discussion",
            Self::Voting => "voting",
            Self::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// Day/night phase shown to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Day,
    Night,
}

/// A player's role. `Hidden` is both the value before assignment and the
/// value every observer sees in broadcasts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Mafia,
    Liar,
    #[default]
    Hidden,
}

/// Terminal outcome of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameResult {
    CitizenWin,
    MafiaWin,
    LiarWin,
    Draw,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CitizenWin => "citizen-win",
            Self::MafiaWin => "mafia-win",
            Self::LiarWin => "liar-win",
            Self::Draw => "draw",
        };
        f.write_str(s)
    }
}

/// Whether a mission asks a player to say something or do something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionKind {
    Question,
    Action,
}

/// Milliseconds since the Unix epoch, the timestamp unit on the wire.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_normalizes_case_and_whitespace() {
        assert_eq!(RoomCode::new("  ab12cd ").as_str(), "AB12CD");
    }

    #[test]
    fn test_room_code_deserialize_normalizes() {
        let code: RoomCode = serde_json::from_str("\"xy9zq1\"").unwrap();
        assert_eq!(code, RoomCode::new("XY9ZQ1"));
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"XY9ZQ1\"");
    }

    #[test]
    fn test_player_id_serializes_as_plain_uuid_string() {
        let id = PlayerId::from_random_bytes([7; 16]);
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.0.to_string()));
    }

    #[test]
    fn test_ids_from_same_bytes_are_equal() {
        assert_eq!(
            RoomId::from_random_bytes([1; 16]),
            RoomId::from_random_bytes([1; 16])
        );
        assert_ne!(
            RoomId::from_random_bytes([1; 16]),
            RoomId::from_random_bytes([2; 16])
        );
    }

    #[test]
    fn test_game_mode_uses_kebab_names() {
        assert_eq!(
            serde_json::to_string(&GameMode::ActiveMafia).unwrap(),
            "\"active-mafia\""
        );
        let mode: GameMode = serde_json::from_str("\"custom-liar\"").unwrap();
        assert_eq!(mode, GameMode::CustomLiar);
    }

    #[test]
    fn test_room_state_is_in_game() {
        assert!(!RoomState::Waiting.is_in_game());
        assert!(RoomState::Night.is_in_game());
        assert!(RoomState::Day.is_in_game());
        assert!(RoomState::Discussion.is_in_game());
        assert!(RoomState::Voting.is_in_game());
        assert!(!RoomState::Ended.is_in_game());
    }

    #[test]
    fn test_role_default_is_hidden() {
        assert_eq!(Role::default(), Role::Hidden);
    }

    #[test]
    fn test_game_result_display_matches_wire_name() {
        for result in [
            GameResult::CitizenWin,
            GameResult::MafiaWin,
            GameResult::LiarWin,
            GameResult::Draw,
        ] {
            let wire = serde_json::to_value(result).unwrap();
            assert_eq!(wire, serde_json::Value::String(result.to_string()));
        }
    }
}
