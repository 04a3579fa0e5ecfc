//! Payload shapes that leave the server.
//!
//! [`RoomView`] is what the whole room sees: it carries no connection
//! identifiers and every role reads `hidden`. The per-player payloads
//! ([`WordPayload`], [`MissionAssignment`]) are only ever unicast to the
//! player they belong to.

use serde::{Deserialize, Serialize};

use crate::{
    GameMode, LiarMode, MissionId, MissionKind, Phase, PlayerId, Role,
    RoomCode, RoomId, RoomState,
};

/// One player as observed by the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub nickname: String,
    pub role: Role,
    pub alive: bool,
    pub points: u32,
    pub confirmed_missions: u32,
    /// `false` while the seat waits for its owner to rejoin.
    pub connected: bool,
}

/// A room as broadcast in `room:state-update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: RoomId,
    pub code: RoomCode,
    pub host: PlayerId,
    pub game_mode: GameMode,
    pub state: RoomState,
    pub players: Vec<PlayerView>,
    pub max_players: usize,
    pub created_at: u64,
    pub current_phase: Phase,
    pub phase_end_time: Option<u64>,
}

/// The liar game's private payload (`game:word`).
///
/// `word` is `None` only for the liar in [`LiarMode::Classic`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPayload {
    pub word: Option<String>,
    pub topic: String,
    pub mode: LiarMode,
}

/// A mafia-mode mission owned by one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: MissionId,
    pub player_id: PlayerId,
    pub mission_text: String,
    #[serde(rename = "type")]
    pub kind: MissionKind,
    pub target_player_id: Option<PlayerId>,
    pub completed: bool,
    pub confirmed_by: Option<PlayerId>,
    pub created_at: u64,
}

/// The mafia game's private payload (`game:mission-assign`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionAssignment {
    pub player_id: PlayerId,
    pub role: Role,
    pub mission: Mission,
}

/// Who the caller is, returned with create/join/rejoin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfInfo {
    pub player_id: PlayerId,
    /// Secret presented on `room:rejoin` to prove seat ownership.
    pub rejoin_token: String,
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub timestamp: u64,
    pub active_rooms: usize,
}
