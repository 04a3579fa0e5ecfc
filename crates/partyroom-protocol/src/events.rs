//! Session events: what clients send, what the server answers, and what it
//! pushes unprompted.
//!
//! ```text
//! client → server   {"ack": 4, "event": {"type": "room:join", "data": {...}}}
//! server → client   {"ack": 4, "response": {"room": {...}, "self": {...}}}
//! server → client   {"type": "room:state-update", "data": {...}}
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    GameMode, GameResult, HealthReport, LiarMode, MissionAssignment,
    MissionId, PlayerId, RoomCode, RoomId, RoomState, RoomView, SelfInfo,
    WordPayload,
};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// One inbound frame. `ack` is echoed back on the reply; requests without
/// an `ack` are processed but not answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub ack: Option<u64>,
    pub event: ClientEvent,
}

/// Just the `ack` of an inbound frame.
///
/// Lets the server answer a request whose event failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestHeader {
    #[serde(default)]
    pub ack: Option<u64>,
}

/// Everything a client can ask of the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "room:create")]
    CreateRoom(CreateRoom),
    #[serde(rename = "room:join")]
    JoinRoom(JoinRoom),
    #[serde(rename = "room:rejoin")]
    RejoinRoom(RejoinRoom),
    #[serde(rename = "room:leave")]
    LeaveRoom(LeaveRoom),
    #[serde(rename = "game:start")]
    StartGame(StartGame),
    #[serde(rename = "game:restart")]
    RestartGame(StartGame),
    #[serde(rename = "game:mission-confirm")]
    ConfirmMission(ConfirmMission),
    #[serde(rename = "game:vote")]
    Vote(CastVote),
    #[serde(rename = "health")]
    Health,
}

impl ClientEvent {
    /// The wire name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom(_) => "room:create",
            Self::JoinRoom(_) => "room:join",
            Self::RejoinRoom(_) => "room:rejoin",
            Self::LeaveRoom(_) => "room:leave",
            Self::StartGame(_) => "game:start",
            Self::RestartGame(_) => "game:restart",
            Self::ConfirmMission(_) => "game:mission-confirm",
            Self::Vote(_) => "game:vote",
            Self::Health => "health",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    pub nickname: String,
    pub game_mode: GameMode,
    pub max_players: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoom {
    pub code: RoomCode,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejoinRoom {
    pub code: RoomCode,
    pub nickname: String,
    /// The `rejoinToken` handed out at create/join.
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRoom {
    pub room_id: RoomId,
}

/// Payload of both `game:start` and `game:restart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGame {
    pub room_id: RoomId,
    /// Liar sub-mode; ignored by mafia rooms. Defaults to classic.
    #[serde(default)]
    pub mode: Option<LiarMode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmMission {
    pub mission_id: MissionId,
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVote {
    pub room_id: RoomId,
    pub voter_id: PlayerId,
    pub target_id: PlayerId,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Machine-readable error category carried next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    RoomFull,
    InsufficientPlayers,
    BadRequest,
    Internal,
}

/// The acknowledgement body for one request.
///
/// Untagged: clients tell variants apart by their keys (`error`, `code` +
/// `room`, `room`, `status`, `success`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Failure {
        error: String,
        code: ErrorKind,
    },
    Created {
        code: RoomCode,
        room: RoomView,
        #[serde(rename = "self")]
        me: SelfInfo,
    },
    Joined {
        room: RoomView,
        #[serde(rename = "self")]
        me: SelfInfo,
    },
    Health(HealthReport),
    Success {
        success: bool,
    },
}

impl Response {
    pub fn success() -> Self {
        Self::Success { success: true }
    }
}

/// A reply to the request carrying the same `ack`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub ack: u64,
    pub response: Response,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseChange {
    pub room_id: RoomId,
    pub phase: RoomState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEnd {
    pub room_id: RoomId,
    pub result: GameResult,
}

/// Notifications the server pushes to a room or to a single connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    /// Masked room snapshot, to the whole room.
    #[serde(rename = "room:state-update")]
    RoomStateUpdate(RoomView),
    #[serde(rename = "game:phase-change")]
    PhaseChange(PhaseChange),
    /// Mafia mode, unicast.
    #[serde(rename = "game:mission-assign")]
    MissionAssign(MissionAssignment),
    /// Liar mode, unicast.
    #[serde(rename = "game:word")]
    Word(WordPayload),
    #[serde(rename = "game:end")]
    GameEnd(GameEnd),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomStateUpdate(_) => "room:state-update",
            Self::PhaseChange(_) => "game:phase-change",
            Self::MissionAssign(_) => "game:mission-assign",
            Self::Word(_) => "game:word",
            Self::GameEnd(_) => "game:end",
        }
    }
}

/// Anything written to a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outbound {
    Reply(Reply),
    Event(ServerEvent),
}

impl From<ServerEvent> for Outbound {
    fn from(event: ServerEvent) -> Self {
        Self::Event(event)
    }
}

impl From<Reply> for Outbound {
    fn from(reply: Reply) -> Self {
        Self::Reply(reply)
    }
}
