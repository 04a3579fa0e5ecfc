//! Shared vocabulary for Partyroom.
//!
//! - **Types**: ids ([`PlayerId`], [`RoomId`], [`MissionId`],
//!   [`RoomCode`]) and the game enums every layer agrees on.
//! - **Views**: the masked [`RoomView`] and the
//!   per-player private payloads, everything that leaves the server.
//! - **Events**: inbound [`Request`]s and outbound [`Outbound`] frames.
//! - **Codec**: [`Codec`] / [`JsonCodec`].
//!
//! ```text
//! Transport (text frames) → Protocol (Request / Outbound) → Room / Game
//! ```

mod codec;
mod error;
mod events;
mod types;
mod view;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use events::{
    CastVote, ClientEvent, ConfirmMission, CreateRoom, ErrorKind, GameEnd,
    JoinRoom, LeaveRoom, Outbound, PhaseChange, RejoinRoom, Reply, Request,
    RequestHeader, Response, ServerEvent, StartGame,
};
pub use partyroom_transport::ConnectionId;
pub use types::{
    GameMode, GameResult, LiarMode, MissionId, MissionKind, Phase, PlayerId,
    Role, RoomCode, RoomId, RoomState, unix_millis,
};
pub use view::{
    HealthReport, Mission, MissionAssignment, PlayerView, RoomView, SelfInfo,
    WordPayload,
};
