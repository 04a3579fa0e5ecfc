//! # Partyroom
//!
//! Real-time room server for hidden-role party games.
//!
//! Players connect over WebSocket, gather in a room behind a six-character
//! code, and the host starts either a mafia game (hidden mafia, per-player
//! missions) or a liar game (everyone but the liar knows the word). The
//! server deals roles and private payloads, tallies votes and announces
//! the outcome.
//!
//! ```text
//! transport → protocol → Dispatcher ─┬→ RoomRegistry
//!                                    └→ GameCoordinator → ConnectionHub
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use partyroom::prelude::*;
//!
//! # async fn run() -> Result<(), PartyError> {
//! let server = PartyServer::builder()
//!     .bind("0.0.0.0:4000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod dispatch;
mod error;
mod handler;
mod hub;
mod server;

pub use config::ServerConfig;
pub use dispatch::Dispatcher;
pub use error::PartyError;
pub use hub::ConnectionHub;
pub use server::{PartyServer, PartyServerBuilder};

/// Everything needed to run a server and talk to it.
pub mod prelude {
    pub use crate::{
        ConnectionHub, Dispatcher, PartyError, PartyServer,
        PartyServerBuilder, ServerConfig,
    };
    pub use partyroom_game::{
        GameConfig, GameLog, GameLogStore, MemoryGameLogStore,
        MissionTemplate, WordSet,
    };
    pub use partyroom_protocol::{
        ClientEvent, Codec, ErrorKind, GameMode, GameResult, JsonCodec,
        LiarMode, Outbound, Request, Response, Role, RoomCode, RoomState,
        ServerEvent,
    };
}
