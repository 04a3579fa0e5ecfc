//! Game coordination for Partyroom.
//!
//! The coordinator never owns a player list. It reads rooms from the
//! [`RoomRegistry`](partyroom_room::RoomRegistry), computes roles, private
//! payloads, vote tallies and outcomes, commits the result back through
//! the registry, and announces it through a [`Broadcaster`].
//!
//! # Key types
//!
//! - [`GameCoordinator`]: start/restart, mission confirmation, voting
//! - [`Broadcaster`]: outbound capability: one connection or a whole room
//! - [`GameConfig`]: word sets, mission templates, player minimum
//! - [`GameLog`] / [`GameLogStore`]: finished-game records

mod broadcast;
mod config;
mod coordinator;
mod error;
mod log;
mod vote;

pub use broadcast::Broadcaster;
pub use config::{GameConfig, MissionTemplate, WordSet};
pub use coordinator::{GameCoordinator, PrivateInfo, VoteOutcome};
pub use error::GameError;
pub use log::{GameLog, GameLogPlayer, GameLogStore, MemoryGameLogStore};
pub use vote::VoteLedger;
