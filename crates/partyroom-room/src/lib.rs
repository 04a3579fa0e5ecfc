//! Room registry for Partyroom.
//!
//! The registry is the only thing allowed to create, destroy, or change
//! the membership of a room. It keeps two indexes in step on every
//! mutation:
//!
//! - room code → [`Room`]
//! - connection → room code
//!
//! Game rules live elsewhere; they read rooms through lookups and commit
//! their results back through [`RoomRegistry::update`].
//!
//! # Key types
//!
//! - [`RoomRegistry`]: create/join/rejoin/leave/lookup/update
//! - [`Room`] / [`Player`]: the authoritative state
//! - [`RoomUpdate`] / [`PlayerPatch`]: partial changes to commit
//! - [`Departure`]: what a leave actually did

mod error;
mod registry;
mod room;

pub use error::RoomError;
pub use registry::{Departure, RoomRegistry};
pub use room::{Player, PlayerPatch, Room, RoomUpdate};
