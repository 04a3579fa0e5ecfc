//! The outbound capability the coordinator is handed.

use std::sync::Arc;

use partyroom_protocol::{ConnectionId, ServerEvent};
use partyroom_room::Room;

/// Delivers server events to connections.
///
/// Delivery is fire-and-forget: a connection that has gone away simply
/// misses the event.
pub trait Broadcaster {
    /// Sends to one connection only.
    fn to_connection(&self, conn: ConnectionId, event: ServerEvent);

    /// Sends to every member's current connection.
    fn to_room(&self, room: &Room, event: ServerEvent) {
        for conn in room.connections() {
            self.to_connection(conn, event.clone());
        }
    }

    /// Sends the masked `room:state-update` snapshot to the room.
    fn room_state(&self, room: &Room) {
        self.to_room(room, ServerEvent::RoomStateUpdate(room.masked()));
    }
}

impl<B: Broadcaster + ?Sized> Broadcaster for Arc<B> {
    fn to_connection(&self, conn: ConnectionId, event: ServerEvent) {
        (**self).to_connection(conn, event);
    }

    fn to_room(&self, room: &Room, event: ServerEvent) {
        (**self).to_room(room, event);
    }
}
