//! Connection hub: where outbound frames are queued per connection.
//!
//! Each live connection registers an unbounded channel whose receiving end
//! is drained by that connection's writer task. Game code never waits on
//! a socket; it drops frames into the hub and moves on.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use partyroom_game::Broadcaster;
use partyroom_protocol::{ConnectionId, Outbound, ServerEvent};
use tokio::sync::mpsc;

/// Routes outbound frames to live connections.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    peers: Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the queue its writer drains.
    ///
    /// Registering an id twice replaces the earlier queue.
    pub fn register(
        &self,
        conn: ConnectionId,
    ) -> mpsc::UnboundedReceiver<Outbound> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers().insert(conn, tx);
        rx
    }

    /// Drops a connection's queue; its writer sees the channel close.
    pub fn unregister(&self, conn: ConnectionId) {
        self.peers().remove(&conn);
    }

    /// Queues a frame. Returns `false` if the connection is gone.
    pub fn send(&self, conn: ConnectionId, frame: Outbound) -> bool {
        let mut peers = self.peers();
        let Some(tx) = peers.get(&conn) else {
            return false;
        };
        if tx.send(frame).is_ok() {
            return true;
        }
        // Writer already exited.
        peers.remove(&conn);
        false
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.peers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn peers(
        &self,
    ) -> MutexGuard<'_, HashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>>
    {
        // A panic while holding the lock cannot leave the map half-updated.
        self.peers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Broadcaster for ConnectionHub {
    fn to_connection(&self, conn: ConnectionId, event: ServerEvent) {
        let name = event.name();
        if !self.send(conn, event.into()) {
            tracing::debug!(%conn, event = name, "dropped event for gone connection");
        }
    }
}
