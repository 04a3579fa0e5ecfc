//! Transport layer for Partyroom.
//!
//! Accepts WebSocket connections and hands each one out as a pair of
//! independent halves: a [`FrameSender`] that a writer task owns and a
//! [`FrameReceiver`] the connection handler reads from. Splitting keeps a
//! slow reader from ever blocking outbound broadcasts.
//!
//! Frames are UTF-8 text. Binary frames are accepted on receive as long as
//! they decode as UTF-8.

#![allow(async_fn_in_trait)]

mod error;
mod websocket;

pub use error::TransportError;
pub use websocket::{
    WebSocketConnection, WebSocketReceiver, WebSocketSender,
    WebSocketTransport,
};

use std::fmt;

/// Identifies one accepted connection for its whole lifetime.
///
/// Ids are handed out by the transport that accepted the connection and
/// are never reused by that transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The accept sequence number.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener that yields connections one at a time.
pub trait Transport: Send + 'static {
    type Connection: Send + 'static;

    /// Resolves once a peer has connected and finished any handshake.
    async fn accept(&mut self) -> Result<Self::Connection, TransportError>;

    /// Where the listener is bound; useful after binding port 0.
    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr>;
}

/// The write half of a connection.
pub trait FrameSender: Send + 'static {
    /// Sends one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Sends a close frame and flushes.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// The read half of a connection.
pub trait FrameReceiver: Send + 'static {
    /// Receives the next text frame.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly.
    async fn recv_text(&mut self) -> Result<Option<String>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_orders_by_accept_sequence() {
        let mut ids = vec![ConnectionId::new(3), ConnectionId::new(1)];
        ids.sort();
        assert_eq!(ids, vec![ConnectionId::new(1), ConnectionId::new(3)]);
    }
}
