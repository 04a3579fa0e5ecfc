//! Per-connection handler: decode requests, dispatch, acknowledge.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's hub queue. The flow is:
//!   1. Register with the hub → spawn the writer
//!   2. Loop: receive a frame → decode `Request` → dispatch → queue the reply
//!   3. On exit the guard runs disconnect cleanup

use std::sync::Arc;

use partyroom_game::GameLogStore;
use partyroom_protocol::{
    Codec, ConnectionId, ErrorKind, Outbound, Reply, Request, RequestHeader,
    Response,
};
use partyroom_transport::{
    FrameReceiver, FrameSender, WebSocketConnection, WebSocketSender,
};
use tokio::sync::mpsc;

use crate::server::ServerState;

/// Drop guard that unregisters the connection from the hub and hands it to
/// [`Dispatcher::disconnect`](crate::Dispatcher::disconnect) when the
/// handler exits.
///
/// Runs even if the handler panics. `Drop` is synchronous, so the async
/// lock is taken in a spawned task.
struct DisconnectGuard<S: GameLogStore, C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<S, C>>,
}

impl<S: GameLogStore, C: Codec> Drop for DisconnectGuard<S, C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        state.hub.unregister(conn_id);
        tokio::spawn(async move {
            let mut dispatcher = state.dispatcher.lock().await;
            dispatcher.disconnect(conn_id);
        });
    }
}

/// Serves one connection until the peer goes away or the socket fails.
pub(crate) async fn handle_connection<S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, C>>,
) where
    S: GameLogStore,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (sender, mut receiver) = conn.split();
    let outbox = state.hub.register(conn_id);
    let _guard = DisconnectGuard {
        conn_id,
        state: Arc::clone(&state),
    };
    tokio::spawn(write_frames(conn_id, sender, outbox, Arc::clone(&state)));

    loop {
        let text = match receiver.recv_text().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let request: Request = match state.codec.decode(&text) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to decode request");
                let header: RequestHeader =
                    state.codec.decode(&text).unwrap_or_default();
                if let Some(ack) = header.ack {
                    send_error(&state, conn_id, ack, ErrorKind::BadRequest, &e.to_string());
                }
                continue;
            }
        };

        let event = request.event.name();
        tracing::debug!(%conn_id, event, ack = ?request.ack, "request");
        let result = {
            let mut dispatcher = state.dispatcher.lock().await;
            dispatcher.handle(conn_id, request.event).await
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%conn_id, event, error = %e, "request failed");
                Response::Failure {
                    error: e.to_string(),
                    code: e.kind(),
                }
            }
        };
        if let Some(ack) = request.ack {
            state.hub.send(conn_id, Reply { ack, response }.into());
        }
    }

    // _guard drops here → hub unregister + room cleanup.
}

/// Drains a connection's queue onto the socket until the queue closes or
/// the socket fails.
async fn write_frames<S, C>(
    conn_id: ConnectionId,
    mut sender: WebSocketSender,
    mut outbox: mpsc::UnboundedReceiver<Outbound>,
    state: Arc<ServerState<S, C>>,
) where
    S: GameLogStore,
    C: Codec,
{
    while let Some(frame) = outbox.recv().await {
        let text = match state.codec.encode(&frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(%conn_id, error = %e, "failed to encode frame");
                continue;
            }
        };
        if let Err(e) = sender.send_text(text).await {
            tracing::debug!(%conn_id, error = %e, "send failed");
            break;
        }
    }
    let _ = sender.close().await;
    tracing::debug!(%conn_id, "writer finished");
}

fn send_error<S: GameLogStore, C: Codec>(
    state: &ServerState<S, C>,
    conn_id: ConnectionId,
    ack: u64,
    code: ErrorKind,
    message: &str,
) {
    let reply = Reply {
        ack,
        response: Response::Failure {
            error: message.to_string(),
            code,
        },
    };
    state.hub.send(conn_id, reply.into());
}
