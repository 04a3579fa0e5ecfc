//! `PartyServer` builder and server loop.
//!
//! This is the entry point for running a Partyroom server. It ties
//! together all the layers: transport → protocol → dispatch → room/game.

use std::sync::Arc;
use std::time::Duration;

use partyroom_game::{GameConfig, GameLogStore, MemoryGameLogStore};
use partyroom_protocol::{Codec, JsonCodec, unix_millis};
use partyroom_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::handler::handle_connection;
use crate::{ConnectionHub, Dispatcher, PartyError, ServerConfig};

/// What every connection task holds an `Arc` of.
///
/// All room and game state sits behind the one dispatcher lock; the hub
/// has its own, so writers never wait on game logic.
pub(crate) struct ServerState<S: GameLogStore, C: Codec> {
    pub(crate) dispatcher: Mutex<Dispatcher<S>>,
    pub(crate) hub: Arc<ConnectionHub>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Partyroom server.
///
/// # Example
///
/// ```rust,no_run
/// use partyroom::prelude::*;
///
/// # async fn run() -> Result<(), PartyError> {
/// let server = PartyServer::builder()
///     .bind("0.0.0.0:4000")
///     .require_rejoin_token(true)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PartyServerBuilder<S: GameLogStore = MemoryGameLogStore> {
    config: ServerConfig,
    logs: S,
}

impl PartyServerBuilder {
    /// Default [`ServerConfig`], in-memory game logs.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            logs: MemoryGameLogStore::default(),
        }
    }
}

impl Default for PartyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GameLogStore> PartyServerBuilder<S> {
    /// Listener address, `"127.0.0.1:4000"` unless set.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the game rules.
    pub fn game_config(mut self, game: GameConfig) -> Self {
        self.config.game = game;
        self
    }

    pub fn max_room_size(mut self, max: usize) -> Self {
        self.config.max_room_size = max;
        self
    }

    pub fn max_nickname_len(mut self, max: usize) -> Self {
        self.config.max_nickname_len = max;
        self
    }

    pub fn require_rejoin_token(mut self, required: bool) -> Self {
        self.config.require_rejoin_token = required;
        self
    }

    pub fn sweep_interval(mut self, every: Duration) -> Self {
        self.config.sweep_interval = every;
        self
    }

    /// Sends finished-game logs to `logs` instead.
    pub fn log_store<T: GameLogStore>(self, logs: T) -> PartyServerBuilder<T> {
        PartyServerBuilder {
            config: self.config,
            logs,
        }
    }

    /// Binds the listener and assembles the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<PartyServer<S, JsonCodec>, PartyError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let hub = Arc::new(ConnectionHub::new());
        let logs = Arc::new(self.logs);

        let state = Arc::new(ServerState {
            dispatcher: Mutex::new(Dispatcher::new(
                self.config.clone(),
                Arc::clone(&hub),
                Arc::clone(&logs),
            )),
            hub,
            codec: JsonCodec,
        });

        Ok(PartyServer {
            transport,
            state,
            logs,
            config: self.config,
        })
    }
}

/// A bound Partyroom server. Nothing is accepted until
/// [`run()`](Self::run).
pub struct PartyServer<S: GameLogStore, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, C>>,
    logs: Arc<S>,
    config: ServerConfig,
}

impl PartyServer<MemoryGameLogStore, JsonCodec> {
    pub fn builder() -> PartyServerBuilder {
        PartyServerBuilder::new()
    }
}

impl<S, C> PartyServer<S, C>
where
    S: GameLogStore,
    C: Codec,
{
    /// The bound address. Tests bind port 0 and read the real one here.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The store finished games are saved to.
    pub fn log_store(&self) -> Arc<S> {
        Arc::clone(&self.logs)
    }

    /// Accepts connections forever, one handler task each.
    ///
    /// When phase deadlines are configured a sweep task runs alongside.
    /// A failed accept or handshake is logged and skipped.
    pub async fn run(mut self) -> Result<(), PartyError> {
        tracing::info!(addr = %self.config.bind_addr, "Partyroom server running");

        if self.config.game.discussion_secs.is_some() {
            tokio::spawn(sweep_phases(
                Arc::clone(&self.state),
                self.config.sweep_interval,
            ));
        }

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(handle_connection(conn, state));
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Periodically opens voting in rooms whose deadline has passed.
async fn sweep_phases<S: GameLogStore, C: Codec>(
    state: Arc<ServerState<S, C>>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let advanced = state.dispatcher.lock().await.sweep(unix_millis());
        if advanced > 0 {
            tracing::debug!(advanced, "phase sweep");
        }
    }
}
