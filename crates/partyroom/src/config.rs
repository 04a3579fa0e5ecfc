//! Server configuration.

use std::time::Duration;

use partyroom_game::GameConfig;

/// Settings for a [`PartyServer`](crate::PartyServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Rules every game on this server follows.
    pub game: GameConfig,

    /// Largest `maxPlayers` accepted on `room:create`.
    pub max_room_size: usize,

    /// Longest nickname accepted, in characters.
    pub max_nickname_len: usize,

    /// Whether `room:rejoin` must carry the seat's rejoin token. When
    /// `false`, a nickname alone reclaims a seat.
    pub require_rejoin_token: bool,

    /// How often phase deadlines are checked. Only used when
    /// [`GameConfig::discussion_secs`] is set.
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".to_string(),
            game: GameConfig::default(),
            max_room_size: 12,
            max_nickname_len: 20,
            require_rejoin_token: false,
            sweep_interval: Duration::from_secs(1),
        }
    }
}
