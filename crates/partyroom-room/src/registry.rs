//! The room registry: sole owner of room existence and membership.

use std::collections::HashMap;

use partyroom_protocol::{
    ConnectionId, CreateRoom, Phase, PlayerId, RoomCode, RoomId, RoomState,
    unix_millis,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{Player, Room, RoomError, RoomUpdate};

/// How many codes to draw before giving up on finding a free one.
const MAX_CODE_ATTEMPTS: usize = 64;

/// What a leave or disconnect did to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// No such room, or the connection was not in it. Nothing changed.
    Absent,
    /// The player left and the room lives on.
    Left { room_id: RoomId, player: Player },
    /// The connection dropped mid-game. The seat is held for a rejoin.
    Detached { room_id: RoomId, player_id: PlayerId },
    /// The last player left and the room was destroyed.
    Closed {
        room_id: RoomId,
        code: RoomCode,
        player: Player,
    },
}

impl Departure {
    /// The room that lost a player, if any did.
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            Self::Absent => None,
            Self::Left { room_id, .. }
            | Self::Detached { room_id, .. }
            | Self::Closed { room_id, .. } => Some(*room_id),
        }
    }
}

/// All active rooms plus the indexes that reach them.
///
/// A connection belongs to at most one room at a time. A room with no
/// players does not exist.
///
/// `R` supplies codes, ids and rejoin tokens; tests pass a seeded
/// [`StdRng`] to get reproducible rooms.
pub struct RoomRegistry<R: Rng = StdRng> {
    rooms: HashMap<RoomCode, Room>,

    /// Room id → code, so a held id survives any code lookup.
    codes_by_id: HashMap<RoomId, RoomCode>,

    /// Connection → code of the room it currently sits in.
    connections: HashMap<ConnectionId, RoomCode>,

    rng: R,
}

impl RoomRegistry<StdRng> {
    /// Creates an empty registry seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl Default for RoomRegistry<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RoomRegistry<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rooms: HashMap::new(),
            codes_by_id: HashMap::new(),
            connections: HashMap::new(),
            rng,
        }
    }

    /// Creates a room in `waiting` with `conn` as its only player and host.
    ///
    /// # Errors
    /// - [`RoomError::InvalidState`] if `conn` already sits in a room
    /// - [`RoomError::CodeSpaceExhausted`] if no unused code could be drawn
    pub fn create_room(
        &mut self,
        conn: ConnectionId,
        params: CreateRoom,
    ) -> Result<&Room, RoomError> {
        if let Some(current) = self.connections.get(&conn) {
            return Err(RoomError::InvalidState(format!(
                "{conn} is already in room {current}"
            )));
        }

        let code = self.unused_code()?;
        let host = Player::new(
            new_player_id(&mut self.rng),
            conn,
            params.nickname,
            new_token(&mut self.rng),
        );
        let room = Room {
            id: RoomId::from_random_bytes(self.rng.random()),
            code: code.clone(),
            host: host.id,
            game_mode: params.game_mode,
            state: RoomState::Waiting,
            players: vec![host],
            max_players: params.max_players,
            created_at: unix_millis(),
            current_phase: Phase::Night,
            phase_end_time: None,
        };

        tracing::info!(
            %code,
            room_id = %room.id,
            %conn,
            game_mode = ?room.game_mode,
            "room created"
        );
        self.codes_by_id.insert(room.id, code.clone());
        self.connections.insert(conn, code.clone());
        Ok(&*self.rooms.entry(code).or_insert(room))
    }

    /// Adds a new player to a waiting room.
    ///
    /// Joining again from a connection that is already in the room returns
    /// the room unchanged.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`]: no room with this code
    /// - [`RoomError::InvalidState`]: the game has started, or `conn`
    ///   sits in a different room
    /// - [`RoomError::RoomFull`]: `maxPlayers` reached
    pub fn join_room(
        &mut self,
        code: &RoomCode,
        conn: ConnectionId,
        nickname: String,
    ) -> Result<&Room, RoomError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;

        if room.state != RoomState::Waiting {
            return Err(RoomError::InvalidState(format!(
                "room {code} is {}, not waiting",
                room.state
            )));
        }
        if room.player_by_connection(conn).is_some() {
            tracing::debug!(%code, %conn, "duplicate join ignored");
            return Ok(&*room);
        }
        if let Some(current) = self.connections.get(&conn) {
            return Err(RoomError::InvalidState(format!(
                "{conn} is already in room {current}"
            )));
        }
        if room.is_full() {
            return Err(RoomError::RoomFull(code.clone()));
        }

        let player = Player::new(
            new_player_id(&mut self.rng),
            conn,
            nickname,
            new_token(&mut self.rng),
        );
        tracing::info!(
            %code,
            player_id = %player.id,
            nickname = %player.nickname,
            %conn,
            "player joined"
        );
        room.players.push(player);
        self.connections.insert(conn, code.clone());
        Ok(&*room)
    }

    /// Hands an existing seat, matched by nickname, to a new connection.
    ///
    /// Id, role, points, alive flag and confirmed missions are kept; only
    /// the connection changes. When `token` is given it must equal the
    /// seat's rejoin token.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] / [`RoomError::PlayerNotFound`]
    /// - [`RoomError::TokenMismatch`]: wrong token for the seat
    /// - [`RoomError::InvalidState`]: `conn` already holds another seat
    pub fn rejoin_room(
        &mut self,
        code: &RoomCode,
        conn: ConnectionId,
        nickname: &str,
        token: Option<&str>,
    ) -> Result<(&Room, PlayerId), RoomError> {
        if let Some(current) = self.connections.get(&conn) {
            if current != code {
                return Err(RoomError::InvalidState(format!(
                    "{conn} is already in room {current}"
                )));
            }
        }

        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;
        let index = room
            .players
            .iter()
            .position(|p| p.nickname == nickname)
            .ok_or_else(|| RoomError::PlayerNotFound(nickname.to_owned()))?;
        let player_id = room.players[index].id;

        if let Some(token) = token {
            if token != room.players[index].rejoin_token {
                tracing::warn!(%code, %player_id, %conn, "rejoin token mismatch");
                return Err(RoomError::TokenMismatch(player_id));
            }
        }
        if let Some(holder) = room.player_by_connection(conn) {
            if holder.id != player_id {
                return Err(RoomError::InvalidState(format!(
                    "{conn} already holds another seat in room {code}"
                )));
            }
        }

        let seat = &mut room.players[index];
        let previous = std::mem::replace(&mut seat.connection, conn);
        seat.connected = true;
        if previous != conn && self.connections.get(&previous) == Some(code) {
            self.connections.remove(&previous);
        }
        self.connections.insert(conn, code.clone());

        tracing::info!(
            %code,
            %player_id,
            from = %previous,
            to = %conn,
            "player rejoined"
        );
        Ok((&*room, player_id))
    }

    /// Removes the player on `conn` from the room.
    ///
    /// Destroys the room when it empties. If the host leaves, the first
    /// remaining player becomes host. Never fails: leaving a room twice,
    /// or a room the connection is not in, returns [`Departure::Absent`].
    pub fn leave_room(
        &mut self,
        room_id: RoomId,
        conn: ConnectionId,
    ) -> Departure {
        let Some(code) = self.codes_by_id.get(&room_id).cloned() else {
            return Departure::Absent;
        };
        let Some(room) = self.rooms.get(&code) else {
            return Departure::Absent;
        };
        let Some(index) = room
            .players
            .iter()
            .position(|p| p.connected && p.connection == conn)
        else {
            return Departure::Absent;
        };
        let player_id = room.players[index].id;
        if self.connections.get(&conn) == Some(&code) {
            self.connections.remove(&conn);
        }
        tracing::info!(%code, %player_id, %conn, "player left");
        self.remove_seat(code, index)
    }

    /// Handles a connection that went away without leaving.
    ///
    /// While a game runs the seat is held (marked disconnected) so its
    /// owner can rejoin; a held host seat hands the host role to the first
    /// connected player. A room whose seats are all held is destroyed.
    /// Otherwise this is [`leave_room`](Self::leave_room). A connection
    /// with no room is a silent no-op.
    pub fn remove_by_connection(&mut self, conn: ConnectionId) -> Departure {
        let Some(room) = self.room_of(conn) else {
            return Departure::Absent;
        };
        let room_id = room.id;
        if !room.state.is_in_game() {
            return self.leave_room(room_id, conn);
        }

        let Some(code) = self.connections.remove(&conn) else {
            return Departure::Absent;
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return Departure::Absent;
        };
        let Some(seat) = room
            .players
            .iter_mut()
            .find(|p| p.connected && p.connection == conn)
        else {
            return Departure::Absent;
        };
        seat.connected = false;
        let player_id = seat.id;
        tracing::info!(%code, %player_id, %conn, "seat held for rejoin");

        if room.connected_count() == 0 {
            return self.close_room(code);
        }
        if room.host == player_id {
            if let Some(host) = room.players.iter().find(|p| p.connected) {
                room.host = host.id;
                tracing::info!(%code, host = %room.host, "host migrated off held seat");
            }
        }
        Departure::Detached { room_id, player_id }
    }

    /// Removes every held seat, e.g. once the game they were held for
    /// is over. Returns the players removed.
    pub fn evict_detached(&mut self, room_id: RoomId) -> Vec<Player> {
        let Some(code) = self.codes_by_id.get(&room_id).cloned() else {
            return Vec::new();
        };
        let mut evicted = Vec::new();
        loop {
            let Some(room) = self.rooms.get(&code) else {
                break;
            };
            let Some(index) = room.players.iter().position(|p| !p.connected)
            else {
                break;
            };
            match self.remove_seat(code.clone(), index) {
                Departure::Left { player, .. }
                | Departure::Closed { player, .. } => {
                    tracing::info!(%code, player_id = %player.id, "held seat evicted");
                    evicted.push(player);
                }
                Departure::Absent | Departure::Detached { .. } => break,
            }
        }
        evicted
    }

    pub fn get_by_code(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_by_id(&self, room_id: RoomId) -> Option<&Room> {
        self.codes_by_id
            .get(&room_id)
            .and_then(|code| self.rooms.get(code))
    }

    /// The room `conn` currently sits in.
    pub fn room_of(&self, conn: ConnectionId) -> Option<&Room> {
        self.connections
            .get(&conn)
            .and_then(|code| self.rooms.get(code))
    }

    /// Merges a partial change into the room.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no room has this code, or
    /// [`RoomError::PlayerNotFound`] if a patch names a non-member. Nothing
    /// is applied in either case.
    pub fn update(
        &mut self,
        code: &RoomCode,
        update: RoomUpdate,
    ) -> Result<&Room, RoomError> {
        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;
        if let Some(stranger) = update.unknown_player(room) {
            return Err(RoomError::PlayerNotFound(stranger.to_string()));
        }
        update.apply(room);
        tracing::debug!(%code, state = %room.state, "room updated");
        Ok(&*room)
    }

    /// Number of active rooms.
    pub fn count(&self) -> usize {
        self.rooms.len()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    // -----------------------------------------------------------------------
    // Seat removal
    // -----------------------------------------------------------------------

    /// Takes `players[index]` out of the room, migrating the host or
    /// destroying the room as needed. The caller has already unindexed
    /// the seat's connection.
    fn remove_seat(&mut self, code: RoomCode, index: usize) -> Departure {
        let Some(room) = self.rooms.get_mut(&code) else {
            return Departure::Absent;
        };
        if index >= room.players.len() {
            return Departure::Absent;
        }
        let room_id = room.id;
        let player = room.players.remove(index);

        if room.players.is_empty() {
            self.rooms.remove(&code);
            self.codes_by_id.remove(&room_id);
            tracing::info!(%code, %room_id, "room destroyed");
            return Departure::Closed {
                room_id,
                code,
                player,
            };
        }

        if room.host == player.id {
            let host = room
                .players
                .iter()
                .find(|p| p.connected)
                .unwrap_or(&room.players[0]);
            room.host = host.id;
            tracing::info!(%code, host = %room.host, "host migrated");
        }
        Departure::Left { room_id, player }
    }

    /// Destroys a room whose seats are all held, unindexing nothing since
    /// held seats have no indexed connection.
    fn close_room(&mut self, code: RoomCode) -> Departure {
        let Some(room) = self.rooms.remove(&code) else {
            return Departure::Absent;
        };
        let room_id = room.id;
        self.codes_by_id.remove(&room_id);
        tracing::info!(%code, %room_id, "room destroyed, every seat disconnected");
        let Some(player) = room.players.into_iter().next() else {
            return Departure::Absent;
        };
        Departure::Closed {
            room_id,
            code,
            player,
        }
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    fn unused_code(&mut self) -> Result<RoomCode, RoomError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = draw_code(&mut self.rng);
            if !self.rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        tracing::error!(
            rooms = self.rooms.len(),
            "room code space exhausted"
        );
        Err(RoomError::CodeSpaceExhausted(MAX_CODE_ATTEMPTS))
    }
}

fn draw_code<R: Rng>(rng: &mut R) -> RoomCode {
    let raw: String = (0..RoomCode::LEN)
        .map(|_| {
            let i = rng.random_range(0..RoomCode::ALPHABET.len());
            RoomCode::ALPHABET[i] as char
        })
        .collect();
    RoomCode::new(&raw)
}

fn new_player_id<R: Rng>(rng: &mut R) -> PlayerId {
    PlayerId::from_random_bytes(rng.random())
}

/// 16 random bytes rendered as 32 lowercase hex characters.
fn new_token<R: Rng>(rng: &mut R) -> String {
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use partyroom_protocol::GameMode;
    use rand::RngCore;

    /// An RNG that always yields zero, so every drawn code is the same.
    struct Stuck;

    impl RngCore for Stuck {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0);
        }
    }

    fn params(nickname: &str) -> CreateRoom {
        CreateRoom {
            nickname: nickname.into(),
            game_mode: GameMode::ActiveMafia,
            max_players: 4,
        }
    }

    fn conn(n: u64) -> ConnectionId {
        ConnectionId::new(n)
    }

    #[test]
    fn test_create_room_when_every_code_collides_returns_exhausted() {
        let mut registry = RoomRegistry::with_rng(Stuck);
        registry.create_room(conn(1), params("mina")).unwrap();

        let err = registry.create_room(conn(2), params("jun")).unwrap_err();
        assert!(matches!(err, RoomError::CodeSpaceExhausted(MAX_CODE_ATTEMPTS)));
        assert_eq!(registry.count(), 1);
        assert!(registry.room_of(conn(2)).is_none());
    }

    #[test]
    fn test_draw_code_uses_alphabet_and_length() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let code = draw_code(&mut rng);
            assert_eq!(code.as_str().len(), RoomCode::LEN);
            assert!(
                code.as_str()
                    .bytes()
                    .all(|b| RoomCode::ALPHABET.contains(&b))
            );
        }
    }

    #[test]
    fn test_new_token_is_32_hex_chars() {
        let mut rng = StdRng::seed_from_u64(3);
        let token = new_token(&mut rng);
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, new_token(&mut rng));
    }

    #[test]
    fn test_create_room_indexes_both_ways() {
        let mut registry = RoomRegistry::with_rng(StdRng::seed_from_u64(1));
        let room = registry.create_room(conn(1), params("mina")).unwrap();
        let (id, code) = (room.id, room.code.clone());

        assert_eq!(registry.get_by_id(id).map(|r| &r.code), Some(&code));
        assert_eq!(registry.room_of(conn(1)).map(|r| r.id), Some(id));
    }

    #[test]
    fn test_leave_room_twice_is_absent() {
        let mut registry = RoomRegistry::with_rng(StdRng::seed_from_u64(1));
        let room = registry.create_room(conn(1), params("mina")).unwrap();
        let code = room.code.clone();
        let id = room.id;
        registry.join_room(&code, conn(2), "jun".into()).unwrap();

        assert!(matches!(
            registry.leave_room(id, conn(2)),
            Departure::Left { .. }
        ));
        assert_eq!(registry.leave_room(id, conn(2)), Departure::Absent);
        assert_eq!(registry.get_by_code(&code).unwrap().players.len(), 1);
    }
}
