//! Rooms, players, and the partial updates committed to them.

use partyroom_protocol::{
    ConnectionId, GameMode, Phase, PlayerId, PlayerView, Role, RoomCode,
    RoomId, RoomState, RoomView,
};

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One seat in a room.
///
/// `id` never changes once assigned. `connection` is overwritten on
/// rejoin; it goes stale while `connected` is `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub connection: ConnectionId,
    pub nickname: String,
    pub role: Role,
    pub alive: bool,
    pub points: u32,
    pub confirmed_missions: u32,
    /// Cleared when the socket drops mid-game and the seat is held.
    pub connected: bool,
    /// Secret proving ownership of this seat on rejoin.
    pub rejoin_token: String,
}

impl Player {
    pub(crate) fn new(
        id: PlayerId,
        connection: ConnectionId,
        nickname: String,
        rejoin_token: String,
    ) -> Self {
        Self {
            id,
            connection,
            nickname,
            role: Role::Hidden,
            alive: true,
            points: 0,
            confirmed_missions: 0,
            connected: true,
            rejoin_token,
        }
    }

    /// How the rest of the room sees this player: role always `hidden`.
    pub fn masked(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            nickname: self.nickname.clone(),
            role: Role::Hidden,
            alive: self.alive,
            points: self.points,
            confirmed_missions: self.confirmed_missions,
            connected: self.connected,
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// The authoritative state of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub code: RoomCode,
    pub host: PlayerId,
    pub game_mode: GameMode,
    pub state: RoomState,
    /// Join order. Never empty while the room exists.
    pub players: Vec<Player>,
    pub max_players: usize,
    /// Unix millis.
    pub created_at: u64,
    pub current_phase: Phase,
    /// Unix millis.
    pub phase_end_time: Option<u64>,
}

impl Room {
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// The connected player on `conn`. Held seats never match.
    pub fn player_by_connection(&self, conn: ConnectionId) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.connected && p.connection == conn)
    }

    /// First player with this nickname. Nicknames are not unique.
    pub fn player_by_nickname(&self, nickname: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.nickname == nickname)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    /// Returns `true` if `conn` is the host's current connection.
    pub fn is_host_connection(&self, conn: ConnectionId) -> bool {
        self.player_by_connection(conn)
            .is_some_and(|p| p.id == self.host)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    /// Living players holding `role`.
    pub fn alive_with_role(&self, role: Role) -> usize {
        self.players
            .iter()
            .filter(|p| p.alive && p.role == role)
            .count()
    }

    /// Every connected member's connection, in join order.
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.players
            .iter()
            .filter(|p| p.connected)
            .map(|p| p.connection)
    }

    /// Seats still attached to a live connection.
    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    /// The snapshot broadcast to the room, with every role masked and no
    /// connection ids or tokens.
    pub fn masked(&self) -> RoomView {
        RoomView {
            id: self.id,
            code: self.code.clone(),
            host: self.host,
            game_mode: self.game_mode,
            state: self.state,
            players: self.players.iter().map(Player::masked).collect(),
            max_players: self.max_players,
            created_at: self.created_at,
            current_phase: self.current_phase,
            phase_end_time: self.phase_end_time,
        }
    }
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

/// Game-owned fields of one player. `None` leaves a field alone.
///
/// Membership (ids, connections, nicknames, tokens) is not patchable:
/// only join, rejoin and leave change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerPatch {
    pub id: PlayerId,
    pub role: Option<Role>,
    pub alive: Option<bool>,
    pub points: Option<u32>,
    pub confirmed_missions: Option<u32>,
}

impl PlayerPatch {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            role: None,
            alive: None,
            points: None,
            confirmed_missions: None,
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn alive(mut self, alive: bool) -> Self {
        self.alive = Some(alive);
        self
    }

    pub fn points(mut self, points: u32) -> Self {
        self.points = Some(points);
        self
    }

    pub fn confirmed_missions(mut self, count: u32) -> Self {
        self.confirmed_missions = Some(count);
        self
    }

    fn apply(&self, player: &mut Player) {
        if let Some(role) = self.role {
            player.role = role;
        }
        if let Some(alive) = self.alive {
            player.alive = alive;
        }
        if let Some(points) = self.points {
            player.points = points;
        }
        if let Some(count) = self.confirmed_missions {
            player.confirmed_missions = count;
        }
    }
}

/// A partial room change, merged in place by
/// [`RoomRegistry::update`](crate::RoomRegistry::update).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomUpdate {
    pub state: Option<RoomState>,
    pub current_phase: Option<Phase>,
    /// `Some(None)` clears the deadline.
    pub phase_end_time: Option<Option<u64>>,
    pub players: Vec<PlayerPatch>,
}

impl RoomUpdate {
    pub fn state(mut self, state: RoomState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.current_phase = Some(phase);
        self
    }

    pub fn phase_end_time(mut self, deadline: Option<u64>) -> Self {
        self.phase_end_time = Some(deadline);
        self
    }

    pub fn player(mut self, patch: PlayerPatch) -> Self {
        self.players.push(patch);
        self
    }

    /// Id of the first patch naming a player not in `room`.
    pub(crate) fn unknown_player(&self, room: &Room) -> Option<PlayerId> {
        self.players
            .iter()
            .map(|patch| patch.id)
            .find(|id| !room.contains(*id))
    }

    /// Merges into `room`. Callers check [`Self::unknown_player`] first.
    pub(crate) fn apply(&self, room: &mut Room) {
        if let Some(state) = self.state {
            room.state = state;
        }
        if let Some(phase) = self.current_phase {
            room.current_phase = phase;
        }
        if let Some(deadline) = self.phase_end_time {
            room.phase_end_time = deadline;
        }
        for patch in &self.players {
            if let Some(player) =
                room.players.iter_mut().find(|p| p.id == patch.id)
            {
                patch.apply(player);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(seed: u8, conn: u64, nickname: &str) -> Player {
        Player::new(
            PlayerId::from_random_bytes([seed; 16]),
            ConnectionId::new(conn),
            nickname.into(),
            format!("token-{seed}"),
        )
    }

    fn room() -> Room {
        let host = player(1, 1, "mina");
        Room {
            id: RoomId::from_random_bytes([9; 16]),
            code: RoomCode::new("ABC123"),
            host: host.id,
            game_mode: GameMode::ActiveMafia,
            state: RoomState::Waiting,
            players: vec![host, player(2, 2, "jun"), player(3, 3, "jun")],
            max_players: 3,
            created_at: 0,
            current_phase: Phase::Night,
            phase_end_time: None,
        }
    }

    #[test]
    fn test_masked_hides_every_role() {
        let mut room = room();
        room.players[0].role = Role::Mafia;
        room.players[1].role = Role::Citizen;

        let view = room.masked();
        assert!(view.players.iter().all(|p| p.role == Role::Hidden));
        assert_eq!(view.players.len(), 3);
        assert_eq!(view.host, room.host);
    }

    #[test]
    fn test_player_by_nickname_returns_first_match() {
        let room = room();
        let found = room.player_by_nickname("jun").unwrap();
        assert_eq!(found.connection, ConnectionId::new(2));
    }

    #[test]
    fn test_is_host_connection_only_for_host() {
        let room = room();
        assert!(room.is_host_connection(ConnectionId::new(1)));
        assert!(!room.is_host_connection(ConnectionId::new(2)));
        assert!(!room.is_host_connection(ConnectionId::new(99)));
    }

    #[test]
    fn test_update_apply_merges_only_set_fields() {
        let mut room = room();
        let target = room.players[1].id;
        let update = RoomUpdate::default()
            .state(RoomState::Voting)
            .player(PlayerPatch::new(target).alive(false).points(3));

        assert_eq!(update.unknown_player(&room), None);
        update.apply(&mut room);

        assert_eq!(room.state, RoomState::Voting);
        assert_eq!(room.current_phase, Phase::Night);
        assert!(!room.players[1].alive);
        assert_eq!(room.players[1].points, 3);
        assert_eq!(room.players[1].role, Role::Hidden);
        assert!(room.players[0].alive);
    }

    #[test]
    fn test_update_phase_end_time_some_none_clears() {
        let mut room = room();
        room.phase_end_time = Some(42);
        RoomUpdate::default().phase_end_time(None).apply(&mut room);
        assert_eq!(room.phase_end_time, None);
    }

    #[test]
    fn test_update_unknown_player_is_reported() {
        let room = room();
        let stranger = PlayerId::from_random_bytes([77; 16]);
        let update = RoomUpdate::default().player(PlayerPatch::new(stranger));
        assert_eq!(update.unknown_player(&room), Some(stranger));
    }

    #[test]
    fn test_alive_with_role_counts_living_only() {
        let mut room = room();
        room.players[0].role = Role::Mafia;
        room.players[1].role = Role::Mafia;
        room.players[1].alive = false;
        assert_eq!(room.alive_with_role(Role::Mafia), 1);
    }
}
