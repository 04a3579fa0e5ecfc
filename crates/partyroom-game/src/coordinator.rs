//! The game coordinator: roles, private payloads, missions, votes.

use std::collections::{HashMap, HashSet};

use partyroom_protocol::{
    GameEnd, GameMode, GameResult, LiarMode, Mission, MissionAssignment,
    MissionId, Phase, PhaseChange, PlayerId, Role, RoomId, RoomState,
    ServerEvent, WordPayload, unix_millis,
};
use partyroom_room::{PlayerPatch, Room, RoomRegistry, RoomUpdate};
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    Broadcaster, GameConfig, GameError, GameLog, GameLogPlayer, VoteLedger,
};

/// Points awarded the first time a mission is confirmed.
const MISSION_POINTS: u32 = 1;

// ---------------------------------------------------------------------------
// Public outcome types
// ---------------------------------------------------------------------------

/// A player's hidden information for the current game.
///
/// Only ever sent to the player it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivateInfo {
    /// Liar game.
    Word(WordPayload),
    /// Mafia game.
    Mission(MissionAssignment),
}

impl PrivateInfo {
    pub fn into_event(self) -> ServerEvent {
        match self {
            Self::Word(payload) => ServerEvent::Word(payload),
            Self::Mission(assignment) => ServerEvent::MissionAssign(assignment),
        }
    }
}

/// What a vote did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Recorded; still waiting on other voters.
    Pending { cast: usize, required: usize },
    /// Everyone voted. The caller ends the game with `result`.
    Resolved {
        eliminated: Option<PlayerId>,
        result: GameResult,
    },
}

// ---------------------------------------------------------------------------
// Per-room game state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RoomGame {
    private: HashMap<PlayerId, PrivateInfo>,
    ledger: VoteLedger,
    /// Missions that already paid out; un-confirming does not reset this.
    credited: HashSet<MissionId>,
    started_at: u64,
}

impl RoomGame {
    fn missions(&self) -> impl Iterator<Item = &Mission> {
        self.private.values().filter_map(|info| match info {
            PrivateInfo::Mission(assignment) => Some(&assignment.mission),
            PrivateInfo::Word(_) => None,
        })
    }
}

// ---------------------------------------------------------------------------
// GameCoordinator
// ---------------------------------------------------------------------------

/// Runs games on top of a [`RoomRegistry`].
///
/// Private state, vote ledgers and missions are kept per room and never
/// shared between rooms.
pub struct GameCoordinator<B, R: Rng = StdRng> {
    broadcaster: B,
    config: GameConfig,
    rng: R,
    games: HashMap<RoomId, RoomGame>,
}

impl<B: Broadcaster> GameCoordinator<B, StdRng> {
    pub fn new(broadcaster: B, config: GameConfig) -> Self {
        Self::with_rng(broadcaster, config, StdRng::from_os_rng())
    }
}

impl<B: Broadcaster, R: Rng> GameCoordinator<B, R> {
    pub fn with_rng(broadcaster: B, config: GameConfig, rng: R) -> Self {
        Self {
            broadcaster,
            config,
            rng,
            games: HashMap::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn broadcaster(&self) -> &B {
        &self.broadcaster
    }

    /// Assigns roles, hands out private payloads, and opens the first
    /// phase.
    ///
    /// `mode` only matters for liar rooms. Each player's payload goes to
    /// that player's connection alone; the room then gets the masked state
    /// and a `game:phase-change`.
    ///
    /// # Errors
    /// - [`GameError::RoomNotFound`]
    /// - [`GameError::InvalidState`]: the room is not `waiting`
    /// - [`GameError::InsufficientPlayers`]: below the configured minimum
    /// - [`GameError::EmptyPool`]: no word sets or missions to draw from
    pub fn start_game<Q: Rng>(
        &mut self,
        registry: &mut RoomRegistry<Q>,
        room_id: RoomId,
        mode: LiarMode,
    ) -> Result<(), GameError> {
        let room = registry
            .get_by_id(room_id)
            .ok_or(GameError::RoomNotFound(room_id))?
            .clone();

        if room.state != RoomState::Waiting {
            return Err(GameError::InvalidState(format!(
                "room {} is {}, not waiting",
                room.code, room.state
            )));
        }
        self.ensure_enough_players(&room)?;

        let mut order: Vec<PlayerId> = room.players.iter().map(|p| p.id).collect();
        order.shuffle(&mut self.rng);

        let now = unix_millis();
        let (roles, private, state, phase) = match room.game_mode {
            GameMode::ActiveMafia => {
                let roles = mafia_roles(&order);
                let private = self.deal_missions(&room, &roles, now)?;
                (roles, private, RoomState::Night, Phase::Night)
            }
            GameMode::CustomLiar => {
                let liar = order[self.rng.random_range(0..order.len())];
                let roles: HashMap<PlayerId, Role> = order
                    .iter()
                    .map(|id| (*id, if *id == liar { Role::Liar } else { Role::Citizen }))
                    .collect();
                let private = self.deal_words(&roles, mode)?;
                (roles, private, RoomState::Day, Phase::Day)
            }
        };

        // Each payload reaches its owner only.
        for player in &room.players {
            if let Some(info) = private.get(&player.id) {
                self.broadcaster
                    .to_connection(player.connection, info.clone().into_event());
            }
        }
        self.games.insert(
            room_id,
            RoomGame {
                private,
                started_at: now,
                ..RoomGame::default()
            },
        );

        let deadline = self
            .config
            .discussion_secs
            .map(|secs| now.saturating_add(secs.saturating_mul(1000)));
        let update = room.players.iter().fold(
            RoomUpdate::default()
                .state(state)
                .phase(phase)
                .phase_end_time(deadline),
            |update, player| {
                let role = roles.get(&player.id).copied().unwrap_or_default();
                update.player(PlayerPatch::new(player.id).role(role))
            },
        );
        let room = registry.update(&room.code, update)?;

        tracing::info!(
            code = %room.code,
            %room_id,
            game_mode = ?room.game_mode,
            ?mode,
            players = room.players.len(),
            "game started"
        );
        self.broadcaster.room_state(room);
        self.broadcaster.to_room(
            room,
            ServerEvent::PhaseChange(PhaseChange {
                room_id,
                phase: state,
            }),
        );
        Ok(())
    }

    /// Resets every player to alive, `hidden` and zero confirmed missions,
    /// drops the previous game's state, and starts again.
    ///
    /// Points carry over. Nothing is reset if the room could not start:
    /// the player minimum and the mode's pool are checked first.
    pub fn restart_game<Q: Rng>(
        &mut self,
        registry: &mut RoomRegistry<Q>,
        room_id: RoomId,
        mode: LiarMode,
    ) -> Result<(), GameError> {
        let room = registry
            .get_by_id(room_id)
            .ok_or(GameError::RoomNotFound(room_id))?;
        self.ensure_enough_players(room)?;
        self.ensure_pool(room.game_mode)?;

        let code = room.code.clone();
        let update = room.players.iter().fold(
            RoomUpdate::default()
                .state(RoomState::Waiting)
                .phase(Phase::Night)
                .phase_end_time(None),
            |update, player| {
                update.player(
                    PlayerPatch::new(player.id)
                        .role(Role::Hidden)
                        .alive(true)
                        .confirmed_missions(0),
                )
            },
        );
        registry.update(&code, update)?;
        self.discard_room(room_id);
        tracing::info!(%code, %room_id, "game reset");

        self.start_game(registry, room_id, mode)
    }

    /// The liar-game payload dealt to `player_id`, if any.
    pub fn private_word_state(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Option<&WordPayload> {
        match self.private_state(room_id, player_id)? {
            PrivateInfo::Word(payload) => Some(payload),
            PrivateInfo::Mission(_) => None,
        }
    }

    /// Whatever was dealt to `player_id` in this room's current game.
    pub fn private_state(
        &self,
        room_id: RoomId,
        player_id: PlayerId,
    ) -> Option<&PrivateInfo> {
        self.games.get(&room_id)?.private.get(&player_id)
    }

    /// Resends a player's private payload to their current connection.
    ///
    /// Returns `false` if nothing was dealt to them.
    pub fn replay_private_state(&self, room: &Room, player_id: PlayerId) -> bool {
        let Some(player) = room.player(player_id) else {
            return false;
        };
        let Some(info) = self.private_state(room.id, player_id) else {
            return false;
        };
        tracing::debug!(code = %room.code, %player_id, "private state replayed");
        self.broadcaster
            .to_connection(player.connection, info.clone().into_event());
        true
    }

    /// All missions dealt in a room, in no particular order.
    pub fn missions(&self, room_id: RoomId) -> Vec<Mission> {
        self.games
            .get(&room_id)
            .map(|game| game.missions().cloned().collect())
            .unwrap_or_default()
    }

    /// Marks a mission, found by id across every room, as completed or not.
    ///
    /// The first confirmation credits the owner with a confirmed mission
    /// and points, and the room gets a fresh state update. Returns `false`
    /// when no mission has this id.
    pub fn confirm_mission<Q: Rng>(
        &mut self,
        registry: &mut RoomRegistry<Q>,
        mission_id: MissionId,
        confirmed: bool,
        confirmed_by: Option<PlayerId>,
    ) -> bool {
        let found = self.games.iter_mut().find_map(|(room_id, game)| {
            let credited = &mut game.credited;
            let mission = game.private.values_mut().find_map(|info| match info {
                PrivateInfo::Mission(assignment)
                    if assignment.mission.id == mission_id =>
                {
                    Some(&mut assignment.mission)
                }
                _ => None,
            })?;
            Some((*room_id, mission, credited))
        });
        let Some((room_id, mission, credited)) = found else {
            tracing::debug!(%mission_id, "mission not found");
            return false;
        };

        let first_completion = confirmed && credited.insert(mission_id);
        mission.completed = confirmed;
        if confirmed {
            mission.confirmed_by = confirmed_by;
        }
        let owner = mission.player_id;
        tracing::info!(%mission_id, %room_id, %owner, confirmed, "mission confirmed");

        if !first_completion {
            return true;
        }
        let Some(room) = registry.get_by_id(room_id) else {
            return true;
        };
        let Some(player) = room.player(owner) else {
            return true;
        };
        let code = room.code.clone();
        let patch = PlayerPatch::new(owner)
            .confirmed_missions(player.confirmed_missions + 1)
            .points(player.points + MISSION_POINTS);
        match registry.update(&code, RoomUpdate::default().player(patch)) {
            Ok(room) => self.broadcaster.room_state(room),
            Err(err) => tracing::warn!(%code, error = %err, "mission credit not committed"),
        }
        true
    }

    /// Records a vote and resolves the round once every player has voted.
    ///
    /// Voting again replaces the voter's earlier choice. On resolution the
    /// eliminated player is marked dead and the ledger is cleared; ending
    /// the game is left to the caller (see [`Self::finish_game`]).
    ///
    /// # Errors
    /// - [`GameError::RoomNotFound`]
    /// - [`GameError::InvalidState`]: no game is running
    /// - [`GameError::PlayerNotFound`]: the voter is not in the room
    /// - [`GameError::InvalidState`]: the voter's seat is held after a disconnect
    pub fn submit_vote<Q: Rng>(
        &mut self,
        registry: &mut RoomRegistry<Q>,
        room_id: RoomId,
        voter: PlayerId,
        target: PlayerId,
    ) -> Result<VoteOutcome, GameError> {
        let room = registry
            .get_by_id(room_id)
            .ok_or(GameError::RoomNotFound(room_id))?;
        if !room.state.is_in_game() {
            return Err(GameError::InvalidState(format!(
                "room {} is {}, no game running",
                room.code, room.state
            )));
        }
        match room.player(voter) {
            None => return Err(GameError::PlayerNotFound(voter)),
            Some(seat) if !seat.connected => {
                return Err(GameError::InvalidState(format!(
                    "player {voter} is disconnected"
                )));
            }
            Some(_) => {}
        }

        let game = self.games.entry(room_id).or_default();
        game.ledger.cast(voter, target);
        game.ledger
            .retain_voters(|id| room.player(id).is_some_and(|p| p.connected));

        // Held seats neither vote nor count toward the total.
        let cast = game.ledger.len();
        let required = room.connected_count();
        tracing::debug!(code = %room.code, %voter, %target, cast, required, "vote cast");
        if cast < required {
            return Ok(VoteOutcome::Pending { cast, required });
        }

        let leader = game.ledger.leader();
        game.ledger = VoteLedger::default();

        let mut room = room.clone();
        let eliminated = leader.filter(|id| room.contains(*id));
        let eliminated_role = eliminated.and_then(|id| {
            let player = room.players.iter_mut().find(|p| p.id == id)?;
            player.alive = false;
            Some(player.role)
        });
        let result = evaluate(&room, eliminated_role);

        if let Some(id) = eliminated {
            registry.update(
                &room.code,
                RoomUpdate::default().player(PlayerPatch::new(id).alive(false)),
            )?;
        }
        tracing::info!(
            code = %room.code,
            eliminated = ?eliminated,
            %result,
            "vote resolved"
        );
        Ok(VoteOutcome::Resolved { eliminated, result })
    }

    /// Commits `ended`, announces `game:end`, and returns the game's log.
    pub fn finish_game<Q: Rng>(
        &mut self,
        registry: &mut RoomRegistry<Q>,
        room_id: RoomId,
        result: GameResult,
    ) -> Result<GameLog, GameError> {
        let code = registry
            .get_by_id(room_id)
            .ok_or(GameError::RoomNotFound(room_id))?
            .code
            .clone();
        let room = registry.update(
            &code,
            RoomUpdate::default()
                .state(RoomState::Ended)
                .phase_end_time(None),
        )?;

        self.broadcaster.room_state(room);
        self.broadcaster
            .to_room(room, ServerEvent::GameEnd(GameEnd { room_id, result }));

        let game = self.games.get(&room_id);
        let log = GameLog {
            room_id,
            game_mode: room.game_mode,
            result,
            started_at: game.map_or(room.created_at, |g| g.started_at),
            ended_at: unix_millis(),
            players: room
                .players
                .iter()
                .map(|p| GameLogPlayer {
                    player_id: p.id,
                    nickname: p.nickname.clone(),
                    role: p.role,
                    points: p.points,
                })
                .collect(),
            missions: room
                .players
                .iter()
                .filter_map(|p| match game?.private.get(&p.id)? {
                    PrivateInfo::Mission(assignment) => {
                        Some(assignment.mission.clone())
                    }
                    PrivateInfo::Word(_) => None,
                })
                .collect(),
        };
        tracing::info!(%code, %room_id, %result, "game ended");
        Ok(log)
    }

    /// Moves every running room whose deadline has passed into `voting`.
    ///
    /// Returns the rooms that advanced.
    pub fn advance_expired_phases<Q: Rng>(
        &mut self,
        registry: &mut RoomRegistry<Q>,
        now: u64,
    ) -> Vec<RoomId> {
        let expired: Vec<_> = registry
            .rooms()
            .filter(|room| {
                room.state.is_in_game()
                    && room.state != RoomState::Voting
                    && room.phase_end_time.is_some_and(|deadline| deadline <= now)
            })
            .map(|room| (room.id, room.code.clone()))
            .collect();

        let mut advanced = Vec::with_capacity(expired.len());
        for (room_id, code) in expired {
            let update = RoomUpdate::default()
                .state(RoomState::Voting)
                .phase_end_time(None);
            match registry.update(&code, update) {
                Ok(room) => {
                    tracing::info!(%code, "phase deadline passed, voting opened");
                    self.broadcaster.room_state(room);
                    self.broadcaster.to_room(
                        room,
                        ServerEvent::PhaseChange(PhaseChange {
                            room_id,
                            phase: RoomState::Voting,
                        }),
                    );
                    advanced.push(room_id);
                }
                Err(err) => {
                    tracing::warn!(%code, error = %err, "phase advance failed")
                }
            }
        }
        advanced
    }

    /// Forgets everything about a room's game. Called once the room is
    /// destroyed or restarted.
    pub fn discard_room(&mut self, room_id: RoomId) {
        if self.games.remove(&room_id).is_some() {
            tracing::debug!(%room_id, "game state discarded");
        }
    }

    /// Rooms with game state held.
    pub fn active_games(&self) -> usize {
        self.games.len()
    }

    // -----------------------------------------------------------------------
    // Dealing
    // -----------------------------------------------------------------------

    fn ensure_enough_players(&self, room: &Room) -> Result<(), GameError> {
        let need = self.config.min_players;
        let have = room.players.len();
        if have < need {
            return Err(GameError::InsufficientPlayers { have, need });
        }
        Ok(())
    }

    fn ensure_pool(&self, mode: GameMode) -> Result<(), GameError> {
        match mode {
            GameMode::ActiveMafia if self.config.missions.is_empty() => {
                Err(GameError::EmptyPool("missions"))
            }
            GameMode::CustomLiar if self.config.word_sets.is_empty() => {
                Err(GameError::EmptyPool("word sets"))
            }
            _ => Ok(()),
        }
    }

    fn deal_words(
        &mut self,
        roles: &HashMap<PlayerId, Role>,
        mode: LiarMode,
    ) -> Result<HashMap<PlayerId, PrivateInfo>, GameError> {
        let set = self
            .config
            .word_sets
            .choose(&mut self.rng)
            .ok_or(GameError::EmptyPool("word sets"))?;

        Ok(roles
            .iter()
            .map(|(id, role)| {
                let word = match (role, mode) {
                    (Role::Liar, LiarMode::Classic) => None,
                    (Role::Liar, LiarMode::Fool) => Some(set.decoy.clone()),
                    _ => Some(set.answer.clone()),
                };
                let payload = WordPayload {
                    word,
                    topic: set.topic.clone(),
                    mode,
                };
                (*id, PrivateInfo::Word(payload))
            })
            .collect())
    }

    fn deal_missions(
        &mut self,
        room: &Room,
        roles: &HashMap<PlayerId, Role>,
        now: u64,
    ) -> Result<HashMap<PlayerId, PrivateInfo>, GameError> {
        if self.config.missions.is_empty() {
            return Err(GameError::EmptyPool("missions"));
        }

        let mut private = HashMap::with_capacity(room.players.len());
        for player in &room.players {
            let index = self.rng.random_range(0..self.config.missions.len());
            let template = &self.config.missions[index];
            let others: Vec<PlayerId> = room
                .players
                .iter()
                .map(|p| p.id)
                .filter(|id| *id != player.id)
                .collect();
            let target = if template.targeted {
                others.choose(&mut self.rng).copied()
            } else {
                None
            };
            let mission = Mission {
                id: MissionId::from_random_bytes(self.rng.random()),
                player_id: player.id,
                mission_text: template.text.clone(),
                kind: template.kind,
                target_player_id: target,
                completed: false,
                confirmed_by: None,
                created_at: now,
            };
            let assignment = MissionAssignment {
                player_id: player.id,
                role: roles.get(&player.id).copied().unwrap_or_default(),
                mission,
            };
            private.insert(player.id, PrivateInfo::Mission(assignment));
        }
        Ok(private)
    }
}

/// `ceil(n / 3)` mafia, taken from the front of the shuffled order.
fn mafia_roles(order: &[PlayerId]) -> HashMap<PlayerId, Role> {
    let mafia = order.len().div_ceil(3);
    order
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, if i < mafia { Role::Mafia } else { Role::Citizen }))
        .collect()
}

/// Decides the outcome of a resolved vote. `room` already has the
/// eliminated player marked dead.
fn evaluate(room: &Room, eliminated: Option<Role>) -> GameResult {
    match room.game_mode {
        GameMode::ActiveMafia => {
            let Some(role) = eliminated else {
                return GameResult::Draw;
            };
            let mafia = room.alive_with_role(Role::Mafia);
            let citizens = room.alive_with_role(Role::Citizen);
            if role == Role::Mafia && mafia == 0 {
                GameResult::CitizenWin
            } else if mafia >= citizens {
                GameResult::MafiaWin
            } else {
                GameResult::Draw
            }
        }
        GameMode::CustomLiar => match eliminated {
            Some(Role::Liar) => GameResult::CitizenWin,
            _ => GameResult::LiarWin,
        },
    }
}
