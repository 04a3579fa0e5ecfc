//! Event dispatch: one inbound session event in, one response out.
//!
//! Every handler runs to completion against the registry and coordinator
//! before the next event is looked at, so each call is a critical section
//! over all room and game state.

use std::sync::Arc;

use partyroom_game::{
    Broadcaster, GameCoordinator, GameLogStore, MemoryGameLogStore,
    VoteOutcome,
};
use partyroom_protocol::{
    CastVote, ClientEvent, ConfirmMission, ConnectionId, CreateRoom,
    HealthReport, JoinRoom, LeaveRoom, RejoinRoom, Response, RoomId,
    SelfInfo, StartGame, unix_millis,
};
use partyroom_room::{Departure, Room, RoomError, RoomRegistry};

use crate::{ConnectionHub, PartyError, ServerConfig};

/// Owns all room and game state for one server.
pub struct Dispatcher<S: GameLogStore = MemoryGameLogStore> {
    config: ServerConfig,
    registry: RoomRegistry,
    coordinator: GameCoordinator<Arc<ConnectionHub>>,
    logs: Arc<S>,
}

impl<S: GameLogStore> Dispatcher<S> {
    pub fn new(
        config: ServerConfig,
        hub: Arc<ConnectionHub>,
        logs: Arc<S>,
    ) -> Self {
        let coordinator = GameCoordinator::new(hub, config.game.clone());
        Self {
            config,
            registry: RoomRegistry::new(),
            coordinator,
            logs,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn logs(&self) -> &Arc<S> {
        &self.logs
    }

    /// Handles one request from `conn`.
    ///
    /// Notifications triggered along the way are queued on the hub before
    /// this returns, so they reach `conn` ahead of the response.
    pub async fn handle(
        &mut self,
        conn: ConnectionId,
        event: ClientEvent,
    ) -> Result<Response, PartyError> {
        match event {
            ClientEvent::CreateRoom(req) => self.create_room(conn, req),
            ClientEvent::JoinRoom(req) => self.join_room(conn, req),
            ClientEvent::RejoinRoom(req) => self.rejoin_room(conn, req),
            ClientEvent::LeaveRoom(req) => self.leave_room(conn, req),
            ClientEvent::StartGame(req) => self.start_game(conn, req, false),
            ClientEvent::RestartGame(req) => self.start_game(conn, req, true),
            ClientEvent::ConfirmMission(req) => {
                self.confirm_mission(conn, req)
            }
            ClientEvent::Vote(req) => self.vote(req).await,
            ClientEvent::Health => Ok(Response::Health(self.health())),
        }
    }

    /// Cleans up after a connection that went away without leaving.
    ///
    /// Mid-game the seat is held for a rejoin; otherwise the player leaves.
    /// Never fails: a connection with no room is ignored.
    pub fn disconnect(&mut self, conn: ConnectionId) {
        let departure = self.registry.remove_by_connection(conn);
        if departure != Departure::Absent {
            tracing::info!(%conn, "player disconnected");
        }
        self.after_departure(departure);
    }

    /// Opens voting in rooms whose phase deadline has passed.
    pub fn sweep(&mut self, now: u64) -> usize {
        self.coordinator
            .advance_expired_phases(&mut self.registry, now)
            .len()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok".to_string(),
            timestamp: unix_millis(),
            active_rooms: self.registry.count(),
        }
    }

    // -----------------------------------------------------------------------
    // Room events
    // -----------------------------------------------------------------------

    fn create_room(
        &mut self,
        conn: ConnectionId,
        mut req: CreateRoom,
    ) -> Result<Response, PartyError> {
        req.nickname = self.checked_nickname(&req.nickname)?;
        let (min, max) = (self.config.game.min_players, self.config.max_room_size);
        if !(min..=max).contains(&req.max_players) {
            return Err(PartyError::BadRequest(format!(
                "maxPlayers must be between {min} and {max}"
            )));
        }

        let room = self.registry.create_room(conn, req)?;
        let me = self_info(room, conn)?;
        self.coordinator.broadcaster().room_state(room);
        Ok(Response::Created {
            code: room.code.clone(),
            room: room.masked(),
            me,
        })
    }

    fn join_room(
        &mut self,
        conn: ConnectionId,
        req: JoinRoom,
    ) -> Result<Response, PartyError> {
        let nickname = self.checked_nickname(&req.nickname)?;
        let room = self.registry.join_room(&req.code, conn, nickname)?;
        let me = self_info(room, conn)?;
        self.coordinator.broadcaster().room_state(room);
        Ok(Response::Joined {
            room: room.masked(),
            me,
        })
    }

    fn rejoin_room(
        &mut self,
        conn: ConnectionId,
        req: RejoinRoom,
    ) -> Result<Response, PartyError> {
        if self.config.require_rejoin_token && req.token.is_none() {
            return Err(PartyError::BadRequest(
                "rejoin token required".to_string(),
            ));
        }
        let nickname = req.nickname.trim();
        let (room, player_id) = self.registry.rejoin_room(
            &req.code,
            conn,
            nickname,
            req.token.as_deref(),
        )?;
        let me = self_info(room, conn)?;

        self.coordinator.broadcaster().room_state(room);
        self.coordinator.replay_private_state(room, player_id);
        Ok(Response::Joined {
            room: room.masked(),
            me,
        })
    }

    fn leave_room(
        &mut self,
        conn: ConnectionId,
        req: LeaveRoom,
    ) -> Result<Response, PartyError> {
        if self.registry.get_by_id(req.room_id).is_none() {
            return Err(PartyError::Room(RoomError::NotFound(
                req.room_id.to_string(),
            )));
        }
        let departure = self.registry.leave_room(req.room_id, conn);
        self.after_departure(departure);
        Ok(Response::success())
    }

    /// Tells the remaining players, or drops game state if the room died.
    fn after_departure(&mut self, departure: Departure) {
        match departure {
            Departure::Absent => {}
            Departure::Left { room_id, .. }
            | Departure::Detached { room_id, .. } => {
                if let Some(room) = self.registry.get_by_id(room_id) {
                    self.coordinator.broadcaster().room_state(room);
                }
            }
            Departure::Closed { room_id, .. } => {
                self.coordinator.discard_room(room_id);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Game events
    // -----------------------------------------------------------------------

    fn start_game(
        &mut self,
        conn: ConnectionId,
        req: StartGame,
        restart: bool,
    ) -> Result<Response, PartyError> {
        let room = self.registry.get_by_id(req.room_id).ok_or_else(|| {
            PartyError::Room(RoomError::NotFound(
                req.room_id.to_string(),
            ))
        })?;
        if !room.is_host_connection(conn) {
            tracing::warn!(code = %room.code, %conn, "host-only action refused");
            return Err(PartyError::NotHost(room.code.clone()));
        }

        let mode = req.mode.unwrap_or_default();
        if restart {
            self.coordinator
                .restart_game(&mut self.registry, req.room_id, mode)?;
        } else {
            self.coordinator
                .start_game(&mut self.registry, req.room_id, mode)?;
        }
        Ok(Response::success())
    }

    fn confirm_mission(
        &mut self,
        conn: ConnectionId,
        req: ConfirmMission,
    ) -> Result<Response, PartyError> {
        let confirmer = self
            .registry
            .room_of(conn)
            .and_then(|room| room.player_by_connection(conn))
            .map(|player| player.id);
        self.coordinator.confirm_mission(
            &mut self.registry,
            req.mission_id,
            req.confirmed,
            confirmer,
        );
        Ok(Response::success())
    }

    async fn vote(&mut self, req: CastVote) -> Result<Response, PartyError> {
        let outcome = self.coordinator.submit_vote(
            &mut self.registry,
            req.room_id,
            req.voter_id,
            req.target_id,
        )?;
        if let VoteOutcome::Resolved { result, .. } = outcome {
            let log = self.coordinator.finish_game(
                &mut self.registry,
                req.room_id,
                result,
            )?;
            if let Err(err) = self.logs.save(log).await {
                tracing::warn!(room_id = %req.room_id, error = %err, "game log not saved");
            }
            self.release_held_seats(req.room_id);
        }
        Ok(Response::success())
    }

    /// Seats held for a game that is now over go away for good.
    fn release_held_seats(&mut self, room_id: RoomId) {
        if self.registry.evict_detached(room_id).is_empty() {
            return;
        }
        match self.registry.get_by_id(room_id) {
            Some(room) => self.coordinator.broadcaster().room_state(room),
            None => self.coordinator.discard_room(room_id),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn checked_nickname(&self, raw: &str) -> Result<String, PartyError> {
        let nickname = raw.trim();
        let max = self.config.max_nickname_len;
        if nickname.is_empty() {
            return Err(PartyError::BadRequest("nickname is empty".to_string()));
        }
        if nickname.chars().count() > max {
            return Err(PartyError::BadRequest(format!(
                "nickname is longer than {max} characters"
            )));
        }
        Ok(nickname.to_string())
    }
}

/// The caller's own id and token, read from the seat on `conn`.
fn self_info(room: &Room, conn: ConnectionId) -> Result<SelfInfo, PartyError> {
    let player = room.player_by_connection(conn).ok_or_else(|| {
        PartyError::Room(RoomError::PlayerNotFound(conn.to_string()))
    })?;
    Ok(SelfInfo {
        player_id: player.id,
        rejoin_token: player.rejoin_token.clone(),
    })
}
