//! Finished-game records and where they go.

use std::collections::VecDeque;
use std::future::Future;

use partyroom_protocol::{
    GameMode, GameResult, Mission, PlayerId, Role, RoomId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::GameError;

/// One player's line in a [`GameLog`], with the true role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLogPlayer {
    pub player_id: PlayerId,
    pub nickname: String,
    pub role: Role,
    pub points: u32,
}

/// The record of one finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLog {
    pub room_id: RoomId,
    pub game_mode: GameMode,
    pub result: GameResult,
    /// Unix millis.
    pub started_at: u64,
    /// Unix millis.
    pub ended_at: u64,
    pub players: Vec<GameLogPlayer>,
    /// Empty for liar games.
    pub missions: Vec<Mission>,
}

/// Save/query interface to wherever finished games are kept.
pub trait GameLogStore: Send + Sync + 'static {
    fn save(
        &self,
        log: GameLog,
    ) -> impl Future<Output = Result<(), GameError>> + Send;

    /// Newest first.
    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<GameLog>, GameError>> + Send;
}

/// Keeps the most recent logs in memory.
#[derive(Debug)]
pub struct MemoryGameLogStore {
    capacity: usize,
    logs: Mutex<VecDeque<GameLog>>,
}

impl MemoryGameLogStore {
    const DEFAULT_CAPACITY: usize = 256;

    /// A store that forgets the oldest log once `capacity` are held.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            logs: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }
}

impl Default for MemoryGameLogStore {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl GameLogStore for MemoryGameLogStore {
    async fn save(&self, log: GameLog) -> Result<(), GameError> {
        let mut logs = self.logs.lock().await;
        if self.capacity == 0 {
            return Ok(());
        }
        while logs.len() >= self.capacity {
            logs.pop_front();
        }
        tracing::debug!(room_id = %log.room_id, result = %log.result, "game log saved");
        logs.push_back(log);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<GameLog>, GameError> {
        let logs = self.logs.lock().await;
        Ok(logs.iter().rev().take(limit).cloned().collect())
    }
}
