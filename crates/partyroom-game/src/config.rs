//! Game configuration: what the coordinator draws from.

use partyroom_protocol::MissionKind;
use serde::{Deserialize, Serialize};

/// One liar-game round's words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSet {
    /// Given to every citizen.
    pub answer: String,
    /// Given to the liar in fool mode.
    pub decoy: String,
    /// Shown to everyone.
    pub topic: String,
}

impl WordSet {
    pub fn new(answer: &str, decoy: &str, topic: &str) -> Self {
        Self {
            answer: answer.into(),
            decoy: decoy.into(),
            topic: topic.into(),
        }
    }
}

/// A mission a mafia-game player may be handed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionTemplate {
    pub text: String,
    pub kind: MissionKind,
    /// Whether the mission names another player as its target.
    pub targeted: bool,
}

impl MissionTemplate {
    pub fn new(text: &str, kind: MissionKind, targeted: bool) -> Self {
        Self {
            text: text.into(),
            kind,
            targeted,
        }
    }
}

/// Settings for every game the coordinator runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Minimum players required to start.
    pub min_players: usize,

    /// Liar-game word pool. One set is drawn per game.
    pub word_sets: Vec<WordSet>,

    /// Mafia-game mission pool. One template is drawn per player.
    pub missions: Vec<MissionTemplate>,

    /// How long the opening phase lasts before voting opens.
    /// `None` means phases only change on player action.
    pub discussion_secs: Option<u64>,
}

impl GameConfig {
    pub fn with_min_players(mut self, min_players: usize) -> Self {
        self.min_players = min_players;
        self
    }

    pub fn with_word_sets(mut self, word_sets: Vec<WordSet>) -> Self {
        self.word_sets = word_sets;
        self
    }

    pub fn with_missions(mut self, missions: Vec<MissionTemplate>) -> Self {
        self.missions = missions;
        self
    }

    pub fn with_discussion_secs(mut self, secs: Option<u64>) -> Self {
        self.discussion_secs = secs;
        self
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 3,
            word_sets: vec![
                WordSet::new("apple", "pear", "fruit"),
                WordSet::new("puppy", "kitten", "animals"),
                WordSet::new("soccer", "basketball", "sports"),
            ],
            missions: vec![
                MissionTemplate::new(
                    "Ask someone what they had for breakfast",
                    MissionKind::Question,
                    false,
                ),
                MissionTemplate::new(
                    "Get your target to name their favourite colour",
                    MissionKind::Question,
                    true,
                ),
                MissionTemplate::new(
                    "Make your target laugh",
                    MissionKind::Action,
                    true,
                ),
                MissionTemplate::new(
                    "Clap twice while someone else is talking",
                    MissionKind::Action,
                    false,
                ),
            ],
            discussion_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_three_player_minimum_and_pools() {
        let config = GameConfig::default();
        assert_eq!(config.min_players, 3);
        assert!(!config.word_sets.is_empty());
        assert!(!config.missions.is_empty());
        assert_eq!(config.discussion_secs, None);
    }

    #[test]
    fn test_with_methods_override() {
        let config = GameConfig::default()
            .with_min_players(4)
            .with_word_sets(vec![WordSet::new("a", "b", "c")])
            .with_discussion_secs(Some(90));
        assert_eq!(config.min_players, 4);
        assert_eq!(config.word_sets.len(), 1);
        assert_eq!(config.discussion_secs, Some(90));
    }
}
