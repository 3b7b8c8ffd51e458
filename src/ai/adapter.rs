use std::fmt::Debug;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Static description of a game, as seen by a learning agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Width of an encoded state row.
    pub input_size: usize,
    /// Number of distinct action slots (network outputs).
    pub output_size: usize,
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,
    /// Output index -> game-specific action value. `None` means identity.
    #[serde(default)]
    pub game_actions: Option<Vec<i64>>,
}

fn default_hidden_size() -> usize {
    128
}

impl AdapterConfig {
    pub fn new(input_size: usize, output_size: usize) -> Self {
        AdapterConfig {
            input_size,
            output_size,
            hidden_size: default_hidden_size(),
            game_actions: None,
        }
    }

    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn with_game_actions(mut self, actions: Vec<i64>) -> Self {
        self.game_actions = Some(actions);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_size == 0 {
            return Err(ConfigError::Validation("input_size must be > 0".into()));
        }
        if self.output_size == 0 {
            return Err(ConfigError::Validation("output_size must be > 0".into()));
        }
        if self.hidden_size == 0 {
            return Err(ConfigError::Validation("hidden_size must be > 0".into()));
        }
        if let Some(actions) = &self.game_actions {
            if actions.len() != self.output_size {
                return Err(ConfigError::Validation(format!(
                    "game_actions has {} entries but output_size is {}",
                    actions.len(),
                    self.output_size
                )));
            }
        }
        Ok(())
    }

    /// Game-specific action value for a network output index.
    pub fn game_action(&self, index: usize) -> Option<i64> {
        match &self.game_actions {
            Some(actions) => actions.get(index).copied(),
            None if index < self.output_size => Some(index as i64),
            None => None,
        }
    }
}

/// Capability interface an agent needs from a game: its dimensions, the legal
/// moves from a board, and a numeric encoding of a board.
///
/// Both functions must be pure: equal boards give equal results.
pub trait GameAdapter {
    /// Raw board value. Used as a table key and stored in transitions.
    type Board: Clone + Eq + Hash + Debug + Serialize + DeserializeOwned;

    fn config(&self) -> AdapterConfig;

    /// Output indices that are legal from `board`, in ascending order.
    /// Empty for terminal boards.
    fn valid_moves(&self, board: &Self::Board) -> Vec<usize>;

    /// Encode `board` as one row of width `config().input_size`.
    fn encode_state(&self, board: &Self::Board) -> Vec<f32>;

    /// Text shown to a human player before their move.
    fn render(&self, board: &Self::Board) -> String {
        format!("{board:?}")
    }
}
