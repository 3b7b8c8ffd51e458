use serde::{Deserialize, Serialize};

use crate::error::{CheckpointError, TrainingError};

/// A single turn taken by one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<B> {
    pub state: B,
    /// Zero-based index into the network's output vector.
    pub action: usize,
    pub reward: f32,
    pub next_state: B,
}

/// Metrics returned from a learning update.
#[derive(Debug, Clone, Default)]
pub struct UpdateMetrics {
    pub loss: f32,
    pub batch_size: usize,
    pub target_synced: bool,
}

/// Opaque eval state for enter/exit eval mode.
pub enum EvalState {
    Epsilon(f32),
    NoOp,
}

/// Universal interface for agents that play a game whose boards are `B`.
pub trait Agent<B> {
    /// Choose an action index for `board`, or `None` when no legal move exists.
    fn select_action(&mut self, board: &B) -> Result<Option<usize>, TrainingError>;

    /// Learn from one player's transitions of a finished episode.
    fn learn(&mut self, history: &[Transition<B>]) -> Result<UpdateMetrics, TrainingError>;

    /// Return the agent's display name.
    fn name(&self) -> &str;

    /// Current exploration rate.
    fn epsilon(&self) -> f32 {
        0.0
    }

    /// Enter greedy evaluation mode. Returns state to restore.
    fn enter_eval_mode(&mut self) -> EvalState {
        EvalState::NoOp
    }

    /// Exit eval mode, restoring previous state.
    fn exit_eval_mode(&mut self, _state: EvalState) {}
}

/// Extension trait for agents whose learned state can be checkpointed.
pub trait TrainableAgent<B>: Agent<B> {
    /// Algorithm name for logging and checkpoint metadata ("DQN", "QLearning").
    fn algorithm_name(&self) -> &str;
    /// Number of `learn` calls that processed a non-empty history.
    fn learn_step(&self) -> usize;
    /// Serialize the full learned state to JSON.
    fn training_state_json(&self) -> Result<String, serde_json::Error>;
    /// Restore learned state produced by [`TrainableAgent::training_state_json`].
    fn restore_training_state_json(&mut self, json: &str) -> Result<(), CheckpointError>;
}
