use serde::{Deserialize, Serialize};

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    /// Greedy win rate of the first seat against a random opponent.
    pub eval_win_rate: f32,
    pub first_seat_win_rate: f32,
    pub draw_rate: f32,
    pub average_game_length: f32,
    pub current_loss: f32,
    pub learn_steps: usize,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub episode: usize,
    pub timestamp: u64,
    pub algorithm: String,
    pub game: String,
    pub metrics: CheckpointMetrics,
    /// Seat names with a state file in the checkpoint directory.
    #[serde(default)]
    pub seats: Vec<String>,
}
