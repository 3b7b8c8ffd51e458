//! Training infrastructure: the episode loop with terminal reward shaping,
//! the self-play trainer, evaluation against a random opponent, and metrics.

pub mod episode;
pub mod metrics;
pub mod trainer;

pub use episode::{
    apply_terminal_reward, episode_seed, evaluate, play_episode, shape_rewards, terminal_reward,
    EpisodeTrace,
};
pub use metrics::{EpisodeResult, TrainingMetrics};
pub use trainer::{RewardConfig, Trainer, TrainerConfig, TrainingSummary};
