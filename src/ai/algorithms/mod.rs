mod dqn;
mod q_learning;

pub use dqn::{DqnAgent, DqnConfig, DqnTrainingState};
pub use q_learning::{QLearningAgent, QLearningConfig};
