mod adapter;
mod agent;
pub mod algorithms;
mod human;
pub mod networks;
mod random;

pub use adapter::{AdapterConfig, GameAdapter};
pub use agent::{Agent, EvalState, TrainableAgent, Transition, UpdateMetrics};
pub use algorithms::{DqnAgent, DqnConfig, QLearningAgent, QLearningConfig};
pub use human::HumanAgent;
pub use networks::{Matrix, QNetwork};
pub use random::RandomAgent;
