//! Hand-rolled dense network used as the Q-value function approximator.

mod matrix;
mod q_network;

pub use matrix::Matrix;
pub use q_network::{Parameters, QNetwork};
