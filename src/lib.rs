//! # ML Self-Play
//!
//! Self-play reinforcement learning for small two-player turn-based games.
//! Agents learn Q-values either with a hand-rolled two-layer network and a
//! periodically synchronized target network (DQN) or with a lookup table.
//!
//! ## Modules
//!
//! - [`ai`]: Agent traits, game adapter contract, DQN and tabular agents, networks
//! - [`game`]: Rule engines: Nim and Tic-Tac-Toe
//! - [`training`]: Episode loop, reward shaping, self-play trainer, metrics
//! - [`checkpoint`]: Agent persistence and versioning
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;
