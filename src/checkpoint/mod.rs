//! On-disk snapshots of trained agents: one directory per checkpoint holding
//! metadata plus each seat's learned state.

mod manager;
mod metadata;

pub use manager::{CheckpointData, CheckpointManager, CheckpointManagerConfig};
pub use metadata::{CheckpointMetadata, CheckpointMetrics};
