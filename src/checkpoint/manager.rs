use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::ai::TrainableAgent;
use crate::checkpoint::metadata::{CheckpointMetadata, CheckpointMetrics};
use crate::error::CheckpointError;
use crate::game::Player;

const LATEST: &str = "latest";
const METADATA: &str = "metadata.json";

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    pub keep_last_n: usize,
    /// Additionally keep this many checkpoints with the best eval win rate.
    pub keep_best_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_last_n: 5,
            keep_best_n: 1,
        }
    }
}

/// A checkpoint read back from disk. Seat states are loaded on demand.
#[derive(Debug)]
pub struct CheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
}

impl CheckpointData {
    fn seat_path(&self, seat: Player) -> PathBuf {
        self.path.join(format!("{}.json", seat.name()))
    }

    /// Raw JSON state saved for `seat`.
    pub fn seat_state_json(&self, seat: Player) -> Result<String, CheckpointError> {
        let path = self.seat_path(seat);
        if !path.exists() {
            return Err(CheckpointError::StateMissing {
                path: self.path.clone(),
                seat: seat.name().to_string(),
            });
        }
        Ok(fs::read_to_string(path)?)
    }

    /// Restore `agent` from the state saved for `seat`.
    pub fn restore_seat<B, T>(&self, seat: Player, agent: &mut T) -> Result<(), CheckpointError>
    where
        T: TrainableAgent<B> + ?Sized,
    {
        if self.metadata.algorithm != agent.algorithm_name() {
            return Err(CheckpointError::Incompatible(format!(
                "checkpoint holds {} agents, got {}",
                self.metadata.algorithm,
                agent.algorithm_name()
            )));
        }
        agent.restore_training_state_json(&self.seat_state_json(seat)?)
    }
}

/// Manages saving, loading, listing, and pruning checkpoints.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Self {
        CheckpointManager { config }
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.config.checkpoint_dir
    }

    /// Save one state file per seat plus metadata, then move `latest` to it.
    pub fn save_checkpoint<B>(
        &self,
        game: &str,
        seats: &[(Player, &dyn TrainableAgent<B>)],
        metrics: &CheckpointMetrics,
        episode: usize,
    ) -> Result<PathBuf, CheckpointError> {
        let dir_name = format!("checkpoint_{:07}", episode);
        let tmp_dir = self.config.checkpoint_dir.join(format!("{}.tmp", dir_name));
        let final_dir = self.config.checkpoint_dir.join(&dir_name);

        if tmp_dir.exists() {
            fs::remove_dir_all(&tmp_dir)?;
        }
        fs::create_dir_all(&tmp_dir)?;

        for (seat, agent) in seats {
            let state = agent.training_state_json()?;
            fs::write(tmp_dir.join(format!("{}.json", seat.name())), state)?;
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let algorithm = seats
            .first()
            .map(|(_, agent)| agent.algorithm_name().to_string())
            .unwrap_or_default();
        let metadata = CheckpointMetadata {
            episode,
            timestamp,
            algorithm,
            game: game.to_string(),
            metrics: metrics.clone(),
            seats: seats.iter().map(|(seat, _)| seat.name().to_string()).collect(),
        };
        fs::write(tmp_dir.join(METADATA), serde_json::to_string_pretty(&metadata)?)?;

        // Atomic rename
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest(&dir_name)?;
        self.prune_old_checkpoints()?;

        info!("checkpoint saved: {}", final_dir.display());
        Ok(final_dir)
    }

    /// Load the metadata of the checkpoint in `dir`.
    pub fn load_checkpoint(&self, dir: &Path) -> Result<CheckpointData, CheckpointError> {
        if !dir.is_dir() {
            return Err(CheckpointError::DirNotFound(dir.to_path_buf()));
        }
        Ok(CheckpointData {
            path: dir.to_path_buf(),
            metadata: read_metadata(&dir.join(METADATA))?,
        })
    }

    /// Load the checkpoint the `latest` pointer names.
    pub fn load_latest(&self) -> Result<CheckpointData, CheckpointError> {
        let pointer = self.config.checkpoint_dir.join(LATEST);
        if !pointer.is_file() {
            return Err(CheckpointError::NoLatest(self.config.checkpoint_dir.clone()));
        }
        let dir_name = fs::read_to_string(&pointer)?;
        self.load_checkpoint(&self.config.checkpoint_dir.join(dir_name.trim()))
    }

    /// List all checkpoints sorted by episode (ascending).
    pub fn list_checkpoints(&self) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        if !self.config.checkpoint_dir.is_dir() {
            return Err(CheckpointError::DirNotFound(self.config.checkpoint_dir.clone()));
        }
        let mut results = Vec::new();
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if !name_str.starts_with("checkpoint_") || name_str.ends_with(".tmp") {
                continue;
            }
            let meta_path = path.join(METADATA);
            if meta_path.exists() {
                let metadata = read_metadata(&meta_path)?;
                results.push((path, metadata));
            }
        }
        results.sort_by_key(|(_, m)| m.episode);
        Ok(results)
    }

    /// Prune old checkpoints, keeping the union of the last N and best N by eval win rate.
    fn prune_old_checkpoints(&self) -> Result<(), CheckpointError> {
        let checkpoints = self.list_checkpoints()?;
        if checkpoints.len() <= self.config.keep_last_n {
            return Ok(());
        }

        let total = checkpoints.len();
        let mut keep: HashSet<usize> =
            (total.saturating_sub(self.config.keep_last_n)..total).collect();

        let mut by_win_rate: Vec<(usize, f32)> = checkpoints
            .iter()
            .enumerate()
            .map(|(i, (_, m))| (i, m.metrics.eval_win_rate))
            .collect();
        by_win_rate.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        keep.extend(by_win_rate.iter().take(self.config.keep_best_n).map(|&(i, _)| i));

        for (i, (path, _)) in checkpoints.iter().enumerate() {
            if !keep.contains(&i) {
                debug!("pruning checkpoint {}", path.display());
                fs::remove_dir_all(path)?;
            }
        }

        Ok(())
    }

    /// Point `latest` at the given checkpoint directory name.
    fn update_latest(&self, dir_name: &str) -> Result<(), CheckpointError> {
        let pointer = self.config.checkpoint_dir.join(LATEST);
        let tmp = self.config.checkpoint_dir.join(format!("{}.tmp", LATEST));
        fs::write(&tmp, dir_name)?;
        fs::rename(&tmp, &pointer)?;
        Ok(())
    }
}

fn read_metadata(path: &Path) -> Result<CheckpointMetadata, CheckpointError> {
    let json = fs::read_to_string(path).map_err(|e| CheckpointError::MetadataRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&json).map_err(|e| CheckpointError::MetadataParse {
        path: path.to_path_buf(),
        source: e,
    })
}
