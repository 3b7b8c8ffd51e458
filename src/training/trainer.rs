use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::ai::TrainableAgent;
use crate::checkpoint::{CheckpointManager, CheckpointMetrics};
use crate::error::TrainingError;
use crate::game::{BoardOf, Game, Player};
use crate::training::episode::{episode_seed, evaluate, play_episode, shape_rewards};
use crate::training::metrics::TrainingMetrics;

/// Terminal rewards handed to each seat at the end of an episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub win: f32,
    pub loss: f32,
    pub draw: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            win: 1.0,
            loss: -1.0,
            draw: 0.1,
        }
    }
}

/// Trainer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    pub log_interval: usize,
    /// Episodes between evaluations against a random opponent. 0 disables.
    pub eval_interval: usize,
    pub eval_games: usize,
    /// Episodes between checkpoints. 0 disables.
    pub checkpoint_interval: usize,
    /// Per-step discount applied when spreading the terminal reward backwards.
    pub reward_discount: f32,
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 1000,
            log_interval: 100,
            eval_interval: 500,
            eval_games: 100,
            checkpoint_interval: 0,
            reward_discount: 0.9,
            seed: None,
        }
    }
}

/// Outcome of a [`Trainer::train`] run.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub last_episode: usize,
    pub first_seat_win_rate: f32,
    pub draw_rate: f32,
    pub average_loss: f32,
    pub final_eval_win_rate: f32,
}

/// Self-play trainer: one learning agent per seat.
pub struct Trainer {
    config: TrainerConfig,
    rewards: RewardConfig,
    checkpoint_manager: CheckpointManager,
}

fn is_due(episode: usize, interval: usize) -> bool {
    interval > 0 && episode % interval == 0
}

impl Trainer {
    pub fn new(
        config: TrainerConfig,
        rewards: RewardConfig,
        checkpoint_manager: CheckpointManager,
    ) -> Self {
        Trainer {
            config,
            rewards,
            checkpoint_manager,
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run `num_episodes` episodes after `start_episode`. Both seats learn
    /// from their own shaped history after every episode.
    pub fn train<G, F, S>(
        &self,
        first: &mut F,
        second: &mut S,
        start_episode: usize,
    ) -> Result<TrainingSummary, TrainingError>
    where
        G: Game,
        F: TrainableAgent<BoardOf<G>>,
        S: TrainableAgent<BoardOf<G>>,
    {
        let window = self.config.log_interval.max(1);
        let mut metrics = TrainingMetrics::with_capacity(window);
        let end_episode = start_episode + self.config.num_episodes;

        info!(
            "Starting {} training on {} for {} episodes (episodes {}..{})",
            first.algorithm_name(),
            G::NAME,
            self.config.num_episodes,
            start_episode + 1,
            end_episode
        );

        for episode in start_episode + 1..=end_episode {
            let mut trace = play_episode(G::initial(), first, second)?;
            shape_rewards(&mut trace, &self.rewards, self.config.reward_discount);

            for update in [first.learn(&trace.first)?, second.learn(&trace.second)?] {
                if update.batch_size > 0 {
                    metrics.record_update(update.loss);
                }
            }
            metrics.record_episode(trace.result);

            if is_due(episode, self.config.log_interval) {
                info!(
                    "Episode {}/{} | eps: {:.3}/{:.3} | loss: {:.4} | first wins: {:.1}% | draws: {:.1}% | avg_len: {:.1}",
                    episode,
                    end_episode,
                    first.epsilon(),
                    second.epsilon(),
                    metrics.average_loss(window),
                    metrics.win_rate(Player::First, window) * 100.0,
                    metrics.draw_rate(window) * 100.0,
                    metrics.average_game_length(window),
                );
            }

            let mut eval_win_rate = None;
            if is_due(episode, self.config.eval_interval) {
                let rate = self.evaluate::<G>(first, episode)?;
                info!(
                    "  >> Eval vs Random ({} games): {:.1}% win rate",
                    self.config.eval_games,
                    rate * 100.0
                );
                eval_win_rate = Some(rate);
            }

            if is_due(episode, self.config.checkpoint_interval) {
                let eval_win_rate = match eval_win_rate {
                    Some(rate) => rate,
                    None => self.evaluate::<G>(first, episode)?,
                };
                let ckpt_metrics = CheckpointMetrics {
                    eval_win_rate,
                    first_seat_win_rate: metrics.win_rate(Player::First, window),
                    draw_rate: metrics.draw_rate(window),
                    average_game_length: metrics.average_game_length(window),
                    current_loss: metrics.average_loss(window),
                    learn_steps: first.learn_step(),
                };
                let seats: [(Player, &dyn TrainableAgent<BoardOf<G>>); 2] =
                    [(Player::First, &*first), (Player::Second, &*second)];
                let saved = self
                    .checkpoint_manager
                    .save_checkpoint(G::NAME, &seats, &ckpt_metrics, episode);
                if let Err(e) = saved {
                    warn!("checkpoint at episode {} failed: {}", episode, e);
                }
            }
        }

        let final_eval_win_rate = self.evaluate::<G>(first, end_episode + 1)?;
        info!(
            "Training complete. Total episodes: {}. Final eval vs Random: {:.1}% win rate",
            metrics.total_episodes(),
            final_eval_win_rate * 100.0
        );

        Ok(TrainingSummary {
            last_episode: end_episode,
            first_seat_win_rate: metrics.win_rate(Player::First, window),
            draw_rate: metrics.draw_rate(window),
            average_loss: metrics.average_loss(window),
            final_eval_win_rate,
        })
    }

    /// Greedy win rate of `agent` against a random opponent.
    pub fn evaluate<G: Game>(
        &self,
        agent: &mut dyn crate::ai::Agent<BoardOf<G>>,
        episode: usize,
    ) -> Result<f32, TrainingError> {
        let seed = self.config.seed.map(|s| episode_seed(s, episode));
        evaluate::<G>(agent, self.config.eval_games, seed)
    }
}
