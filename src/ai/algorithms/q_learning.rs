use std::collections::HashMap;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ai::adapter::{AdapterConfig, GameAdapter};
use crate::ai::agent::{Agent, EvalState, TrainableAgent, Transition, UpdateMetrics};
use crate::error::{CheckpointError, ConfigError, TrainingError};

/// Tabular Q-learning hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    pub learning_rate: f32,
    pub discount_factor: f32,
    pub epsilon_start: f32,
    pub epsilon_decay: f32,
    pub min_epsilon: f32,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        QLearningConfig {
            learning_rate: 0.1,
            discount_factor: 0.9,
            epsilon_start: 1.0,
            epsilon_decay: 0.9999,
            min_epsilon: 0.01,
        }
    }
}

impl QLearningConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.learning_rate <= 0.0 || self.learning_rate > 1.0 {
            return Err(ConfigError::Validation(
                "q_learning.learning_rate must be in (0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(ConfigError::Validation(
                "q_learning.discount_factor must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.epsilon_start) || !(0.0..=1.0).contains(&self.min_epsilon) {
            return Err(ConfigError::Validation(
                "q_learning epsilons must be in [0, 1]".into(),
            ));
        }
        if self.epsilon_decay <= 0.0 || self.epsilon_decay > 1.0 {
            return Err(ConfigError::Validation(
                "q_learning.epsilon_decay must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct QLearningTrainingState<B> {
    epsilon: f32,
    learn_step: usize,
    config: QLearningConfig,
    // JSON maps need string keys, so boards are stored as pairs.
    table: Vec<(B, Vec<(usize, f32)>)>,
}

/// Q-learning over an explicit `board -> action -> value` table.
pub struct QLearningAgent<A: GameAdapter> {
    adapter: A,
    adapter_config: AdapterConfig,
    q_table: HashMap<A::Board, HashMap<usize, f32>>,
    config: QLearningConfig,
    epsilon: f32,
    learn_step: usize,
    rng: StdRng,
}

impl<A: GameAdapter> QLearningAgent<A> {
    pub fn new(adapter: A, config: QLearningConfig, rng: StdRng) -> Result<Self, ConfigError> {
        let adapter_config = adapter.config();
        adapter_config.validate()?;
        config.validate()?;
        Ok(QLearningAgent {
            adapter,
            adapter_config,
            q_table: HashMap::new(),
            epsilon: config.epsilon_start,
            config,
            learn_step: 0,
            rng,
        })
    }

    pub fn with_seed(adapter: A, config: QLearningConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::new(adapter, config, StdRng::seed_from_u64(seed))
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, eps: f32) {
        self.epsilon = eps;
    }

    pub fn learn_step(&self) -> usize {
        self.learn_step
    }

    /// Number of distinct boards in the table.
    pub fn table_len(&self) -> usize {
        self.q_table.len()
    }

    /// Stored value for `(board, action)`, defaulting to 0.
    pub fn q_value(&self, board: &A::Board, action: usize) -> f32 {
        self.q_table
            .get(board)
            .and_then(|row| row.get(&action))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn make_move(&mut self, board: &A::Board) -> Option<usize> {
        let valid_moves = self.adapter.valid_moves(board);
        if valid_moves.is_empty() {
            return None;
        }

        let action = if self.rng.random::<f32>() < self.epsilon {
            valid_moves[self.rng.random_range(0..valid_moves.len())]
        } else {
            let mut best = valid_moves[0];
            let mut best_q = f32::NEG_INFINITY;
            for &action in &valid_moves {
                let q = self.q_value(board, action);
                if q > best_q {
                    best_q = q;
                    best = action;
                }
            }
            best
        };
        trace!("q-learning action {} from {:?}", action, board);

        let decayed = (self.epsilon * self.config.epsilon_decay).max(self.config.min_epsilon);
        self.epsilon = self.epsilon.min(decayed);
        Some(action)
    }

    /// One Q-learning update per transition, in order.
    pub fn learn(
        &mut self,
        history: &[Transition<A::Board>],
    ) -> Result<UpdateMetrics, TrainingError> {
        if history.is_empty() {
            return Ok(UpdateMetrics::default());
        }

        for transition in history {
            if transition.action >= self.adapter_config.output_size {
                return Err(TrainingError::IllegalAction {
                    action: transition.action,
                    legal: self.adapter.valid_moves(&transition.state),
                });
            }
        }

        let mut squared_error = 0.0;
        for transition in history {
            let old_q = self.q_value(&transition.state, transition.action);
            let max_future_q = match self.q_table.get(&transition.next_state) {
                Some(row) => self
                    .adapter
                    .valid_moves(&transition.next_state)
                    .iter()
                    .map(|action| row.get(action).copied().unwrap_or(0.0))
                    .reduce(f32::max)
                    .unwrap_or(0.0),
                None => 0.0,
            };

            let td_error =
                transition.reward + self.config.discount_factor * max_future_q - old_q;
            squared_error += td_error * td_error;
            self.q_table
                .entry(transition.state.clone())
                .or_default()
                .insert(transition.action, old_q + self.config.learning_rate * td_error);
        }

        self.learn_step += 1;
        let loss = squared_error / history.len() as f32;
        debug!(
            "q-learning step {}: batch {}, mean td error^2 {:.6}, table size {}",
            self.learn_step,
            history.len(),
            loss,
            self.q_table.len()
        );

        Ok(UpdateMetrics {
            loss,
            batch_size: history.len(),
            target_synced: false,
        })
    }
}

impl<A: GameAdapter> Agent<A::Board> for QLearningAgent<A> {
    fn select_action(&mut self, board: &A::Board) -> Result<Option<usize>, TrainingError> {
        Ok(self.make_move(board))
    }

    fn learn(&mut self, history: &[Transition<A::Board>]) -> Result<UpdateMetrics, TrainingError> {
        QLearningAgent::learn(self, history)
    }

    fn name(&self) -> &str {
        "QLearning"
    }

    fn epsilon(&self) -> f32 {
        self.epsilon
    }

    fn enter_eval_mode(&mut self) -> EvalState {
        let saved = self.epsilon;
        self.epsilon = 0.0;
        EvalState::Epsilon(saved)
    }

    fn exit_eval_mode(&mut self, state: EvalState) {
        if let EvalState::Epsilon(eps) = state {
            self.epsilon = eps;
        }
    }
}

impl<A: GameAdapter> TrainableAgent<A::Board> for QLearningAgent<A> {
    fn algorithm_name(&self) -> &str {
        "QLearning"
    }

    fn learn_step(&self) -> usize {
        self.learn_step
    }

    fn training_state_json(&self) -> Result<String, serde_json::Error> {
        let state = QLearningTrainingState {
            epsilon: self.epsilon,
            learn_step: self.learn_step,
            config: self.config.clone(),
            table: self
                .q_table
                .iter()
                .map(|(board, row)| {
                    let mut values: Vec<(usize, f32)> = row.iter().map(|(&a, &q)| (a, q)).collect();
                    values.sort_by_key(|(a, _)| *a);
                    (board.clone(), values)
                })
                .collect(),
        };
        serde_json::to_string(&state)
    }

    fn restore_training_state_json(&mut self, json: &str) -> Result<(), CheckpointError> {
        let state: QLearningTrainingState<A::Board> = serde_json::from_str(json)?;
        let output_size = self.adapter_config.output_size;
        let max_action = state
            .table
            .iter()
            .flat_map(|(_, row)| row.iter().map(|(action, _)| *action))
            .max();
        if let Some(action) = max_action.filter(|&a| a >= output_size) {
            return Err(CheckpointError::Incompatible(format!(
                "table holds action {action}, game has {output_size} actions"
            )));
        }

        self.epsilon = state.epsilon;
        self.learn_step = state.learn_step;
        self.config = state.config;
        self.q_table = state
            .table
            .into_iter()
            .map(|(board, row)| (board, row.into_iter().collect()))
            .collect();
        Ok(())
    }
}
