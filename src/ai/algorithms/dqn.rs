use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ai::adapter::{AdapterConfig, GameAdapter};
use crate::ai::agent::{Agent, EvalState, TrainableAgent, Transition, UpdateMetrics};
use crate::ai::networks::{Matrix, QNetwork};
use crate::error::{CheckpointError, ConfigError, NetworkError, TrainingError};

/// DQN hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub learning_rate: f32,
    pub discount_factor: f32,
    pub epsilon_start: f32,
    /// Multiplicative decay applied after every action selection.
    pub epsilon_decay: f32,
    pub min_epsilon: f32,
    /// Number of `learn` calls between hard target-network syncs.
    pub target_update_freq: usize,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            learning_rate: 0.001,
            discount_factor: 0.9,
            epsilon_start: 1.0,
            epsilon_decay: 0.9999,
            min_epsilon: 0.01,
            target_update_freq: 10,
        }
    }
}

impl DqnConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.learning_rate <= 0.0 {
            return Err(ConfigError::Validation("dqn.learning_rate must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(ConfigError::Validation(
                "dqn.discount_factor must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.epsilon_start) {
            return Err(ConfigError::Validation(
                "dqn.epsilon_start must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_epsilon) {
            return Err(ConfigError::Validation(
                "dqn.min_epsilon must be in [0, 1]".into(),
            ));
        }
        if self.epsilon_decay <= 0.0 || self.epsilon_decay > 1.0 {
            return Err(ConfigError::Validation(
                "dqn.epsilon_decay must be in (0, 1]".into(),
            ));
        }
        if self.target_update_freq == 0 {
            return Err(ConfigError::Validation(
                "dqn.target_update_freq must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Everything a DQN agent has learned, as written to checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqnTrainingState {
    pub epsilon: f32,
    pub learn_step: usize,
    pub config: DqnConfig,
    pub online_network: QNetwork,
    pub target_network: QNetwork,
}

/// Epsilon-greedy DQN agent with an online network and a periodically
/// synchronised target network.
pub struct DqnAgent<A: GameAdapter> {
    adapter: A,
    adapter_config: AdapterConfig,
    online_network: QNetwork,
    target_network: QNetwork,
    config: DqnConfig,
    epsilon: f32,
    learn_step: usize,
    rng: StdRng,
}

impl<A: GameAdapter> DqnAgent<A> {
    /// Build an agent for `adapter`. Fails if either configuration is invalid.
    pub fn new(adapter: A, config: DqnConfig, mut rng: StdRng) -> Result<Self, ConfigError> {
        let adapter_config = adapter.config();
        adapter_config.validate()?;
        config.validate()?;

        let online_network = QNetwork::new(
            adapter_config.input_size,
            adapter_config.hidden_size,
            adapter_config.output_size,
            &mut rng,
        );
        let target_network = online_network.snapshot();

        Ok(DqnAgent {
            adapter,
            adapter_config,
            online_network,
            target_network,
            epsilon: config.epsilon_start,
            config,
            learn_step: 0,
            rng,
        })
    }

    pub fn with_seed(adapter: A, config: DqnConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::new(adapter, config, StdRng::seed_from_u64(seed))
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Set epsilon directly (e.g. 0.0 for pure greedy inference).
    pub fn set_epsilon(&mut self, eps: f32) {
        self.epsilon = eps;
    }

    pub fn learn_step(&self) -> usize {
        self.learn_step
    }

    pub fn online_network(&self) -> &QNetwork {
        &self.online_network
    }

    pub fn target_network(&self) -> &QNetwork {
        &self.target_network
    }

    /// Epsilon-greedy choice among the legal moves of `board`.
    pub fn make_move(&mut self, board: &A::Board) -> Result<Option<usize>, TrainingError> {
        let valid_moves = self.adapter.valid_moves(board);
        if valid_moves.is_empty() {
            trace!("no legal move from {:?}", board);
            return Ok(None);
        }
        if let Some(&action) = valid_moves
            .iter()
            .find(|&&action| action >= self.adapter_config.output_size)
        {
            return Err(TrainingError::IllegalAction {
                action,
                legal: valid_moves,
            });
        }

        let action = if self.rng.random::<f32>() < self.epsilon {
            let idx = self.rng.random_range(0..valid_moves.len());
            trace!("explore: action {} (eps {:.4})", valid_moves[idx], self.epsilon);
            valid_moves[idx]
        } else {
            let action = self.greedy_action(board, &valid_moves)?;
            trace!("exploit: action {} (eps {:.4})", action, self.epsilon);
            action
        };

        self.decay_epsilon();
        Ok(Some(action))
    }

    /// Highest-Q action restricted to `valid_moves`; ties go to the first.
    fn greedy_action(
        &mut self,
        board: &A::Board,
        valid_moves: &[usize],
    ) -> Result<usize, TrainingError> {
        let x = self.encode_batch(std::iter::once(board))?;
        let q_values = self.online_network.forward(&x)?;
        let q_row = q_values.row(0);

        let mut best_relative = 0;
        let mut best_q = f32::NEG_INFINITY;
        for (relative, &action) in valid_moves.iter().enumerate() {
            if q_row[action] > best_q {
                best_q = q_row[action];
                best_relative = relative;
            }
        }
        Ok(valid_moves[best_relative])
    }

    /// Geometric decay floored at `min_epsilon`. Never raises epsilon.
    fn decay_epsilon(&mut self) {
        let decayed = (self.epsilon * self.config.epsilon_decay).max(self.config.min_epsilon);
        self.epsilon = self.epsilon.min(decayed);
    }

    /// Temporal-difference update over one episode's transitions as a single batch.
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

        let old_states = self.encode_batch(history.iter().map(|t| &t.state))?;
        let new_states = self.encode_batch(history.iter().map(|t| &t.next_state))?;

        let q_predicted = self.online_network.forward(&old_states)?;
        let q_next = self.target_network.forward(&new_states)?;
        let q_target = self.td_targets(history, &q_predicted, &q_next);

        let loss = self
            .online_network
            .backward(&q_predicted, &q_target, self.config.learning_rate)?;

        self.learn_step += 1;
        let target_synced = self.learn_step % self.config.target_update_freq == 0;
        if target_synced {
            self.target_network = self.online_network.snapshot();
            debug!("target network synced at learn step {}", self.learn_step);
        }
        debug!(
            "learn step {}: batch {}, loss {:.6}",
            self.learn_step,
            history.len(),
            loss
        );

        Ok(UpdateMetrics {
            loss,
            batch_size: history.len(),
            target_synced,
        })
    }

    /// Copy of `q_predicted` with each taken action's column replaced by
    /// `reward + γ · max Q_target(s', a')` over the legal moves of `s'`.
    fn td_targets(
        &self,
        history: &[Transition<A::Board>],
        q_predicted: &Matrix,
        q_next: &Matrix,
    ) -> Matrix {
        let mut q_target = q_predicted.clone();
        for (i, transition) in history.iter().enumerate() {
            let valid_next = self.adapter.valid_moves(&transition.next_state);
            let max_future_q = if valid_next.is_empty() {
                0.0
            } else {
                valid_next
                    .iter()
                    .map(|&idx| q_next.get(i, idx))
                    .fold(f32::NEG_INFINITY, f32::max)
            };
            q_target.set(
                i,
                transition.action,
                transition.reward + self.config.discount_factor * max_future_q,
            );
        }
        q_target
    }

    fn encode_batch<'b>(
        &self,
        boards: impl Iterator<Item = &'b A::Board>,
    ) -> Result<Matrix, NetworkError>
    where
        A::Board: 'b,
    {
        let width = self.adapter_config.input_size;
        let mut data = Vec::new();
        let mut rows = 0;
        for board in boards {
            let row = self.adapter.encode_state(board);
            if row.len() != width {
                return Err(NetworkError::InputWidth {
                    expected: width,
                    actual: row.len(),
                });
            }
            data.extend(row);
            rows += 1;
        }
        Ok(Matrix::from_vec(rows, width, data))
    }

    /// Export current learned state for checkpointing.
    pub fn training_state(&self) -> DqnTrainingState {
        DqnTrainingState {
            epsilon: self.epsilon,
            learn_step: self.learn_step,
            config: self.config.clone(),
            online_network: self.online_network.snapshot(),
            target_network: self.target_network.snapshot(),
        }
    }

    /// Restore learned state from a checkpoint.
    pub fn restore_training_state(
        &mut self,
        state: DqnTrainingState,
    ) -> Result<(), CheckpointError> {
        let expected = (
            self.adapter_config.input_size,
            self.adapter_config.hidden_size,
            self.adapter_config.output_size,
        );
        for (name, net) in [("online", &state.online_network), ("target", &state.target_network)] {
            let actual = (net.input_size(), net.hidden_size(), net.output_size());
            if actual != expected {
                return Err(CheckpointError::Incompatible(format!(
                    "{name} network has dimensions {actual:?}, game expects {expected:?}"
                )));
            }
        }
        self.epsilon = state.epsilon;
        self.learn_step = state.learn_step;
        self.config = state.config;
        self.online_network = state.online_network;
        self.target_network = state.target_network;
        Ok(())
    }
}

impl<A: GameAdapter> Agent<A::Board> for DqnAgent<A> {
    fn select_action(&mut self, board: &A::Board) -> Result<Option<usize>, TrainingError> {
        self.make_move(board)
    }

    fn learn(&mut self, history: &[Transition<A::Board>]) -> Result<UpdateMetrics, TrainingError> {
        DqnAgent::learn(self, history)
    }

    fn name(&self) -> &str {
        "DQN"
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

impl<A: GameAdapter> TrainableAgent<A::Board> for DqnAgent<A> {
    fn algorithm_name(&self) -> &str {
        "DQN"
    }

    fn learn_step(&self) -> usize {
        self.learn_step
    }

    fn training_state_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.training_state())
    }

    fn restore_training_state_json(&mut self, json: &str) -> Result<(), CheckpointError> {
        let state: DqnTrainingState = serde_json::from_str(json)?;
        self.restore_training_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One-number board; action i removes i + 1 and is legal while it fits.
    struct CountdownAdapter;

    impl GameAdapter for CountdownAdapter {
        type Board = u32;

        fn config(&self) -> AdapterConfig {
            AdapterConfig::new(1, 3)
                .with_hidden_size(4)
                .with_game_actions(vec![1, 2, 3])
        }

        fn valid_moves(&self, board: &u32) -> Vec<usize> {
            (0..3).filter(|&i| i as u32 + 1 <= *board).collect()
        }

        fn encode_state(&self, board: &u32) -> Vec<f32> {
            vec![*board as f32]
        }
    }

    /// Four output slots, of which only the first three are ever legal.
    struct WideAdapter;

    impl GameAdapter for WideAdapter {
        type Board = Vec<i32>;

        fn config(&self) -> AdapterConfig {
            AdapterConfig::new(1, 4).with_hidden_size(4)
        }

        fn valid_moves(&self, board: &Vec<i32>) -> Vec<usize> {
            if board[0] == 0 {
                Vec::new()
            } else {
                vec![0, 1, 2]
            }
        }

        fn encode_state(&self, board: &Vec<i32>) -> Vec<f32> {
            board.iter().map(|&v| v as f32).collect()
        }
    }

    struct BadAdapter;

    impl GameAdapter for BadAdapter {
        type Board = u32;

        fn config(&self) -> AdapterConfig {
            AdapterConfig::new(1, 3).with_game_actions(vec![1, 2])
        }

        fn valid_moves(&self, _board: &u32) -> Vec<usize> {
            vec![0]
        }

        fn encode_state(&self, board: &u32) -> Vec<f32> {
            vec![*board as f32]
        }
    }

    /// Reports a move index past the end of its own output layer.
    struct OverflowAdapter;

    impl GameAdapter for OverflowAdapter {
        type Board = u32;

        fn config(&self) -> AdapterConfig {
            AdapterConfig::new(1, 3).with_hidden_size(4)
        }

        fn valid_moves(&self, _board: &u32) -> Vec<usize> {
            vec![0, 3]
        }

        fn encode_state(&self, board: &u32) -> Vec<f32> {
            vec![*board as f32]
        }
    }

    fn greedy_countdown() -> DqnAgent<CountdownAdapter> {
        let mut agent = DqnAgent::with_seed(CountdownAdapter, DqnConfig::default(), 1).unwrap();
        agent.set_epsilon(0.0);
        agent
    }

    /// Network whose output is `b2` for every input.
    fn constant_network(input: usize, hidden: usize, b2: Vec<f32>) -> QNetwork {
        let output = b2.len();
        QNetwork::from_parameters(
            Matrix::zeros(input, hidden),
            vec![0.0; hidden],
            Matrix::zeros(hidden, output),
            b2,
        )
    }

    #[test]
    fn test_invalid_adapter_config_fails_at_construction() {
        assert!(DqnAgent::with_seed(BadAdapter, DqnConfig::default(), 0).is_err());
    }

    #[test]
    fn test_invalid_dqn_config_fails_at_construction() {
        let config = DqnConfig {
            target_update_freq: 0,
            ..Default::default()
        };
        assert!(DqnAgent::with_seed(CountdownAdapter, config, 0).is_err());
    }

    #[test]
    fn test_target_starts_as_copy_of_online() {
        let agent = DqnAgent::with_seed(CountdownAdapter, DqnConfig::default(), 3).unwrap();
        assert_eq!(
            agent.online_network().parameters(),
            agent.target_network().parameters()
        );
    }

    #[test]
    fn test_make_move_returns_legal_or_none() {
        let mut agent = DqnAgent::with_seed(CountdownAdapter, DqnConfig::default(), 11).unwrap();
        for board in 0..6u32 {
            for _ in 0..20 {
                let legal = CountdownAdapter.valid_moves(&board);
                match agent.make_move(&board).unwrap() {
                    None => assert!(legal.is_empty()),
                    Some(action) => assert!(legal.contains(&action), "{action} not in {legal:?}"),
                }
            }
        }
    }

    #[test]
    fn test_no_move_does_not_decay_epsilon() {
        let mut agent = DqnAgent::with_seed(CountdownAdapter, DqnConfig::default(), 0).unwrap();
        assert_eq!(agent.make_move(&0).unwrap(), None);
        assert_eq!(agent.epsilon(), 1.0);
    }

    #[test]
    fn test_epsilon_non_increasing_and_floored() {
        let config = DqnConfig {
            epsilon_decay: 0.9,
            min_epsilon: 0.05,
            ..Default::default()
        };
        let mut agent = DqnAgent::with_seed(CountdownAdapter, config, 5).unwrap();
        let mut previous = agent.epsilon();
        for _ in 0..100 {
            agent.make_move(&7).unwrap();
            assert!(agent.epsilon() <= previous);
            assert!(agent.epsilon() >= 0.05);
            previous = agent.epsilon();
        }
        assert!((agent.epsilon() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_forced_zero_epsilon_stays_zero() {
        let mut agent = greedy_countdown();
        agent.make_move(&7).unwrap();
        assert_eq!(agent.epsilon(), 0.0);
    }

    #[test]
    fn test_greedy_is_deterministic() {
        let mut a = greedy_countdown();
        let mut b = greedy_countdown();
        for board in 1..8u32 {
            let first = a.make_move(&board).unwrap();
            assert_eq!(first, a.make_move(&board).unwrap());
            assert_eq!(first, b.make_move(&board).unwrap());
        }
    }

    #[test]
    fn test_greedy_ignores_higher_illegal_q() {
        let mut agent = DqnAgent::with_seed(WideAdapter, DqnConfig::default(), 0).unwrap();
        agent.set_epsilon(0.0);
        // a1 = [5, 0, 0, 0] for board [5]; q = [0.5, 1.5, 1.0, 50.0]
        let mut w1 = Matrix::zeros(1, 4);
        w1.set(0, 0, 1.0);
        let mut w2 = Matrix::zeros(4, 4);
        for (c, v) in [0.1, 0.3, 0.2, 10.0].into_iter().enumerate() {
            w2.set(0, c, v);
        }
        agent.online_network = QNetwork::from_parameters(w1, vec![0.0; 4], w2, vec![0.0; 4]);

        assert_eq!(agent.make_move(&vec![5]).unwrap(), Some(1));
    }

    #[test]
    fn test_greedy_picks_best_legal_column_on_full_row() {
        let mut agent = greedy_countdown();
        assert_eq!(CountdownAdapter.valid_moves(&5), vec![0, 1, 2]);
        // a1 = [5, 0, 0, 0] for board 5; q = [-9.0, 1.5, 1.0]
        let mut w1 = Matrix::zeros(1, 4);
        w1.set(0, 0, 1.0);
        let mut w2 = Matrix::zeros(4, 3);
        for (c, v) in [-1.8, 0.3, 0.2].into_iter().enumerate() {
            w2.set(0, c, v);
        }
        agent.online_network = QNetwork::from_parameters(w1, vec![0.0; 4], w2, vec![0.0; 3]);

        assert_eq!(agent.make_move(&5).unwrap(), Some(1));
        assert_eq!(agent.epsilon(), 0.0);
    }

    #[test]
    fn test_out_of_range_valid_move_is_an_error() {
        for epsilon in [0.0, 1.0] {
            let mut agent =
                DqnAgent::with_seed(OverflowAdapter, DqnConfig::default(), 4).unwrap();
            agent.set_epsilon(epsilon);
            let err = agent.make_move(&1).unwrap_err();
            match err {
                TrainingError::IllegalAction { action, legal } => {
                    assert_eq!(action, 3);
                    assert_eq!(legal, vec![0, 3]);
                }
                other => panic!("unexpected error: {other}"),
            }
            assert_eq!(agent.epsilon(), epsilon);
        }
    }

    #[test]
    fn test_greedy_remaps_relative_index() {
        let mut agent = greedy_countdown();
        // Only actions 0 and 1 are legal from board 2; column 2 has the highest Q.
        agent.online_network = constant_network(1, 4, vec![0.2, 0.7, 9.0]);
        assert_eq!(agent.make_move(&2).unwrap(), Some(1));
    }

    #[test]
    fn test_greedy_tie_breaks_to_first() {
        let mut agent = greedy_countdown();
        agent.online_network = constant_network(1, 4, vec![1.0, 1.0, 1.0]);
        assert_eq!(agent.make_move(&7).unwrap(), Some(0));
    }

    #[test]
    fn test_learn_empty_history_is_noop() {
        let mut agent = DqnAgent::with_seed(CountdownAdapter, DqnConfig::default(), 2).unwrap();
        let online = agent.online_network().snapshot();
        let target = agent.target_network().snapshot();
        let epsilon = agent.epsilon();

        let metrics = agent.learn(&[]).unwrap();
        assert_eq!(metrics.batch_size, 0);
        assert_eq!(agent.online_network().parameters(), online.parameters());
        assert_eq!(agent.target_network().parameters(), target.parameters());
        assert_eq!(agent.epsilon(), epsilon);
        assert_eq!(agent.learn_step(), 0);
    }

    #[test]
    fn test_terminal_transition_target_is_reward() {
        let agent = greedy_countdown();
        let history = vec![Transition {
            state: 2,
            action: 1,
            reward: -0.75,
            next_state: 0,
        }];
        let q_predicted = Matrix::from_vec(1, 3, vec![0.1, 0.2, 0.3]);
        let q_next = Matrix::from_vec(1, 3, vec![5.0, 5.0, 5.0]);

        let q_target = agent.td_targets(&history, &q_predicted, &q_next);
        assert_eq!(q_target.row(0), &[0.1, -0.75, 0.3]);
    }

    #[test]
    fn test_non_terminal_target_uses_legal_max() {
        let agent = greedy_countdown();
        // From board 2 only actions 0 and 1 are legal; column 2 must be ignored.
        let history = vec![Transition {
            state: 5,
            action: 0,
            reward: 0.5,
            next_state: 2,
        }];
        let q_predicted = Matrix::from_vec(1, 3, vec![0.0, 0.0, 0.0]);
        let q_next = Matrix::from_vec(1, 3, vec![1.0, 3.0, 100.0]);

        let q_target = agent.td_targets(&history, &q_predicted, &q_next);
        assert!((q_target.get(0, 0) - (0.5 + 0.9 * 3.0)).abs() < 1e-6);
        assert_eq!(q_target.get(0, 1), 0.0);
        assert_eq!(q_target.get(0, 2), 0.0);
    }

    #[test]
    fn test_target_sync_schedule() {
        let config = DqnConfig {
            target_update_freq: 3,
            learning_rate: 0.05,
            ..Default::default()
        };
        let mut agent = DqnAgent::with_seed(CountdownAdapter, config, 9).unwrap();
        let history = vec![
            Transition {
                state: 5,
                action: 0,
                reward: 0.0,
                next_state: 4,
            },
            Transition {
                state: 3,
                action: 2,
                reward: 1.0,
                next_state: 0,
            },
        ];

        let initial_target = agent.target_network().snapshot();
        for step in 1..=3 {
            let metrics = agent.learn(&history).unwrap();
            assert_eq!(metrics.target_synced, step == 3);
            if step < 3 {
                assert_eq!(agent.target_network().parameters(), initial_target.parameters());
            }
        }
        assert_eq!(agent.learn_step(), 3);
        assert_eq!(
            agent.target_network().parameters(),
            agent.online_network().parameters()
        );

        let synced = agent.target_network().snapshot();
        agent.learn(&history).unwrap();
        assert_ne!(
            agent.online_network().parameters(),
            synced.parameters()
        );
        assert_eq!(agent.target_network().parameters(), synced.parameters());
    }

    #[test]
    fn test_learning_fits_terminal_reward() {
        let config = DqnConfig {
            learning_rate: 0.01,
            ..Default::default()
        };
        let mut agent = DqnAgent::with_seed(CountdownAdapter, config, 4).unwrap();
        let history = vec![Transition {
            state: 1,
            action: 0,
            reward: 1.0,
            next_state: 0,
        }];

        let first = agent.learn(&history).unwrap().loss;
        let mut last = first;
        for _ in 0..200 {
            last = agent.learn(&history).unwrap().loss;
        }
        assert!(last < first, "loss {first} -> {last}");
    }

    #[test]
    fn test_learn_rejects_out_of_range_action() {
        let mut agent = greedy_countdown();
        let history = vec![Transition {
            state: 5,
            action: 3,
            reward: 0.0,
            next_state: 1,
        }];
        assert!(matches!(
            agent.learn(&history),
            Err(TrainingError::IllegalAction { action: 3, .. })
        ));
        assert_eq!(agent.learn_step(), 0);
    }

    #[test]
    fn test_training_state_roundtrip() {
        let mut agent = DqnAgent::with_seed(CountdownAdapter, DqnConfig::default(), 6).unwrap();
        agent.set_epsilon(0.42);
        agent
            .learn(&[Transition {
                state: 3,
                action: 2,
                reward: 1.0,
                next_state: 0,
            }])
            .unwrap();

        let json = agent.training_state_json().unwrap();
        let mut restored = DqnAgent::with_seed(CountdownAdapter, DqnConfig::default(), 99).unwrap();
        restored.restore_training_state_json(&json).unwrap();

        assert!((restored.epsilon() - 0.42).abs() < 1e-6);
        assert_eq!(restored.learn_step(), 1);
        assert_eq!(
            restored.online_network().parameters(),
            agent.online_network().parameters()
        );
    }

    #[test]
    fn test_restore_rejects_mismatched_dimensions() {
        let wide = DqnAgent::with_seed(WideAdapter, DqnConfig::default(), 0).unwrap();
        let json = wide.training_state_json().unwrap();
        let mut agent = greedy_countdown();
        assert!(matches!(
            agent.restore_training_state_json(&json),
            Err(CheckpointError::Incompatible(_))
        ));
    }

    #[test]
    fn test_eval_mode_restores_epsilon() {
        let mut agent = DqnAgent::with_seed(CountdownAdapter, DqnConfig::default(), 0).unwrap();
        agent.set_epsilon(0.3);
        let saved = agent.enter_eval_mode();
        assert_eq!(Agent::epsilon(&agent), 0.0);
        agent.exit_eval_mode(saved);
        assert!((agent.epsilon() - 0.3).abs() < 1e-6);
    }
}
