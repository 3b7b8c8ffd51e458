use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::adapter::GameAdapter;
use super::agent::{Agent, Transition, UpdateMetrics};
use crate::error::TrainingError;

/// An agent that selects uniformly at random from legal actions.
pub struct RandomAgent<A: GameAdapter> {
    adapter: A,
    rng: StdRng,
}

impl<A: GameAdapter> RandomAgent<A> {
    pub fn new(adapter: A) -> Self {
        RandomAgent {
            adapter,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(adapter: A, seed: u64) -> Self {
        RandomAgent {
            adapter,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<A: GameAdapter> Agent<A::Board> for RandomAgent<A> {
    fn select_action(&mut self, board: &A::Board) -> Result<Option<usize>, TrainingError> {
        let actions = self.adapter.valid_moves(board);
        if actions.is_empty() {
            return Ok(None);
        }
        let idx = self.rng.random_range(0..actions.len());
        Ok(Some(actions[idx]))
    }

    fn learn(&mut self, _history: &[Transition<A::Board>]) -> Result<UpdateMetrics, TrainingError> {
        Ok(UpdateMetrics::default())
    }

    fn name(&self) -> &str {
        "Random"
    }
}
