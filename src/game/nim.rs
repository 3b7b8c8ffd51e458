use super::{Game, GameOutcome, MoveError, Player};
use crate::ai::{AdapterConfig, GameAdapter};

/// Stones a player may take, indexed by action.
pub const NIM_ACTIONS: [u32; 3] = [1, 2, 3];
pub const DEFAULT_PILE: u32 = 7;

/// Single-pile Nim: players alternately take 1-3 stones, whoever takes the
/// last stone wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nim {
    remaining: u32,
    current_player: Player,
    outcome: Option<GameOutcome>,
}

impl Nim {
    /// Start a game on a pile of `pile` stones. An empty pile is already drawn.
    pub fn with_pile(pile: u32) -> Self {
        Nim {
            remaining: pile,
            current_player: Player::First,
            outcome: (pile == 0).then_some(GameOutcome::Draw),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl Game for Nim {
    type Adapter = NimAdapter;

    const NAME: &'static str = "nim";

    fn initial() -> Self {
        Nim::with_pile(DEFAULT_PILE)
    }

    fn adapter() -> NimAdapter {
        NimAdapter
    }

    fn board(&self) -> u32 {
        self.remaining
    }

    fn current_player(&self) -> Player {
        self.current_player
    }

    fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    fn apply_move(&self, action: usize) -> Result<Nim, MoveError> {
        if self.is_terminal() {
            return Err(MoveError::GameOver);
        }
        let take = *NIM_ACTIONS.get(action).ok_or(MoveError::IllegalMove)?;
        if take > self.remaining {
            return Err(MoveError::IllegalMove);
        }

        let remaining = self.remaining - take;
        Ok(Nim {
            remaining,
            current_player: self.current_player.other(),
            outcome: (remaining == 0).then_some(GameOutcome::Winner(self.current_player)),
        })
    }
}

/// Nim as seen by an agent: the board is the remaining pile.
#[derive(Debug, Clone, Copy, Default)]
pub struct NimAdapter;

impl GameAdapter for NimAdapter {
    type Board = u32;

    fn config(&self) -> AdapterConfig {
        AdapterConfig::new(1, NIM_ACTIONS.len())
            .with_hidden_size(64)
            .with_game_actions(NIM_ACTIONS.iter().map(|&take| i64::from(take)).collect())
    }

    fn valid_moves(&self, board: &u32) -> Vec<usize> {
        NIM_ACTIONS
            .iter()
            .enumerate()
            .filter(|&(_, &take)| take <= *board)
            .map(|(index, _)| index)
            .collect()
    }

    fn encode_state(&self, board: &u32) -> Vec<f32> {
        vec![*board as f32]
    }

    fn render(&self, board: &u32) -> String {
        format!("{board} stones left")
    }
}
