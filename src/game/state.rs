use super::Player;
use crate::ai::GameAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Winner(Player),
    Draw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    IllegalMove,
    GameOver,
}

/// Board type of a game's adapter.
pub type BoardOf<G> = <<G as Game>::Adapter as GameAdapter>::Board;

/// Rule engine for a two-player, turn-based game with immutable transitions.
pub trait Game: Clone {
    type Adapter: GameAdapter;

    /// Short identifier used on the command line and in checkpoints.
    const NAME: &'static str;

    /// Create the initial game state
    fn initial() -> Self;

    /// Agent-facing description of this game
    fn adapter() -> Self::Adapter;

    /// Raw board value, as seen by agents
    fn board(&self) -> BoardOf<Self>;

    fn current_player(&self) -> Player;

    /// Get game outcome if game is over
    fn outcome(&self) -> Option<GameOutcome>;

    /// Apply an action index and return the new state
    fn apply_move(&self, action: usize) -> Result<Self, MoveError>;

    fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// Legal action indices for the player to move
    fn legal_actions(&self) -> Vec<usize> {
        if self.is_terminal() {
            return Vec::new();
        }
        Self::adapter().valid_moves(&self.board())
    }
}
