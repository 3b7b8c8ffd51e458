//! Two-player game engines with immutable transitions, plus the adapters that
//! describe them to learning agents.

mod nim;
mod player;
mod state;
mod tictactoe;

pub use nim::{Nim, NimAdapter, DEFAULT_PILE, NIM_ACTIONS};
pub use player::Player;
pub use state::{BoardOf, Game, GameOutcome, MoveError};
pub use tictactoe::{line_winner, Cells, TicTacToe, TicTacToeAdapter};
