use super::{Game, GameOutcome, MoveError, Player};
use crate::ai::{AdapterConfig, GameAdapter};

pub const CELLS: usize = 9;

/// Board of marks: 0 empty, 1 first player, -1 second player. Row-major.
pub type Cells = [i8; CELLS];

const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Mark holding a complete line, if any.
pub fn line_winner(cells: &Cells) -> Option<i8> {
    WIN_LINES.iter().find_map(|&[a, b, c]| {
        let mark = cells[a];
        (mark != 0 && mark == cells[b] && mark == cells[c]).then_some(mark)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicTacToe {
    cells: Cells,
    current_player: Player,
    outcome: Option<GameOutcome>,
}

impl Game for TicTacToe {
    type Adapter = TicTacToeAdapter;

    const NAME: &'static str = "tictactoe";

    fn initial() -> Self {
        TicTacToe {
            cells: [0; CELLS],
            current_player: Player::First,
            outcome: None,
        }
    }

    fn adapter() -> TicTacToeAdapter {
        TicTacToeAdapter
    }

    fn board(&self) -> Cells {
        self.cells
    }

    fn current_player(&self) -> Player {
        self.current_player
    }

    fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    fn apply_move(&self, action: usize) -> Result<TicTacToe, MoveError> {
        if self.is_terminal() {
            return Err(MoveError::GameOver);
        }
        if self.cells.get(action) != Some(&0) {
            return Err(MoveError::IllegalMove);
        }

        let mut cells = self.cells;
        cells[action] = self.current_player.mark();

        let outcome = if line_winner(&cells).is_some() {
            Some(GameOutcome::Winner(self.current_player))
        } else if cells.iter().all(|&mark| mark != 0) {
            Some(GameOutcome::Draw)
        } else {
            None
        };

        Ok(TicTacToe {
            cells,
            current_player: self.current_player.other(),
            outcome,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TicTacToeAdapter;

impl GameAdapter for TicTacToeAdapter {
    type Board = Cells;

    fn config(&self) -> AdapterConfig {
        AdapterConfig::new(CELLS, CELLS).with_hidden_size(128)
    }

    fn valid_moves(&self, board: &Cells) -> Vec<usize> {
        if line_winner(board).is_some() {
            return Vec::new();
        }
        (0..CELLS).filter(|&cell| board[cell] == 0).collect()
    }

    fn encode_state(&self, board: &Cells) -> Vec<f32> {
        board.iter().map(|&mark| f32::from(mark)).collect()
    }

    fn render(&self, board: &Cells) -> String {
        board
            .chunks(3)
            .enumerate()
            .map(|(row, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .map(|(col, &mark)| match mark {
                        1 => "X".to_string(),
                        -1 => "O".to_string(),
                        _ => (row * 3 + col).to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
