use std::io::{self, BufRead, Stdout, Write};

use super::adapter::GameAdapter;
use super::agent::{Agent, Transition, UpdateMetrics};
use crate::error::TrainingError;

/// A person choosing moves by typing an action index.
///
/// Each turn shows the board and the legal indices, then reads one line.
/// Input that does not parse or names an illegal move is reported and asked
/// for again. End of input is an error, so an abandoned game does not end as
/// a silent draw.
pub struct HumanAgent<A: GameAdapter, R, W> {
    adapter: A,
    input: R,
    output: W,
}

impl<A: GameAdapter> HumanAgent<A, io::StdinLock<'static>, Stdout> {
    /// Reads from standard input and prompts on standard output.
    pub fn stdio(adapter: A) -> Self {
        HumanAgent::new(adapter, io::stdin().lock(), io::stdout())
    }
}

impl<A: GameAdapter, R: BufRead, W: Write> HumanAgent<A, R, W> {
    pub fn new(adapter: A, input: R, output: W) -> Self {
        HumanAgent {
            adapter,
            input,
            output,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn describe_moves(&self, valid_moves: &[usize]) -> String {
        let config = self.adapter.config();
        valid_moves
            .iter()
            .map(|&index| match config.game_actions.as_ref().and_then(|a| a.get(index)) {
                Some(value) => format!("{index} ({value})"),
                None => index.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<A: GameAdapter, R: BufRead, W: Write> Agent<A::Board> for HumanAgent<A, R, W> {
    fn select_action(&mut self, board: &A::Board) -> Result<Option<usize>, TrainingError> {
        let valid_moves = self.adapter.valid_moves(board);
        if valid_moves.is_empty() {
            return Ok(None);
        }

        writeln!(self.output, "{}", self.adapter.render(board))?;
        let choices = self.describe_moves(&valid_moves);
        let mut line = String::new();
        loop {
            write!(self.output, "Your move [{choices}]: ")?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed").into());
            }

            match line.trim().parse::<usize>() {
                Ok(action) if valid_moves.contains(&action) => return Ok(Some(action)),
                Ok(action) => writeln!(
                    self.output,
                    "Invalid move {action}. Valid moves: {choices}"
                )?,
                Err(_) => writeln!(
                    self.output,
                    "Invalid input '{}'. Enter a move index.",
                    line.trim()
                )?,
            }
        }
    }

    fn learn(&mut self, _history: &[Transition<A::Board>]) -> Result<UpdateMetrics, TrainingError> {
        Ok(UpdateMetrics::default())
    }

    fn name(&self) -> &str {
        "Human"
    }
}
