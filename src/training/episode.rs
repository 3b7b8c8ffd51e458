use log::trace;

use crate::ai::{Agent, RandomAgent, Transition};
use crate::error::TrainingError;
use crate::game::{BoardOf, Game, GameOutcome, Player};
use crate::training::metrics::EpisodeResult;
use crate::training::trainer::RewardConfig;

/// Per-seat transition histories of one finished episode.
pub struct EpisodeTrace<B> {
    pub first: Vec<Transition<B>>,
    pub second: Vec<Transition<B>>,
    pub result: EpisodeResult,
}

impl<B> EpisodeTrace<B> {
    pub fn history(&self, seat: Player) -> &[Transition<B>] {
        match seat {
            Player::First => &self.first,
            Player::Second => &self.second,
        }
    }
}

/// Play one game from `game` to the end, one agent per seat.
///
/// Each transition records the board before the mover's action and the board
/// right after it; rewards are left at zero. The game also ends when the mover
/// has no legal action, which counts as a draw.
pub fn play_episode<G: Game>(
    game: G,
    first: &mut dyn Agent<BoardOf<G>>,
    second: &mut dyn Agent<BoardOf<G>>,
) -> Result<EpisodeTrace<BoardOf<G>>, TrainingError> {
    let mut state = game;
    let mut first_history = Vec::new();
    let mut second_history = Vec::new();
    let mut game_length = 0;

    while !state.is_terminal() {
        let player = state.current_player();
        let board = state.board();
        let choice = match player {
            Player::First => first.select_action(&board)?,
            Player::Second => second.select_action(&board)?,
        };
        let Some(action) = choice else {
            trace!("{} seat has no legal move, ending episode", player.name());
            break;
        };
        let next = state
            .apply_move(action)
            .map_err(|_| TrainingError::IllegalAction {
                action,
                legal: state.legal_actions(),
            })?;

        let transition = Transition {
            state: board,
            action,
            reward: 0.0,
            next_state: next.board(),
        };
        match player {
            Player::First => first_history.push(transition),
            Player::Second => second_history.push(transition),
        }
        state = next;
        game_length += 1;
    }

    let winner = match state.outcome() {
        Some(GameOutcome::Winner(p)) => Some(p),
        Some(GameOutcome::Draw) | None => None,
    };

    Ok(EpisodeTrace {
        first: first_history,
        second: second_history,
        result: EpisodeResult { winner, game_length },
    })
}

/// Terminal reward for `seat` given the episode winner.
pub fn terminal_reward(rewards: &RewardConfig, seat: Player, winner: Option<Player>) -> f32 {
    match winner {
        Some(w) if w == seat => rewards.win,
        Some(_) => rewards.loss,
        None => rewards.draw,
    }
}

/// Spread a terminal reward back over one seat's history: the last transition
/// gets `reward`, each earlier one is discounted by another factor of `discount`.
pub fn apply_terminal_reward<B>(history: &mut [Transition<B>], reward: f32, discount: f32) {
    let mut shaped = reward;
    for transition in history.iter_mut().rev() {
        transition.reward = shaped;
        shaped *= discount;
    }
}

/// Assign shaped rewards to both seats of a finished episode.
pub fn shape_rewards<B>(trace: &mut EpisodeTrace<B>, rewards: &RewardConfig, discount: f32) {
    let winner = trace.result.winner;
    apply_terminal_reward(
        &mut trace.first,
        terminal_reward(rewards, Player::First, winner),
        discount,
    );
    apply_terminal_reward(
        &mut trace.second,
        terminal_reward(rewards, Player::Second, winner),
        discount,
    );
}

/// Play a single evaluation game between two agents.
/// Returns Some(true) if agent won, Some(false) if agent lost, None if draw.
pub fn play_eval_game<G: Game>(
    agent: &mut dyn Agent<BoardOf<G>>,
    opponent: &mut dyn Agent<BoardOf<G>>,
    agent_seat: Player,
) -> Result<Option<bool>, TrainingError> {
    let trace = match agent_seat {
        Player::First => play_episode(G::initial(), agent, opponent)?,
        Player::Second => play_episode(G::initial(), opponent, agent)?,
    };
    Ok(trace.result.winner.map(|winner| winner == agent_seat))
}

/// Evaluate agent vs random over N games, alternating sides. Returns the win rate.
pub fn evaluate<G: Game>(
    agent: &mut dyn Agent<BoardOf<G>>,
    eval_games: usize,
    seed: Option<u64>,
) -> Result<f32, TrainingError> {
    if eval_games == 0 {
        return Ok(0.0);
    }
    let mut random = match seed {
        Some(seed) => RandomAgent::with_seed(G::adapter(), seed),
        None => RandomAgent::new(G::adapter()),
    };
    let mut wins = 0;

    let eval_state = agent.enter_eval_mode();
    let mut outcome = Ok(());
    for game_idx in 0..eval_games {
        let seat = if game_idx % 2 == 0 { Player::First } else { Player::Second };
        match play_eval_game::<G>(agent, &mut random, seat) {
            Ok(Some(true)) => wins += 1,
            Ok(_) => {}
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    agent.exit_eval_mode(eval_state);

    outcome.map(|()| wins as f32 / eval_games as f32)
}

/// Derive a deterministic seed for a given episode index.
pub fn episode_seed(base_seed: u64, episode_index: usize) -> u64 {
    // FNV-1a-inspired mixing for deterministic, well-distributed seeds
    let mut hash = base_seed ^ 0x517cc1b727220a95;
    let index = episode_index as u64;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index >> 32;
    hash
}
