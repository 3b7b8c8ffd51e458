use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use ml_self_play::ai::{Agent, DqnAgent, GameAdapter, HumanAgent, QLearningAgent, TrainableAgent};
use ml_self_play::checkpoint::CheckpointManager;
use ml_self_play::config::AppConfig;
use ml_self_play::error::ConfigError;
use ml_self_play::game::{BoardOf, Game, Nim, Player, TicTacToe};
use ml_self_play::training::{play_episode, EpisodeTrace};

#[derive(Clone, Copy, ValueEnum)]
enum Seat {
    First,
    Second,
}

impl From<Seat> for Player {
    fn from(seat: Seat) -> Player {
        match seat {
            Seat::First => Player::First,
            Seat::Second => Player::Second,
        }
    }
}

/// Play against the latest trained checkpoint from the terminal.
#[derive(Parser)]
#[command(name = "play", about = "Play a trained agent from the terminal")]
struct Cli {
    /// Game to play: nim or tictactoe
    #[arg(long, default_value = "tictactoe")]
    game: String,

    /// Agent type the checkpoint was trained with: dqn or qlearning
    #[arg(long, default_value = "dqn")]
    agent: String,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of games to play
    #[arg(long, default_value_t = 10)]
    games: usize,

    /// Seat the human takes; the agent plays the other one
    #[arg(long, value_enum, default_value = "second")]
    seat: Seat,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    app_config.validate().context("invalid configuration")?;

    let human_seat = Player::from(cli.seat);
    match (cli.game.as_str(), cli.agent.as_str()) {
        ("nim", "dqn") => play::<Nim, _, _>(&app_config, cli.games, human_seat, |rng| {
            DqnAgent::new(Nim::adapter(), app_config.dqn.clone(), rng)
        }),
        ("nim", "qlearning") => play::<Nim, _, _>(&app_config, cli.games, human_seat, |rng| {
            QLearningAgent::new(Nim::adapter(), app_config.q_learning.clone(), rng)
        }),
        ("tictactoe", "dqn") => {
            play::<TicTacToe, _, _>(&app_config, cli.games, human_seat, |rng| {
                DqnAgent::new(TicTacToe::adapter(), app_config.dqn.clone(), rng)
            })
        }
        ("tictactoe", "qlearning") => {
            play::<TicTacToe, _, _>(&app_config, cli.games, human_seat, |rng| {
                QLearningAgent::new(TicTacToe::adapter(), app_config.q_learning.clone(), rng)
            })
        }
        ("nim" | "tictactoe", other) => {
            bail!("unknown agent '{}' (expected 'dqn' or 'qlearning')", other)
        }
        (other, _) => bail!("unknown game '{}' (expected 'nim' or 'tictactoe')", other),
    }
}

/// Load the agent for the seat the human does not take, then play greedily.
fn play<G, A, F>(config: &AppConfig, games: usize, human_seat: Player, make_agent: F) -> Result<()>
where
    G: Game,
    A: TrainableAgent<BoardOf<G>>,
    F: FnOnce(StdRng) -> Result<A, ConfigError>,
{
    let rng = match config.training.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut agent = make_agent(rng).context("building agent")?;
    let agent_seat = human_seat.other();

    let manager = CheckpointManager::new(config.checkpoint.clone());
    match manager.load_latest() {
        Ok(data) => {
            if data.metadata.game != G::NAME {
                bail!(
                    "checkpoint {} was trained on '{}', not '{}'",
                    data.path.display(),
                    data.metadata.game,
                    G::NAME
                );
            }
            data.restore_seat(agent_seat, &mut agent)
                .with_context(|| format!("restoring {}-seat agent", agent_seat.name()))?;
            info!(
                "Loaded {} agent for the {} seat from episode {}",
                agent.name(),
                agent_seat.name(),
                data.metadata.episode
            );
        }
        Err(e) => warn!("No checkpoint found ({}), playing an untrained agent", e),
    }

    let eval_state = agent.enter_eval_mode();
    let mut human = HumanAgent::stdio(G::adapter());
    let outcome = play_series::<G>(&mut agent, &mut human, human_seat, games);
    agent.exit_eval_mode(eval_state);
    outcome
}

fn play_series<G: Game>(
    agent: &mut dyn Agent<BoardOf<G>>,
    human: &mut dyn Agent<BoardOf<G>>,
    human_seat: Player,
    games: usize,
) -> Result<()> {
    let adapter = G::adapter();
    let (mut human_wins, mut agent_wins, mut draws) = (0, 0, 0);

    for game in 1..=games {
        println!();
        println!("Game {}/{}: you play {}", game, games, human_seat.name());
        let trace = match human_seat {
            Player::First => play_episode(G::initial(), human, agent)?,
            Player::Second => play_episode(G::initial(), agent, human)?,
        };

        if let Some(board) = final_board(&trace) {
            println!("{}", adapter.render(board));
        }
        match trace.result.winner {
            Some(winner) if winner == human_seat => {
                human_wins += 1;
                println!("You win!");
            }
            Some(_) => {
                agent_wins += 1;
                println!("{} wins.", agent.name());
            }
            None => {
                draws += 1;
                println!("Draw.");
            }
        }
    }

    println!();
    println!("You {human_wins} | {} {agent_wins} | draws {draws}", agent.name());
    Ok(())
}

/// Board after the last move of the episode, whichever seat made it.
fn final_board<B>(trace: &EpisodeTrace<B>) -> Option<&B> {
    let last_mover = if trace.result.game_length % 2 == 1 {
        &trace.first
    } else {
        &trace.second
    };
    last_mover.last().map(|transition| &transition.next_state)
}
