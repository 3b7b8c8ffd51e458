use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use ml_self_play::ai::{Agent, DqnAgent, GameAdapter, QLearningAgent, TrainableAgent};
use ml_self_play::checkpoint::CheckpointManager;
use ml_self_play::config::AppConfig;
use ml_self_play::error::ConfigError;
use ml_self_play::game::{BoardOf, Game, Nim, Player, TicTacToe};
use ml_self_play::training::{episode_seed, Trainer};

/// Train two agents against each other via self-play.
#[derive(Parser)]
#[command(name = "train", about = "Train self-play RL agents on small board games")]
struct Cli {
    /// Game to play: nim or tictactoe
    #[arg(long, default_value = "tictactoe")]
    game: String,

    /// Agent type for both seats: dqn or qlearning
    #[arg(long, default_value = "dqn")]
    agent: String,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override learning rate
    #[arg(long)]
    lr: Option<f32>,

    /// Seed all random number generators
    #[arg(long)]
    seed: Option<u64>,

    /// Resume training from the latest checkpoint
    #[arg(long)]
    resume: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.game.as_str() {
        "nim" | "tictactoe" => {}
        other => bail!("unknown game '{}' (expected 'nim' or 'tictactoe')", other),
    }
    match cli.agent.as_str() {
        "dqn" | "qlearning" => {}
        other => bail!("unknown agent '{}' (expected 'dqn' or 'qlearning')", other),
    }

    // Load configuration
    let mut app_config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(episodes) = cli.episodes {
        app_config.training.num_episodes = episodes;
    }
    if let Some(lr) = cli.lr {
        match cli.agent.as_str() {
            "dqn" => app_config.dqn.learning_rate = lr,
            _ => app_config.q_learning.learning_rate = lr,
        }
    }
    if cli.seed.is_some() {
        app_config.training.seed = cli.seed;
    }
    app_config.validate().context("invalid configuration")?;

    if cli.print_config {
        print!("{}", toml::to_string_pretty(&app_config)?);
        return Ok(());
    }

    match (cli.game.as_str(), cli.agent.as_str()) {
        ("nim", "dqn") => run::<Nim, _, _>(&app_config, cli.resume, |rng| {
            DqnAgent::new(Nim::adapter(), app_config.dqn.clone(), rng)
        }),
        ("nim", _) => run::<Nim, _, _>(&app_config, cli.resume, |rng| {
            QLearningAgent::new(Nim::adapter(), app_config.q_learning.clone(), rng)
        }),
        ("tictactoe", "dqn") => run::<TicTacToe, _, _>(&app_config, cli.resume, |rng| {
            DqnAgent::new(TicTacToe::adapter(), app_config.dqn.clone(), rng)
        }),
        _ => run::<TicTacToe, _, _>(&app_config, cli.resume, |rng| {
            QLearningAgent::new(TicTacToe::adapter(), app_config.q_learning.clone(), rng)
        }),
    }
}

/// Build one agent per seat, optionally resume both, then train.
fn run<G, A, F>(config: &AppConfig, resume: bool, make_agent: F) -> Result<()>
where
    G: Game,
    A: TrainableAgent<BoardOf<G>>,
    F: Fn(StdRng) -> Result<A, ConfigError>,
{
    let seat_rng = |seat: usize| match config.training.seed {
        Some(seed) => StdRng::seed_from_u64(episode_seed(seed, seat)),
        None => StdRng::from_os_rng(),
    };
    let mut first = make_agent(seat_rng(0)).context("building first-seat agent")?;
    let mut second = make_agent(seat_rng(1)).context("building second-seat agent")?;

    let manager = CheckpointManager::new(config.checkpoint.clone());
    let mut start_episode = 0;
    if resume {
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
                data.restore_seat(Player::First, &mut first)
                    .context("restoring first-seat agent")?;
                data.restore_seat(Player::Second, &mut second)
                    .context("restoring second-seat agent")?;
                start_episode = data.metadata.episode;
                info!("Resumed from episode {}", start_episode);
            }
            Err(e) => info!("No checkpoint found ({}), starting fresh", e),
        }
    }

    info!(
        "{} on {}: input {} / output {} / hidden {}",
        first.name(),
        G::NAME,
        G::adapter().config().input_size,
        G::adapter().config().output_size,
        G::adapter().config().hidden_size
    );

    let trainer = Trainer::new(config.training.clone(), config.rewards.clone(), manager);
    let summary = trainer
        .train::<G, _, _>(&mut first, &mut second, start_episode)
        .context("training failed")?;

    info!(
        "Episode {}: first seat won {:.1}%, draws {:.1}%, avg loss {:.4}",
        summary.last_episode,
        summary.first_seat_win_rate * 100.0,
        summary.draw_rate * 100.0,
        summary.average_loss
    );
    Ok(())
}
