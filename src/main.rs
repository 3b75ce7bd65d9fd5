use std::io::{self, BufRead, Write};
use std::time::Duration;

use ai_2048_sim::engine::{self as GameEngine, Move};
use ai_2048_sim::expectimax::ExpectimaxConfig;
use ai_2048_sim::game::GameState;
use ai_2048_sim::mcts::MctsConfig;
use ai_2048_sim::policy::{Policy, PolicySettings, Strategy};
use ai_2048_sim::GameError;
use clap::{Parser, Subcommand};
use flexi_logger::Logger;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Parser)]
#[command(name = "ai-2048-sim", about = "Play 2048 yourself or watch a strategy play it")]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Let a strategy play one game, printing every board
    Auto {
        #[arg(long, value_enum, default_value_t = Strategy::Expectimax)]
        strategy: Strategy,
        /// Seed for tile spawns and the strategy's own choices (random if omitted)
        #[arg(long)]
        seed: Option<u64>,
        /// Expectimax search depth in plies
        #[arg(long, default_value_t = 3)]
        depth: u32,
        /// MCTS time budget per move, in milliseconds
        #[arg(long, default_value_t = 500)]
        budget_ms: u64,
        /// Only print the final board
        #[arg(long)]
        quiet: bool,
    },
    /// Interactive game: w/a/s/d to move, q to quit
    Play {
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let _logger = Logger::try_with_env_or_str("info")?
        .format(flexi_logger::colored_default_format)
        .start()?;
    let args = Args::parse();
    GameEngine::new();

    match args.cmd {
        Cmd::Auto { strategy, seed, depth, budget_ms, quiet } => {
            let settings = PolicySettings {
                expectimax: ExpectimaxConfig { depth },
                mcts: MctsConfig { time_budget: Duration::from_millis(budget_ms), ..Default::default() },
            };
            run_auto(strategy, &settings, seed.unwrap_or_else(rand::random), quiet)
        }
        Cmd::Play { seed } => run_interactive(seed.unwrap_or_else(rand::random)),
    }
}

fn run_auto(strategy: Strategy, settings: &PolicySettings, seed: u64, quiet: bool) -> anyhow::Result<()> {
    info!("playing one game with {strategy} (seed {seed})");
    let mut policy = strategy.build(settings, seed)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = GameState::new(&mut rng);
    if !quiet {
        println!("{}", state);
    }
    let mut move_count = 0u64;
    while !state.is_terminal() {
        let dir = match policy.decide(&state) {
            Ok(dir) => dir,
            Err(GameError::TerminalState) | Err(GameError::SearchExhausted) => break,
            Err(e) => return Err(e.into()),
        };
        state = state.apply(dir, &mut rng)?;
        move_count += 1;
        if !quiet {
            println!("{dir}\n{}", state);
        }
    }
    if quiet {
        println!("{}", state);
    }
    println!("Moves made: {}, Final score: {}, Highest tile: {}", move_count, state.score(), state.highest());
    Ok(())
}

fn parse_key(line: &str) -> Option<Move> {
    match line.trim().to_ascii_lowercase().as_str() {
        "w" => Some(Move::Up),
        "a" => Some(Move::Left),
        "s" => Some(Move::Down),
        "d" => Some(Move::Right),
        _ => None,
    }
}

fn run_interactive(seed: u64) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = GameState::new(&mut rng);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!("{}", state);
        if state.is_terminal() {
            println!("Game over!");
            break;
        }
        print!("Move (w/a/s/d, q to quit): ");
        io::stdout().flush()?;
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }
        let Some(dir) = parse_key(&line) else {
            println!("Unknown key {:?}", line.trim());
            continue;
        };
        match state.apply(dir, &mut rng) {
            Ok(next) => state = next,
            Err(GameError::InvalidMove(dir)) => println!("{dir} does not move anything"),
            Err(e) => return Err(e.into()),
        }
    }
    println!("Final score: {}, Highest tile: {}", state.score(), state.highest());
    Ok(())
}
