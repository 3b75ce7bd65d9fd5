use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use ai_2048_sim::engine as GameEngine;
use ai_2048_sim::expectimax::ExpectimaxConfig;
use ai_2048_sim::mcts::MctsConfig;
use ai_2048_sim::policy::{PolicySettings, Strategy};
use ai_2048_sim::simulation::{run_batch, BatchConfig, BatchReport, GameLimits};
use clap::Parser;
use flexi_logger::Logger;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "simulate", about = "Play many 2048 games with one strategy and summarize the results")]
struct Args {
    /// Number of games to play
    #[arg(short = 'n', long, default_value_t = 100)]
    games: u64,

    #[arg(short, long, value_enum, default_value_t = Strategy::Expectimax)]
    strategy: Strategy,

    /// Per-game wall-clock limit in seconds
    #[arg(long)]
    time_limit: Option<f64>,

    /// Stop each game after this many moves
    #[arg(long)]
    max_moves: Option<u64>,

    /// Expectimax search depth in plies
    #[arg(long, default_value_t = 3)]
    depth: u32,

    /// MCTS time budget per move, in milliseconds
    #[arg(long, default_value_t = 500)]
    budget_ms: u64,

    /// Plies per MCTS rollout
    #[arg(long, default_value_t = 25)]
    rollout_depth: u32,

    /// Base seed; game i uses seed + i
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Worker threads (rayon default if omitted)
    #[arg(long)]
    threads: Option<usize>,

    /// Suppress the progress bar
    #[arg(long)]
    quiet: bool,

    /// Write settings and statistics as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    config: &'a BatchConfig,
    report: &'a BatchReport,
    average_score: f64,
    win_rate: f64,
    elapsed_s: f64,
}

impl Args {
    fn batch_config(&self) -> anyhow::Result<BatchConfig> {
        let time_limit = match self.time_limit {
            Some(secs) if !(secs.is_finite() && secs > 0.0) => {
                anyhow::bail!("--time-limit must be a positive number of seconds, got {secs}")
            }
            Some(secs) => match Duration::try_from_secs_f64(secs) {
                Ok(limit) => Some(limit),
                Err(e) => anyhow::bail!("--time-limit {secs} is out of range: {e}"),
            },
            None => None,
        };
        Ok(BatchConfig {
            strategy: self.strategy,
            games: self.games,
            seed: self.seed,
            limits: GameLimits { time_limit, max_moves: self.max_moves },
            settings: PolicySettings {
                expectimax: ExpectimaxConfig { depth: self.depth },
                mcts: MctsConfig {
                    time_budget: Duration::from_millis(self.budget_ms),
                    rollout_depth: self.rollout_depth,
                    ..Default::default()
                },
            },
        })
    }
}

fn main() -> anyhow::Result<()> {
    let _logger = Logger::try_with_env_or_str("warn")?
        .format(flexi_logger::colored_default_format)
        .start()?;
    let args = Args::parse();
    GameEngine::new();
    let cfg = args.batch_config()?;

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(cfg.games);
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} [{bar:40}] {pos}/{len} games | {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃")
                .progress_chars("=> "),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    let start = Instant::now();
    let on_game = |outcome: &ai_2048_sim::simulation::GameOutcome| {
        pb.set_message(format!("last score: {}", outcome.score));
        pb.inc(1);
    };
    let report = match args.threads {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n).build()?;
            pool.install(|| run_batch(&cfg, on_game))?
        }
        None => run_batch(&cfg, on_game)?,
    };
    pb.finish_and_clear();
    let elapsed = start.elapsed().as_secs_f64();

    print_summary(&cfg, &report, elapsed);

    if let Some(path) = &args.json {
        let out = JsonReport {
            config: &cfg,
            report: &report,
            average_score: report.average_score(),
            win_rate: report.win_rate(),
            elapsed_s: elapsed,
        };
        serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), &out)?;
        info!("wrote report to {}", path.display());
    }
    Ok(())
}

fn print_summary(cfg: &BatchConfig, report: &BatchReport, elapsed: f64) {
    println!("Strategy: {}", cfg.strategy);
    println!("Games played: {}", report.games);
    println!("Highest score: {}", report.max_score);
    println!("Highest tile: {}", report.highest_tile);
    println!("Average score: {:.2}", report.average_score());
    println!("Tile distribution:");
    for (tile, count) in report.tile_counts.iter().rev() {
        println!("  {:>6}: {:>5} ({:.1}%)", tile, count, 100.0 * *count as f64 / report.games.max(1) as f64);
    }
    println!("Win percentage (reached 2048): {:.2}%", 100.0 * report.win_rate());
    println!("Elapsed: {:.2}s", elapsed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_build_batch_config() {
        let args = Args::parse_from([
            "simulate", "-n", "4", "--strategy", "mcts", "--budget-ms", "20", "--rollout-depth", "5",
            "--max-moves", "300", "--seed", "9",
        ]);
        let cfg = args.batch_config().unwrap();
        assert_eq!(cfg.strategy, Strategy::Mcts);
        assert_eq!(cfg.games, 4);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.limits.max_moves, Some(300));
        assert_eq!(cfg.settings.mcts.time_budget, Duration::from_millis(20));
        assert_eq!(cfg.settings.mcts.rollout_depth, 5);
    }

    #[test]
    fn non_positive_time_limit_is_rejected() {
        let args = Args::parse_from(["simulate", "--time-limit", "0"]);
        assert!(args.batch_config().is_err());
    }

    #[test]
    fn oversized_time_limit_is_rejected() {
        let args = Args::parse_from(["simulate", "--time-limit", "1e30"]);
        assert!(args.batch_config().is_err());
        let args = Args::parse_from(["simulate", "--time-limit", "2.5"]);
        assert_eq!(args.batch_config().unwrap().limits.time_limit, Some(Duration::from_millis(2500)));
    }
}
