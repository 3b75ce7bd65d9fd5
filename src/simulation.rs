//! Game driver and batch simulation.
//!
//! [`play_game`] runs one game to completion with any [`Policy`].
//! [`run_batch`] fans independent games out over rayon's pool and folds
//! their outcomes into a [`BatchReport`]. Each game owns its RNG and its
//! policy, so results only depend on the base seed, never on scheduling.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::game::GameState;
use crate::policy::{Policy, PolicySettings, Strategy};

/// A game whose highest tile reaches this value counts as a win.
pub const WIN_TILE: u32 = 2048;

/// Optional caps applied to each game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLimits {
    /// Wall-clock limit per game, checked between plies.
    pub time_limit: Option<Duration>,
    /// Maximum number of plies per game.
    pub max_moves: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// No legal move remained.
    NoMoves,
    TimeLimit,
    MoveLimit,
    /// The policy's search budget ran out before it explored any move.
    SearchExhausted,
}

/// Per-game result handed to reporting code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub score: u64,
    pub highest_tile: u32,
    pub moves: u64,
    pub end: EndReason,
}

/// Play one game from a fresh state.
///
/// `TerminalState` and `SearchExhausted` from the policy end the game
/// normally; any other policy error is returned.
///
/// ```
/// use ai_2048_sim::policy::RandomPolicy;
/// use ai_2048_sim::simulation::{play_game, EndReason, GameLimits};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut rng = StdRng::seed_from_u64(4);
/// let mut policy = RandomPolicy::new(4);
/// let outcome = play_game(&mut policy, &mut rng, GameLimits::default()).unwrap();
/// assert_eq!(outcome.end, EndReason::NoMoves);
/// assert!(outcome.highest_tile >= 4);
/// ```
pub fn play_game<P, R>(policy: &mut P, rng: &mut R, limits: GameLimits) -> Result<GameOutcome, GameError>
where
    P: Policy + ?Sized,
    R: Rng + ?Sized,
{
    let start = Instant::now();
    let mut state = GameState::new(rng);
    let mut moves = 0u64;
    let end = loop {
        if state.is_terminal() {
            break EndReason::NoMoves;
        }
        if limits.max_moves.is_some_and(|cap| moves >= cap) {
            break EndReason::MoveLimit;
        }
        if limits.time_limit.is_some_and(|limit| start.elapsed() >= limit) {
            break EndReason::TimeLimit;
        }
        let dir = match policy.decide(&state) {
            Ok(dir) => dir,
            Err(GameError::TerminalState) => break EndReason::NoMoves,
            Err(GameError::SearchExhausted) => {
                warn!("{} could not pick a move after {} plies; ending game", policy.name(), moves);
                break EndReason::SearchExhausted;
            }
            Err(e) => return Err(e),
        };
        state = state.apply(dir, rng)?;
        moves += 1;
    };
    let tally = state.tally();
    Ok(GameOutcome { score: tally.score, highest_tile: tally.highest_tile, moves, end })
}

/// Order-independent aggregate over many games.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub games: u64,
    pub total_score: u64,
    pub max_score: u64,
    pub highest_tile: u32,
    /// Number of games per highest tile reached.
    pub tile_counts: BTreeMap<u32, u64>,
    pub wins: u64,
    pub total_moves: u64,
}

impl BatchReport {
    pub fn record(&mut self, outcome: &GameOutcome) {
        self.games += 1;
        self.total_score += outcome.score;
        self.max_score = self.max_score.max(outcome.score);
        self.highest_tile = self.highest_tile.max(outcome.highest_tile);
        *self.tile_counts.entry(outcome.highest_tile).or_insert(0) += 1;
        if outcome.highest_tile >= WIN_TILE {
            self.wins += 1;
        }
        self.total_moves += outcome.moves;
    }

    /// Combine two partial reports. Associative and commutative.
    pub fn merge(mut self, other: BatchReport) -> BatchReport {
        self.games += other.games;
        self.total_score += other.total_score;
        self.max_score = self.max_score.max(other.max_score);
        self.highest_tile = self.highest_tile.max(other.highest_tile);
        for (tile, count) in other.tile_counts {
            *self.tile_counts.entry(tile).or_insert(0) += count;
        }
        self.wins += other.wins;
        self.total_moves += other.total_moves;
        self
    }

    pub fn average_score(&self) -> f64 {
        if self.games == 0 { 0.0 } else { self.total_score as f64 / self.games as f64 }
    }

    /// Fraction of games that reached [`WIN_TILE`].
    pub fn win_rate(&self) -> f64 {
        if self.games == 0 { 0.0 } else { self.wins as f64 / self.games as f64 }
    }
}

impl FromIterator<GameOutcome> for BatchReport {
    fn from_iter<I: IntoIterator<Item = GameOutcome>>(iter: I) -> Self {
        let mut report = BatchReport::default();
        for outcome in iter {
            report.record(&outcome);
        }
        report
    }
}

/// Batch parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub strategy: Strategy,
    pub games: u64,
    /// Game `i` is seeded with `seed + i`.
    pub seed: u64,
    pub limits: GameLimits,
    pub settings: PolicySettings,
}

/// Play `cfg.games` independent games in parallel and aggregate them.
///
/// `on_game` runs after every finished game, from whichever worker played it.
pub fn run_batch<F>(cfg: &BatchConfig, on_game: F) -> Result<BatchReport, GameError>
where
    F: Fn(&GameOutcome) + Sync,
{
    let start = Instant::now();
    let report = (0..cfg.games)
        .into_par_iter()
        .map(|idx| -> Result<GameOutcome, GameError> {
            let game_seed = cfg.seed.wrapping_add(idx);
            let mut rng = StdRng::seed_from_u64(game_seed);
            // Decorrelate the policy's stream from the spawn stream.
            let mut policy = cfg.strategy.build(&cfg.settings, game_seed ^ 0x9E37_79B9_7F4A_7C15)?;
            let outcome = play_game(&mut policy, &mut rng, cfg.limits)?;
            on_game(&outcome);
            Ok(outcome)
        })
        .try_fold(BatchReport::default, |mut acc, outcome| -> Result<BatchReport, GameError> {
            acc.record(&outcome?);
            Ok(acc)
        })
        .try_reduce(BatchReport::default, |a, b| Ok(a.merge(b)))?;
    info!(
        "{}: {} games in {:.2}s, avg score {:.1}, win rate {:.2}",
        cfg.strategy,
        report.games,
        start.elapsed().as_secs_f64(),
        report.average_score(),
        report.win_rate()
    );
    Ok(report)
}
