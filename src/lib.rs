//! ai-2048-sim: a 2048 game engine, search policies, and a batch simulator
//!
//! This crate provides:
//! - A compact `Board` type with table-driven moves (`engine` module)
//! - `GameState`, which tracks score and highest tile across plies (`game`)
//! - The positional evaluator shared by the searches (`heuristic`)
//! - Expectimax (`expectimax`) and Monte-Carlo tree search (`mcts`) policies
//! - Baseline strategies and the common `Policy` contract (`policy`)
//! - A game driver and a rayon-backed batch runner (`simulation`)
//!
//! Every spawned tile is a 2, in live games and in both searches' chance
//! models alike.
//!
//! Quick start:
//! ```
//! use ai_2048_sim::engine::Move;
//! use ai_2048_sim::game::GameState;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Deterministic game start with a seeded RNG
//! let mut rng = StdRng::seed_from_u64(42);
//! let s0 = GameState::new(&mut rng);
//! let moves = s0.legal_moves();
//! let s1 = s0.apply(moves[0], &mut rng).unwrap();
//! assert!(s1.score() >= s0.score());
//! assert!(Move::ALL.contains(&moves[0]));
//! ```
//!
//! Full loop with a search policy:
//! ```
//! use ai_2048_sim::expectimax::ExpectimaxConfig;
//! use ai_2048_sim::policy::{Policy, PolicySettings, Strategy};
//! use ai_2048_sim::game::GameState;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let settings = PolicySettings { expectimax: ExpectimaxConfig { depth: 1 }, ..Default::default() };
//! let mut policy = Strategy::Expectimax.build(&settings, 0).unwrap();
//! let mut rng = StdRng::seed_from_u64(123);
//! let mut state = GameState::new(&mut rng);
//! let mut moves = 0u32;
//!
//! // Keep doctests fast: a handful of plies
//! while !state.is_terminal() && moves < 8 {
//!     let dir = policy.decide(&state).unwrap();
//!     state = state.apply(dir, &mut rng).unwrap();
//!     moves += 1;
//! }
//! assert_eq!(moves, 8);
//! ```
//!
pub mod engine;
pub mod error;
pub mod expectimax;
pub mod game;
pub mod heuristic;
pub mod mcts;
pub mod policy;
pub mod simulation;

pub use error::GameError;

/// Bench-only: expose the raw evaluator for a board.
///
/// Enabled only with the `bench-internal` feature to keep the public API small.
#[cfg(feature = "bench-internal")]
#[inline]
pub fn heuristic_value(board: engine::Board) -> f64 {
    heuristic::evaluate(&game::GameState::from_board(board))
}
