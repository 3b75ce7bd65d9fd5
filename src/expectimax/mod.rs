//! Expectimax search policy for 2048.
//!
//! Odd remaining depth is a player (max) level, even remaining depth is a
//! chance level averaging over a 2 placed in every empty cell. The root is a
//! player level and each legal move is searched with `depth - 1`. With an odd
//! depth the levels alternate all the way down; an even depth puts a second
//! player level directly under the root and plays worse. Even depths are
//! accepted (with a warning) but not adjusted.
//!
//! Expectimax is deterministic: ties go to the earlier move in
//! [`Move::ALL`](crate::engine::Move::ALL) order.
//!
//! ```
//! use ai_2048_sim::expectimax::{Expectimax, ExpectimaxConfig};
//! use ai_2048_sim::game::GameState;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(123);
//! let state = GameState::new(&mut rng);
//! let mut ex = Expectimax::with_config(ExpectimaxConfig { depth: 3 });
//! let mv = ex.best_move(&state).unwrap();
//! assert!(state.legal_moves().contains(&mv));
//! assert!(ex.last_stats().nodes > 0);
//! ```

use serde::{Deserialize, Serialize};

use crate::engine::{self, Move};

mod search;

pub use search::Expectimax;

/// Configurable knobs for Expectimax.
///
/// - `depth`: plies of search, counting player and chance levels separately.
///   Must be positive; odd values are the intended setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectimaxConfig {
    pub depth: u32,
}

impl Default for ExpectimaxConfig {
    fn default() -> Self {
        Self { depth: 3 }
    }
}

/// Per-branch expected value at the root.
///
/// - `ev` is the expected value for taking `dir` from the current state.
/// - `legal` is false when the move is a no-op for the current board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchEval {
    pub dir: Move,
    pub ev: f64,
    pub legal: bool,
}

/// Basic search stats for a single evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchStats {
    pub nodes: u64,
}

/// Common helper for constructors to ensure tables are initialized.
fn warm_engine_and_heuristics() {
    // Safe to call multiple times.
    engine::new();
    crate::heuristic::warm();
}
