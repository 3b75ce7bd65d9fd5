//! Monte-Carlo Tree Search policy for 2048.
//!
//! Each decision builds a fresh tree of alternating Decision/Chance nodes
//! under a wall-clock budget:
//!
//! 1. select: UCB1 at decision nodes (unvisited children first), uniform at
//!    chance nodes;
//! 2. expand: one chance child per legal move, or one decision child per
//!    empty cell holding a fresh 2;
//! 3. simulate: a short rollout that always plays the move with the best
//!    heuristic value, scored by the evaluator and scaled down;
//! 4. backpropagate: visits and reward up to the root.
//!
//! The deadline is polled before every iteration; a started iteration always
//! completes and none is started once the budget is spent.
//!
//! ```
//! use ai_2048_sim::game::GameState;
//! use ai_2048_sim::mcts::{Mcts, MctsConfig};
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::time::Duration;
//!
//! let mut rng = StdRng::seed_from_u64(8);
//! let state = GameState::new(&mut rng);
//! let cfg = MctsConfig { time_budget: Duration::from_millis(20), seed: Some(1), ..Default::default() };
//! let mut mcts = Mcts::with_config(cfg).unwrap();
//! let mv = mcts.best_move(&state).unwrap();
//! assert!(state.legal_moves().contains(&mv));
//! ```

use std::time::{Duration, Instant};

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::engine::{self, Move};
use crate::error::GameError;
use crate::game::GameState;
use crate::heuristic::{self, evaluate};

mod tree;

use tree::{NodeKind, Tree};

/// Configurable knobs for MCTS.
///
/// - `time_budget`: wall-clock time spent per decision.
/// - `rollout_depth`: plies per rollout before it is cut off and scored.
/// - `reward_scale`: rollout values are divided by this before backpropagation.
/// - `exploration`: the `c` in `sqrt(c * ln(T) / n)`.
/// - `max_iterations`: optional iteration cap on top of the time budget.
/// - `seed`: RNG seed for selection, expansion and rollouts (entropy if None).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MctsConfig {
    pub time_budget: Duration,
    pub rollout_depth: u32,
    pub reward_scale: f64,
    pub exploration: f64,
    pub max_iterations: Option<u64>,
    pub seed: Option<u64>,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_millis(500),
            rollout_depth: 25,
            reward_scale: (1u64 << 20) as f64,
            exploration: 2.0,
            max_iterations: None,
            seed: None,
        }
    }
}

/// Search stats for the last decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct MctsStats {
    pub iterations: u64,
    pub nodes: u64,
    pub root_visits: u64,
}

/// Time-bounded MCTS with guided rollouts.
pub struct Mcts {
    cfg: MctsConfig,
    rng: StdRng,
    stats: MctsStats,
}

impl Mcts {
    /// Validates the configuration and warms the engine/heuristic tables.
    pub fn with_config(cfg: MctsConfig) -> Result<Self, GameError> {
        if !(cfg.reward_scale.is_finite() && cfg.reward_scale > 0.0) {
            return Err(GameError::Configuration("mcts reward_scale must be positive".into()));
        }
        if !(cfg.exploration.is_finite() && cfg.exploration >= 0.0) {
            return Err(GameError::Configuration("mcts exploration must be non-negative".into()));
        }
        engine::new();
        heuristic::warm();
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { cfg, rng, stats: MctsStats::default() })
    }

    #[inline]
    pub fn last_stats(&self) -> MctsStats { self.stats }

    /// Search from `state` until the budget runs out and return the root
    /// move with the best average reward.
    ///
    /// A state with a single legal move returns it without searching.
    /// Errors with [`GameError::TerminalState`] when nothing is legal and
    /// [`GameError::SearchExhausted`] when no root move got a visit.
    pub fn best_move(&mut self, state: &GameState) -> Result<Move, GameError> {
        self.stats = MctsStats::default();
        let legal = state.legal_moves();
        match legal.as_slice() {
            [] => return Err(GameError::TerminalState),
            [only] => return Ok(*only),
            _ => {}
        }

        let deadline = Instant::now() + self.cfg.time_budget;
        let mut tree = Tree::new(*state);
        let mut iterations = 0u64;
        while Instant::now() < deadline && self.cfg.max_iterations.map_or(true, |cap| iterations < cap) {
            self.iterate(&mut tree);
            iterations += 1;
        }

        self.stats = MctsStats {
            iterations,
            nodes: tree.len() as u64,
            root_visits: tree.node(tree::ROOT).visits,
        };
        let best = tree.best_root_action().ok_or(GameError::SearchExhausted)?;
        debug!(
            "mcts move={} iterations={} nodes={} budget={:?}",
            best, iterations, self.stats.nodes, self.cfg.time_budget
        );
        Ok(best)
    }

    fn iterate(&mut self, tree: &mut Tree) {
        let mut leaf = tree.select(self.cfg.exploration, &mut self.rng);
        let node = tree.node(leaf);
        if node.children.is_empty() && node.state.board().can_move() {
            if let Some(child) = tree.expand(leaf, &mut self.rng) {
                leaf = child;
            }
        }
        let node = tree.node(leaf);
        let reward = self.simulate(node.state, node.kind);
        tree.backpropagate(leaf, reward);
    }

    /// Guided rollout from a copy of `state`, scaled by `reward_scale`.
    fn simulate(&mut self, state: GameState, kind: NodeKind) -> f64 {
        let mut state = match kind {
            NodeKind::Chance => state.spawn(&mut self.rng),
            NodeKind::Decision => state,
        };
        for _ in 0..self.cfg.rollout_depth {
            let Some(next) = greedy_successor(&state) else {
                break;
            };
            state = next.spawn(&mut self.rng);
        }
        evaluate(&state) / self.cfg.reward_scale
    }
}

/// Post-move state with the highest evaluation; earliest move wins ties.
/// `None` on a terminal state.
fn greedy_successor(state: &GameState) -> Option<GameState> {
    let mut best: Option<(GameState, f64)> = None;
    for (_, next) in state.successors() {
        let value = evaluate(&next);
        if best.map_or(true, |(_, cur)| value > cur) {
            best = Some((next, value));
        }
    }
    best.map(|(next, _)| next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Board;

    fn seeded(budget_ms: u64, max_iterations: Option<u64>) -> Mcts {
        Mcts::with_config(MctsConfig {
            time_budget: Duration::from_millis(budget_ms),
            max_iterations,
            seed: Some(42),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn single_legal_move_needs_no_budget() {
        let state = GameState::from_board(
            Board::from_rows([[2, 0, 0, 0], [4, 0, 0, 0], [8, 0, 0, 0], [16, 0, 0, 0]]).unwrap(),
        );
        assert_eq!(seeded(0, None).best_move(&state), Ok(Move::Right));
        assert_eq!(seeded(50, None).best_move(&state), Ok(Move::Right));
    }

    #[test]
    fn zero_budget_is_search_exhausted() {
        let state = GameState::from_board(Board::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 4]]).unwrap());
        assert_eq!(seeded(0, None).best_move(&state), Err(GameError::SearchExhausted));
    }

    #[test]
    fn terminal_state_is_reported() {
        let state = GameState::from_board(
            Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap(),
        );
        assert_eq!(seeded(10, None).best_move(&state), Err(GameError::TerminalState));
    }

    #[test]
    fn iteration_cap_bounds_the_search() {
        let state = GameState::from_board(Board::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 4]]).unwrap());
        let mut mcts = seeded(10_000, Some(64));
        let mv = mcts.best_move(&state).unwrap();
        assert!(state.legal_moves().contains(&mv));
        let stats = mcts.last_stats();
        assert_eq!(stats.iterations, 64);
        assert_eq!(stats.root_visits, 64);
    }

    #[test]
    fn seeded_search_is_reproducible() {
        let state = GameState::from_board(Board::from_rows([[2, 2, 0, 0], [0, 4, 0, 0], [0; 4], [0, 0, 0, 8]]).unwrap());
        let a = seeded(10_000, Some(200)).best_move(&state).unwrap();
        let b = seeded(10_000, Some(200)).best_move(&state).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let cfg = MctsConfig { reward_scale: 0.0, ..Default::default() };
        assert!(matches!(Mcts::with_config(cfg), Err(GameError::Configuration(_))));
        let cfg = MctsConfig { exploration: f64::NAN, ..Default::default() };
        assert!(matches!(Mcts::with_config(cfg), Err(GameError::Configuration(_))));
    }

    fn with_rollout(rollout_depth: u32, reward_scale: f64) -> Mcts {
        Mcts::with_config(MctsConfig { rollout_depth, reward_scale, seed: Some(3), ..Default::default() }).unwrap()
    }

    #[test]
    fn rollout_from_terminal_state_scores_it_directly() {
        let stuck = GameState::with_score(
            Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap(),
            120,
        );
        let mut mcts = with_rollout(25, MctsConfig::default().reward_scale);
        let reward = mcts.simulate(stuck, NodeKind::Decision);
        assert_eq!(reward, evaluate(&stuck) / (1u64 << 20) as f64);
    }

    #[test]
    fn chance_leaf_spawns_before_rolling_out() {
        let state = GameState::from_board(Board::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 4]]).unwrap());
        let base = evaluate(&state);
        let mut mcts = with_rollout(0, 1.0);

        // Decision leaves are scored as they are.
        assert_eq!(mcts.simulate(state, NodeKind::Decision), base);

        // Chance leaves gain exactly one 2 in some empty cell first.
        for _ in 0..20 {
            let gained = mcts.simulate(state, NodeKind::Chance) - base;
            let matches_a_cell = state.board().empty_cells().any(|idx| {
                let w = crate::heuristic::WEIGHTS[idx / 4][idx % 4];
                gained == (2 * w) as f64
            });
            assert!(matches_a_cell, "gain {gained} is not a single 2 in an empty cell");
        }
    }

    #[test]
    fn rollout_reward_is_final_evaluation_over_scale() {
        // Only Left and Right are legal and both leave one empty cell, so a
        // one-ply rollout is fully determined: Right scores higher, and the
        // spawn fills the hole it leaves in the top-left corner.
        let state = GameState::from_board(
            Board::from_rows([[2, 2, 4, 8], [16, 32, 64, 128], [256, 512, 1024, 2048], [4, 8, 16, 32]]).unwrap(),
        );
        let finished = GameState::with_score(
            Board::from_rows([[2, 4, 4, 8], [16, 32, 64, 128], [256, 512, 1024, 2048], [4, 8, 16, 32]]).unwrap(),
            4,
        );
        let scale = MctsConfig::default().reward_scale;
        let mut mcts = with_rollout(1, scale);
        assert_eq!(mcts.simulate(state, NodeKind::Decision), evaluate(&finished) / scale);
    }

    #[test]
    fn tiny_budget_still_runs_one_iteration() {
        let state = GameState::from_board(Board::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 4]]).unwrap());
        let mut mcts = seeded(10_000, Some(1));
        let mv = mcts.best_move(&state).unwrap();
        assert!(state.legal_moves().contains(&mv));
        let stats = mcts.last_stats();
        assert_eq!(stats.iterations, 1);
        assert_eq!(stats.root_visits, 1);
    }

    #[test]
    fn greedy_successor_picks_best_evaluation() {
        let state = GameState::from_board(Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap());
        let next = greedy_successor(&state).unwrap();
        assert_eq!(next.board().to_rows()[0], [0, 0, 0, 4]);
        assert_eq!(next.score(), 4);
        let stuck = GameState::from_board(
            Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap(),
        );
        assert!(greedy_successor(&stuck).is_none());
    }
}
