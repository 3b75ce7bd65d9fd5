use log::{debug, warn};

use crate::engine::Move;
use crate::error::GameError;
use crate::game::GameState;
use crate::heuristic::evaluate;

use super::{warm_engine_and_heuristics, BranchEval, ExpectimaxConfig, SearchStats};

enum Node { Max, Chance }

/// Single-threaded, depth-bounded Expectimax search.
///
/// Constructors warm engine/heuristic tables. The search itself keeps no
/// state between calls apart from [`SearchStats`].
pub struct Expectimax {
    cfg: ExpectimaxConfig,
    stats: SearchStats,
}

impl Expectimax {
    pub fn new() -> Self { Self::with_config(ExpectimaxConfig::default()) }

    pub fn with_config(cfg: ExpectimaxConfig) -> Self {
        warm_engine_and_heuristics();
        if cfg.depth > 0 && cfg.depth % 2 == 0 {
            warn!("expectimax depth {} is even; the level below the root repeats a player move", cfg.depth);
        }
        Self { cfg, stats: SearchStats::default() }
    }

    /// Compute the best move using expectimax.
    ///
    /// Errors with [`GameError::Configuration`] for a zero depth and
    /// [`GameError::TerminalState`] when no move is legal.
    ///
    /// ```
    /// use ai_2048_sim::engine::{Board, Move};
    /// use ai_2048_sim::expectimax::Expectimax;
    /// use ai_2048_sim::game::GameState;
    ///
    /// let state = GameState::from_board(Board::from_rows([[2, 4, 0, 4], [0; 4], [0; 4], [0; 4]]).unwrap());
    /// let mut ex = Expectimax::new();
    /// let mv = ex.best_move(&state).unwrap();
    /// assert!(state.legal_moves().contains(&mv));
    /// assert_ne!(mv, Move::Up);
    /// ```
    pub fn best_move(&mut self, state: &GameState) -> Result<Move, GameError> {
        let branches = self.branch_evals(state)?;
        let best = first_best(&branches).ok_or(GameError::TerminalState)?;
        debug!(
            "expectimax depth={} move={} ev={:.1} nodes={}",
            self.cfg.depth, best.dir, best.ev, self.stats.nodes
        );
        Ok(best.dir)
    }

    /// Compute EV for each direction.
    ///
    /// Returns a fixed array in [`Move::ALL`] order and marks illegal moves
    /// as `legal=false`.
    pub fn branch_evals(&mut self, state: &GameState) -> Result<[BranchEval; 4], GameError> {
        if self.cfg.depth == 0 {
            return Err(GameError::Configuration("expectimax depth must be positive".into()));
        }
        if state.is_terminal() {
            return Err(GameError::TerminalState);
        }
        let mut state_count = 0u64;
        let mut out = Move::ALL.map(|dir| BranchEval { dir, ev: 0.0, legal: false });
        for (dir, next) in state.successors() {
            let ev = self.expectimax(&next, self.cfg.depth - 1, &mut state_count);
            if let Some(slot) = out.iter_mut().find(|b| b.dir == dir) {
                *slot = BranchEval { dir, ev, legal: true };
            }
        }
        self.stats.nodes = state_count;
        Ok(out)
    }

    /// Statistics collected from the last call to [`Self::best_move`] or
    /// [`Self::branch_evals`].
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    fn expectimax(&self, state: &GameState, depth: u32, state_count: &mut u64) -> f64 {
        *state_count += 1;
        if depth == 0 || !state.board().can_move() {
            return evaluate(state);
        }
        let node = if depth % 2 == 1 { Node::Max } else { Node::Chance };
        match node {
            Node::Max => self.evaluate_max(state, depth, state_count),
            Node::Chance => self.evaluate_chance(state, depth, state_count),
        }
    }

    fn evaluate_max(&self, state: &GameState, depth: u32, state_count: &mut u64) -> f64 {
        let mut best_score = f64::NEG_INFINITY;
        for (_, next) in state.successors() {
            let score = self.expectimax(&next, depth - 1, state_count);
            if score > best_score {
                best_score = score;
            }
        }
        // can_move() held, so at least one successor exists
        if best_score.is_finite() { best_score } else { evaluate(state) }
    }

    fn evaluate_chance(&self, state: &GameState, depth: u32, state_count: &mut u64) -> f64 {
        let mut total = 0.0;
        let mut placements = 0u32;
        for idx in state.board().empty_cells() {
            total += self.expectimax(&state.place_spawn(idx), depth - 1, state_count);
            placements += 1;
        }
        if placements == 0 {
            return evaluate(state);
        }
        total / f64::from(placements)
    }
}

impl Default for Expectimax { fn default() -> Self { Self::new() } }

/// Legal branch with the strictly greatest EV; the earliest one wins ties.
fn first_best(branches: &[BranchEval]) -> Option<BranchEval> {
    let mut best: Option<BranchEval> = None;
    for &branch in branches.iter().filter(|b| b.legal) {
        if best.map_or(true, |cur| branch.ev > cur.ev) {
            best = Some(branch);
        }
    }
    best
}
