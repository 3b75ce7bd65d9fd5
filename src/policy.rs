//! Strategies behind one `decide` contract.
//!
//! The game loop only ever sees [`Policy`]. Configuration names a
//! [`Strategy`], and [`Strategy::build`] turns it into a [`StrategyPolicy`]
//! that dispatches to the concrete implementation.

use std::fmt;

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::engine::Move;
use crate::error::GameError;
use crate::expectimax::{Expectimax, ExpectimaxConfig};
use crate::game::GameState;
use crate::mcts::{Mcts, MctsConfig};

/// Something that picks a move for a live game state.
pub trait Policy {
    fn name(&self) -> &'static str;

    /// Choose a legal move, or explain why none can be chosen.
    fn decide(&mut self, state: &GameState) -> Result<Move, GameError>;
}

/// Strategy identifiers accepted by configuration and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Uniformly random legal move
    Random,
    /// Prefer right/down, fall back to up/left
    Corner,
    /// Largest immediate merge score
    Greedy,
    /// Monte-Carlo tree search
    Mcts,
    /// Depth-bounded expectimax
    Expectimax,
}

impl Strategy {
    pub const ALL: [Strategy; 5] =
        [Strategy::Random, Strategy::Corner, Strategy::Greedy, Strategy::Mcts, Strategy::Expectimax];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Random => "random",
            Strategy::Corner => "corner",
            Strategy::Greedy => "greedy",
            Strategy::Mcts => "mcts",
            Strategy::Expectimax => "expectimax",
        }
    }

    /// Instantiate the strategy. `seed` drives every random choice the
    /// policy makes unless the settings pin their own seed.
    pub fn build(self, settings: &PolicySettings, seed: u64) -> Result<StrategyPolicy, GameError> {
        Ok(match self {
            Strategy::Random => StrategyPolicy::Random(RandomPolicy::new(seed)),
            Strategy::Corner => StrategyPolicy::Corner(CornerPolicy::new(seed)),
            Strategy::Greedy => StrategyPolicy::Greedy(GreedyPolicy::new(seed)),
            Strategy::Mcts => {
                let cfg = MctsConfig { seed: Some(settings.mcts.seed.unwrap_or(seed)), ..settings.mcts };
                StrategyPolicy::Mcts(Mcts::with_config(cfg)?)
            }
            Strategy::Expectimax => {
                if settings.expectimax.depth == 0 {
                    return Err(GameError::Configuration("expectimax depth must be positive".into()));
                }
                StrategyPolicy::Expectimax(Expectimax::with_config(settings.expectimax))
            }
        })
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tunables for the search strategies. Baselines take none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySettings {
    pub expectimax: ExpectimaxConfig,
    pub mcts: MctsConfig,
}

/// Closed set of strategies behind [`Policy`].
pub enum StrategyPolicy {
    Random(RandomPolicy),
    Corner(CornerPolicy),
    Greedy(GreedyPolicy),
    Mcts(Mcts),
    Expectimax(Expectimax),
}

impl Policy for StrategyPolicy {
    fn name(&self) -> &'static str {
        match self {
            StrategyPolicy::Random(p) => p.name(),
            StrategyPolicy::Corner(p) => p.name(),
            StrategyPolicy::Greedy(p) => p.name(),
            StrategyPolicy::Mcts(p) => p.name(),
            StrategyPolicy::Expectimax(p) => p.name(),
        }
    }

    fn decide(&mut self, state: &GameState) -> Result<Move, GameError> {
        match self {
            StrategyPolicy::Random(p) => p.decide(state),
            StrategyPolicy::Corner(p) => p.decide(state),
            StrategyPolicy::Greedy(p) => p.decide(state),
            StrategyPolicy::Mcts(p) => p.decide(state),
            StrategyPolicy::Expectimax(p) => p.decide(state),
        }
    }
}

impl Policy for Mcts {
    fn name(&self) -> &'static str { "mcts" }

    fn decide(&mut self, state: &GameState) -> Result<Move, GameError> { self.best_move(state) }
}

impl Policy for Expectimax {
    fn name(&self) -> &'static str { "expectimax" }

    fn decide(&mut self, state: &GameState) -> Result<Move, GameError> { self.best_move(state) }
}

/// Uniformly random legal move.
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self { Self { rng: StdRng::seed_from_u64(seed) } }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &'static str { "random" }

    fn decide(&mut self, state: &GameState) -> Result<Move, GameError> {
        state.legal_moves().choose(&mut self.rng).copied().ok_or(GameError::TerminalState)
    }
}

/// Keeps tiles packed towards the bottom-right: random among Right/Down
/// when either is legal, otherwise random among what is left (Up/Left).
pub struct CornerPolicy {
    rng: StdRng,
}

impl CornerPolicy {
    pub fn new(seed: u64) -> Self { Self { rng: StdRng::seed_from_u64(seed) } }
}

impl Policy for CornerPolicy {
    fn name(&self) -> &'static str { "corner" }

    fn decide(&mut self, state: &GameState) -> Result<Move, GameError> {
        let legal = state.legal_moves();
        let preferred: Vec<Move> =
            legal.iter().copied().filter(|m| matches!(m, Move::Right | Move::Down)).collect();
        let pool = if preferred.is_empty() { legal } else { preferred };
        pool.choose(&mut self.rng).copied().ok_or(GameError::TerminalState)
    }
}

/// Move with the largest immediate merge score; ties broken at random.
pub struct GreedyPolicy {
    rng: StdRng,
}

impl GreedyPolicy {
    pub fn new(seed: u64) -> Self { Self { rng: StdRng::seed_from_u64(seed) } }
}

impl Policy for GreedyPolicy {
    fn name(&self) -> &'static str { "greedy" }

    fn decide(&mut self, state: &GameState) -> Result<Move, GameError> {
        let scored: Vec<(Move, u64)> = Move::ALL
            .into_iter()
            .map(|dir| (dir, state.board().apply_move(dir)))
            .filter(|(_, out)| out.changed)
            .map(|(dir, out)| (dir, out.score_delta))
            .collect();
        let top = scored.iter().map(|&(_, s)| s).max().ok_or(GameError::TerminalState)?;
        let best: Vec<Move> = scored.iter().filter(|&&(_, s)| s == top).map(|&(m, _)| m).collect();
        best.choose(&mut self.rng).copied().ok_or(GameError::TerminalState)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Board;
    use std::time::Duration;

    fn state(rows: [[u32; 4]; 4]) -> GameState {
        GameState::from_board(Board::from_rows(rows).unwrap())
    }

    fn stuck() -> GameState {
        state([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]])
    }

    fn fast_settings() -> PolicySettings {
        PolicySettings {
            expectimax: ExpectimaxConfig { depth: 1 },
            mcts: MctsConfig { time_budget: Duration::from_millis(5), max_iterations: Some(50), ..Default::default() },
        }
    }

    #[test]
    fn every_strategy_reports_terminal_state() {
        for strategy in Strategy::ALL {
            let mut policy = strategy.build(&fast_settings(), 7).unwrap();
            assert_eq!(policy.decide(&stuck()), Err(GameError::TerminalState), "{strategy}");
        }
    }

    #[test]
    fn every_strategy_returns_a_legal_move() {
        let s = state([[2, 0, 0, 0], [0, 2, 0, 0], [0; 4], [0, 0, 4, 0]]);
        for strategy in Strategy::ALL {
            let mut policy = strategy.build(&fast_settings(), 3).unwrap();
            let mv = policy.decide(&s).unwrap();
            assert!(s.legal_moves().contains(&mv), "{} chose {mv}", policy.name());
        }
    }

    #[test]
    fn built_policy_reports_its_strategy_name() {
        for strategy in Strategy::ALL {
            let policy = strategy.build(&fast_settings(), 1).unwrap();
            assert_eq!(policy.name(), strategy.name());
            assert_eq!(strategy.to_string(), strategy.name());
        }
    }

    #[test]
    fn corner_prefers_right_and_down() {
        let s = state([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut policy = CornerPolicy::new(1);
        for _ in 0..20 {
            let mv = policy.decide(&s).unwrap();
            assert!(matches!(mv, Move::Right | Move::Down));
        }
        // Bottom-right corner: only Up and Left move anything.
        let s = state([[0; 4], [0; 4], [0; 4], [0, 0, 0, 2]]);
        let mv = policy.decide(&s).unwrap();
        assert!(matches!(mv, Move::Up | Move::Left));
    }

    #[test]
    fn greedy_takes_the_biggest_merge() {
        let s = state([[2, 2, 0, 0], [8, 0, 0, 0], [8, 0, 0, 0], [0; 4]]);
        // Up/Down merge the 8s (16) while Left/Right merge the 2s (4).
        let mut policy = GreedyPolicy::new(5);
        for _ in 0..10 {
            let mv = policy.decide(&s).unwrap();
            assert!(matches!(mv, Move::Up | Move::Down));
        }
    }

    #[test]
    fn zero_depth_expectimax_fails_to_build() {
        let settings = PolicySettings { expectimax: ExpectimaxConfig { depth: 0 }, ..fast_settings() };
        assert!(matches!(Strategy::Expectimax.build(&settings, 0), Err(GameError::Configuration(_))));
    }

    #[test]
    fn strategy_parses_from_cli_names() {
        assert_eq!(Strategy::from_str("mcts", true), Ok(Strategy::Mcts));
        assert_eq!(Strategy::from_str("expectimax", true), Ok(Strategy::Expectimax));
        assert!(Strategy::from_str("minimax", true).is_err());
    }
}
