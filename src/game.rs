//! Live game state: a board plus the score and highest tile it has produced.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::{Board, Move, SPAWN_EXPONENT};
use crate::error::GameError;

/// Board, accumulated merge score and the highest tile seen so far.
///
/// `GameState` is `Copy`; every hypothetical line a policy explores works on
/// its own copy and never touches the live game.
///
/// ```
/// use ai_2048_sim::game::GameState;
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut rng = StdRng::seed_from_u64(3);
/// let mut state = GameState::new(&mut rng);
/// while !state.is_terminal() {
///     let mv = state.legal_moves()[0];
///     state = state.apply(mv, &mut rng).unwrap();
/// }
/// assert!(state.highest() >= 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameState {
    board: Board,
    score: u64,
    highest: u32,
}

/// Per-game result handed to reporting code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalTally {
    pub score: u64,
    pub highest_tile: u32,
}

impl GameState {
    /// Fresh game: an empty board seeded with two spawns.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let board = Board::EMPTY.with_random_tile(rng).with_random_tile(rng);
        Self::from_board(board)
    }

    /// Start from an arbitrary board with a zero score.
    pub fn from_board(board: Board) -> Self {
        Self::with_score(board, 0)
    }

    pub fn with_score(board: Board, score: u64) -> Self {
        Self { board, score, highest: board.highest_tile() }
    }

    #[inline]
    pub fn board(&self) -> Board { self.board }

    #[inline]
    pub fn score(&self) -> u64 { self.score }

    /// Highest tile observed in this game.
    #[inline]
    pub fn highest(&self) -> u32 { self.highest }

    #[inline]
    pub fn legal_moves(&self) -> Vec<Move> { self.board.legal_moves() }

    #[inline]
    pub fn is_terminal(&self) -> bool { self.board.is_game_over() }

    /// Slide without spawning. `None` when the move leaves the board unchanged.
    #[inline]
    pub fn slide(&self, dir: Move) -> Option<GameState> {
        let out = self.board.apply_move(dir);
        if !out.changed {
            return None;
        }
        Some(GameState {
            board: out.board,
            score: self.score + out.score_delta,
            highest: self.highest.max(out.board.highest_tile()),
        })
    }

    /// Every legal move paired with its post-slide state, in [`Move::ALL`] order.
    pub fn successors(&self) -> impl Iterator<Item = (Move, GameState)> + '_ {
        Move::ALL.into_iter().filter_map(move |dir| self.slide(dir).map(|next| (dir, next)))
    }

    /// One ply: apply `dir` and spawn a tile.
    ///
    /// A move that does not change the board is rejected with
    /// [`GameError::InvalidMove`]; `self` is left as it was.
    pub fn apply<R: Rng + ?Sized>(&self, dir: Move, rng: &mut R) -> Result<GameState, GameError> {
        let next = self.slide(dir).ok_or(GameError::InvalidMove(dir))?;
        Ok(next.spawn(rng))
    }

    /// Spawn a tile at a random empty cell.
    pub fn spawn<R: Rng + ?Sized>(&self, rng: &mut R) -> GameState {
        let board = self.board.with_random_tile(rng);
        GameState { board, highest: self.highest.max(board.highest_tile()), ..*self }
    }

    /// Place a spawn tile at a specific empty cell (a chance outcome).
    pub fn place_spawn(&self, idx: usize) -> GameState {
        let board = self.board.with_tile(idx, SPAWN_EXPONENT);
        GameState { board, highest: self.highest.max(board.highest_tile()), ..*self }
    }

    pub fn tally(&self) -> FinalTally {
        FinalTally { score: self.score, highest_tile: self.highest }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.board)?;
        writeln!(f, "Score: {}  Highest: {}", self.score, self.highest)
    }
}
