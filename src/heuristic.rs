//! Positional evaluation shared by every search policy.
//!
//! `evaluate(state) = score + Σ tile(r, c) * WEIGHTS[r][c]`. The weights form
//! a snake that starts at the top-right corner (2^16) and halves cell by cell,
//! turning at the row ends, down to 2^1 in the bottom-right corner.

use std::sync::OnceLock;

use crate::engine::{self as GameEngine, Board};
use crate::game::GameState;

/// Snake-ordered positional weights, largest in the top-right corner.
pub const WEIGHTS: [[u64; 4]; 4] = [
    [8192, 16384, 32768, 65536],
    [4096, 2048, 1024, 512],
    [32, 64, 128, 256],
    [16, 8, 4, 2],
];

const LINE_TABLE_SIZE: usize = 0x1_0000;

/// One table per row: weighted tile sum of every possible 16-bit row.
static ROW_WEIGHTS: OnceLock<Box<[Box<[u64]>]>> = OnceLock::new();

pub(crate) fn warm() {
    let _ = row_weights();
}

fn row_weights() -> &'static [Box<[u64]>] {
    ROW_WEIGHTS.get_or_init(|| {
        WEIGHTS
            .iter()
            .map(|weights| {
                (0..LINE_TABLE_SIZE as u64)
                    .map(|line| calc_row_weight(line, weights))
                    .collect::<Vec<_>>()
                    .into_boxed_slice()
            })
            .collect::<Vec<_>>()
            .into_boxed_slice()
    })
}

fn calc_row_weight(line: u64, weights: &[u64; 4]) -> u64 {
    GameEngine::line_to_array(line)
        .iter()
        .zip(weights)
        .map(|(&exp, &w)| if exp == 0 { 0 } else { (1u64 << exp) * w })
        .sum()
}

/// Positional part of the evaluation: `Σ tile * weight`.
#[inline]
pub fn weighted_sum(board: Board) -> u64 {
    let tables = row_weights();
    (0..4).fold(0, |acc, row_idx| {
        let row_val = GameEngine::extract_line(board.raw(), row_idx as u64);
        acc + tables[row_idx][row_val as usize]
    })
}

/// Heuristic value of a state: merge score plus positional weight.
///
/// ```
/// use ai_2048_sim::engine::Board;
/// use ai_2048_sim::game::GameState;
/// use ai_2048_sim::heuristic::evaluate;
///
/// let board = Board::from_rows([[0, 0, 0, 2], [0; 4], [0; 4], [0; 4]]).unwrap();
/// assert_eq!(evaluate(&GameState::with_score(board, 10)), 10.0 + 2.0 * 65536.0);
/// ```
#[inline]
pub fn evaluate(state: &GameState) -> f64 {
    (state.score() + weighted_sum(state.board())) as f64
}
