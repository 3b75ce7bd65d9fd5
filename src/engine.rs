use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::GameError;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Up,
    Left,
    Down,
    Right,
}

impl Move {
    /// Fixed enumeration order. Legal move lists follow it and every
    /// search policy breaks value ties in favour of the earlier move.
    pub const ALL: [Move; 4] = [Move::Up, Move::Left, Move::Down, Move::Right];
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Move::Up => "up",
            Move::Left => "left",
            Move::Down => "down",
            Move::Right => "right",
        };
        f.write_str(s)
    }
}

const LINE_TABLE_SIZE: usize = 0x1_0000; // 65,536 possible 16-bit lines

/// Largest exponent a nibble can hold (2^15 = 32768). Two such tiles never merge.
pub const MAX_EXPONENT: u64 = 15;

/// Exponent written by every spawn: new tiles are always 2.
pub const SPAWN_EXPONENT: u64 = 1;

struct Stores {
    shift_left: Box<[u64]>,
    shift_right: Box<[u64]>,
    shift_up: Box<[u64]>,
    shift_down: Box<[u64]>,
    merge_left: Box<[Score]>,
    merge_right: Box<[Score]>,
}

type BoardRaw = u64;
type Line = u64;
type Tile = u64;
type Score = u64;

/// Packed 4x4 2048 board as 16 4-bit exponents in a `u64`.
///
/// Cell 0 is the top-left corner and lives in the highest nibble; cells run
/// row-major. A nibble of 0 is an empty cell, `k` is the tile `2^k`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board(BoardRaw);

/// Result of sliding a board in one direction, before any spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub board: Board,
    /// Sum of the tiles created by merges during this move.
    pub score_delta: Score,
    /// True iff the move changed the board; the only legality test.
    pub changed: bool,
}

impl Board {
    /// A constant empty board (all zeros).
    pub const EMPTY: Board = Board(0);

    /// Construct a `Board` from its raw packed representation.
    #[inline]
    pub fn from_raw(raw: BoardRaw) -> Self { Board(raw) }

    /// Borrow the raw packed `u64` for this `Board`.
    #[inline]
    pub fn raw(&self) -> BoardRaw { self.0 }

    /// Build a board from tile values (0 = empty).
    ///
    /// ```
    /// use ai_2048_sim::engine::{Board, Move};
    /// let b = Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
    /// let out = b.apply_move(Move::Left);
    /// assert_eq!(out.board.to_rows()[0], [4, 0, 0, 0]);
    /// assert_eq!(out.score_delta, 4);
    /// ```
    pub fn from_rows(rows: [[u32; 4]; 4]) -> Result<Self, GameError> {
        let mut raw = 0;
        for (idx, &val) in rows.iter().flatten().enumerate() {
            let exp = match val {
                0 => 0,
                v if v.is_power_of_two() && v >= 2 && (v.trailing_zeros() as u64) <= MAX_EXPONENT => {
                    v.trailing_zeros() as u64
                }
                v => return Err(GameError::InvalidTile(v)),
            };
            raw |= exp << ((15 - idx) * 4);
        }
        Ok(Board(raw))
    }

    /// Tile values row by row (0 = empty).
    pub fn to_rows(self) -> [[u32; 4]; 4] {
        let mut rows = [[0; 4]; 4];
        for (idx, cell) in rows.iter_mut().flatten().enumerate() {
            *cell = self.tile_value(idx);
        }
        rows
    }

    /// Return the board resulting from sliding/merging tiles in `dir` (no random insert).
    #[inline]
    pub fn shift(self, dir: Move) -> Self { self.apply_move(dir).board }

    /// Slide/merge in `dir`, reporting the merge score and whether anything moved.
    #[inline]
    pub fn apply_move(self, dir: Move) -> MoveOutcome { apply_move(self, dir) }

    /// Place a 2 into a uniformly chosen empty cell, using the provided RNG.
    ///
    /// A full board is returned unchanged.
    ///
    /// ```
    /// use ai_2048_sim::engine::Board;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(b.count_empty(), 14);
    /// ```
    #[inline]
    pub fn with_random_tile<R: Rng + ?Sized>(self, rng: &mut R) -> Self { spawn_tile(self, rng) }

    /// Write exponent `exp` into cell `idx` (row-major, 0..16).
    #[inline]
    pub fn with_tile(self, idx: usize, exp: u64) -> Self {
        debug_assert!(idx < 16 && exp <= MAX_EXPONENT);
        let shift = (15 - idx) * 4;
        Board((self.0 & !(0xf << shift)) | (exp << shift))
    }

    /// Perform a move then insert a random tile if the move changed the board.
    #[inline]
    pub fn make_move<R: Rng + ?Sized>(self, direction: Move, rng: &mut R) -> Self {
        let moved = self.shift(direction);
        if moved != self { moved.with_random_tile(rng) } else { self }
    }

    /// Moves that change this board, in [`Move::ALL`] order.
    #[inline]
    pub fn legal_moves(self) -> Vec<Move> { legal_moves(self) }

    /// True while some move is still possible.
    #[inline]
    pub fn can_move(self) -> bool { can_move(self) }

    /// Return true if no legal moves remain.
    ///
    /// ```
    /// use ai_2048_sim::engine::Board;
    /// assert!(Board::EMPTY.is_game_over());
    /// ```
    #[inline]
    pub fn is_game_over(self) -> bool { !can_move(self) }

    /// Return the highest tile value (e.g., 2048) present on the board, 0 when empty.
    #[inline]
    pub fn highest_tile(self) -> u32 { get_highest_tile_val(self) }

    /// Count the number of empty cells on the board.
    #[inline]
    pub fn count_empty(self) -> u64 { count_empty(self) }

    /// Row-major indices of the empty cells.
    #[inline]
    pub fn empty_cells(self) -> impl Iterator<Item = usize> {
        (0..16).filter(move |&idx| extract_tile(self, idx) == 0)
    }

    /// Tile value at row-major index `idx` (0 if empty).
    #[inline]
    pub fn tile_value(self, idx: usize) -> u32 { get_tile_val(self, idx) }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:#018x})", self.0)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = (0..16).map(|idx| format_val(extract_tile(*self, idx))).collect();
        for (row_idx, row) in cells.chunks(4).enumerate() {
            if row_idx > 0 {
                writeln!(f, "-------------------------------")?;
            }
            writeln!(f, "{}", row.join("|"))?;
        }
        Ok(())
    }
}

/// Initialize internal tables eagerly. Safe to call multiple times; tables
/// are otherwise built on first use.
pub fn new() {
    let _ = stores();
}

/// Slide/merge tiles in the given direction. No randomness.
pub fn apply_move(board: Board, direction: Move) -> MoveOutcome {
    let (moved, score_delta) = match direction {
        Move::Left | Move::Right => shift_rows(board, direction),
        Move::Up | Move::Down => shift_cols(board, direction),
    };
    MoveOutcome { board: moved, score_delta, changed: moved != board }
}

/// Moves whose `apply_move` reports a change, in [`Move::ALL`] order.
pub fn legal_moves(board: Board) -> Vec<Move> {
    Move::ALL
        .into_iter()
        .filter(|&dir| apply_move(board, dir).changed)
        .collect()
}

/// Terminal test: an empty cell or a mergeable adjacent pair exists.
///
/// The all-empty board has nothing to slide and counts as terminal, which
/// keeps this in agreement with [`legal_moves`] for every board.
pub fn can_move(board: Board) -> bool {
    if board == Board::EMPTY {
        return false;
    }
    if count_empty(board) > 0 {
        return true;
    }
    let transposed = transpose(board.0);
    (0..4).any(|idx| {
        line_has_merge(extract_line(board.0, idx)) || line_has_merge(extract_line(transposed, idx))
    })
}

/// Place a 2 in a uniformly random empty cell; no-op on a full board.
pub fn spawn_tile<R: Rng + ?Sized>(board: Board, rng: &mut R) -> Board {
    let empty = count_empty(board) as usize;
    if empty == 0 {
        return board;
    }
    let pick = rng.gen_range(0..empty);
    match board.empty_cells().nth(pick) {
        Some(idx) => board.with_tile(idx, SPAWN_EXPONENT),
        None => board,
    }
}

// Credit to Nneonneo
pub(crate) fn transpose(x: BoardRaw) -> BoardRaw {
    let a1 = x & 0xF0F00F0FF0F00F0F;
    let a2 = x & 0x0000F0F00000F0F0;
    let a3 = x & 0x0F0F00000F0F0000;
    let a = a1 | (a2 << 12) | (a3 >> 12);
    let b1 = a & 0xFF00FF0000FF00FF;
    let b2 = a & 0x00FF00FF00000000;
    let b3 = a & 0x00000000FF00FF00;
    b1 | (b2 >> 24) | (b3 << 24)
}

pub(crate) fn extract_line(board: BoardRaw, line_idx: u64) -> Line {
    (board >> ((3 - line_idx) * 16)) & 0xffff
}

/// Return the cell's actual value (0 if empty), e.g., 2, 4, 8, ...
pub fn get_tile_val(board: Board, idx: usize) -> u32 {
    match extract_tile(board, idx) {
        0 => 0,
        exp => 1 << exp,
    }
}

pub(crate) fn line_to_array(line: Line) -> [Tile; 4] {
    let mut tiles = [0; 4];
    for (tile_idx, tile) in tiles.iter_mut().enumerate() {
        *tile = (line >> ((3 - tile_idx) * 4)) & 0xf;
    }
    tiles
}

// https://stackoverflow.com/questions/38225571/count-number-of-zero-nibbles-in-an-unsigned-64-bit-integer
/// Count the number of zero tiles.
pub fn count_empty(board: Board) -> u64 {
    16 - count_non_empty(board)
}

static STORES: OnceLock<Stores> = OnceLock::new();

fn create_stores() -> Stores {
    // Allocate on the heap to avoid large stack frames
    let mut shift_left = vec![0u64; LINE_TABLE_SIZE];
    let mut shift_right = vec![0u64; LINE_TABLE_SIZE];
    let mut shift_up = vec![0u64; LINE_TABLE_SIZE];
    let mut shift_down = vec![0u64; LINE_TABLE_SIZE];
    let mut merge_left = vec![0u64; LINE_TABLE_SIZE];
    let mut merge_right = vec![0u64; LINE_TABLE_SIZE];

    for val in 0..LINE_TABLE_SIZE {
        let tiles = line_to_array(val as u64);
        let (left, left_score) = slide_line_left(tiles);
        let (right, right_score) = slide_line_right(tiles);
        shift_left[val] = array_to_row(left);
        shift_right[val] = array_to_row(right);
        shift_up[val] = array_to_col(left);
        shift_down[val] = array_to_col(right);
        merge_left[val] = left_score;
        merge_right[val] = right_score;
    }

    Stores {
        shift_left: shift_left.into_boxed_slice(),
        shift_right: shift_right.into_boxed_slice(),
        shift_up: shift_up.into_boxed_slice(),
        shift_down: shift_down.into_boxed_slice(),
        merge_left: merge_left.into_boxed_slice(),
        merge_right: merge_right.into_boxed_slice(),
    }
}

#[inline(always)]
fn stores() -> &'static Stores {
    STORES.get_or_init(create_stores)
}

#[inline(always)]
fn get_line_entry(table: &[u64], idx: Line) -> u64 {
    debug_assert!((idx as usize) < LINE_TABLE_SIZE);
    unsafe { *table.get_unchecked(idx as usize) }
}

fn shift_rows(board: Board, move_dir: Move) -> (Board, Score) {
    let s = stores();
    let (table, scores): (&[u64], &[Score]) = match move_dir {
        Move::Left => (&s.shift_left, &s.merge_left),
        Move::Right => (&s.shift_right, &s.merge_right),
        _ => unreachable!("shift_rows only handles left/right"),
    };
    (0..4).fold((Board::EMPTY, 0), |(new_board, score), row_idx| {
        let row_val = extract_line(board.0, row_idx);
        let new_row_val = get_line_entry(table, row_val);
        (
            Board(new_board.0 | (new_row_val << (48 - (16 * row_idx)))),
            score + get_line_entry(scores, row_val),
        )
    })
}

fn shift_cols(board: Board, move_dir: Move) -> (Board, Score) {
    let transpose_board = transpose(board.0);
    let s = stores();
    let (table, scores): (&[u64], &[Score]) = match move_dir {
        Move::Up => (&s.shift_up, &s.merge_left),
        Move::Down => (&s.shift_down, &s.merge_right),
        _ => unreachable!("shift_cols only handles up/down"),
    };
    (0..4).fold((Board::EMPTY, 0), |(new_board, score), col_idx| {
        let col_val = extract_line(transpose_board, col_idx);
        let new_col_val = get_line_entry(table, col_val);
        (
            Board(new_board.0 | (new_col_val << (12 - (4 * col_idx)))),
            score + get_line_entry(scores, col_val),
        )
    })
}

fn array_to_row(tiles: [Tile; 4]) -> Line {
    tiles[0] << 12 | tiles[1] << 8 | tiles[2] << 4 | tiles[3]
}

fn array_to_col(tiles: [Tile; 4]) -> Line {
    tiles[0] << 48 | tiles[1] << 32 | tiles[2] << 16 | tiles[3]
}

/// Canonical slide: drop gaps, merge equal neighbours left to right (each
/// tile at most once), pad with zeros on the right.
fn slide_line_left(line: [Tile; 4]) -> ([Tile; 4], Score) {
    let mut packed = [0; 4];
    let mut len = 0;
    for &tile in line.iter().filter(|&&t| t != 0) {
        packed[len] = tile;
        len += 1;
    }

    let mut out = [0; 4];
    let mut out_len = 0;
    let mut score = 0;
    let mut idx = 0;
    while idx < len {
        let tile = packed[idx];
        if idx + 1 < len && packed[idx + 1] == tile && tile < MAX_EXPONENT {
            out[out_len] = tile + 1;
            score += 1 << (tile + 1);
            idx += 2;
        } else {
            out[out_len] = tile;
            idx += 1;
        }
        out_len += 1;
    }
    (out, score)
}

fn slide_line_right(mut line: [Tile; 4]) -> ([Tile; 4], Score) {
    line.reverse();
    let (mut out, score) = slide_line_left(line);
    out.reverse();
    (out, score)
}

fn line_has_merge(line: Line) -> bool {
    line_to_array(line)
        .windows(2)
        .any(|pair| pair[0] != 0 && pair[0] == pair[1] && pair[0] < MAX_EXPONENT)
}

fn count_non_empty(board: Board) -> u64 {
    let mut board_copy = board.0;
    board_copy |= board_copy >> 1;
    board_copy |= board_copy >> 2;
    board_copy &= 0x1111111111111111;
    board_copy.count_ones() as u64
}

fn extract_tile(board: Board, idx: usize) -> Tile {
    (board.0 >> ((15 - idx) * 4)) & 0xf
}

fn format_val(exp: Tile) -> String {
    match exp {
        0 => " ".repeat(7),
        x => format!("{:^7}", 1u32 << x),
    }
}

pub fn get_highest_tile_val(board: Board) -> u32 {
    let max_exp = (0..16).map(|idx| extract_tile(board, idx)).max().unwrap_or(0);
    match max_exp {
        0 => 0,
        exp => 1 << exp,
    }
}
