use crate::engine::Move;

/// Recoverable failures surfaced by the engine and the policies.
///
/// None of these are fatal: the game driver treats a policy that cannot
/// decide as the end of that game and reports the rest to its caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GameError {
    #[error("move {0} does not change the board")]
    InvalidMove(Move),
    #[error("no legal move: the game is over")]
    TerminalState,
    #[error("search budget expired before any move was explored")]
    SearchExhausted,
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("{0} is not a valid tile value")]
    InvalidTile(u32),
}
