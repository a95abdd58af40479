use serde::Serialize;

/// User-visible failures of the session operations.
///
/// Engine-side failures (process missing, timeout, malformed response) never
/// appear here: the bridge absorbs them into the local search, so a computer
/// move either applies or the game was not in a state to accept one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "error", content = "detail", rename_all = "kebab-case")]
pub enum SessionError {
    #[error("game not found: {0}")]
    GameNotFound(String),
    #[error("game already exists: {0}")]
    GameAlreadyExists(String),
    #[error("game is not active")]
    GameNotActive,
    #[error("connection does not own the seat whose side is to move")]
    SeatMismatch,
    #[error("illegal move: {0}")]
    IllegalMove(String),
    #[error("not a computer-opponent game")]
    NotAnAIGame,
}
