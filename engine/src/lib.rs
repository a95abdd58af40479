pub mod bridge;
pub mod difficulty;
pub mod eval;
pub mod search;
pub mod uci;

pub use bridge::{BridgeError, EngineBridge};
pub use difficulty::DifficultyProfile;
pub use search::{analyze_position, PositionAnalysis, SearchEngine, Suggestion};
pub use uci::{UciError, UciMessage};

use cozy_chess::Move;

/// Events surfaced by the engine process reader task.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// `uciok` or `readyok`.
    Ready,
    /// `bestmove <token>`; `None` for the "(none)"/resignation sentinel.
    BestMove(Option<Move>),
    Info(EngineInfo),
}

/// Search metadata from `info` lines. Informational only.
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u8>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
}

#[derive(Debug, Clone, Copy)]
pub enum Score {
    Centipawns(i32),
    Mate(i8), // Negative for being mated
}
