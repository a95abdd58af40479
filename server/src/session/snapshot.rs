//! Orchestrator-facing inputs and result types.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use cozy_chess::Move;
use serde::Serialize;

use super::state::{EndReason, GameState, GameStats, GameType};

/// One applied move as broadcast to clients and kept for analysis.
/// Immutable once appended.
#[derive(Debug, Clone, Serialize)]
pub struct MoveRecord {
    pub san: String,
    pub from: String,
    pub to: String,
    pub color: String,
    pub timestamp_ms: u64,
    /// Position after the move.
    pub fen: String,
    pub by_engine: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: u64,
    pub author: String,
    pub text: String,
    pub timestamp_ms: u64,
    pub from_spectator: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatRole {
    White,
    Black,
    Spectator,
}

impl From<chess::PieceColor> for SeatRole {
    fn from(color: chess::PieceColor) -> Self {
        match color {
            chess::PieceColor::White => Self::White,
            chess::PieceColor::Black => Self::Black,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinOutcome {
    pub game_id: String,
    pub role: SeatRole,
    pub reconnected: bool,
    pub fen: String,
    pub state: GameState,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameOver {
    pub reason: EndReason,
    pub winner: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveOutcome {
    pub record: MoveRecord,
    pub fen: String,
    pub side_to_move: String,
    pub game_over: Option<GameOver>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub name: String,
    pub rating: u16,
    pub is_ai: bool,
}

/// Lobby-level view of one game.
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    pub id: String,
    pub state: GameState,
    pub white: Option<PlayerSummary>,
    pub black: Option<PlayerSummary>,
    pub move_count: usize,
    pub spectator_count: usize,
    pub started_at_ms: Option<u64>,
    pub game_type: GameType,
    pub rated: bool,
    pub ai_game: bool,
}

/// Post-game (or mid-game) review data: the move stream plus derived stats.
#[derive(Debug, Clone, Serialize)]
pub struct GameAnalysis {
    pub moves: Vec<MoveRecord>,
    pub stats: GameStats,
    /// Wall-clock game length; `None` until the game has ended.
    pub duration_secs: Option<u64>,
}

/// A player's disconnect, reported back so the opponent can be told.
#[derive(Debug, Clone, Serialize)]
pub struct DisconnectNotice {
    pub game_id: String,
    pub color: String,
    pub name: String,
}

/// Display name and optional rating supplied on join.
#[derive(Debug, Clone)]
pub struct PlayerInfo {
    pub name: String,
    pub rating: Option<u16>,
}

impl PlayerInfo {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rating: None,
        }
    }
}

/// A candidate move as submitted by a client.
#[derive(Debug, Clone)]
pub struct MoveInput {
    pub from: String,
    pub to: String,
    pub promotion: Option<char>,
}

impl MoveInput {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            promotion: None,
        }
    }

    pub fn promoting(from: &str, to: &str, piece: char) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            promotion: Some(piece),
        }
    }

    pub(crate) fn to_move(&self) -> Option<Move> {
        let from = chess_common::parse_square(&self.from)?;
        let to = chess_common::parse_square(&self.to)?;
        let promotion = match self.promotion {
            Some(c) => Some(chess_common::parse_piece(c)?),
            None => None,
        };
        Some(Move {
            from,
            to,
            promotion,
        })
    }
}

impl fmt::Display for MoveInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = self.promotion {
            write!(f, "{p}")?;
        }
        Ok(())
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
