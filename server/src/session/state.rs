//! Per-game entity and its lifecycle state machine.
//!
//! `waiting -> playing <-> disconnected -> finished`. All mutation happens
//! through the methods here, called by the store under its registry lock.
//! The disconnect generation counter lets a grace timer verify at fire time
//! that it belongs to the disconnect that armed it.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chess::{PieceColor, TerminalReason};
use engine::{DifficultyProfile, EngineBridge};
use serde::Serialize;
use uuid::Uuid;

use super::snapshot::{now_ms, ChatMessage, GameSummary, MoveRecord, PlayerInfo, PlayerSummary};

const DEFAULT_RATING: u16 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Waiting,
    Playing,
    Disconnected,
    Finished,
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    Repetition,
    InsufficientMaterial,
    Draw,
    Resignation,
    Timeout,
}

impl From<TerminalReason> for EndReason {
    fn from(reason: TerminalReason) -> Self {
        match reason {
            TerminalReason::Checkmate => Self::Checkmate,
            TerminalReason::Stalemate => Self::Stalemate,
            TerminalReason::Repetition => Self::Repetition,
            TerminalReason::InsufficientMaterial => Self::InsufficientMaterial,
            TerminalReason::FiftyMoveDraw => Self::Draw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Standard,
    Blitz,
    Bullet,
    Correspondence,
}

/// Options supplied at explicit game creation.
#[derive(Debug, Clone, Serialize)]
pub struct GameOptions {
    pub rated: bool,
    pub game_type: GameType,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            rated: false,
            game_type: GameType::Standard,
        }
    }
}

/// A seated participant. Owned by its seat; replaced wholesale on
/// reassignment, never shared across games.
#[derive(Debug, Clone)]
pub struct Player {
    pub connection_id: String,
    pub name: String,
    pub rating: u16,
    pub is_ai: bool,
}

impl Player {
    pub(crate) fn human(connection_id: &str, info: &PlayerInfo) -> Self {
        Self {
            connection_id: connection_id.to_string(),
            name: info.name.clone(),
            rating: info.rating.unwrap_or(DEFAULT_RATING),
            is_ai: false,
        }
    }

    pub(crate) fn engine(profile: DifficultyProfile) -> Self {
        Self {
            connection_id: format!("engine-{}", Uuid::new_v4()),
            name: format!("Computer (Level {})", profile.level),
            rating: profile.elo,
            is_ai: true,
        }
    }

    fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            name: self.name.clone(),
            rating: self.rating,
            is_ai: self.is_ai,
        }
    }
}

/// Counters derived from the move stream; always one-to-one with a game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GameStats {
    pub moves: u32,
    pub captures: u32,
    pub checks: u32,
    pub castles: u32,
    pub promotions: u32,
}

impl GameStats {
    fn record(&mut self, entry: &chess::HistoryEntry) {
        self.moves += 1;
        if entry.captured.is_some() {
            self.captures += 1;
        }
        if entry.is_check {
            self.checks += 1;
        }
        if entry.is_castle {
            self.castles += 1;
        }
        if entry.promotion.is_some() {
            self.promotions += 1;
        }
    }
}

pub struct GameSession {
    pub id: String,
    pub rules: chess::Game,
    pub white: Option<Player>,
    pub black: Option<Player>,
    pub spectators: HashSet<String>,
    pub moves: Vec<MoveRecord>,
    pub stats: GameStats,
    pub chat: VecDeque<ChatMessage>,
    pub state: GameState,
    pub end_reason: Option<EndReason>,
    pub winner: Option<PieceColor>,
    pub options: GameOptions,
    pub is_ai_game: bool,
    pub difficulty: Option<DifficultyProfile>,
    pub engine: Option<Arc<EngineBridge>>,
    pub created_at: Instant,
    pub started_at: Option<Instant>,
    pub ended_at: Option<Instant>,
    pub disconnected_at: Option<Instant>,
    pub started_at_ms: Option<u64>,
    pub disconnect_epoch: u64,
    pub disconnected_seat: Option<PieceColor>,
}

impl GameSession {
    pub(crate) fn new(id: String, options: GameOptions) -> Self {
        Self {
            id,
            rules: chess::Game::new(),
            white: None,
            black: None,
            spectators: HashSet::new(),
            moves: Vec::new(),
            stats: GameStats::default(),
            chat: VecDeque::new(),
            state: GameState::Waiting,
            end_reason: None,
            winner: None,
            options,
            is_ai_game: false,
            difficulty: None,
            engine: None,
            created_at: Instant::now(),
            started_at: None,
            ended_at: None,
            disconnected_at: None,
            started_at_ms: None,
            disconnect_epoch: 0,
            disconnected_seat: None,
        }
    }

    pub(crate) fn player(&self, color: PieceColor) -> Option<&Player> {
        match color {
            PieceColor::White => self.white.as_ref(),
            PieceColor::Black => self.black.as_ref(),
        }
    }

    pub(crate) fn player_mut(&mut self, color: PieceColor) -> Option<&mut Player> {
        match color {
            PieceColor::White => self.white.as_mut(),
            PieceColor::Black => self.black.as_mut(),
        }
    }

    pub(crate) fn seat(&mut self, color: PieceColor, player: Player) {
        match color {
            PieceColor::White => self.white = Some(player),
            PieceColor::Black => self.black = Some(player),
        }
    }

    pub(crate) fn vacate(&mut self, color: PieceColor) {
        match color {
            PieceColor::White => self.white = None,
            PieceColor::Black => self.black = None,
        }
    }

    pub(crate) fn seat_of(&self, connection_id: &str) -> Option<PieceColor> {
        if self
            .white
            .as_ref()
            .is_some_and(|p| p.connection_id == connection_id)
        {
            Some(PieceColor::White)
        } else if self
            .black
            .as_ref()
            .is_some_and(|p| p.connection_id == connection_id)
        {
            Some(PieceColor::Black)
        } else {
            None
        }
    }

    /// The seat occupied by a synthetic engine player, if any.
    pub(crate) fn ai_seat(&self) -> Option<PieceColor> {
        if self.white.as_ref().is_some_and(|p| p.is_ai) {
            Some(PieceColor::White)
        } else if self.black.as_ref().is_some_and(|p| p.is_ai) {
            Some(PieceColor::Black)
        } else {
            None
        }
    }

    pub(crate) fn both_seated(&self) -> bool {
        self.white.is_some() && self.black.is_some()
    }

    pub(crate) fn start(&mut self) {
        self.state = GameState::Playing;
        self.started_at = Some(Instant::now());
        self.started_at_ms = Some(now_ms());
    }

    /// `playing -> disconnected`; returns the generation the grace timer
    /// must present at fire time.
    pub(crate) fn mark_disconnected(&mut self, seat: PieceColor) -> u64 {
        self.state = GameState::Disconnected;
        self.disconnected_at = Some(Instant::now());
        self.disconnected_seat = Some(seat);
        self.disconnect_epoch += 1;
        self.disconnect_epoch
    }

    /// `disconnected -> playing` after a successful reconnection.
    pub(crate) fn restore_playing(&mut self) {
        self.state = GameState::Playing;
        self.disconnected_at = None;
        self.disconnected_seat = None;
    }

    /// Terminal transition. Returns false if the game was already finished.
    pub(crate) fn finish(&mut self, reason: EndReason, winner: Option<PieceColor>) -> bool {
        if self.state == GameState::Finished {
            return false;
        }
        self.state = GameState::Finished;
        self.end_reason = Some(reason);
        self.winner = winner;
        self.ended_at = Some(Instant::now());
        true
    }

    pub(crate) fn record_move(&mut self, entry: &chess::HistoryEntry, by_engine: bool) -> MoveRecord {
        self.stats.record(entry);
        let record = MoveRecord {
            san: entry.san.clone(),
            from: chess_common::format_square(entry.from),
            to: chess_common::format_square(entry.to),
            color: chess_common::format_color(entry.piece_color).to_string(),
            timestamp_ms: now_ms(),
            fen: entry.fen.clone(),
            by_engine,
        };
        self.moves.push(record.clone());
        record
    }

    /// Age anchor for the retention sweep: end time, else start time, else now.
    pub(crate) fn effective_age(&self, now: Instant) -> Duration {
        let anchor = self.ended_at.or(self.started_at).unwrap_or(now);
        now.saturating_duration_since(anchor)
    }

    pub(crate) fn summary(&self) -> GameSummary {
        GameSummary {
            id: self.id.clone(),
            state: self.state,
            white: self.white.as_ref().map(Player::summary),
            black: self.black.as_ref().map(Player::summary),
            move_count: self.moves.len(),
            spectator_count: self.spectators.len(),
            started_at_ms: self.started_at_ms,
            game_type: self.options.game_type,
            rated: self.options.rated,
            ai_game: self.is_ai_game,
        }
    }

    /// Every human connection attached to this game.
    pub(crate) fn connection_ids(&self) -> Vec<String> {
        self.white
            .iter()
            .chain(self.black.iter())
            .filter(|p| !p.is_ai)
            .map(|p| p.connection_id.clone())
            .chain(self.spectators.iter().cloned())
            .collect()
    }
}
