pub mod fen;
pub mod game;
pub mod types;
pub mod uci;

pub use game::{Game, GameError, HistoryEntry, StartPosition, TerminalReason};
pub use types::PieceColor;
pub use uci::convert_uci_castling_to_cozy;
