//! UCI (Universal Chess Interface) notation adjustments.

pub use chess_common::convert_uci_castling_to_cozy;
