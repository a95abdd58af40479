//! Common utilities for chessrooms
//!
//! This crate provides shared conversion utilities and UCI move-token helpers
//! used across the session, rules, and engine components.

pub mod converters;
pub mod uci;

// Re-export commonly used items
pub use converters::*;
pub use uci::*;
