//! Session core for multiplayer chess.
//!
//! The transport-facing orchestrator drives this crate through
//! [`session::SessionStore`]: joining and creating games, submitting moves,
//! triggering the computer opponent, and reacting to disconnections. Move
//! legality belongs to the `chess` crate, move selection to the `engine`
//! crate; this crate owns who is seated where and what state each game is in.

pub mod config;
pub mod session;

pub use config::StoreConfig;
pub use session::SessionStore;
