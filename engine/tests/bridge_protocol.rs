//! Bridge behavior against a scripted stand-in engine.
//!
//! A tiny shell script speaks just enough UCI to exercise the handshake,
//! the happy path, the malformed-response path, and timeout enforcement
//! without needing a real engine installed.

#![cfg(unix)]

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::Instant;

use cozy_chess::Board;
use engine::search::legal_moves;
use engine::{DifficultyProfile, EngineBridge};
use tempfile::TempDir;

/// Write an executable script that answers the UCI handshake and handles
/// `go` with the given shell fragment.
fn fake_engine(dir: &TempDir, on_go: &str) -> PathBuf {
    let path = dir.path().join("fake-engine.sh");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "#!/bin/sh\n\
         while read line; do\n\
           case \"$line\" in\n\
             uci) echo \"id name fake\"; echo \"uciok\" ;;\n\
             isready) echo \"readyok\" ;;\n\
             go*) {on_go} ;;\n\
             quit) exit 0 ;;\n\
           esac\n\
         done"
    )
    .unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn fast_profile() -> DifficultyProfile {
    DifficultyProfile {
        movetime_ms: 100,
        timeout_margin_ms: 400,
        ..DifficultyProfile::for_level(3)
    }
}

#[tokio::test]
async fn test_engine_bestmove_is_used_when_legal() {
    let dir = TempDir::new().unwrap();
    let path = fake_engine(&dir, "echo \"info depth 3 score cp 21\"; echo \"bestmove e2e4\"");

    let bridge = EngineBridge::connect(Some(&path), fast_profile()).await;
    assert!(bridge.is_available().await);

    let board = Board::default();
    let mv = bridge.select_move(&board).await.unwrap();
    assert_eq!(chess_common::format_uci_move(mv), "e2e4");

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_illegal_bestmove_falls_back() {
    let dir = TempDir::new().unwrap();
    // e2e5 is never legal from the start position.
    let path = fake_engine(&dir, "echo \"bestmove e2e5\"");

    let bridge = EngineBridge::connect(Some(&path), fast_profile()).await;
    let board = Board::default();
    let mv = bridge.select_move(&board).await.unwrap();
    assert!(legal_moves(&board).contains(&mv));

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_none_sentinel_falls_back() {
    let dir = TempDir::new().unwrap();
    let path = fake_engine(&dir, "echo \"bestmove (none)\"");

    let bridge = EngineBridge::connect(Some(&path), fast_profile()).await;
    let board = Board::default();
    let mv = bridge.select_move(&board).await.unwrap();
    assert!(legal_moves(&board).contains(&mv));

    bridge.shutdown().await;
}

#[tokio::test]
async fn test_timeout_yields_exactly_one_fallback_move() {
    let dir = TempDir::new().unwrap();
    // Never answers go: every request must hit the budget and fall back.
    let path = fake_engine(&dir, ":");

    let profile = fast_profile();
    let bridge = EngineBridge::connect(Some(&path), profile).await;
    let board = Board::default();

    let started = Instant::now();
    let mv = bridge.select_move(&board).await.unwrap();
    let elapsed = started.elapsed();

    assert!(legal_moves(&board).contains(&mv));
    assert!(elapsed >= profile.request_budget());
    assert!(elapsed < profile.request_budget() * 4);

    // The bridge stays usable for the next request.
    assert!(bridge.is_available().await);
    let second = bridge.select_move(&board).await.unwrap();
    assert!(legal_moves(&board).contains(&second));

    bridge.shutdown().await;
}
