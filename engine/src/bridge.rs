//! Bridge to an external UCI engine process.
//!
//! One bridge per computer-opponent game. The bridge owns the subprocess and
//! its line protocol; every failure class (no binary, handshake failure,
//! timeout, nonsense response, process death) collapses into the local
//! [`SearchEngine`] so move selection itself never fails while legal moves
//! exist.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use cozy_chess::{Board, Move};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;

use chess_common::{convert_uci_castling_to_cozy, format_uci_move};

use crate::difficulty::DifficultyProfile;
use crate::search::{legal_moves, SearchEngine};
use crate::uci::{parse_uci_message, UciMessage};
use crate::{EngineEvent, EngineInfo};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, thiserror::Error)]
pub enum BridgeError {
    #[error("engine process is not available")]
    Unavailable,
    #[error("another request is already in flight")]
    Busy,
    #[error("engine did not answer within the time budget")]
    Timeout,
    #[error("unusable engine response: {0}")]
    Malformed(String),
}

pub struct EngineBridge {
    profile: DifficultyProfile,
    // None once the process is gone (or was never wanted); try_lock doubles
    // as the single-outstanding-request guard.
    link: Mutex<Option<EngineLink>>,
}

struct EngineLink {
    child: Child,
    stdin_tx: mpsc::Sender<String>,
    event_rx: mpsc::Receiver<EngineEvent>,
    last_info: EngineInfo,
}

impl EngineBridge {
    /// Set up move selection for one game at the given difficulty.
    ///
    /// Low tiers never spawn a process. For the rest, a spawn or handshake
    /// failure leaves the bridge disabled rather than failing construction;
    /// all requests then route to the local search.
    pub async fn connect(path: Option<&Path>, profile: DifficultyProfile) -> Self {
        if profile.local_only() {
            tracing::debug!(level = profile.level, "difficulty tier plays from local search");
            return Self {
                profile,
                link: Mutex::new(None),
            };
        }

        let link = match spawn_engine(path, &profile).await {
            Ok(link) => Some(link),
            Err(err) => {
                tracing::warn!(error = %err, "external engine unavailable, bridge disabled");
                None
            }
        };

        Self {
            profile,
            link: Mutex::new(link),
        }
    }

    pub fn profile(&self) -> DifficultyProfile {
        self.profile
    }

    /// Whether the subprocess is still alive behind this bridge.
    pub async fn is_available(&self) -> bool {
        self.link.lock().await.is_some()
    }

    /// Pick a move for the side to move. Engine failures are absorbed by the
    /// local search; `None` only when the position has no legal moves.
    pub async fn select_move(&self, board: &Board) -> Option<Move> {
        let candidates = legal_moves(board);
        if candidates.is_empty() {
            return None;
        }

        match self.request_best_move(board, &candidates).await {
            Ok(mv) => Some(mv),
            Err(err) => {
                if !self.profile.local_only() {
                    tracing::warn!(
                        error = %err,
                        level = self.profile.level,
                        "engine request failed, selecting with local search"
                    );
                }
                SearchEngine::new(self.profile.fallback_depth()).best_move(board)
            }
        }
    }

    /// One engine round-trip: `ucinewgame`, position, `go`, wait for
    /// `bestmove` within the profile's budget. At most one request may be in
    /// flight; a second caller is refused, not queued.
    async fn request_best_move(
        &self,
        board: &Board,
        candidates: &[Move],
    ) -> Result<Move, BridgeError> {
        let mut guard = self.link.try_lock().map_err(|_| BridgeError::Busy)?;
        let link = guard.as_mut().ok_or(BridgeError::Unavailable)?;

        let outcome = run_request(link, &self.profile, board, candidates).await;

        if matches!(outcome, Err(BridgeError::Unavailable)) {
            // The process is gone; disable the bridge for the rest of the game.
            *guard = None;
            tracing::warn!("engine process lost");
        }
        outcome
    }

    /// Terminate the engine process: `quit`, bounded wait, then kill.
    pub async fn shutdown(&self) {
        let mut guard = self.link.lock().await;
        if let Some(mut link) = guard.take() {
            let _ = link.send("quit").await;
            if timeout(SHUTDOWN_GRACE, link.child.wait()).await.is_err() {
                tracing::warn!("engine ignored quit, killing process");
                let _ = link.child.kill().await;
            }
        }
    }
}

async fn run_request(
    link: &mut EngineLink,
    profile: &DifficultyProfile,
    board: &Board,
    candidates: &[Move],
) -> Result<Move, BridgeError> {
    // A previous timed-out request may have left a stale bestmove behind;
    // it must never resolve this request.
    link.drain_stale_events();

    link.send("ucinewgame").await?;
    link.send(&format!("position fen {board}")).await?;
    link.send(&format!(
        "go depth {} movetime {}",
        profile.depth, profile.movetime_ms
    ))
    .await?;

    let waited = timeout(profile.request_budget(), async {
        loop {
            match link.event_rx.recv().await {
                Some(EngineEvent::Info(info)) => link.observe(info),
                Some(EngineEvent::BestMove(Some(mv))) => return Ok(mv),
                Some(EngineEvent::BestMove(None)) => {
                    return Err(BridgeError::Malformed("bestmove (none)".to_string()))
                }
                Some(EngineEvent::Ready) => {}
                None => return Err(BridgeError::Unavailable),
            }
        }
    })
    .await;

    let mv = match waited {
        Ok(result) => result?,
        Err(_) => {
            // Tell the engine to wind down; its late bestmove is drained at
            // the start of the next request.
            let _ = link.send("stop").await;
            return Err(BridgeError::Timeout);
        }
    };

    tracing::debug!(
        depth = ?link.last_info.depth,
        score = ?link.last_info.score,
        bestmove = %format_uci_move(mv),
        "engine answered"
    );

    // Trust nothing: the token must map onto a legal move here.
    let mv = convert_uci_castling_to_cozy(mv, candidates);
    if !candidates.contains(&mv) {
        return Err(BridgeError::Malformed(format!(
            "illegal engine move {}",
            format_uci_move(mv)
        )));
    }
    Ok(mv)
}

impl EngineLink {
    async fn send(&self, cmd: &str) -> Result<(), BridgeError> {
        tracing::trace!("UCI >> {}", cmd);
        self.stdin_tx
            .send(format!("{cmd}\n"))
            .await
            .map_err(|_| BridgeError::Unavailable)
    }

    async fn wait_ready(&mut self, budget: Duration) -> Result<(), BridgeError> {
        timeout(budget, async {
            loop {
                match self.event_rx.recv().await {
                    Some(EngineEvent::Ready) => return Ok(()),
                    Some(_) => continue,
                    None => return Err(BridgeError::Unavailable),
                }
            }
        })
        .await
        .map_err(|_| BridgeError::Timeout)?
    }

    fn drain_stale_events(&mut self) {
        while self.event_rx.try_recv().is_ok() {}
    }

    fn observe(&mut self, info: EngineInfo) {
        if let Some(depth) = info.depth {
            self.last_info.depth = Some(depth);
        }
        if let Some(score) = info.score {
            self.last_info.score = Some(score);
        }
        if let Some(time_ms) = info.time_ms {
            self.last_info.time_ms = Some(time_ms);
        }
        if let Some(nodes) = info.nodes {
            self.last_info.nodes = Some(nodes);
        }
    }
}

async fn spawn_engine(
    path: Option<&Path>,
    profile: &DifficultyProfile,
) -> Result<EngineLink, BridgeError> {
    let path = path.map_or_else(discover_engine_path, Path::to_path_buf);
    tracing::info!(path = %path.display(), level = profile.level, "spawning engine process");

    let mut child = Command::new(&path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|_| BridgeError::Unavailable)?;

    let stdin = child.stdin.take().ok_or(BridgeError::Unavailable)?;
    let stdout = child.stdout.take().ok_or(BridgeError::Unavailable)?;

    let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(64);
    tokio::spawn(read_engine_output(stdout, event_tx));

    let (stdin_tx, stdin_rx) = mpsc::channel::<String>(64);
    tokio::spawn(write_engine_input(stdin, stdin_rx));

    let mut link = EngineLink {
        child,
        stdin_tx,
        event_rx,
        last_info: EngineInfo::default(),
    };

    // uci -> uciok, strength options, isready -> readyok.
    link.send("uci").await?;
    link.wait_ready(HANDSHAKE_TIMEOUT).await?;
    for (name, value) in profile.engine_options() {
        link.send(&format!("setoption name {name} value {value}"))
            .await?;
    }
    link.send("isready").await?;
    link.wait_ready(HANDSHAKE_TIMEOUT).await?;

    tracing::info!(level = profile.level, "engine handshake complete");
    Ok(link)
}

async fn read_engine_output(stdout: ChildStdout, event_tx: mpsc::Sender<EngineEvent>) {
    let mut lines = BufReader::new(stdout).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        tracing::trace!("UCI << {}", trimmed);

        let event = match parse_uci_message(trimmed) {
            Ok(UciMessage::UciOk | UciMessage::ReadyOk) => EngineEvent::Ready,
            Ok(UciMessage::BestMove { mv }) => EngineEvent::BestMove(mv),
            Ok(UciMessage::Info(info)) => EngineEvent::Info(info),
            Ok(UciMessage::Id { .. }) | Err(_) => continue,
        };

        if event_tx.send(event).await.is_err() {
            break;
        }
    }
    tracing::debug!("engine stdout closed");
}

async fn write_engine_input(mut stdin: ChildStdin, mut rx: mpsc::Receiver<String>) {
    while let Some(cmd) = rx.recv().await {
        if stdin.write_all(cmd.as_bytes()).await.is_err() {
            break;
        }
        if stdin.flush().await.is_err() {
            break;
        }
    }
    tracing::debug!("engine stdin writer exited");
}

/// Look for a UCI engine in the usual install locations, falling back to
/// whatever `stockfish` resolves to on PATH.
fn discover_engine_path() -> PathBuf {
    [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ]
    .iter()
    .map(Path::new)
    .find(|p| p.exists())
    .map_or_else(|| PathBuf::from("stockfish"), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozy_chess::Board;

    #[tokio::test]
    async fn test_local_tier_selects_without_a_process() {
        let bridge = EngineBridge::connect(None, DifficultyProfile::for_level(1)).await;
        assert!(!bridge.is_available().await);

        let board = Board::default();
        let mv = bridge.select_move(&board).await.unwrap();
        assert!(legal_moves(&board).contains(&mv));
    }

    #[tokio::test]
    async fn test_missing_binary_falls_back_to_local_search() {
        let bogus = Path::new("/nonexistent/definitely-not-an-engine");
        let bridge = EngineBridge::connect(Some(bogus), DifficultyProfile::for_level(3)).await;
        assert!(!bridge.is_available().await);

        let board = Board::default();
        let mv = bridge.select_move(&board).await.unwrap();
        assert!(legal_moves(&board).contains(&mv));
    }

    #[tokio::test]
    async fn test_terminal_position_selects_nothing() {
        let bridge = EngineBridge::connect(None, DifficultyProfile::for_level(1)).await;
        let stalemate: Board = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1".parse().unwrap();
        assert!(bridge.select_move(&stalemate).await.is_none());
    }
}
