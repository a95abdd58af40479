//! Session registry and move arbitration.
//!
//! One [`SessionStore`] is the single source of truth for every active game
//! and for the connection -> game mapping. All mutation funnels through its
//! methods behind one async lock; the orchestrator serializes events per
//! game, so operations here never interleave for the same game. The two
//! pieces of deferred work (waiting on the engine process, and the
//! disconnect grace timer) run without the lock and re-validate state when
//! they come back.

pub mod errors;
pub mod events;
pub mod snapshot;
pub mod state;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chess::PieceColor;
use cozy_chess::Move;
use engine::{DifficultyProfile, EngineBridge};
use tokio::sync::{mpsc, RwLock};

use crate::config::StoreConfig;

pub use errors::SessionError;
pub use events::{EventReceiver, SessionEvent};
pub use snapshot::{
    ChatMessage, DisconnectNotice, GameAnalysis, GameOver, GameSummary, JoinOutcome, MoveInput,
    MoveOutcome, MoveRecord, PlayerInfo, PlayerSummary, SeatRole,
};
pub use state::{EndReason, GameOptions, GameSession, GameState, GameStats, GameType, Player};

use events::EventSender;
use snapshot::now_ms;

#[derive(Clone)]
pub struct SessionStore {
    shared: Arc<Shared>,
}

struct Shared {
    config: StoreConfig,
    events: EventSender,
    registry: RwLock<Registry>,
}

#[derive(Default)]
struct Registry {
    games: HashMap<String, GameSession>,
    connections: HashMap<String, String>,
}

impl SessionStore {
    /// Build a store and the receiving end of its event channel.
    pub fn new(config: StoreConfig) -> (Self, EventReceiver) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let store = Self {
            shared: Arc::new(Shared {
                config,
                events,
                registry: RwLock::new(Registry::default()),
            }),
        };
        (store, event_rx)
    }

    /// Allocate an empty game. Fails only if the id is already taken.
    pub async fn create_game(
        &self,
        game_id: &str,
        options: GameOptions,
    ) -> Result<(), SessionError> {
        let mut registry = self.shared.registry.write().await;
        if registry.games.contains_key(game_id) {
            return Err(SessionError::GameAlreadyExists(game_id.to_string()));
        }
        registry.games.insert(
            game_id.to_string(),
            GameSession::new(game_id.to_string(), options),
        );
        tracing::info!(game_id, "game created");
        Ok(())
    }

    /// Create a game against the computer: the human takes white, a
    /// synthetic engine identity takes black, and the game starts
    /// immediately (the engine never moves first).
    pub async fn create_ai_game(
        &self,
        connection_id: &str,
        game_id: &str,
        info: PlayerInfo,
        level: u8,
    ) -> Result<JoinOutcome, SessionError> {
        {
            let registry = self.shared.registry.read().await;
            if registry.games.contains_key(game_id) {
                return Err(SessionError::GameAlreadyExists(game_id.to_string()));
            }
        }

        // Spawning and handshaking the engine can take a moment; do it
        // before taking the write lock.
        let profile = DifficultyProfile::for_level(level);
        let bridge = Arc::new(
            EngineBridge::connect(self.shared.config.engine_path.as_deref(), profile).await,
        );

        let mut registry = self.shared.registry.write().await;
        if registry.games.contains_key(game_id) {
            shutdown_engine(bridge);
            return Err(SessionError::GameAlreadyExists(game_id.to_string()));
        }

        self.detach_connection_locked(&mut registry, connection_id);

        let mut game = GameSession::new(game_id.to_string(), GameOptions::default());
        game.is_ai_game = true;
        game.difficulty = Some(profile);
        game.engine = Some(bridge);
        game.seat(PieceColor::White, Player::human(connection_id, &info));
        game.seat(PieceColor::Black, Player::engine(profile));
        game.start();

        let outcome = JoinOutcome {
            game_id: game_id.to_string(),
            role: SeatRole::White,
            reconnected: false,
            fen: game.rules.to_fen(),
            state: game.state,
        };

        registry.games.insert(game_id.to_string(), game);
        registry
            .connections
            .insert(connection_id.to_string(), game_id.to_string());

        tracing::info!(game_id, level, player = %info.name, "ai game created");
        Ok(outcome)
    }

    /// Join a game, creating it on first join.
    ///
    /// A joining name matching an occupied seat reclaims that seat
    /// (identity-by-name reconnection; deliberately unauthenticated, see
    /// DESIGN notes). Otherwise seats fill white before black; filling the
    /// second seat starts the game; a full game yields the spectator role.
    pub async fn join_game(
        &self,
        connection_id: &str,
        game_id: &str,
        info: PlayerInfo,
    ) -> JoinOutcome {
        let mut guard = self.shared.registry.write().await;
        let registry = &mut *guard;

        // One game per connection: joining elsewhere detaches first.
        let previous = registry.connections.get(connection_id).cloned();
        if previous.is_some_and(|p| p != game_id) {
            self.detach_connection_locked(registry, connection_id);
        }

        registry
            .connections
            .insert(connection_id.to_string(), game_id.to_string());

        let game = registry.games.entry(game_id.to_string()).or_insert_with(|| {
            tracing::info!(game_id, "game created on first join");
            GameSession::new(game_id.to_string(), GameOptions::default())
        });

        // Reconnection by display name.
        let returning = [PieceColor::White, PieceColor::Black]
            .into_iter()
            .find(|&color| {
                game.player(color)
                    .is_some_and(|p| !p.is_ai && p.name == info.name)
            });
        if let Some(color) = returning {
            let mut stale_connection = None;
            if let Some(player) = game.player_mut(color) {
                stale_connection = Some(std::mem::replace(
                    &mut player.connection_id,
                    connection_id.to_string(),
                ));
            }
            if let Some(old) = stale_connection.filter(|old| old != connection_id) {
                registry.connections.remove(&old);
            }

            if game.state == GameState::Disconnected {
                game.restore_playing();
                tracing::info!(game_id, seat = color.as_str(), "player reconnected in time");
            } else {
                tracing::info!(game_id, seat = color.as_str(), "seat rebound to new connection");
            }

            return JoinOutcome {
                game_id: game_id.to_string(),
                role: color.into(),
                reconnected: true,
                fen: game.rules.to_fen(),
                state: game.state,
            };
        }

        let role = if game.player(PieceColor::White).is_none() {
            game.seat(PieceColor::White, Player::human(connection_id, &info));
            SeatRole::White
        } else if game.player(PieceColor::Black).is_none() {
            game.seat(PieceColor::Black, Player::human(connection_id, &info));
            SeatRole::Black
        } else {
            game.spectators.insert(connection_id.to_string());
            SeatRole::Spectator
        };

        if role != SeatRole::Spectator && game.both_seated() && game.state == GameState::Waiting {
            game.start();
            tracing::info!(game_id, "both seats filled, game started");
        }

        tracing::debug!(game_id, role = ?role, player = %info.name, "joined");
        JoinOutcome {
            game_id: game_id.to_string(),
            role,
            reconnected: false,
            fen: game.rules.to_fen(),
            state: game.state,
        }
    }

    /// Apply a human move. Error ladder: unknown game, inactive game, wrong
    /// seat or wrong turn, then rules rejection. Nothing mutates on failure.
    pub async fn make_move(
        &self,
        connection_id: &str,
        game_id: &str,
        input: &MoveInput,
    ) -> Result<MoveOutcome, SessionError> {
        let mut registry = self.shared.registry.write().await;
        let game = registry
            .games
            .get_mut(game_id)
            .ok_or_else(|| SessionError::GameNotFound(game_id.to_string()))?;

        if game.state != GameState::Playing {
            return Err(SessionError::GameNotActive);
        }

        let seat = game
            .seat_of(connection_id)
            .ok_or(SessionError::SeatMismatch)?;
        if cozy_chess::Color::from(seat) != game.rules.side_to_move() {
            return Err(SessionError::SeatMismatch);
        }

        let mv = input
            .to_move()
            .ok_or_else(|| SessionError::IllegalMove(input.to_string()))?;
        let mv = chess::convert_uci_castling_to_cozy(mv, &game.rules.legal_moves());
        let entry = game
            .rules
            .make_move(mv)
            .map_err(|_| SessionError::IllegalMove(input.to_string()))?;

        let record = game.record_move(&entry, false);
        tracing::debug!(game_id, san = %record.san, color = %record.color, "move applied");
        Ok(finalize_move(game, record))
    }

    /// Apply an engine-selected move: same path as [`make_move`] but without
    /// seat ownership checks, and the record is tagged as engine-originated.
    pub async fn make_ai_move(&self, game_id: &str, mv: Move) -> Result<MoveOutcome, SessionError> {
        let mut registry = self.shared.registry.write().await;
        let game = registry
            .games
            .get_mut(game_id)
            .ok_or_else(|| SessionError::GameNotFound(game_id.to_string()))?;

        if !game.is_ai_game {
            return Err(SessionError::NotAnAIGame);
        }
        if game.state != GameState::Playing {
            return Err(SessionError::GameNotActive);
        }

        let entry = game
            .rules
            .make_move(mv)
            .map_err(|_| SessionError::IllegalMove(chess_common::format_uci_move(mv)))?;

        let record = game.record_move(&entry, true);
        tracing::debug!(game_id, san = %record.san, "engine move applied");
        Ok(finalize_move(game, record))
    }

    /// Ask the computer opponent for its move and apply it.
    ///
    /// Only valid once the turn has passed to the engine's side. The engine
    /// wait happens off-lock; any engine failure is absorbed by the local
    /// search inside the bridge.
    pub async fn play_ai_turn(&self, game_id: &str) -> Result<MoveOutcome, SessionError> {
        let (board, bridge) = {
            let registry = self.shared.registry.read().await;
            let game = registry
                .games
                .get(game_id)
                .ok_or_else(|| SessionError::GameNotFound(game_id.to_string()))?;

            if !game.is_ai_game {
                return Err(SessionError::NotAnAIGame);
            }
            if game.state != GameState::Playing {
                return Err(SessionError::GameNotActive);
            }
            let ai_seat = game.ai_seat().ok_or(SessionError::NotAnAIGame)?;
            if cozy_chess::Color::from(ai_seat) != game.rules.side_to_move() {
                return Err(SessionError::SeatMismatch);
            }

            (game.rules.position().clone(), game.engine.clone())
        };

        let bridge = bridge.ok_or(SessionError::GameNotActive)?;
        let mv = bridge
            .select_move(&board)
            .await
            .ok_or(SessionError::GameNotActive)?;

        self.make_ai_move(game_id, mv).await
    }

    /// Handle a dropped connection.
    ///
    /// Spectators are removed immediately. A seated player in a live game is
    /// NOT unseated: the game moves to `disconnected` and a grace timer is
    /// armed; a same-named rejoin within the window reclaims the seat.
    pub async fn remove_connection(&self, connection_id: &str) -> Option<DisconnectNotice> {
        let mut registry = self.shared.registry.write().await;
        self.detach_connection_locked(&mut registry, connection_id)
    }

    fn detach_connection_locked(
        &self,
        registry: &mut Registry,
        connection_id: &str,
    ) -> Option<DisconnectNotice> {
        let game_id = registry.connections.remove(connection_id)?;
        let game = registry.games.get_mut(&game_id)?;

        let Some(seat) = game.seat_of(connection_id) else {
            game.spectators.remove(connection_id);
            tracing::debug!(game_id = %game.id, "spectator left");
            return None;
        };

        let name = game
            .player(seat)
            .map(|p| p.name.clone())
            .unwrap_or_default();

        match game.state {
            GameState::Playing => {
                let epoch = game.mark_disconnected(seat);
                tracing::info!(
                    game_id = %game.id,
                    seat = seat.as_str(),
                    "player disconnected, grace timer armed"
                );
                self.arm_grace_timer(game_id.clone(), epoch);
            }
            GameState::Waiting => {
                // Pre-start: nothing to reconnect to, free the seat.
                game.vacate(seat);
            }
            GameState::Disconnected => {
                // The other player left too; the armed timer will settle it.
                tracing::info!(game_id = %game.id, seat = seat.as_str(), "second player disconnected");
            }
            GameState::Finished => return None,
        }

        Some(DisconnectNotice {
            game_id,
            color: seat.as_str().to_string(),
            name,
        })
    }

    /// Grace timer: sleeps off-lock, then re-validates both the state and
    /// the disconnect generation. Reconnection makes the firing a no-op, so
    /// the timer itself never needs cancelling.
    fn arm_grace_timer(&self, game_id: String, epoch: u64) {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(shared.config.grace_period).await;

            let mut registry = shared.registry.write().await;
            let Some(game) = registry.games.get_mut(&game_id) else {
                return;
            };
            if game.state != GameState::Disconnected || game.disconnect_epoch != epoch {
                return;
            }

            let abandoned = game.disconnected_seat;
            let winner = abandoned.map(PieceColor::opposite);
            game.finish(EndReason::Timeout, winner);
            if let Some(engine) = game.engine.take() {
                shutdown_engine(engine);
            }
            tracing::info!(game_id = %game_id, "grace period expired, game forfeited");

            let _ = shared.events.send(SessionEvent::GraceExpired {
                game_id,
                abandoned_by: abandoned.map(|c| c.as_str().to_string()),
                winner: winner.map(|c| c.as_str().to_string()),
            });
        });
    }

    /// Explicit end (resignation, agreed draw, external adjudication).
    pub async fn end_game(
        &self,
        game_id: &str,
        reason: EndReason,
        winner: Option<PieceColor>,
    ) -> Result<GameOver, SessionError> {
        let mut registry = self.shared.registry.write().await;
        let game = registry
            .games
            .get_mut(game_id)
            .ok_or_else(|| SessionError::GameNotFound(game_id.to_string()))?;

        if game.state == GameState::Finished {
            return Err(SessionError::GameNotActive);
        }

        let winner = winner.or_else(|| match reason {
            EndReason::Checkmate => Some(PieceColor::from(game.rules.side_to_move()).opposite()),
            EndReason::Timeout => game.disconnected_seat.map(PieceColor::opposite),
            _ => None,
        });

        game.finish(reason, winner);
        if let Some(engine) = game.engine.take() {
            shutdown_engine(engine);
        }
        tracing::info!(game_id, reason = ?reason, "game ended");

        Ok(GameOver {
            reason,
            winner: winner.map(|c| c.as_str().to_string()),
        })
    }

    /// Append to the bounded chat log; the oldest entry drops past capacity.
    pub async fn add_chat_message(
        &self,
        connection_id: &str,
        game_id: &str,
        text: &str,
    ) -> Result<ChatMessage, SessionError> {
        let mut registry = self.shared.registry.write().await;
        let game = registry
            .games
            .get_mut(game_id)
            .ok_or_else(|| SessionError::GameNotFound(game_id.to_string()))?;

        let (author, from_spectator) = match game.seat_of(connection_id) {
            Some(seat) => (
                game.player(seat)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                false,
            ),
            None => ("Spectator".to_string(), true),
        };

        let stamp = now_ms();
        let message = ChatMessage {
            id: stamp,
            author,
            text: text.trim().to_string(),
            timestamp_ms: stamp,
            from_spectator,
        };
        game.chat.push_back(message.clone());
        while game.chat.len() > self.shared.config.chat_capacity {
            game.chat.pop_front();
        }
        Ok(message)
    }

    pub async fn chat_log(&self, game_id: &str) -> Result<Vec<ChatMessage>, SessionError> {
        let registry = self.shared.registry.read().await;
        let game = registry
            .games
            .get(game_id)
            .ok_or_else(|| SessionError::GameNotFound(game_id.to_string()))?;
        Ok(game.chat.iter().cloned().collect())
    }

    /// Lobby view of every game.
    pub async fn game_summaries(&self) -> Vec<GameSummary> {
        let registry = self.shared.registry.read().await;
        registry.games.values().map(GameSession::summary).collect()
    }

    /// Move history plus derived stats for one game.
    pub async fn game_analysis(&self, game_id: &str) -> Result<GameAnalysis, SessionError> {
        let registry = self.shared.registry.read().await;
        let game = registry
            .games
            .get(game_id)
            .ok_or_else(|| SessionError::GameNotFound(game_id.to_string()))?;

        let duration_secs = match (game.started_at, game.ended_at) {
            (Some(started), Some(ended)) => Some(ended.duration_since(started).as_secs()),
            _ => None,
        };

        Ok(GameAnalysis {
            moves: game.moves.clone(),
            stats: game.stats,
            duration_secs,
        })
    }

    /// Drop games whose effective age exceeds the retention window.
    /// Returns how many games were purged.
    pub async fn cleanup_old_games(&self) -> usize {
        let mut registry = self.shared.registry.write().await;
        let now = Instant::now();
        let retention = self.shared.config.retention;

        let expired: Vec<String> = registry
            .games
            .values()
            .filter(|game| game.effective_age(now) > retention)
            .map(|game| game.id.clone())
            .collect();

        for game_id in &expired {
            if let Some(mut game) = registry.games.remove(game_id) {
                if let Some(engine) = game.engine.take() {
                    shutdown_engine(engine);
                }
                for connection in game.connection_ids() {
                    registry.connections.remove(&connection);
                }
            }
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "purged stale games");
        }
        expired.len()
    }

    /// Run the retention sweep on an interval until the task is aborted.
    pub fn spawn_periodic_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        let period = store.shared.config.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.cleanup_old_games().await;
            }
        })
    }
}

/// Finish bookkeeping shared by the human and engine move paths.
fn finalize_move(game: &mut GameSession, record: MoveRecord) -> MoveOutcome {
    let game_over = game.rules.terminal_reason().map(|reason| {
        let end = EndReason::from(reason);
        let winner = match end {
            EndReason::Checkmate => Some(PieceColor::from(game.rules.side_to_move()).opposite()),
            _ => None,
        };
        game.finish(end, winner);
        if let Some(engine) = game.engine.take() {
            shutdown_engine(engine);
        }
        tracing::info!(game_id = %game.id, reason = ?end, "game finished");
        GameOver {
            reason: end,
            winner: winner.map(|c| c.as_str().to_string()),
        }
    });

    MoveOutcome {
        record,
        fen: game.rules.to_fen(),
        side_to_move: chess_common::format_color(game.rules.side_to_move()).to_string(),
        game_over,
    }
}

/// Engine teardown is fire-and-forget; it must not hold the registry lock.
fn shutdown_engine(engine: Arc<EngineBridge>) {
    tokio::spawn(async move {
        engine.shutdown().await;
    });
}
