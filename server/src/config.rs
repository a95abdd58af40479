//! Configuration for the session core.
//!
//! Every knob has a hard default; the environment can override the
//! deployment-relevant ones:
//! 1. CHESSROOMS_ENGINE_PATH: UCI engine binary (else common-path discovery)
//! 2. CHESSROOMS_GRACE_SECS: disconnect grace period
//! 3. CHESSROOMS_RETENTION_SECS: finished/stale game retention

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_GRACE_SECS: u64 = 5 * 60;
const DEFAULT_RETENTION_SECS: u64 = 24 * 60 * 60;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60 * 60;
const DEFAULT_CHAT_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Explicit engine binary; `None` lets the bridge probe common locations.
    pub engine_path: Option<PathBuf>,
    /// How long a seated player may stay disconnected before forfeiting.
    pub grace_period: Duration,
    /// Age past which the periodic sweep drops a game.
    pub retention: Duration,
    pub cleanup_interval: Duration,
    /// Chat log bound; oldest entries are dropped past this.
    pub chat_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            engine_path: None,
            grace_period: Duration::from_secs(DEFAULT_GRACE_SECS),
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            chat_capacity: DEFAULT_CHAT_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Defaults overlaid with any environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("CHESSROOMS_ENGINE_PATH") {
            config.engine_path = Some(PathBuf::from(path));
        }
        if let Some(grace) = env_secs("CHESSROOMS_GRACE_SECS") {
            config.grace_period = grace;
        }
        if let Some(retention) = env_secs("CHESSROOMS_RETENTION_SECS") {
            config.retention = retention;
        }
        config
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()?
        .parse()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.grace_period, Duration::from_secs(300));
        assert_eq!(config.retention, Duration::from_secs(86_400));
        assert_eq!(config.chat_capacity, 100);
        assert!(config.engine_path.is_none());
    }

    // Environment-variable overrides are covered manually; mutating the
    // process environment from unit tests races with parallel tests.
}
