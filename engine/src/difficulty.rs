//! Difficulty tiers for the computer opponent.
//!
//! One immutable table, indexed by level 1-5. Each tier fixes the engine
//! strength options, the search directive, and the time budget used for
//! request timeout enforcement. Depth and movetime are non-decreasing in
//! level; the tests pin that down.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyProfile {
    pub level: u8,
    /// Stockfish-style "Skill Level" (0-20).
    pub skill_level: u8,
    /// Approximate playing-strength target, also used as the AI player rating.
    pub elo: u16,
    pub depth: u8,
    pub movetime_ms: u64,
    pub timeout_margin_ms: u64,
}

const PROFILES: [DifficultyProfile; 5] = [
    DifficultyProfile {
        level: 1,
        skill_level: 0,
        elo: 800,
        depth: 2,
        movetime_ms: 250,
        timeout_margin_ms: 1500,
    },
    DifficultyProfile {
        level: 2,
        skill_level: 5,
        elo: 1100,
        depth: 4,
        movetime_ms: 500,
        timeout_margin_ms: 1500,
    },
    DifficultyProfile {
        level: 3,
        skill_level: 10,
        elo: 1500,
        depth: 8,
        movetime_ms: 1000,
        timeout_margin_ms: 2000,
    },
    DifficultyProfile {
        level: 4,
        skill_level: 15,
        elo: 1900,
        depth: 12,
        movetime_ms: 2000,
        timeout_margin_ms: 2000,
    },
    DifficultyProfile {
        level: 5,
        skill_level: 20,
        elo: 2300,
        depth: 18,
        movetime_ms: 3000,
        timeout_margin_ms: 2500,
    },
];

impl DifficultyProfile {
    pub const MIN_LEVEL: u8 = 1;
    pub const MAX_LEVEL: u8 = 5;

    /// Look up a tier; out-of-range levels clamp to the nearest tier.
    pub fn for_level(level: u8) -> Self {
        let level = level.clamp(Self::MIN_LEVEL, Self::MAX_LEVEL);
        PROFILES[usize::from(level - 1)]
    }

    /// The low tiers skip the external engine entirely and play from the
    /// local search.
    pub fn local_only(&self) -> bool {
        self.level <= 2
    }

    /// Depth for the local fallback search, which has no move ordering or
    /// transposition table and must stay shallow.
    pub fn fallback_depth(&self) -> u8 {
        self.level.min(4)
    }

    /// UCI options sent during the handshake.
    pub fn engine_options(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Skill Level", self.skill_level.to_string()),
            ("UCI_LimitStrength", "true".to_string()),
            ("UCI_Elo", self.elo.to_string()),
        ]
    }

    /// Hard bound on one engine request: movetime plus the safety margin.
    pub fn request_budget(&self) -> Duration {
        Duration::from_millis(self.movetime_ms + self.timeout_margin_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_dense_and_ordered() {
        for (i, profile) in PROFILES.iter().enumerate() {
            assert_eq!(profile.level as usize, i + 1);
        }
    }

    #[test]
    fn test_depth_and_movetime_are_monotonic() {
        for pair in PROFILES.windows(2) {
            assert!(pair[1].depth >= pair[0].depth);
            assert!(pair[1].movetime_ms >= pair[0].movetime_ms);
            assert!(pair[1].skill_level >= pair[0].skill_level);
        }
    }

    #[test]
    fn test_out_of_range_levels_clamp() {
        assert_eq!(DifficultyProfile::for_level(0).level, 1);
        assert_eq!(DifficultyProfile::for_level(9).level, 5);
        assert_eq!(DifficultyProfile::for_level(3).level, 3);
    }

    #[test]
    fn test_engine_options_carry_strength_limit() {
        let opts = DifficultyProfile::for_level(2).engine_options();
        assert!(opts.iter().any(|(k, v)| *k == "Skill Level" && v == "5"));
        assert!(opts.iter().any(|(k, _)| *k == "UCI_LimitStrength"));
        assert!(opts.iter().any(|(k, v)| *k == "UCI_Elo" && v == "1100"));
    }
}
