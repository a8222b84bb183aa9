//! Game configuration.
//!
//! A [`GameConfig`] is built once, validated, and handed to
//! [`crate::Game::new`]. Nothing in the engine reads ambient settings.

use crate::error::GameError;
use crate::roles::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Fewest players a game can start with.
pub const MIN_PLAYERS: usize = 4;

/// Default player names, used in seating order.
pub const DEFAULT_NAMES: [&str; 10] = [
    "Alice", "Bob", "Charlie", "David", "Eve", "Frank", "Grace", "Hannah", "Ivy", "Jack",
];

/// How many of each role are dealt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub mafia: usize,
    pub doctor: usize,
    pub police: usize,
    pub citizen: usize,
}

impl RoleCounts {
    /// Derive counts from a table size: `max(1, n / 4)` mafia, one doctor,
    /// one police, everyone else a citizen.
    pub fn for_players(n: usize) -> Result<Self, GameError> {
        if n < MIN_PLAYERS {
            return Err(GameError::config(format!(
                "at least {MIN_PLAYERS} players are required, got {n}"
            )));
        }
        let mafia = (n / 4).max(1);
        Ok(Self {
            mafia,
            doctor: 1,
            police: 1,
            citizen: n - mafia - 2,
        })
    }

    pub fn total(&self) -> usize {
        self.mafia + self.doctor + self.police + self.citizen
    }

    pub fn count(&self, role: Role) -> usize {
        match role {
            Role::Mafia => self.mafia,
            Role::Doctor => self.doctor,
            Role::Police => self.police,
            Role::Citizen => self.citizen,
        }
    }

    /// The unshuffled deck of roles, mafia first.
    pub fn deck(&self) -> Vec<Role> {
        Role::ALL
            .iter()
            .flat_map(|role| std::iter::repeat(*role).take(self.count(*role)))
            .collect()
    }

    pub fn validate(&self) -> Result<(), GameError> {
        let total = self.total();
        if total < MIN_PLAYERS {
            return Err(GameError::config(format!(
                "at least {MIN_PLAYERS} players are required, got {total}"
            )));
        }
        if self.mafia == 0 {
            return Err(GameError::config("at least one mafia is required"));
        }
        if self.mafia >= total - self.mafia {
            return Err(GameError::config(format!(
                "{} mafia against {} others would end the game before it starts",
                self.mafia,
                total - self.mafia
            )));
        }
        Ok(())
    }
}

/// Settings for one game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Role deck.
    pub roles: RoleCounts,

    /// Player names in seating order. Must cover every role in the deck.
    pub names: Vec<String>,

    /// Seed for the engine RNG (role shuffle, fallback choices).
    pub seed: Option<u64>,

    /// How many past days of memory go into a decision context.
    pub memory_window_days: u32,

    /// Per-player cap on stored memories; oldest are evicted first.
    pub memory_capacity: Option<usize>,

    /// How many times each living player speaks during the day.
    pub discussion_rounds: u32,

    /// Whether to run the private reasoning step between discussion and vote.
    pub reasoning_phase: bool,

    /// Upper bound on a single oracle call.
    #[serde(with = "duration_secs")]
    pub decision_timeout: Duration,

    /// Give up after this many days without a winner.
    pub max_days: Option<u32>,
}

impl GameConfig {
    /// Config for `n` players with role counts derived from the table size.
    pub fn for_players(n: usize) -> Result<Self, GameError> {
        Ok(Self::with_roles(RoleCounts::for_players(n)?))
    }

    /// Config with explicit role counts and default names.
    pub fn with_roles(roles: RoleCounts) -> Self {
        Self {
            names: default_names(roles.total()),
            roles,
            seed: None,
            memory_window_days: 3,
            memory_capacity: None,
            discussion_rounds: 2,
            reasoning_phase: false,
            decision_timeout: Duration::from_secs(60),
            max_days: Some(50),
        }
    }

    pub fn player_count(&self) -> usize {
        self.roles.total()
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_memory_window(mut self, days: u32) -> Self {
        self.memory_window_days = days;
        self
    }

    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = Some(capacity);
        self
    }

    pub fn with_discussion_rounds(mut self, rounds: u32) -> Self {
        self.discussion_rounds = rounds;
        self
    }

    pub fn with_reasoning_phase(mut self, enabled: bool) -> Self {
        self.reasoning_phase = enabled;
        self
    }

    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = timeout;
        self
    }

    pub fn with_max_days(mut self, max_days: Option<u32>) -> Self {
        self.max_days = max_days;
        self
    }

    pub fn validate(&self) -> Result<(), GameError> {
        self.roles.validate()?;

        let needed = self.roles.total();
        if self.names.len() < needed {
            return Err(GameError::config(format!(
                "{needed} players need {needed} names, got {}",
                self.names.len()
            )));
        }

        let mut seen = HashSet::new();
        for name in &self.names[..needed] {
            let key = name.trim().to_lowercase();
            if key.is_empty() {
                return Err(GameError::config("player names must not be empty"));
            }
            if !seen.insert(key) {
                return Err(GameError::config(format!("duplicate player name: {name}")));
            }
        }

        if self.decision_timeout.is_zero() {
            return Err(GameError::config("decision timeout must be positive"));
        }
        Ok(())
    }
}

/// Default names for a table of `n`, padded past the built-in list.
pub fn default_names(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| match DEFAULT_NAMES.get(i) {
            Some(name) => name.to_string(),
            None => format!("Player {}", i + 1),
        })
        .collect()
}

/// Settings for the LLM-backed oracle.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Model override; `None` uses the client default.
    pub model: Option<String>,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 1024,
            temperature: Some(0.7),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_counts_formula() {
        for n in 4..=40 {
            let counts = RoleCounts::for_players(n).unwrap();
            assert_eq!(counts.total(), n);
            assert_eq!(counts.mafia, (n / 4).max(1));
            assert_eq!(counts.doctor, 1);
            assert_eq!(counts.police, 1);
            assert_eq!(counts.citizen, n - counts.mafia - 2);
        }
    }

    #[test]
    fn test_too_few_players() {
        assert!(matches!(
            RoleCounts::for_players(3),
            Err(GameError::Configuration(_))
        ));
        assert!(GameConfig::for_players(0).is_err());
    }

    #[test]
    fn test_deck_matches_counts() {
        let counts = RoleCounts::for_players(9).unwrap();
        let deck = counts.deck();
        assert_eq!(deck.len(), 9);
        assert_eq!(deck.iter().filter(|r| **r == Role::Mafia).count(), 2);
        assert_eq!(deck.iter().filter(|r| **r == Role::Citizen).count(), 5);
    }

    #[test]
    fn test_inconsistent_counts_rejected() {
        let no_mafia = RoleCounts {
            mafia: 0,
            doctor: 1,
            police: 1,
            citizen: 3,
        };
        assert!(no_mafia.validate().is_err());

        let mafia_majority = RoleCounts {
            mafia: 2,
            doctor: 1,
            police: 1,
            citizen: 0,
        };
        assert!(mafia_majority.validate().is_err());
    }

    #[test]
    fn test_names_validation() {
        let config = GameConfig::for_players(4)
            .unwrap()
            .with_names(["Ann", "Ben", "ann", "Dee"]);
        assert!(config.validate().is_err());

        let config = GameConfig::for_players(4).unwrap().with_names(["Ann", "Ben"]);
        assert!(config.validate().is_err());

        assert!(GameConfig::for_players(6).unwrap().validate().is_ok());
    }

    #[test]
    fn test_default_names_padding() {
        let names = default_names(12);
        assert_eq!(names[0], "Alice");
        assert_eq!(names[9], "Jack");
        assert_eq!(names[10], "Player 11");
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn test_config_serde() {
        let config = GameConfig::for_players(5)
            .unwrap()
            .with_seed(7)
            .with_decision_timeout(Duration::from_millis(1500));
        let json = serde_json::to_string(&config).unwrap();
        let back: GameConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.roles, config.roles);
        assert_eq!(back.seed, Some(7));
        assert_eq!(back.decision_timeout, Duration::from_millis(1500));
    }
}
