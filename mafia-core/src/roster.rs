//! The roster: who is playing, what they are, and who is still alive.
//!
//! Players are created once at setup and never removed. The only mutations
//! are elimination and the per-night protection flag.

use crate::config::{GameConfig, RoleCounts};
use crate::error::GameError;
use crate::roles::{Role, Team};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A seat at the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    pub alive: bool,
    /// Set by a doctor's protection; cleared at the start of every night.
    pub protected_this_night: bool,
}

impl Player {
    fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            id: PlayerId::new(),
            name: name.into(),
            role,
            alive: true,
            protected_this_night: false,
        }
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// The public face of a player: what everyone at the table can see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
}

/// Alive headcount per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamCounts {
    pub mafia: usize,
    pub others: usize,
}

/// Whether the game has ended, and who won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub over: bool,
    pub winner: Option<Team>,
}

impl Outcome {
    pub const ONGOING: Outcome = Outcome {
        over: false,
        winner: None,
    };

    pub fn won_by(team: Team) -> Self {
        Self {
            over: true,
            winner: Some(team),
        }
    }

    /// Decide the outcome from alive headcounts.
    pub fn from_counts(counts: TeamCounts) -> Self {
        if counts.mafia == 0 {
            Self::won_by(Team::Citizens)
        } else if counts.mafia >= counts.others {
            Self::won_by(Team::Mafia)
        } else {
            Self::ONGOING
        }
    }
}

/// Deal a shuffled role list for `n` players.
pub fn assign_roles<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Result<Vec<Role>, GameError> {
    let mut deck = RoleCounts::for_players(n)?.deck();
    deck.shuffle(rng);
    Ok(deck)
}

/// Source of truth for player existence and life status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    players: Vec<Player>,
}

impl Roster {
    /// Seat the given players in order.
    pub fn new<S: Into<String>>(seats: Vec<(S, Role)>) -> Result<Self, GameError> {
        let players: Vec<Player> = seats
            .into_iter()
            .map(|(name, role)| Player::new(name, role))
            .collect();

        let mut seen = HashSet::new();
        for player in &players {
            if !seen.insert(normalize(&player.name)) {
                return Err(GameError::invariant(format!(
                    "duplicate player name: {}",
                    player.name
                )));
            }
        }

        Ok(Self { players })
    }

    /// Shuffle the configured deck and deal it to the configured names.
    pub fn from_config<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Result<Self, GameError> {
        config.validate()?;
        let mut deck = config.roles.deck();
        deck.shuffle(rng);
        let seats = config.names.iter().cloned().zip(deck).collect();
        Self::new(seats)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Every player in seating order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Look a player up by name, ignoring case and surrounding whitespace.
    pub fn find_by_name(&self, name: &str) -> Option<&Player> {
        let key = normalize(name);
        self.players.iter().find(|p| normalize(&p.name) == key)
    }

    pub fn name_of(&self, id: PlayerId) -> Option<&str> {
        self.get(id).map(|p| p.name.as_str())
    }

    pub fn role_of(&self, id: PlayerId) -> Option<Role> {
        self.get(id).map(|p| p.role)
    }

    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.get(id).is_some_and(|p| p.alive)
    }

    /// Snapshot of living players in seating order.
    pub fn alive_players(&self) -> Vec<&Player> {
        self.players.iter().filter(|p| p.alive).collect()
    }

    /// Snapshot of eliminated players in seating order.
    pub fn dead_players(&self) -> Vec<&Player> {
        self.players.iter().filter(|p| !p.alive).collect()
    }

    /// Living holders of a role.
    pub fn members_of(&self, role: Role) -> Vec<&Player> {
        self.players
            .iter()
            .filter(|p| p.alive && p.role == role)
            .collect()
    }

    pub fn alive_summaries(&self) -> Vec<PlayerSummary> {
        self.players
            .iter()
            .filter(|p| p.alive)
            .map(Player::summary)
            .collect()
    }

    /// Alive mafia versus alive everyone else.
    pub fn team_counts(&self) -> TeamCounts {
        let mafia = self
            .players
            .iter()
            .filter(|p| p.alive && p.role.team() == Team::Mafia)
            .count();
        let alive = self.players.iter().filter(|p| p.alive).count();
        TeamCounts {
            mafia,
            others: alive - mafia,
        }
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from_counts(self.team_counts())
    }

    /// Mark a player dead.
    ///
    /// Eliminating an unknown or already-dead player is an engine defect and
    /// leaves the roster untouched.
    pub fn eliminate(&mut self, id: PlayerId) -> Result<&Player, GameError> {
        let player = self
            .get_mut(id)
            .ok_or_else(|| GameError::invariant(format!("cannot eliminate unknown player {id}")))?;
        if !player.alive {
            return Err(GameError::invariant(format!(
                "{} is already dead",
                player.name
            )));
        }
        player.alive = false;
        player.protected_this_night = false;
        Ok(player)
    }

    /// Clear every protection flag. Runs at the start of each night.
    pub fn reset_protection(&mut self) {
        for player in &mut self.players {
            player.protected_this_night = false;
        }
    }

    pub fn protect(&mut self, id: PlayerId) -> Result<(), GameError> {
        let player = self
            .get_mut(id)
            .ok_or_else(|| GameError::invariant(format!("cannot protect unknown player {id}")))?;
        if !player.alive {
            return Err(GameError::invariant(format!(
                "cannot protect dead player {}",
                player.name
            )));
        }
        player.protected_this_night = true;
        Ok(())
    }

    pub fn is_protected(&self, id: PlayerId) -> bool {
        self.get(id).is_some_and(|p| p.protected_this_night)
    }

    /// Check that alive and dead partition the seats and names are unique.
    pub fn check_invariants(&self, expected_len: usize) -> Result<(), GameError> {
        if self.players.len() != expected_len {
            return Err(GameError::invariant(format!(
                "roster holds {} players, expected {expected_len}",
                self.players.len()
            )));
        }
        let alive = self.alive_players().len();
        let dead = self.dead_players().len();
        if alive + dead != expected_len {
            return Err(GameError::invariant("alive and dead do not cover the roster"));
        }
        if let Some(p) = self.players.iter().find(|p| !p.alive && p.protected_this_night) {
            return Err(GameError::invariant(format!(
                "dead player {} is marked protected",
                p.name
            )));
        }
        Ok(())
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_roster() -> Roster {
        Roster::new(vec![
            ("Alice", Role::Mafia),
            ("Bob", Role::Doctor),
            ("Charlie", Role::Police),
            ("David", Role::Citizen),
            ("Eve", Role::Citizen),
        ])
        .unwrap()
    }

    #[test]
    fn test_assign_roles_counts() {
        let mut rng = StdRng::seed_from_u64(42);
        for n in 4..=24 {
            let roles = assign_roles(n, &mut rng).unwrap();
            assert_eq!(roles.len(), n);
            let count = |r: Role| roles.iter().filter(|x| **x == r).count();
            assert_eq!(count(Role::Mafia), (n / 4).max(1));
            assert_eq!(count(Role::Doctor), 1);
            assert_eq!(count(Role::Police), 1);
            assert_eq!(count(Role::Citizen), n - (n / 4).max(1) - 2);
        }
    }

    #[test]
    fn test_assign_roles_rejects_small_tables() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            assign_roles(3, &mut rng),
            Err(GameError::Configuration(_))
        ));
    }

    #[test]
    fn test_assign_roles_is_shuffled() {
        let mut rng = StdRng::seed_from_u64(3);
        let layouts: HashSet<Vec<Role>> = (0..20)
            .map(|_| assign_roles(8, &mut rng).unwrap())
            .collect();
        assert!(layouts.len() > 1);
    }

    #[test]
    fn test_from_config_uses_names() {
        let config = GameConfig::for_players(6).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let roster = Roster::from_config(&config, &mut rng).unwrap();
        assert_eq!(roster.len(), 6);
        assert!(roster.find_by_name("alice").is_some());
        assert_eq!(roster.members_of(Role::Doctor).len(), 1);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Roster::new(vec![("Alice", Role::Mafia), ("alice ", Role::Citizen)]);
        assert!(matches!(result, Err(GameError::InvariantViolation(_))));
    }

    #[test]
    fn test_eliminate_partitions() {
        let mut roster = sample_roster();
        let bob = roster.find_by_name("Bob").unwrap().id;
        roster.eliminate(bob).unwrap();

        assert_eq!(roster.alive_players().len(), 4);
        assert_eq!(roster.dead_players().len(), 1);
        assert!(!roster.is_alive(bob));
        roster.check_invariants(5).unwrap();
    }

    #[test]
    fn test_double_elimination_is_invariant_violation() {
        let mut roster = sample_roster();
        let eve = roster.find_by_name("Eve").unwrap().id;
        roster.eliminate(eve).unwrap();
        let before = roster.clone();

        let err = roster.eliminate(eve).unwrap_err();
        assert!(matches!(err, GameError::InvariantViolation(_)));
        assert_eq!(roster.alive_players().len(), before.alive_players().len());
        assert_eq!(roster.dead_players().len(), 1);
    }

    #[test]
    fn test_eliminate_unknown_player() {
        let mut roster = sample_roster();
        assert!(matches!(
            roster.eliminate(PlayerId::new()),
            Err(GameError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_team_counts_and_outcome() {
        let mut roster = sample_roster();
        assert_eq!(roster.team_counts(), TeamCounts { mafia: 1, others: 4 });
        assert_eq!(roster.outcome(), Outcome::ONGOING);

        for name in ["Bob", "Charlie", "David"] {
            let id = roster.find_by_name(name).unwrap().id;
            roster.eliminate(id).unwrap();
        }
        assert_eq!(roster.outcome(), Outcome::won_by(Team::Mafia));
    }

    #[test]
    fn test_citizens_win_when_mafia_gone() {
        let mut roster = sample_roster();
        let alice = roster.find_by_name("Alice").unwrap().id;
        roster.eliminate(alice).unwrap();
        assert_eq!(roster.outcome(), Outcome::won_by(Team::Citizens));
    }

    #[test]
    fn test_protection_reset() {
        let mut roster = sample_roster();
        let david = roster.find_by_name("David").unwrap().id;
        roster.protect(david).unwrap();
        assert!(roster.is_protected(david));
        roster.reset_protection();
        assert!(!roster.is_protected(david));
    }
}
