//! Testing utilities for the Mafia engine.
//!
//! This module provides tools for integration testing:
//! - `ScriptedOracle` for deterministic games without API calls
//! - `RandomOracle` and `FailingOracle` for fuzzing and fallback paths
//! - `TestHarness` for scripted game scenarios on a fixed seating
//! - Assertion helpers for verifying game state

use crate::config::{GameConfig, RoleCounts};
use crate::game::Game;
use crate::memory::MemoryEntry;
use crate::oracle::{Decision, DecisionContext, DecisionOracle, OracleError};
use crate::phase::Phase;
use crate::roles::{NightAbility, Role, Team};
use crate::roster::{Outcome, PlayerId, Roster};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

type ScriptKey = (String, Phase);

/// An oracle that replays queued decisions.
///
/// Decisions are queued per player name and phase. When a day queue runs
/// dry the player stays quiet or abstains; when a night queue runs dry the
/// call fails, so the engine's random fallback takes over.
#[derive(Default)]
pub struct ScriptedOracle {
    scripts: Mutex<HashMap<ScriptKey, VecDeque<Decision>>>,
    failures: Mutex<HashSet<ScriptKey>>,
    seen: Mutex<Vec<DecisionContext>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str, phase: Phase) -> ScriptKey {
        (name.trim().to_lowercase(), phase)
    }

    /// Queue decisions for one player in one phase.
    pub fn script(&self, name: &str, phase: Phase, decisions: impl IntoIterator<Item = Decision>) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts
                .entry(Self::key(name, phase))
                .or_default()
                .extend(decisions);
        }
    }

    /// Make every call for this player and phase fail.
    pub fn fail(&self, name: &str, phase: Phase) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(Self::key(name, phase));
        }
    }

    /// Every context this oracle has been asked with, in call order.
    pub fn contexts(&self) -> Vec<DecisionContext> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Contexts seen by one player.
    pub fn contexts_for(&self, name: &str) -> Vec<DecisionContext> {
        self.contexts()
            .into_iter()
            .filter(|c| c.me.name.eq_ignore_ascii_case(name))
            .collect()
    }

    fn next(&self, key: &ScriptKey) -> Option<Decision> {
        self.scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.get_mut(key).and_then(VecDeque::pop_front))
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn decide(&self, _role: Role, context: &DecisionContext) -> Result<Decision, OracleError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(context.clone());
        }

        let key = Self::key(&context.me.name, context.phase);
        let failing = self.failures.lock().map(|f| f.contains(&key)).unwrap_or(false);
        if failing {
            return Err(OracleError::Unavailable(format!(
                "scripted failure for {} during {}",
                context.me.name, context.phase
            )));
        }

        if let Some(decision) = self.next(&key) {
            return Ok(decision);
        }
        match context.phase {
            Phase::DayConversation => Ok(Decision::speak("I have nothing to add.")),
            Phase::DayReasoning => Ok(Decision::reason("Nothing new to think about.")),
            Phase::DayVote => Ok(Decision::abstain()),
            _ => Err(OracleError::Unavailable(format!(
                "no script left for {} during {}",
                context.me.name, context.phase
            ))),
        }
    }
}

/// An oracle that picks uniformly among legal choices.
pub struct RandomOracle {
    rng: Mutex<StdRng>,
}

const SMALL_TALK: [&str; 4] = [
    "I don't trust anyone yet.",
    "Somebody here is being far too quiet.",
    "Let's think carefully before we vote.",
    "I'm just a citizen trying to survive.",
];

impl RandomOracle {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn pick(&self, names: &[&str]) -> Option<String> {
        let mut rng = self.rng.lock().ok()?;
        names.choose(&mut *rng).map(|s| s.to_string())
    }
}

#[async_trait]
impl DecisionOracle for RandomOracle {
    async fn decide(&self, role: Role, context: &DecisionContext) -> Result<Decision, OracleError> {
        let others = context.other_names();
        let unavailable = || OracleError::Unavailable("no legal choice".to_string());
        match context.phase {
            Phase::DayConversation => self
                .pick(&SMALL_TALK)
                .map(Decision::speak)
                .ok_or_else(unavailable),
            Phase::DayReasoning => Ok(Decision::reason("Weighing everyone's words.")),
            Phase::DayVote => self.pick(&others).map(Decision::vote).ok_or_else(unavailable),
            Phase::NightAction => {
                let ability = role.night_ability().ok_or_else(unavailable)?;
                let mut candidates = others;
                if ability.allows_self_target() {
                    candidates.push(context.me.name.as_str());
                }
                let target = self.pick(&candidates).ok_or_else(unavailable)?;
                Ok(match ability {
                    NightAbility::Kill => Decision::kill(target),
                    NightAbility::Protect => Decision::protect(target),
                    NightAbility::Investigate => Decision::investigate(target),
                })
            }
            Phase::Setup | Phase::GameOver => Err(unavailable()),
        }
    }
}

/// An oracle that always fails.
pub struct FailingOracle;

#[async_trait]
impl DecisionOracle for FailingOracle {
    async fn decide(&self, _role: Role, _context: &DecisionContext) -> Result<Decision, OracleError> {
        Err(OracleError::Unavailable("this oracle always fails".to_string()))
    }
}

/// Test harness for running scripted games on a fixed seating.
pub struct TestHarness {
    pub game: Game,
    pub oracle: Arc<ScriptedOracle>,
}

impl TestHarness {
    /// Seat players in order with the given roles. No shuffle, one discussion
    /// round, seeded fallbacks.
    pub fn new(seats: &[(&str, Role)]) -> Self {
        Self::with_config(seats, |config| config)
    }

    /// Like [`TestHarness::new`], with a chance to adjust the config.
    pub fn with_config(seats: &[(&str, Role)], adjust: impl FnOnce(GameConfig) -> GameConfig) -> Self {
        let count = |role: Role| seats.iter().filter(|(_, r)| *r == role).count();
        let roles = RoleCounts {
            mafia: count(Role::Mafia),
            doctor: count(Role::Doctor),
            police: count(Role::Police),
            citizen: count(Role::Citizen),
        };
        let config = adjust(
            GameConfig::with_roles(roles)
                .with_names(seats.iter().map(|(name, _)| *name))
                .with_seed(7)
                .with_discussion_rounds(1),
        );
        let roster = Roster::new(seats.to_vec()).expect("harness seats must have unique names");
        let oracle = Arc::new(ScriptedOracle::new());
        let game = Game::with_roster(config, roster, oracle.clone()).expect("harness config must be valid");
        Self { game, oracle }
    }

    pub fn id(&self, name: &str) -> PlayerId {
        self.game
            .roster()
            .find_by_name(name)
            .map(|p| p.id)
            .unwrap_or_else(|| panic!("no player named {name}"))
    }

    pub fn script(&self, name: &str, phase: Phase, decisions: impl IntoIterator<Item = Decision>) {
        self.oracle.script(name, phase, decisions);
    }

    /// Queue the same vote for several players.
    pub fn votes(&self, votes: &[(&str, &str)]) {
        for (voter, target) in votes {
            self.script(voter, Phase::DayVote, [Decision::vote(*target)]);
        }
    }

    pub async fn step(&mut self) -> Option<Outcome> {
        self.game.step().await.expect("step failed")
    }

    /// Step until the phase changes to `phase` or the game ends.
    pub async fn advance_to(&mut self, phase: Phase) -> Option<Outcome> {
        loop {
            if let Some(outcome) = self.step().await {
                return Some(outcome);
            }
            if self.game.phase() == phase {
                return None;
            }
        }
    }

    pub fn is_alive(&self, name: &str) -> bool {
        self.game.roster().is_alive(self.id(name))
    }

    pub fn knows(&self, name: &str, needle: &str) -> bool {
        self.game.knowledge().knows(self.id(name), needle)
    }

    /// Public entries containing `needle`.
    pub fn public_entries(&self, needle: &str) -> Vec<&MemoryEntry> {
        self.game
            .transcript()
            .iter()
            .filter(|e| e.content.contains(needle))
            .collect()
    }
}

/// Assert a player is alive.
#[track_caller]
pub fn assert_alive(harness: &TestHarness, name: &str) {
    assert!(harness.is_alive(name), "Expected {name} to be alive");
}

/// Assert a player is dead.
#[track_caller]
pub fn assert_dead(harness: &TestHarness, name: &str) {
    assert!(!harness.is_alive(name), "Expected {name} to be dead");
}

/// Assert the game is over with the given winner.
#[track_caller]
pub fn assert_winner(harness: &TestHarness, team: Team) {
    assert_eq!(
        harness.game.outcome(),
        Outcome::won_by(team),
        "Expected {team} to have won"
    );
}

/// Assert a player's memory holds an entry containing `needle`.
#[track_caller]
pub fn assert_knows(harness: &TestHarness, name: &str, needle: &str) {
    assert!(
        harness.knows(name, needle),
        "Expected {name} to know '{needle}'"
    );
}

/// Assert a player's memory holds no entry containing `needle`.
#[track_caller]
pub fn assert_does_not_know(harness: &TestHarness, name: &str, needle: &str) {
    assert!(
        !harness.knows(name, needle),
        "Expected {name} NOT to know '{needle}'"
    );
}
