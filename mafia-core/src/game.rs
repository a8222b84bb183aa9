//! Game - the orchestrator and primary public API.
//!
//! A [`Game`] owns the roster, the knowledge store and one oracle per seat,
//! and drives the phase cycle:
//!
//! ```text
//! Setup -> DayConversation -> [DayReasoning] -> DayVote -> NightAction -> DayConversation ...
//! ```
//!
//! The outcome is re-checked after every elimination, so a game never runs
//! past a terminal condition. Oracle failures are absorbed at the player
//! boundary; only configuration errors and engine defects surface.

use crate::config::GameConfig;
use crate::error::GameError;
use crate::memory::{Audience, KnowledgeStore, MemoryEntry};
use crate::oracle::{decide_within, Decision, DecisionContext, DecisionOracle, OracleError};
use crate::phase::Phase;
use crate::roles::{Role, Team};
use crate::roster::{Outcome, PlayerId, Roster};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Receives every public game event, in order.
pub trait AnnouncementSink: Send {
    fn on_public_event(&mut self, entry: &MemoryEntry);
}

impl AnnouncementSink for UnboundedSender<MemoryEntry> {
    fn on_public_event(&mut self, entry: &MemoryEntry) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.send(entry.clone());
    }
}

impl AnnouncementSink for Arc<Mutex<Vec<MemoryEntry>>> {
    fn on_public_event(&mut self, entry: &MemoryEntry) {
        if let Ok(mut log) = self.lock() {
            log.push(entry.clone());
        }
    }
}

/// The final state of a finished game.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub outcome: Outcome,
    /// The day on which the game ended.
    pub days: u32,
    /// Every public entry, in order, ending with the game-over announcement.
    pub transcript: Vec<MemoryEntry>,
}

/// What the last night left behind for the morning announcement.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NightReport {
    pub attacked: Option<PlayerId>,
    pub killed: Option<PlayerId>,
}

/// One game of Mafia.
pub struct Game {
    pub(crate) config: GameConfig,
    pub(crate) roster: Roster,
    pub(crate) knowledge: KnowledgeStore,
    default_oracle: Arc<dyn DecisionOracle>,
    oracles: HashMap<PlayerId, Arc<dyn DecisionOracle>>,
    pub(crate) rng: StdRng,
    pub(crate) day: u32,
    phase: Phase,
    pub(crate) last_night: Option<NightReport>,
    transcript: Vec<MemoryEntry>,
    sinks: Vec<Box<dyn AnnouncementSink>>,
    seats: usize,
    outcome: Outcome,
}

impl Game {
    /// Deal roles from the config and seat every player with `default_oracle`.
    pub fn new(config: GameConfig, default_oracle: Arc<dyn DecisionOracle>) -> Result<Self, GameError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let roster = Roster::from_config(&config, &mut rng)?;
        Ok(Self::assemble(config, roster, default_oracle, rng))
    }

    /// Start from a fixed seating instead of dealing roles.
    pub fn with_roster(
        config: GameConfig,
        roster: Roster,
        default_oracle: Arc<dyn DecisionOracle>,
    ) -> Result<Self, GameError> {
        config.roles.validate()?;
        for role in Role::ALL {
            let seated = roster.players().iter().filter(|p| p.role == role).count();
            let dealt = config.roles.count(role);
            if seated != dealt {
                return Err(GameError::config(format!(
                    "roster seats {seated} {role} but the config deals {dealt}"
                )));
            }
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self::assemble(config, roster, default_oracle, rng))
    }

    fn assemble(
        config: GameConfig,
        roster: Roster,
        default_oracle: Arc<dyn DecisionOracle>,
        rng: StdRng,
    ) -> Self {
        let knowledge = KnowledgeStore::new(&roster).with_capacity(config.memory_capacity);
        let seats = roster.len();
        Self {
            config,
            knowledge,
            default_oracle,
            oracles: HashMap::new(),
            rng,
            day: 0,
            phase: Phase::Setup,
            last_night: None,
            transcript: Vec::new(),
            sinks: Vec::new(),
            seats,
            outcome: Outcome::ONGOING,
            roster,
        }
    }

    /// Give one seat its own oracle.
    pub fn with_oracle(mut self, name: &str, oracle: Arc<dyn DecisionOracle>) -> Result<Self, GameError> {
        let id = self
            .roster
            .find_by_name(name)
            .map(|p| p.id)
            .ok_or_else(|| GameError::config(format!("no player named {name}")))?;
        self.oracles.insert(id, oracle);
        Ok(self)
    }

    /// Register a listener for public events.
    pub fn with_sink(mut self, sink: impl AnnouncementSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Public entries so far.
    pub fn transcript(&self) -> &[MemoryEntry] {
        &self.transcript
    }

    /// Advance exactly one phase. Returns the outcome once the game is over.
    pub async fn step(&mut self) -> Result<Option<Outcome>, GameError> {
        match self.phase {
            Phase::Setup => {
                self.announce_roles()?;
                self.day = 1;
                self.phase = Phase::DayConversation;
                Ok(None)
            }
            Phase::DayConversation => {
                if let Some(outcome) = self.open_day()? {
                    return Ok(Some(outcome));
                }
                self.run_discussion().await?;
                self.phase = if self.config.reasoning_phase {
                    Phase::DayReasoning
                } else {
                    Phase::DayVote
                };
                Ok(None)
            }
            Phase::DayReasoning => {
                self.run_reasoning().await?;
                self.phase = Phase::DayVote;
                Ok(None)
            }
            Phase::DayVote => {
                self.run_vote().await?;
                if let Some(outcome) = self.check_outcome()? {
                    return Ok(Some(outcome));
                }
                self.phase = Phase::NightAction;
                Ok(None)
            }
            Phase::NightAction => {
                self.run_night().await?;
                self.day += 1;
                self.phase = Phase::DayConversation;
                Ok(None)
            }
            Phase::GameOver => Ok(Some(self.outcome)),
        }
    }

    /// Play until someone wins.
    pub async fn run(&mut self) -> Result<RunResult, GameError> {
        info!(players = self.seats, "Starting game");
        loop {
            if let Some(outcome) = self.step().await? {
                return Ok(RunResult {
                    outcome,
                    days: self.day,
                    transcript: self.transcript.clone(),
                });
            }
        }
    }

    /// Record an entry and forward it to sinks if it is public.
    pub(crate) fn publish(&mut self, entry: MemoryEntry) {
        let delivered = self.knowledge.record(&entry, &self.roster);
        debug!(
            day = entry.day,
            phase = %entry.phase,
            delivered,
            "{}: {}",
            entry.speaker,
            entry.content
        );
        if entry.audience.is_public() {
            for sink in &mut self.sinks {
                sink.on_public_event(&entry);
            }
            self.transcript.push(entry);
        }
    }

    /// Remove a player and verify the roster still adds up.
    pub(crate) fn eliminate(&mut self, id: PlayerId) -> Result<(), GameError> {
        let player = self.roster.eliminate(id)?;
        info!(player = %player.name, role = %player.role, day = self.day, "Player eliminated");
        self.roster.check_invariants(self.seats)
    }

    /// End the game if a side has won.
    pub(crate) fn check_outcome(&mut self) -> Result<Option<Outcome>, GameError> {
        self.roster.check_invariants(self.seats)?;
        let outcome = self.roster.outcome();
        if !outcome.over {
            return Ok(None);
        }

        let verdict = match outcome.winner {
            Some(Team::Citizens) => "Every mafia member has been eliminated. The citizens win!",
            Some(Team::Mafia) => "The mafia now equal or outnumber everyone else. The mafia win!",
            None => "The game is over.",
        };
        let reveal = self
            .roster
            .players()
            .iter()
            .map(|p| format!("{} ({})", p.name, p.role))
            .collect::<Vec<_>>()
            .join(", ");
        self.publish(MemoryEntry::announcement(
            self.day,
            Phase::GameOver,
            format!("Game over. {verdict} Roles: {reveal}."),
        ));

        info!(winner = ?outcome.winner, day = self.day, "Game over");
        self.phase = Phase::GameOver;
        self.outcome = outcome;
        Ok(Some(outcome))
    }

    /// Tell each player their role, and the mafia who their team is.
    fn announce_roles(&mut self) -> Result<(), GameError> {
        let briefings: Vec<MemoryEntry> = self
            .roster
            .players()
            .iter()
            .map(|p| {
                MemoryEntry::private(
                    0,
                    Phase::Setup,
                    p.id,
                    format!("You are {}. Your role is {}. {}", p.name, p.role, p.role.description()),
                )
            })
            .collect();
        for entry in briefings {
            self.publish(entry);
        }

        let mafia: Vec<String> = self
            .roster
            .members_of(Role::Mafia)
            .iter()
            .map(|p| p.name.clone())
            .collect();
        if mafia.is_empty() {
            return Err(GameError::invariant("no mafia seated"));
        }
        self.publish(
            MemoryEntry::announcement(0, Phase::Setup, format!("The mafia team is: {}.", mafia.join(", ")))
                .with_audience(Audience::Role(Role::Mafia)),
        );
        Ok(())
    }

    /// Reveal the night's result and apply its death.
    fn open_day(&mut self) -> Result<Option<Outcome>, GameError> {
        info!(day = self.day, "Day begins");
        let night = self.last_night.take();
        let content = match night {
            None => format!(
                "Day {} begins. {} players are at the table. Find the mafia before it is too late.",
                self.day,
                self.roster.alive_players().len()
            ),
            Some(NightReport {
                killed: Some(victim),
                ..
            }) => {
                self.eliminate(victim)?;
                let name = self.name(victim);
                format!("Day {} begins. {name} was killed during the night.", self.day)
            }
            Some(NightReport {
                attacked: Some(target),
                killed: None,
            }) => format!(
                "Day {} begins. {} was attacked during the night but survived.",
                self.day,
                self.name(target)
            ),
            Some(_) => format!("Day {} begins. Nothing happened during the night.", self.day),
        };
        self.publish(MemoryEntry::announcement(self.day, Phase::DayConversation, content));

        if let Some(outcome) = self.check_outcome()? {
            return Ok(Some(outcome));
        }
        if let Some(limit) = self.config.max_days {
            if self.day > limit {
                warn!(limit, "Day limit reached without a winner");
                return Err(GameError::Stalled { days: limit });
            }
        }
        Ok(None)
    }

    pub(crate) fn name(&self, id: PlayerId) -> String {
        self.roster.name_of(id).unwrap_or("someone").to_string()
    }

    /// Snapshot of what `id` may see right now.
    pub(crate) fn context(&self, id: PlayerId, phase: Phase) -> Result<(Role, DecisionContext), GameError> {
        let player = self
            .roster
            .get(id)
            .ok_or_else(|| GameError::invariant(format!("no seat for player {id}")))?;
        let teammates = if player.role.shares_team_channel() {
            self.roster
                .members_of(player.role)
                .iter()
                .filter(|p| p.id != id)
                .map(|p| p.summary())
                .collect()
        } else {
            Vec::new()
        };
        Ok((
            player.role,
            DecisionContext {
                day: self.day,
                phase,
                me: player.summary(),
                alive_players: self.roster.alive_summaries(),
                teammates,
                memories: self
                    .knowledge
                    .recent(id, self.day, self.config.memory_window_days),
            },
        ))
    }

    fn oracle_for(&self, id: PlayerId) -> Arc<dyn DecisionOracle> {
        self.oracles
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.default_oracle))
    }

    /// Ask one player, within the configured timeout.
    pub(crate) async fn ask(&self, id: PlayerId, phase: Phase) -> Result<Result<Decision, OracleError>, GameError> {
        let (role, context) = self.context(id, phase)?;
        let oracle = self.oracle_for(id);
        let result = decide_within(oracle.as_ref(), role, &context, self.config.decision_timeout).await;
        self.log_result(id, phase, &result);
        Ok(result)
    }

    /// Ask several players at once against the same snapshot.
    ///
    /// Results come back in the order of `ids`.
    pub(crate) async fn ask_all(
        &self,
        ids: &[PlayerId],
        phase: Phase,
    ) -> Result<Vec<Result<Decision, OracleError>>, GameError> {
        let limit = self.config.decision_timeout;
        let mut requests = Vec::with_capacity(ids.len());
        for &id in ids {
            let (role, context) = self.context(id, phase)?;
            requests.push((self.oracle_for(id), role, context));
        }

        let results = join_all(requests.into_iter().map(|(oracle, role, context)| async move {
            decide_within(oracle.as_ref(), role, &context, limit).await
        }))
        .await;

        for (id, result) in ids.iter().zip(&results) {
            self.log_result(*id, phase, result);
        }
        Ok(results)
    }

    fn log_result(&self, id: PlayerId, phase: Phase, result: &Result<Decision, OracleError>) {
        let player = self.name(id);
        match result {
            Ok(decision) => debug!(
                %player,
                %phase,
                kind = decision.kind.as_str(),
                target = ?decision.target,
                "Decision received"
            ),
            Err(err) => warn!(%player, %phase, error = %err, "Oracle failed, using fallback"),
        }
    }
}
