//! The decision oracle boundary.
//!
//! Every choice a player makes (what to say, whom to vote for, whom to
//! target at night) is delegated to a [`DecisionOracle`]. The engine hands it
//! a read-only [`DecisionContext`] snapshot; oracles never hold a handle into
//! the roster or the knowledge store.

use crate::memory::MemoryEntry;
use crate::phase::Phase;
use crate::roles::{NightAbility, Role};
use crate::roster::PlayerSummary;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Why a decision could not be obtained. Always recovered by a fallback.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("decision timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed decision: {0}")]
    Malformed(String),

    #[error("model refused to decide: {0}")]
    Refused(String),

    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Claude API error: {0}")]
    Api(#[from] claude::Error),
}

/// What a decision does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Speak,
    Reason,
    Vote,
    Abstain,
    Kill,
    Protect,
    Investigate,
}

impl ActionKind {
    /// The kind the engine expects from `role` during `phase`, if any.
    pub fn expected(phase: Phase, role: Role) -> Option<ActionKind> {
        match phase {
            Phase::DayConversation => Some(ActionKind::Speak),
            Phase::DayReasoning => Some(ActionKind::Reason),
            Phase::DayVote => Some(ActionKind::Vote),
            Phase::NightAction => role.night_ability().map(ActionKind::from),
            Phase::Setup | Phase::GameOver => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Speak => "speak",
            ActionKind::Reason => "reason",
            ActionKind::Vote => "vote",
            ActionKind::Abstain => "abstain",
            ActionKind::Kill => "kill",
            ActionKind::Protect => "protect",
            ActionKind::Investigate => "investigate",
        }
    }

    pub fn parse(s: &str) -> Option<ActionKind> {
        match s.trim().to_lowercase().as_str() {
            "speak" => Some(ActionKind::Speak),
            "reason" => Some(ActionKind::Reason),
            "vote" => Some(ActionKind::Vote),
            "abstain" => Some(ActionKind::Abstain),
            "kill" | "attack" => Some(ActionKind::Kill),
            "protect" | "heal" => Some(ActionKind::Protect),
            "investigate" => Some(ActionKind::Investigate),
            _ => None,
        }
    }
}

impl From<NightAbility> for ActionKind {
    fn from(ability: NightAbility) -> Self {
        match ability {
            NightAbility::Kill => ActionKind::Kill,
            NightAbility::Protect => ActionKind::Protect,
            NightAbility::Investigate => ActionKind::Investigate,
        }
    }
}

/// A player's choice, as returned by an oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub kind: ActionKind,
    /// Target player's name, if the action has one.
    pub target: Option<String>,
    /// Spoken or private text, for speak/reason decisions.
    pub utterance: Option<String>,
    pub rationale: String,
}

impl Decision {
    fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            target: None,
            utterance: None,
            rationale: String::new(),
        }
    }

    pub fn speak(text: impl Into<String>) -> Self {
        Self {
            utterance: Some(text.into()),
            ..Self::new(ActionKind::Speak)
        }
    }

    pub fn reason(text: impl Into<String>) -> Self {
        Self {
            utterance: Some(text.into()),
            ..Self::new(ActionKind::Reason)
        }
    }

    pub fn vote(target: impl Into<String>) -> Self {
        Self::targeted(ActionKind::Vote, target)
    }

    pub fn abstain() -> Self {
        Self::new(ActionKind::Abstain)
    }

    pub fn kill(target: impl Into<String>) -> Self {
        Self::targeted(ActionKind::Kill, target)
    }

    pub fn protect(target: impl Into<String>) -> Self {
        Self::targeted(ActionKind::Protect, target)
    }

    pub fn investigate(target: impl Into<String>) -> Self {
        Self::targeted(ActionKind::Investigate, target)
    }

    pub fn targeted(kind: ActionKind, target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..Self::new(kind)
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }
}

/// What a player can see when asked to decide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionContext {
    pub day: u32,
    pub phase: Phase,
    /// The player being asked.
    pub me: PlayerSummary,
    pub alive_players: Vec<PlayerSummary>,
    /// Fellow mafia, for mafia players. Empty for everyone else.
    pub teammates: Vec<PlayerSummary>,
    /// The player's own recent memories, oldest first.
    pub memories: Vec<MemoryEntry>,
}

impl DecisionContext {
    /// Names of living players other than the one deciding.
    pub fn other_names(&self) -> Vec<&str> {
        self.alive_players
            .iter()
            .filter(|p| p.id != self.me.id)
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// Maps a role and a situation to a decision.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn decide(&self, role: Role, context: &DecisionContext) -> Result<Decision, OracleError>;
}

/// Ask an oracle, failing with [`OracleError::Timeout`] after `limit`.
pub async fn decide_within(
    oracle: &dyn DecisionOracle,
    role: Role,
    context: &DecisionContext,
    limit: Duration,
) -> Result<Decision, OracleError> {
    match tokio::time::timeout(limit, oracle.decide(role, context)).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::PlayerId;

    struct Slow;

    #[async_trait]
    impl DecisionOracle for Slow {
        async fn decide(&self, _: Role, _: &DecisionContext) -> Result<Decision, OracleError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Decision::abstain())
        }
    }

    struct Instant;

    #[async_trait]
    impl DecisionOracle for Instant {
        async fn decide(&self, _: Role, _: &DecisionContext) -> Result<Decision, OracleError> {
            Ok(Decision::vote("Bob").with_rationale("quiet all day"))
        }
    }

    fn context() -> DecisionContext {
        let me = PlayerSummary {
            id: PlayerId::new(),
            name: "Alice".to_string(),
        };
        DecisionContext {
            day: 1,
            phase: Phase::DayVote,
            alive_players: vec![
                me.clone(),
                PlayerSummary {
                    id: PlayerId::new(),
                    name: "Bob".to_string(),
                },
            ],
            me,
            teammates: vec![],
            memories: vec![],
        }
    }

    #[test]
    fn test_expected_kinds() {
        assert_eq!(
            ActionKind::expected(Phase::NightAction, Role::Doctor),
            Some(ActionKind::Protect)
        );
        assert_eq!(ActionKind::expected(Phase::NightAction, Role::Citizen), None);
        assert_eq!(
            ActionKind::expected(Phase::DayVote, Role::Mafia),
            Some(ActionKind::Vote)
        );
    }

    #[test]
    fn test_parse_kind_aliases() {
        assert_eq!(ActionKind::parse("Attack"), Some(ActionKind::Kill));
        assert_eq!(ActionKind::parse("heal"), Some(ActionKind::Protect));
        assert_eq!(ActionKind::parse("dance"), None);
    }

    #[test]
    fn test_other_names_excludes_self() {
        assert_eq!(context().other_names(), vec!["Bob"]);
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let result = decide_within(&Slow, Role::Citizen, &context(), Duration::from_millis(20)).await;
        assert!(matches!(result, Err(OracleError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_fast_oracle_passes_through() {
        let decision = decide_within(&Instant, Role::Citizen, &context(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(decision.target.as_deref(), Some("Bob"));
        assert_eq!(decision.rationale, "quiet all day");
    }
}
