//! Action legality.
//!
//! Oracles answer with names and action kinds. This module turns those
//! answers into checked [`NightAction`]s and [`Ballot`]s, or explains why
//! they are illegal with an [`InvalidAction`]. Eligibility is decided here,
//! once, so the engines never invite a player to do something their role
//! cannot do.

use crate::oracle::{ActionKind, Decision};
use crate::roles::NightAbility;
use crate::roster::{PlayerId, Roster};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An illegal choice. Recovered by substitution or by dropping the ballot.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidAction {
    #[error("no player named {0}")]
    UnknownTarget(String),

    #[error("{0} is dead")]
    DeadTarget(String),

    #[error("cannot target yourself with {0}")]
    SelfTarget(String),

    #[error("{0} needs a target")]
    MissingTarget(String),

    #[error("expected {expected}, got {got}")]
    WrongKind { expected: String, got: String },
}

/// A checked night ability use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightAction {
    pub actor: PlayerId,
    pub ability: NightAbility,
    pub target: PlayerId,
}

/// A checked vote. `target: None` is an abstention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub voter: PlayerId,
    pub target: Option<PlayerId>,
}

/// Resolve a named target that must be a living player.
pub fn living_target(roster: &Roster, name: &str) -> Result<PlayerId, InvalidAction> {
    let player = roster
        .find_by_name(name)
        .ok_or_else(|| InvalidAction::UnknownTarget(name.to_string()))?;
    if !player.alive {
        return Err(InvalidAction::DeadTarget(player.name.clone()));
    }
    Ok(player.id)
}

/// Everyone `actor` may legally target with `ability`, in seating order.
pub fn legal_night_targets(roster: &Roster, actor: PlayerId, ability: NightAbility) -> Vec<PlayerId> {
    roster
        .alive_players()
        .into_iter()
        .filter(|p| p.id != actor || ability.allows_self_target())
        .map(|p| p.id)
        .collect()
}

/// Check an oracle's night decision against the actor's ability.
pub fn night_action(
    roster: &Roster,
    actor: PlayerId,
    ability: NightAbility,
    decision: &Decision,
) -> Result<NightAction, InvalidAction> {
    let expected = ActionKind::from(ability);
    if decision.kind != expected {
        return Err(InvalidAction::WrongKind {
            expected: expected.as_str().to_string(),
            got: decision.kind.as_str().to_string(),
        });
    }

    let name = decision
        .target
        .as_deref()
        .ok_or_else(|| InvalidAction::MissingTarget(ability.verb().to_string()))?;
    let target = living_target(roster, name)?;
    if target == actor && !ability.allows_self_target() {
        return Err(InvalidAction::SelfTarget(ability.verb().to_string()));
    }

    Ok(NightAction {
        actor,
        ability,
        target,
    })
}

/// Pick a uniformly random legal night action. `None` if nobody is targetable.
pub fn fallback_night_action<R: Rng + ?Sized>(
    roster: &Roster,
    actor: PlayerId,
    ability: NightAbility,
    rng: &mut R,
) -> Option<NightAction> {
    legal_night_targets(roster, actor, ability)
        .choose(rng)
        .map(|&target| NightAction {
            actor,
            ability,
            target,
        })
}

/// Check an oracle's vote.
///
/// An abstention, or a vote without a target, is a legal empty ballot.
/// Votes for unknown or dead players are invalid.
pub fn ballot(roster: &Roster, voter: PlayerId, decision: &Decision) -> Result<Ballot, InvalidAction> {
    match decision.kind {
        ActionKind::Abstain => Ok(Ballot {
            voter,
            target: None,
        }),
        ActionKind::Vote => {
            let target = match decision.target.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(name) => Some(living_target(roster, name)?),
            };
            Ok(Ballot { voter, target })
        }
        other => Err(InvalidAction::WrongKind {
            expected: ActionKind::Vote.as_str().to_string(),
            got: other.as_str().to_string(),
        }),
    }
}

/// A uniformly random vote for another living player.
pub fn fallback_ballot<R: Rng + ?Sized>(roster: &Roster, voter: PlayerId, rng: &mut R) -> Ballot {
    let candidates: Vec<PlayerId> = roster
        .alive_players()
        .into_iter()
        .filter(|p| p.id != voter)
        .map(|p| p.id)
        .collect();
    Ballot {
        voter,
        target: candidates.choose(rng).copied(),
    }
}
