//! Discussion and voting.
//!
//! Discussion is plain bookkeeping: speakers are asked one at a time and
//! every utterance is public, so later speakers hear earlier ones. Voting is
//! collected concurrently and resolved by plurality. A tie for the most votes
//! cancels the execution; it is never broken at random.

use crate::error::GameError;
use crate::game::Game;
use crate::memory::{MemoryEntry, Speaker};
use crate::oracle::ActionKind;
use crate::phase::Phase;
use crate::roster::{PlayerId, Roster};
use crate::rules::{self, Ballot, InvalidAction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Votes per target and the set of targets sharing the maximum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Targets with their vote counts, in order of first vote.
    pub counts: Vec<(PlayerId, usize)>,
    /// The winner-set. Empty when every ballot abstained.
    pub winners: Vec<PlayerId>,
}

impl Tally {
    /// The player to execute, if exactly one leads.
    pub fn winner(&self) -> Option<PlayerId> {
        match self.winners.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn is_tie(&self) -> bool {
        self.winners.len() > 1
    }

    pub fn votes_for(&self, id: PlayerId) -> usize {
        self.counts
            .iter()
            .find(|(target, _)| *target == id)
            .map_or(0, |(_, n)| *n)
    }
}

/// Count ballots. Abstentions are not counted.
pub fn tally(ballots: &[Ballot]) -> Tally {
    let mut counts: Vec<(PlayerId, usize)> = Vec::new();
    for target in ballots.iter().filter_map(|b| b.target) {
        match counts.iter_mut().find(|(id, _)| *id == target) {
            Some((_, n)) => *n += 1,
            None => counts.push((target, 1)),
        }
    }
    let max = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let winners = counts
        .iter()
        .filter(|(_, n)| max > 0 && *n == max)
        .map(|(id, _)| *id)
        .collect();
    Tally { counts, winners }
}

/// What a day's vote did.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub ballots: Vec<Ballot>,
    /// Ballots thrown out, with the reason.
    pub dropped: Vec<(PlayerId, InvalidAction)>,
    pub tally: Tally,
    pub executed: Option<PlayerId>,
}

fn describe_tally(tally: &Tally, roster: &Roster) -> String {
    let mut counts = tally.counts.clone();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .iter()
        .map(|(id, n)| {
            let name = roster.name_of(*id).unwrap_or("someone");
            if *n == 1 {
                format!("{name} 1 vote")
            } else {
                format!("{name} {n} votes")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl Game {
    /// Every living player speaks once per round, in seating order.
    pub(crate) async fn run_discussion(&mut self) -> Result<(), GameError> {
        info!(day = self.day, rounds = self.config.discussion_rounds, "Discussion begins");
        for round in 0..self.config.discussion_rounds {
            let speakers: Vec<PlayerId> = self.roster.alive_players().iter().map(|p| p.id).collect();
            for id in speakers {
                let answer = self.ask(id, Phase::DayConversation).await?;
                let speaker = Speaker::Player {
                    id,
                    name: self.name(id),
                };
                let text = match answer {
                    Ok(decision) if decision.kind == ActionKind::Speak => decision
                        .utterance
                        .map(|u| u.trim().to_string())
                        .filter(|u| !u.is_empty()),
                    Ok(decision) => {
                        warn!(player = %speaker, kind = decision.kind.as_str(), "Expected speech");
                        None
                    }
                    // Already logged at warn by `ask`.
                    Err(_) => None,
                };
                let entry = match text {
                    Some(text) => {
                        MemoryEntry::announcement(self.day, Phase::DayConversation, text).with_speaker(speaker)
                    }
                    None => MemoryEntry::announcement(
                        self.day,
                        Phase::DayConversation,
                        format!("{speaker} stays silent."),
                    ),
                };
                debug!(round, "{}: {}", entry.speaker, entry.content);
                self.publish(entry);
            }
        }
        Ok(())
    }

    /// Private reflection. Each thought is kept in its author's log only.
    pub(crate) async fn run_reasoning(&mut self) -> Result<(), GameError> {
        let ids: Vec<PlayerId> = self.roster.alive_players().iter().map(|p| p.id).collect();
        let answers = self.ask_all(&ids, Phase::DayReasoning).await?;
        for (id, answer) in ids.into_iter().zip(answers) {
            // Failures were logged at warn by `ask_all`; nothing is recorded.
            let Ok(decision) = answer else { continue };
            let Some(thought) = decision.utterance.filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            let speaker = Speaker::Player {
                id,
                name: self.name(id),
            };
            self.publish(
                MemoryEntry::private(self.day, Phase::DayReasoning, id, thought).with_speaker(speaker),
            );
        }
        Ok(())
    }

    /// Collect ballots, announce the result and execute a sole leader.
    pub(crate) async fn run_vote(&mut self) -> Result<VoteOutcome, GameError> {
        let voters: Vec<PlayerId> = self.roster.alive_players().iter().map(|p| p.id).collect();
        let answers = self.ask_all(&voters, Phase::DayVote).await?;

        let mut ballots = Vec::new();
        let mut dropped = Vec::new();
        for (voter, answer) in voters.into_iter().zip(answers) {
            let checked = match answer {
                Ok(decision) => rules::ballot(&self.roster, voter, &decision),
                // Already logged at warn by `ask_all`.
                Err(_) => Ok(rules::fallback_ballot(&self.roster, voter, &mut self.rng)),
            };
            match checked {
                Ok(ballot) => {
                    let note = match ballot.target {
                        Some(target) => format!("You voted for {}.", self.name(target)),
                        None => "You abstained.".to_string(),
                    };
                    debug!(voter = %self.name(voter), target = ?ballot.target.map(|t| self.name(t)), "Ballot");
                    self.publish(MemoryEntry::private(self.day, Phase::DayVote, voter, note));
                    ballots.push(ballot);
                }
                Err(invalid) => {
                    warn!(voter = %self.name(voter), error = %invalid, "Dropping invalid ballot");
                    self.publish(MemoryEntry::private(
                        self.day,
                        Phase::DayVote,
                        voter,
                        format!("Your vote was not counted: {invalid}."),
                    ));
                    dropped.push((voter, invalid));
                }
            }
        }

        let tally = tally(&ballots);
        let executed = tally.winner();
        let summary = describe_tally(&tally, &self.roster);
        let content = match executed {
            Some(target) => {
                self.eliminate(target)?;
                let role = self
                    .roster
                    .role_of(target)
                    .ok_or_else(|| GameError::invariant("executed player has no role"))?;
                let name = self.name(target);
                format!("Votes: {summary}. {name} is executed. {name} was {role}.")
            }
            None if tally.is_tie() => {
                let tied = tally
                    .winners
                    .iter()
                    .map(|id| self.name(*id))
                    .collect::<Vec<_>>()
                    .join(" and ");
                format!("Votes: {summary}. {tied} are tied, so the execution is cancelled.")
            }
            None => "Nobody received a vote. No one is executed today.".to_string(),
        };
        info!(day = self.day, executed = ?executed.map(|id| self.name(id)), "Vote resolved");
        self.publish(MemoryEntry::announcement(self.day, Phase::DayVote, content));

        Ok(VoteOutcome {
            ballots,
            dropped,
            tally,
            executed,
        })
    }
}
