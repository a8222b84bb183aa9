//! Night resolution.
//!
//! A night runs `COLLECT -> ORDER -> APPLY -> REPORT`:
//!
//! 1. Every living player with a night ability is asked for a target, all at
//!    once, against the same snapshot. Failed or illegal answers are replaced
//!    with a random legal target.
//! 2. Actions are sorted by ability precedence (kill, protect, investigate).
//! 3. Protection is applied before the kill is finalized; investigation reads
//!    true roles.
//! 4. Each actor hears only about their own action.
//!
//! The kill itself is not applied here. It is revealed and carried out when
//! the next day opens.

use crate::error::GameError;
use crate::game::{Game, NightReport};
use crate::memory::{Audience, MemoryEntry, Speaker};
use crate::oracle::Decision;
use crate::phase::Phase;
use crate::roles::{NightAbility, Role};
use crate::roster::{PlayerId, Roster};
use crate::rules::{self, NightAction};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// The result of one night's APPLY step.
#[derive(Debug, Clone, Default)]
pub struct NightResolution {
    /// Who the mafia attacked, if anyone.
    pub attacked: Option<PlayerId>,
    /// Who actually dies at dawn: the attacked player, unless protected.
    pub killed: Option<PlayerId>,
    /// One single-player entry per action.
    pub reports: Vec<MemoryEntry>,
}

/// Sort actions into resolution order. Stable within an ability.
pub fn order_actions(actions: &mut [NightAction]) {
    actions.sort_by_key(|a| a.ability.precedence());
}

/// The mafia's collective target: the most chosen one, ties going to the
/// earliest-seated mafia's choice.
///
/// `choices` must be in seating order.
pub fn team_target(choices: &[NightAction]) -> Option<&NightAction> {
    let mut counts: HashMap<PlayerId, usize> = HashMap::new();
    for choice in choices {
        *counts.entry(choice.target).or_default() += 1;
    }
    let most = counts.values().copied().max()?;
    choices.iter().find(|c| counts[&c.target] == most)
}

/// Apply one night's actions to the roster.
///
/// Every mafia member's kill is reported back to them, but only the team's
/// choice (see [`team_target`]) is attacked. Kills must be in seating order.
/// Protection flags must already have been cleared for this night.
pub fn resolve_night(
    roster: &mut Roster,
    mut actions: Vec<NightAction>,
    day: u32,
) -> Result<NightResolution, GameError> {
    order_actions(&mut actions);

    let kills: Vec<NightAction> = actions
        .iter()
        .filter(|a| a.ability == NightAbility::Kill)
        .copied()
        .collect();
    let mut resolution = NightResolution {
        attacked: team_target(&kills).map(|k| k.target),
        ..NightResolution::default()
    };
    for action in &actions {
        if !roster.is_alive(action.actor) {
            return Err(GameError::invariant("dead player acted at night"));
        }
        let target = roster
            .get(action.target)
            .filter(|p| p.alive)
            .ok_or_else(|| GameError::invariant("night action targets a dead or unknown player"))?;
        let target_name = target.name.clone();
        let target_role = target.role;

        let report = match action.ability {
            NightAbility::Kill => format!("You attacked {target_name}."),
            NightAbility::Protect => {
                roster.protect(action.target)?;
                format!("You protected {target_name}.")
            }
            NightAbility::Investigate => {
                if target_role == Role::Mafia {
                    format!("Your investigation shows that {target_name} is mafia.")
                } else {
                    format!("Your investigation shows that {target_name} is not mafia.")
                }
            }
        };
        resolution
            .reports
            .push(MemoryEntry::private(day, Phase::NightAction, action.actor, report));
    }

    resolution.killed = resolution
        .attacked
        .filter(|target| !roster.is_protected(*target));
    Ok(resolution)
}

impl Game {
    /// Run one night and remember its result for the morning.
    pub(crate) async fn run_night(&mut self) -> Result<(), GameError> {
        info!(day = self.day, "Night falls");
        self.roster.reset_protection();
        self.publish(MemoryEntry::announcement(
            self.day,
            Phase::NightAction,
            "Night falls. Everyone closes their eyes.",
        ));

        // COLLECT
        let actors: Vec<(PlayerId, NightAbility)> = self
            .roster
            .alive_players()
            .iter()
            .filter_map(|p| p.role.night_ability().map(|a| (p.id, a)))
            .collect();
        let ids: Vec<PlayerId> = actors.iter().map(|(id, _)| *id).collect();
        let answers = self.ask_all(&ids, Phase::NightAction).await?;

        let mut kills = Vec::new();
        let mut actions = Vec::new();
        for ((actor, ability), answer) in actors.into_iter().zip(answers) {
            let checked = match answer {
                Ok(decision) => match rules::night_action(&self.roster, actor, ability, &decision) {
                    Ok(action) => Some((action, decision)),
                    Err(invalid) => {
                        warn!(player = %self.name(actor), error = %invalid, "Illegal night action, substituting");
                        None
                    }
                },
                // Already logged at warn by `ask_all`.
                Err(_) => None,
            };
            let (action, decision) = match checked {
                Some(pair) => pair,
                None => match rules::fallback_night_action(&self.roster, actor, ability, &mut self.rng) {
                    Some(action) => (action, Decision::targeted(ability.into(), self.name(action.target))),
                    None => continue,
                },
            };
            debug!(
                actor = %self.name(actor),
                ability = ability.verb(),
                target = %self.name(action.target),
                "Night action"
            );

            if ability == NightAbility::Kill {
                self.share_with_team(actor, &action, &decision);
                kills.push(action);
            } else {
                actions.push(action);
            }
        }

        if let Some(kill) = team_target(&kills) {
            self.publish(
                MemoryEntry::announcement(
                    self.day,
                    Phase::NightAction,
                    format!("The mafia will attack {} tonight.", self.name(kill.target)),
                )
                .with_audience(Audience::Role(Role::Mafia)),
            );
        }
        actions.extend(kills);

        // ORDER + APPLY
        let resolution = resolve_night(&mut self.roster, actions, self.day)?;

        // REPORT
        for report in resolution.reports {
            self.publish(report);
        }
        self.last_night = Some(NightReport {
            attacked: resolution.attacked,
            killed: resolution.killed,
        });
        Ok(())
    }

    fn share_with_team(&mut self, actor: PlayerId, action: &NightAction, decision: &Decision) {
        let mut content = format!("I want to attack {}.", self.name(action.target));
        if !decision.rationale.is_empty() {
            content.push(' ');
            content.push_str(&decision.rationale);
        }
        let speaker = Speaker::Player {
            id: actor,
            name: self.name(actor),
        };
        self.publish(
            MemoryEntry::announcement(self.day, Phase::NightAction, content)
                .with_speaker(speaker)
                .with_audience(Audience::Role(Role::Mafia)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::new(vec![
            ("Alice", Role::Mafia),
            ("Bob", Role::Mafia),
            ("Charlie", Role::Doctor),
            ("David", Role::Police),
            ("Eve", Role::Citizen),
            ("Frank", Role::Citizen),
            ("Grace", Role::Citizen),
        ])
        .unwrap()
    }

    fn id(roster: &Roster, name: &str) -> PlayerId {
        roster.find_by_name(name).unwrap().id
    }

    fn act(roster: &Roster, actor: &str, ability: NightAbility, target: &str) -> NightAction {
        NightAction {
            actor: id(roster, actor),
            ability,
            target: id(roster, target),
        }
    }

    #[test]
    fn test_order_is_kill_protect_investigate() {
        let r = roster();
        let mut actions = vec![
            act(&r, "David", NightAbility::Investigate, "Alice"),
            act(&r, "Charlie", NightAbility::Protect, "Eve"),
            act(&r, "Alice", NightAbility::Kill, "Eve"),
        ];
        order_actions(&mut actions);
        let order: Vec<NightAbility> = actions.iter().map(|a| a.ability).collect();
        assert_eq!(
            order,
            vec![NightAbility::Kill, NightAbility::Protect, NightAbility::Investigate]
        );
    }

    #[test]
    fn test_protection_blocks_kill() {
        let mut r = roster();
        let eve = id(&r, "Eve");
        let actions = vec![
            act(&r, "Alice", NightAbility::Kill, "Eve"),
            act(&r, "Charlie", NightAbility::Protect, "Eve"),
        ];
        let resolution = resolve_night(&mut r, actions, 1).unwrap();

        assert_eq!(resolution.attacked, Some(eve));
        assert_eq!(resolution.killed, None);
        assert!(r.is_alive(eve));

        let mafia_report = resolution
            .reports
            .iter()
            .find(|e| e.audience == Audience::Player(id(&r, "Alice")))
            .unwrap();
        assert_eq!(mafia_report.content, "You attacked Eve.");
    }

    #[test]
    fn test_unprotected_kill_is_deferred() {
        let mut r = roster();
        let frank = id(&r, "Frank");
        let actions = vec![
            act(&r, "Alice", NightAbility::Kill, "Frank"),
            act(&r, "Charlie", NightAbility::Protect, "Charlie"),
        ];
        let resolution = resolve_night(&mut r, actions, 1).unwrap();
        assert_eq!(resolution.killed, Some(frank));
        // Still alive until the morning announcement.
        assert!(r.is_alive(frank));
    }

    #[test]
    fn test_doctor_report_does_not_reveal_save() {
        let mut r = roster();
        let actions = vec![
            act(&r, "Alice", NightAbility::Kill, "Eve"),
            act(&r, "Charlie", NightAbility::Protect, "Eve"),
        ];
        let resolution = resolve_night(&mut r, actions, 1).unwrap();
        let doctor = resolution
            .reports
            .iter()
            .find(|e| e.audience == Audience::Player(id(&r, "Charlie")))
            .unwrap();
        assert_eq!(doctor.content, "You protected Eve.");
    }

    #[test]
    fn test_investigation_reports() {
        let mut r = roster();
        let actions = vec![act(&r, "David", NightAbility::Investigate, "Bob")];
        let resolution = resolve_night(&mut r, actions, 2).unwrap();
        assert_eq!(resolution.reports.len(), 1);
        assert_eq!(resolution.reports[0].audience, Audience::Player(id(&r, "David")));
        assert!(resolution.reports[0].content.contains("Bob is mafia"));

        let actions = vec![act(&r, "David", NightAbility::Investigate, "Grace")];
        let resolution = resolve_night(&mut r, actions, 2).unwrap();
        assert!(resolution.reports[0].content.contains("Grace is not mafia"));
    }

    #[test]
    fn test_dead_target_is_invariant_violation() {
        let mut r = roster();
        let eve = id(&r, "Eve");
        r.eliminate(eve).unwrap();
        let actions = vec![act(&r, "Alice", NightAbility::Kill, "Eve")];
        assert!(matches!(
            resolve_night(&mut r, actions, 1),
            Err(GameError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_every_mafia_hears_about_their_own_kill() {
        let mut r = roster();
        let actions = vec![
            act(&r, "Alice", NightAbility::Kill, "Eve"),
            act(&r, "Bob", NightAbility::Kill, "Frank"),
        ];
        let resolution = resolve_night(&mut r, actions, 1).unwrap();

        assert_eq!(resolution.attacked, Some(id(&r, "Eve")));
        assert_eq!(resolution.killed, Some(id(&r, "Eve")));
        assert_eq!(resolution.reports.len(), 2);
        let report_for = |name: &str| {
            resolution
                .reports
                .iter()
                .find(|e| e.audience == Audience::Player(id(&r, name)))
                .map(|e| e.content.clone())
        };
        assert_eq!(report_for("Alice").as_deref(), Some("You attacked Eve."));
        assert_eq!(report_for("Bob").as_deref(), Some("You attacked Frank."));
    }

    #[test]
    fn test_team_target_plurality_and_tie() {
        let r = roster();
        let agreed = vec![
            act(&r, "Alice", NightAbility::Kill, "Eve"),
            act(&r, "Bob", NightAbility::Kill, "Eve"),
        ];
        assert_eq!(team_target(&agreed).unwrap().target, id(&r, "Eve"));

        let split = vec![
            act(&r, "Alice", NightAbility::Kill, "Frank"),
            act(&r, "Bob", NightAbility::Kill, "Grace"),
        ];
        let chosen = team_target(&split).unwrap();
        assert_eq!(chosen.target, id(&r, "Frank"));
        assert_eq!(chosen.actor, id(&r, "Alice"));

        assert!(team_target(&[]).is_none());
    }
}
