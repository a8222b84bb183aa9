//! Prompt assembly for the Claude-backed oracle.

use crate::memory::render_memories;
use crate::oracle::DecisionContext;
use crate::phase::Phase;
use crate::roles::Role;

/// Game rules plus the role briefing. Stable for a player's whole game.
pub fn system_prompt(name: &str, role: Role) -> String {
    let mut prompt = String::new();
    prompt.push_str(include_str!("prompts/rules.txt"));
    prompt.push_str("\n\n");
    prompt.push_str(match role {
        Role::Mafia => include_str!("prompts/mafia.txt"),
        Role::Doctor => include_str!("prompts/doctor.txt"),
        Role::Police => include_str!("prompts/police.txt"),
        Role::Citizen => include_str!("prompts/citizen.txt"),
    });
    prompt.push_str(&format!("\nYour name is {name}.\n"));
    prompt
}

/// The current situation and what is being asked for.
pub fn user_prompt(role: Role, context: &DecisionContext) -> String {
    let mut prompt = String::new();

    prompt.push_str("## Current situation\n");
    prompt.push_str(&format!("- Day {}, {} phase\n", context.day, context.phase));
    let alive: Vec<&str> = context.alive_players.iter().map(|p| p.name.as_str()).collect();
    prompt.push_str(&format!(
        "- {} players alive: {}\n",
        alive.len(),
        alive.join(", ")
    ));
    if !context.teammates.is_empty() {
        let team: Vec<&str> = context.teammates.iter().map(|p| p.name.as_str()).collect();
        prompt.push_str(&format!("- Your fellow mafia: {}\n", team.join(", ")));
    }

    prompt.push_str("\n## What you remember\n");
    if context.memories.is_empty() {
        prompt.push_str("Nothing yet.\n");
    } else {
        prompt.push_str(&render_memories(&context.memories));
    }

    prompt.push_str("\n## Your task\n");
    prompt.push_str(&phase_instructions(role, context));
    prompt
}

fn phase_instructions(role: Role, context: &DecisionContext) -> String {
    let others = context.other_names().join(", ");
    match context.phase {
        Phase::DayConversation => "It is the day conversation. Say something to the table: \
             analyse last night, point out suspicious behaviour, and explain your reasoning. \
             Use action \"speak\" with your words in \"utterance\"."
            .to_string(),
        Phase::DayReasoning => "Take a moment to think privately. Summarise what you know, \
             who you suspect and who you trust. Nobody else will see this. \
             Use action \"reason\" with your thoughts in \"utterance\"."
            .to_string(),
        Phase::DayVote => format!(
            "It is time to vote. Choose the player you most want executed from: {others}. \
             Use action \"vote\" with their name in \"target\", or action \"abstain\"."
        ),
        Phase::NightAction => match role {
            Role::Mafia => format!(
                "It is night. Choose someone to attack from: {others}. \
                 Use action \"kill\" with their name in \"target\"."
            ),
            Role::Doctor => {
                let me = &context.me.name;
                format!(
                    "It is night. Choose someone to protect from: {others}, {me}. \
                     Use action \"protect\" with their name in \"target\"."
                )
            }
            Role::Police => format!(
                "It is night. Choose someone to investigate from: {others}. \
                 Use action \"investigate\" with their name in \"target\"."
            ),
            Role::Citizen => "It is night. You have nothing to do.".to_string(),
        },
        Phase::Setup | Phase::GameOver => "Nothing to decide right now.".to_string(),
    }
}
