//! Scripted games exercising the full phase cycle.
//!
//! Every test runs against `ScriptedOracle`, so no API key is needed and the
//! outcome is fully determined by the scripts.

use mafia_core::testing::{
    assert_alive, assert_dead, assert_does_not_know, assert_knows, assert_winner, FailingOracle,
    RandomOracle, TestHarness,
};
use mafia_core::{Decision, Game, GameConfig, GameError, MemoryEntry, Phase, Role, Team};
use std::sync::Arc;
use tokio::sync::mpsc;

const FIVE: [(&str, Role); 5] = [
    ("Alice", Role::Mafia),
    ("Bob", Role::Doctor),
    ("Charlie", Role::Police),
    ("David", Role::Citizen),
    ("Eve", Role::Citizen),
];

const SEVEN: [(&str, Role); 7] = [
    ("Alice", Role::Mafia),
    ("Bob", Role::Mafia),
    ("Charlie", Role::Doctor),
    ("David", Role::Police),
    ("Eve", Role::Citizen),
    ("Frank", Role::Citizen),
    ("Grace", Role::Citizen),
];

fn night(h: &TestHarness, actions: &[(&str, Decision)]) {
    for (actor, decision) in actions {
        h.script(actor, Phase::NightAction, [decision.clone()]);
    }
}

// =============================================================================
// VOTING
// =============================================================================

#[tokio::test]
async fn test_tied_vote_cancels_execution() {
    let mut h = TestHarness::new(&FIVE);
    h.votes(&[
        ("Alice", "Bob"),
        ("Charlie", "Bob"),
        ("Bob", "Alice"),
        ("David", "Alice"),
        ("Eve", "Charlie"),
    ]);

    assert_eq!(h.advance_to(Phase::NightAction).await, None);

    for (name, _) in FIVE {
        assert_alive(&h, name);
    }
    let votes: Vec<&MemoryEntry> = h
        .game
        .transcript()
        .iter()
        .filter(|e| e.phase == Phase::DayVote)
        .collect();
    assert_eq!(votes.len(), 1);
    assert!(votes[0].content.contains("Alice 2 votes"));
    assert!(votes[0].content.contains("Bob 2 votes"));
    assert!(votes[0].content.contains("Charlie 1 vote"));
    assert!(votes[0].content.contains("execution is cancelled"));
    assert!(h.public_entries("is executed").is_empty());
}

#[tokio::test]
async fn test_single_leader_is_executed_with_one_reveal() {
    let mut h = TestHarness::new(&SEVEN);
    h.votes(&[
        ("Charlie", "Alice"),
        ("David", "Alice"),
        ("Eve", "Alice"),
        ("Frank", "Bob"),
    ]);

    h.step().await; // setup
    h.step().await; // discussion
    let before = h.game.transcript().len();
    assert_eq!(h.step().await, None); // vote

    assert_dead(&h, "Alice");
    assert_eq!(h.game.transcript().len(), before + 1);
    let reveal = &h.game.transcript()[before];
    assert_eq!(reveal.phase, Phase::DayVote);
    assert!(reveal.content.contains("Alice is executed. Alice was Mafia."));
    assert_eq!(h.public_entries("Alice was Mafia").len(), 1);
    assert_eq!(h.game.phase(), Phase::NightAction);
}

#[tokio::test]
async fn test_voters_remember_their_own_ballots() {
    let mut h = TestHarness::new(&FIVE);
    h.votes(&[("Alice", "David"), ("David", "Charlie"), ("Eve", "Nobody")]);
    h.advance_to(Phase::NightAction).await;

    assert_knows(&h, "David", "You voted for Charlie.");
    assert_does_not_know(&h, "Charlie", "You voted for Charlie.");
    assert_knows(&h, "Eve", "Your vote was not counted");
    assert_knows(&h, "Bob", "You abstained.");
    assert_alive(&h, "Charlie");
}

#[tokio::test]
async fn test_all_abstain_executes_nobody() {
    let mut h = TestHarness::new(&FIVE);
    h.advance_to(Phase::NightAction).await;
    assert_eq!(h.public_entries("No one is executed").len(), 1);
    assert_eq!(h.game.roster().alive_players().len(), 5);
}

// =============================================================================
// NIGHT
// =============================================================================

#[tokio::test]
async fn test_protection_blocks_kill() {
    let mut h = TestHarness::new(&FIVE);
    night(
        &h,
        &[
            ("Alice", Decision::kill("Eve")),
            ("Bob", Decision::protect("Eve")),
            ("Charlie", Decision::investigate("David")),
        ],
    );

    h.step().await; // setup
    assert_eq!(h.advance_to(Phase::DayConversation).await, None);
    assert_eq!(h.game.day(), 2);

    assert_alive(&h, "Eve");
    assert_knows(&h, "Alice", "You attacked Eve.");
    assert_does_not_know(&h, "Alice", "survived");
    assert_knows(&h, "Bob", "You protected Eve.");
    assert_does_not_know(&h, "Bob", "survived");

    h.step().await; // day 2 opens
    assert_alive(&h, "Eve");
    assert_eq!(
        h.public_entries("Eve was attacked during the night but survived").len(),
        1
    );
}

#[tokio::test]
async fn test_protection_does_not_carry_over_to_the_next_night() {
    let mut h = TestHarness::new(&FIVE);
    h.script("Alice", Phase::NightAction, [Decision::kill("Eve"), Decision::kill("Eve")]);
    h.script("Bob", Phase::NightAction, [Decision::protect("Eve"), Decision::protect("Bob")]);
    h.script(
        "Charlie",
        Phase::NightAction,
        [Decision::investigate("David"), Decision::investigate("David")],
    );

    h.step().await; // setup
    h.advance_to(Phase::DayConversation).await; // night 1
    h.step().await; // day 2 opens
    assert_alive(&h, "Eve");

    assert_eq!(h.advance_to(Phase::DayConversation).await, None); // night 2
    assert_eq!(h.game.day(), 3);
    h.step().await; // day 3 opens
    assert_dead(&h, "Eve");
    assert_eq!(h.public_entries("Eve was killed during the night").len(), 1);
}

#[tokio::test]
async fn test_night_kill_is_revealed_next_morning() {
    let mut h = TestHarness::new(&FIVE);
    night(
        &h,
        &[
            ("Alice", Decision::kill("David")),
            ("Bob", Decision::protect("Bob")),
            ("Charlie", Decision::investigate("Eve")),
        ],
    );

    h.step().await;
    h.advance_to(Phase::DayConversation).await;
    assert_alive(&h, "David");

    h.step().await;
    assert_dead(&h, "David");
    assert_eq!(h.public_entries("David was killed during the night").len(), 1);
    assert!(h.game.roster().outcome().winner.is_none());

    let late = h
        .oracle
        .contexts_for("David")
        .iter()
        .filter(|c| c.day >= 2)
        .count();
    assert_eq!(late, 0);
}

#[tokio::test]
async fn test_investigation_is_confidential() {
    let mut h = TestHarness::new(&FIVE);
    night(
        &h,
        &[
            ("Alice", Decision::kill("Eve")),
            ("Bob", Decision::protect("Eve")),
            ("Charlie", Decision::investigate("Alice")),
        ],
    );

    h.step().await;
    h.advance_to(Phase::DayConversation).await;

    assert_knows(&h, "Charlie", "Alice is mafia");
    for name in ["Alice", "Bob", "David", "Eve"] {
        assert_does_not_know(&h, name, "Your investigation shows");
    }
    assert!(h.public_entries("Alice is mafia").is_empty());
}

#[tokio::test]
async fn test_mafia_share_choices_and_tie_goes_to_first_seat() {
    let mut h = TestHarness::new(&SEVEN);
    night(
        &h,
        &[
            ("Alice", Decision::kill("Eve").with_rationale("She is sharp.")),
            ("Bob", Decision::kill("Frank")),
            ("Charlie", Decision::protect("Charlie")),
            ("David", Decision::investigate("Grace")),
        ],
    );

    h.step().await;
    h.advance_to(Phase::DayConversation).await;

    for mafia in ["Alice", "Bob"] {
        assert_knows(&h, mafia, "I want to attack Eve. She is sharp.");
        assert_knows(&h, mafia, "I want to attack Frank.");
        assert_knows(&h, mafia, "The mafia will attack Eve tonight.");
    }
    for other in ["Charlie", "David", "Eve", "Frank", "Grace"] {
        assert_does_not_know(&h, other, "I want to attack");
        assert_does_not_know(&h, other, "The mafia will attack");
    }

    assert_knows(&h, "Alice", "You attacked Eve.");
    assert_knows(&h, "Bob", "You attacked Frank.");

    h.step().await;
    assert_dead(&h, "Eve");
    assert_alive(&h, "Frank");
}

#[tokio::test]
async fn test_every_mafia_gets_a_kill_report() {
    let mut h = TestHarness::new(&SEVEN);
    night(
        &h,
        &[
            ("Alice", Decision::kill("Eve")),
            ("Bob", Decision::kill("Eve")),
            ("Charlie", Decision::protect("Charlie")),
            ("David", Decision::investigate("Grace")),
        ],
    );

    h.step().await;
    h.advance_to(Phase::DayConversation).await;

    for mafia in ["Alice", "Bob"] {
        let reports: Vec<MemoryEntry> = h
            .game
            .knowledge()
            .all(h.id(mafia))
            .into_iter()
            .filter(|e| e.content.starts_with("You attacked"))
            .collect();
        assert_eq!(reports.len(), 1, "{mafia} should get one report");
        assert_eq!(reports[0].content, "You attacked Eve.");
    }
    for other in ["Charlie", "David", "Eve", "Frank", "Grace"] {
        assert_does_not_know(&h, other, "You attacked");
    }
}

#[tokio::test]
async fn test_mafia_contexts_name_teammates() {
    let mut h = TestHarness::new(&SEVEN);
    night(
        &h,
        &[
            ("Alice", Decision::kill("Eve")),
            ("Bob", Decision::kill("Eve")),
            ("Charlie", Decision::protect("Charlie")),
            ("David", Decision::investigate("Grace")),
        ],
    );
    h.step().await;
    h.advance_to(Phase::DayConversation).await;

    let alice = h.oracle.contexts_for("Alice");
    assert!(alice
        .iter()
        .all(|c| c.teammates.iter().map(|t| t.name.as_str()).eq(["Bob"])));
    let david = h.oracle.contexts_for("David");
    assert!(!david.is_empty());
    assert!(david.iter().all(|c| c.teammates.is_empty()));
}

#[tokio::test]
async fn test_failed_and_illegal_night_actions_fall_back() {
    let mut h = TestHarness::new(&FIVE);
    h.oracle.fail("Alice", Phase::NightAction);
    night(
        &h,
        &[
            ("Bob", Decision::protect("Bob")),
            ("Charlie", Decision::investigate("Zed")),
        ],
    );

    h.step().await;
    h.advance_to(Phase::DayConversation).await;

    assert_knows(&h, "Alice", "You attacked");
    assert_does_not_know(&h, "Alice", "You attacked Alice");
    assert_knows(&h, "Charlie", "Your investigation shows");
    assert_does_not_know(&h, "Charlie", "Zed");
}

// =============================================================================
// DAY
// =============================================================================

#[tokio::test]
async fn test_later_speakers_hear_earlier_ones() {
    let mut h = TestHarness::new(&FIVE);
    h.script("Alice", Phase::DayConversation, [Decision::speak("I think Eve is hiding something.")]);

    h.step().await;
    h.step().await;

    let eve = h.oracle.contexts_for("Eve");
    let heard = eve[0]
        .memories
        .iter()
        .any(|m| m.content == "I think Eve is hiding something.");
    assert!(heard);

    let alice = h.oracle.contexts_for("Alice");
    assert!(!alice[0]
        .memories
        .iter()
        .any(|m| m.content == "I think Eve is hiding something."));
}

#[tokio::test]
async fn test_failed_speaker_stays_silent() {
    let mut h = TestHarness::new(&FIVE);
    h.oracle.fail("Bob", Phase::DayConversation);
    h.step().await;
    h.step().await;
    assert_eq!(h.public_entries("Bob stays silent.").len(), 1);
    assert_eq!(h.game.phase(), Phase::DayVote);
}

#[tokio::test]
async fn test_reasoning_stays_private() {
    let mut h = TestHarness::with_config(&FIVE, |c| c.with_reasoning_phase(true));
    h.script("David", Phase::DayReasoning, [Decision::reason("Alice seems off to me.")]);

    h.step().await;
    h.step().await;
    assert_eq!(h.game.phase(), Phase::DayReasoning);
    h.step().await;
    assert_eq!(h.game.phase(), Phase::DayVote);

    assert_knows(&h, "David", "Alice seems off to me.");
    for name in ["Alice", "Bob", "Charlie", "Eve"] {
        assert_does_not_know(&h, name, "Alice seems off to me.");
    }
    assert!(h.public_entries("Alice seems off").is_empty());
}

// =============================================================================
// TERMINATION
// =============================================================================

#[tokio::test]
async fn test_citizens_win_by_voting_out_mafia() {
    let mut h = TestHarness::new(&FIVE);
    h.votes(&[("Bob", "Alice"), ("Charlie", "Alice"), ("David", "Alice")]);

    let result = h.game.run().await.unwrap();
    assert_eq!(result.outcome.winner, Some(Team::Citizens));
    assert_eq!(result.days, 1);
    assert_winner(&h, Team::Citizens);

    let last = result.transcript.last().unwrap();
    assert_eq!(last.phase, Phase::GameOver);
    assert!(last.content.contains("The citizens win!"));
}

#[tokio::test]
async fn test_mafia_win_when_they_reach_parity() {
    let mut h = TestHarness::new(&[
        ("Alice", Role::Mafia),
        ("Bob", Role::Doctor),
        ("Charlie", Role::Police),
        ("David", Role::Citizen),
    ]);
    night(
        &h,
        &[
            ("Alice", Decision::kill("David")),
            ("Bob", Decision::protect("Bob")),
            ("Charlie", Decision::investigate("Bob")),
        ],
    );
    h.script("Alice", Phase::DayVote, [Decision::abstain(), Decision::vote("Charlie")]);
    h.script("Bob", Phase::DayVote, [Decision::abstain(), Decision::vote("Charlie")]);

    let result = h.game.run().await.unwrap();
    assert_eq!(result.outcome.winner, Some(Team::Mafia));
    assert_eq!(result.days, 2);
    assert_winner(&h, Team::Mafia);
    assert_dead(&h, "David");
    assert_dead(&h, "Charlie");
    assert_alive(&h, "Alice");
}

#[tokio::test]
async fn test_game_over_is_sticky() {
    let mut h = TestHarness::new(&FIVE);
    h.votes(&[("Bob", "Alice"), ("Charlie", "Alice")]);
    let outcome = h.advance_to(Phase::NightAction).await;
    assert_eq!(outcome.map(|o| o.winner), Some(Some(Team::Citizens)));
    let len = h.game.transcript().len();
    assert_eq!(h.step().await, outcome);
    assert_eq!(h.game.transcript().len(), len);
}

#[tokio::test]
async fn test_day_limit_stalls() {
    let mut h = TestHarness::with_config(&FIVE, |c| c.with_max_days(Some(1)));
    night(
        &h,
        &[
            ("Alice", Decision::kill("Eve")),
            ("Bob", Decision::protect("Eve")),
            ("Charlie", Decision::investigate("Alice")),
        ],
    );
    assert_eq!(h.game.run().await.unwrap_err(), GameError::Stalled { days: 1 });
}

#[tokio::test]
async fn test_failing_oracles_still_finish() {
    let config = GameConfig::for_players(8).unwrap().with_seed(99);
    let mut game = Game::new(config, Arc::new(FailingOracle)).unwrap();
    match game.run().await {
        Ok(result) => assert!(result.outcome.over),
        Err(GameError::Stalled { .. }) => {}
        Err(other) => panic!("unexpected error: {other}"),
    }
    game.roster().check_invariants(8).unwrap();
    assert_eq!(
        game.roster().alive_players().len() + game.roster().dead_players().len(),
        8
    );
}

#[tokio::test]
async fn test_sink_receives_every_public_event() {
    let (tx, mut rx) = mpsc::unbounded_channel::<MemoryEntry>();
    let config = GameConfig::for_players(6).unwrap().with_seed(5);
    let mut game = Game::new(config, Arc::new(RandomOracle::new(5)))
        .unwrap()
        .with_sink(tx);

    let result = game.run().await.unwrap();

    let mut received = Vec::new();
    while let Ok(entry) = rx.try_recv() {
        received.push(entry);
    }
    assert_eq!(received, result.transcript);
    assert!(received.iter().all(|e| e.audience.is_public()));
}
