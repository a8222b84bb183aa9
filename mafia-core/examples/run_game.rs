//! Play one game and print the public transcript as it happens.
//!
//! Uses Claude when ANTHROPIC_API_KEY is set (from the environment or a
//! `.env` file), and random players otherwise.
//!
//! Run with: `cargo run -p mafia-core --example run_game`

use mafia_core::{ClaudeOracle, DecisionOracle, Game, GameConfig, MemoryEntry, RandomOracle};
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mafia_core=info")),
        )
        .init();

    let oracle: Arc<dyn DecisionOracle> = match ClaudeOracle::from_env() {
        Ok(oracle) => Arc::new(oracle),
        Err(e) => {
            tracing::warn!(error = %e, "Claude unavailable, falling back to random players");
            Arc::new(RandomOracle::new(rand::random()))
        }
    };

    let config = GameConfig::for_players(6)?.with_discussion_rounds(1);
    let (tx, mut rx) = mpsc::unbounded_channel::<MemoryEntry>();
    let mut game = Game::new(config, oracle)?.with_sink(tx);

    let printer = tokio::spawn(async move {
        while let Some(entry) = rx.recv().await {
            println!("[Day {} {}] {}: {}", entry.day, entry.phase, entry.speaker, entry.content);
        }
    });

    let result = game.run().await?;
    drop(game);
    printer.await?;

    match result.outcome.winner {
        Some(team) => println!("\n{team} win after {} days.", result.days),
        None => println!("\nNo winner."),
    }
    Ok(())
}
