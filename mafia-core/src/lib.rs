//! Mafia game engine played by autonomous agents.
//!
//! This crate provides:
//! - The day/night phase machine with terminal checks after every elimination
//! - Per-player memory with public, team and private visibility
//! - Night resolution (kill, protect, investigate) and plurality voting
//! - A pluggable decision oracle, with a Claude-backed implementation
//!
//! # Quick Start
//!
//! ```ignore
//! use mafia_core::{ClaudeOracle, Game, GameConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GameConfig::for_players(6)?;
//!     let oracle = Arc::new(ClaudeOracle::from_env()?);
//!
//!     let mut game = Game::new(config, oracle)?;
//!     let result = game.run().await?;
//!     println!("{:?} after {} days", result.outcome.winner, result.days);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod day;
pub mod error;
pub mod game;
pub mod llm;
pub mod memory;
pub mod night;
pub mod oracle;
pub mod phase;
pub mod roles;
pub mod roster;
pub mod rules;
pub mod testing;

// Primary public API
pub use config::{GameConfig, OracleConfig, RoleCounts};
pub use error::GameError;
pub use game::{AnnouncementSink, Game, RunResult};
pub use llm::ClaudeOracle;
pub use memory::{Audience, KnowledgeStore, MemoryEntry, Speaker};
pub use oracle::{ActionKind, Decision, DecisionContext, DecisionOracle, OracleError};
pub use phase::Phase;
pub use roles::{NightAbility, Role, Team};
pub use roster::{Outcome, Player, PlayerId, PlayerSummary, Roster};
pub use rules::{Ballot, InvalidAction, NightAction};
pub use testing::{RandomOracle, ScriptedOracle, TestHarness};
