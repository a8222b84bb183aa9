//! Fatal engine errors.
//!
//! Recoverable failures live next to the code that recovers from them:
//! [`crate::oracle::OracleError`] for decision failures and
//! [`crate::rules::InvalidAction`] for illegal targets.

use thiserror::Error;

/// Errors that stop a game.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    /// Invalid setup. The game does not start.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal consistency was broken. Indicates an engine defect.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The day limit was reached without a winner.
    #[error("No winner after {days} days")]
    Stalled { days: u32 },
}

impl GameError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        GameError::Configuration(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        GameError::InvariantViolation(msg.into())
    }
}
