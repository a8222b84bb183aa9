//! Game phases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A step of the day/night cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Setup announcements before the first day.
    Setup,
    DayConversation,
    /// Optional private reasoning. No rule effect.
    DayReasoning,
    DayVote,
    NightAction,
    GameOver,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::DayConversation => "day conversation",
            Phase::DayReasoning => "day reasoning",
            Phase::DayVote => "day vote",
            Phase::NightAction => "night",
            Phase::GameOver => "game over",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
