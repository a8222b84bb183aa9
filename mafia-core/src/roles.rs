//! Roles, teams and the capability table.
//!
//! Role names are resolved to this closed set once, at setup. Everything
//! downstream dispatches on [`Role`] and [`NightAbility`], never on strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A player's secret role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Mafia,
    Doctor,
    Police,
    Citizen,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Mafia, Role::Doctor, Role::Police, Role::Citizen];

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Mafia => "Mafia",
            Role::Doctor => "Doctor",
            Role::Police => "Police",
            Role::Citizen => "Citizen",
        }
    }

    /// Which side this role plays for.
    pub fn team(&self) -> Team {
        match self {
            Role::Mafia => Team::Mafia,
            Role::Doctor | Role::Police | Role::Citizen => Team::Citizens,
        }
    }

    /// The capability table: the night ability granted by a role, if any.
    pub fn night_ability(&self) -> Option<NightAbility> {
        match self {
            Role::Mafia => Some(NightAbility::Kill),
            Role::Doctor => Some(NightAbility::Protect),
            Role::Police => Some(NightAbility::Investigate),
            Role::Citizen => None,
        }
    }

    /// Whether holders of this role share a private channel.
    pub fn shares_team_channel(&self) -> bool {
        matches!(self, Role::Mafia)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Mafia => "Each night, choose one other living player to attack. You know who the other mafia are.",
            Role::Doctor => "Each night, choose one living player (yourself included) to protect from the mafia's attack.",
            Role::Police => "Each night, choose one other living player and learn whether they are mafia.",
            Role::Citizen => "No night ability. Find the mafia through discussion and voting.",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A side in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Mafia,
    Citizens,
}

impl Team {
    pub fn name(&self) -> &'static str {
        match self {
            Team::Mafia => "Mafia",
            Team::Citizens => "Citizens",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A night ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NightAbility {
    Kill,
    Protect,
    Investigate,
}

impl NightAbility {
    /// Resolution precedence within a night: lower resolves first.
    pub fn precedence(&self) -> u8 {
        match self {
            NightAbility::Kill => 0,
            NightAbility::Protect => 1,
            NightAbility::Investigate => 2,
        }
    }

    /// Whether the actor may target themselves.
    pub fn allows_self_target(&self) -> bool {
        matches!(self, NightAbility::Protect)
    }

    pub fn verb(&self) -> &'static str {
        match self {
            NightAbility::Kill => "attack",
            NightAbility::Protect => "protect",
            NightAbility::Investigate => "investigate",
        }
    }
}
