//! Per-player knowledge with visibility enforcement.
//!
//! Every player owns a separate append-only log. An entry is copied into a
//! log only if its audience includes that player, so reading one player's
//! memories can never surface another player's private information.

use crate::phase::Phase;
use crate::roles::Role;
use crate::roster::{PlayerId, Roster};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Who said something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    /// The game itself (announcements, night reports).
    Narrator,
    Player { id: PlayerId, name: String },
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Narrator => write!(f, "Narrator"),
            Speaker::Player { name, .. } => write!(f, "{name}"),
        }
    }
}

/// Who gets to see an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    /// Every living player.
    Public,
    /// Living holders of a role at record time.
    Role(Role),
    /// Exactly one player.
    Player(PlayerId),
}

impl Audience {
    pub fn is_public(&self) -> bool {
        matches!(self, Audience::Public)
    }
}

/// One immutable remembered event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub day: u32,
    pub phase: Phase,
    pub speaker: Speaker,
    pub content: String,
    pub audience: Audience,
}

impl MemoryEntry {
    /// A narrator announcement everyone alive hears.
    pub fn announcement(day: u32, phase: Phase, content: impl Into<String>) -> Self {
        Self {
            day,
            phase,
            speaker: Speaker::Narrator,
            content: content.into(),
            audience: Audience::Public,
        }
    }

    /// A narrator message for one player only.
    pub fn private(day: u32, phase: Phase, to: PlayerId, content: impl Into<String>) -> Self {
        Self {
            day,
            phase,
            speaker: Speaker::Narrator,
            content: content.into(),
            audience: Audience::Player(to),
        }
    }

    pub fn with_speaker(mut self, speaker: Speaker) -> Self {
        self.speaker = speaker;
        self
    }

    pub fn with_audience(mut self, audience: Audience) -> Self {
        self.audience = audience;
        self
    }
}

/// The asymmetric memory of every player at the table.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    logs: HashMap<PlayerId, VecDeque<MemoryEntry>>,
    capacity: Option<usize>,
}

impl KnowledgeStore {
    /// An empty log for every seat in the roster.
    pub fn new(roster: &Roster) -> Self {
        Self {
            logs: roster
                .players()
                .iter()
                .map(|p| (p.id, VecDeque::new()))
                .collect(),
            capacity: None,
        }
    }

    /// Cap each player's log; the oldest entries are evicted first.
    pub fn with_capacity(mut self, capacity: Option<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Append `entry` to every log whose owner is in its audience.
    ///
    /// Returns how many logs received the entry.
    pub fn record(&mut self, entry: &MemoryEntry, roster: &Roster) -> usize {
        let recipients: Vec<PlayerId> = match entry.audience {
            Audience::Public => roster.alive_players().iter().map(|p| p.id).collect(),
            Audience::Role(role) => roster.members_of(role).iter().map(|p| p.id).collect(),
            Audience::Player(id) => vec![id],
        };

        let mut delivered = 0;
        for id in recipients {
            if let Some(log) = self.logs.get_mut(&id) {
                log.push_back(entry.clone());
                if let Some(cap) = self.capacity {
                    while log.len() > cap {
                        log.pop_front();
                    }
                }
                delivered += 1;
            }
        }
        delivered
    }

    /// A player's own entries from the last `window_days` days, oldest first.
    pub fn recent(&self, player: PlayerId, current_day: u32, window_days: u32) -> Vec<MemoryEntry> {
        let since = current_day.saturating_sub(window_days);
        self.logs
            .get(&player)
            .map(|log| log.iter().filter(|e| e.day >= since).cloned().collect())
            .unwrap_or_default()
    }

    /// Every entry a player still holds, oldest first.
    pub fn all(&self, player: PlayerId) -> Vec<MemoryEntry> {
        self.logs
            .get(&player)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, player: PlayerId) -> usize {
        self.logs.get(&player).map_or(0, VecDeque::len)
    }

    /// Whether a player holds an entry containing `needle`.
    pub fn knows(&self, player: PlayerId, needle: &str) -> bool {
        self.logs
            .get(&player)
            .is_some_and(|log| log.iter().any(|e| e.content.contains(needle)))
    }

    /// Drop every entry from every log. Only for reset boundaries.
    pub fn clear(&mut self) {
        for log in self.logs.values_mut() {
            log.clear();
        }
    }
}

/// Render memories as prompt text. A read-only projection, never stored.
pub fn render_memories(entries: &[MemoryEntry]) -> String {
    let mut text = String::new();
    for entry in entries {
        let scope = match entry.audience {
            Audience::Public => "",
            Audience::Role(_) => " | team only",
            Audience::Player(_) => " | private",
        };
        text.push_str(&format!(
            "[Day {} {}{}] {}: {}\n",
            entry.day, entry.phase, scope, entry.speaker, entry.content
        ));
    }
    text
}
