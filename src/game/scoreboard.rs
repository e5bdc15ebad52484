//! Per-group scores for the running round

use std::collections::BTreeMap;

use crate::matchmaking::GroupRegistry;
use crate::ws::protocol::{ScoreEntry, ServerMsg};

#[derive(Debug, Default)]
pub struct ScoreBoard {
    scores: BTreeMap<String, u32>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new round with every listed group at zero
    pub fn reset<'a>(&mut self, codes: impl IntoIterator<Item = &'a String>) {
        self.scores = codes.into_iter().map(|c| (c.clone(), 0)).collect();
    }

    /// Add a group at zero (no-op if present)
    pub fn insert(&mut self, code: &str) {
        self.scores.entry(code.to_string()).or_insert(0);
    }

    pub fn remove(&mut self, code: &str) -> Option<u32> {
        self.scores.remove(code)
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }

    /// Add one goal. Returns the new score, or None for an unknown group.
    pub fn increment(&mut self, code: &str) -> Option<u32> {
        let score = self.scores.get_mut(code)?;
        *score += 1;
        Some(*score)
    }

    pub fn score(&self, code: &str) -> Option<u32> {
        self.scores.get(code).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Rows named after each group's seat pair
    pub fn entries(&self, registry: &GroupRegistry) -> Vec<ScoreEntry> {
        self.scores
            .iter()
            .filter_map(|(code, score)| {
                registry.get(code).map(|group| ScoreEntry {
                    name: group.pair_name(),
                    score: *score,
                })
            })
            .collect()
    }

    /// The update sent to one group's seats
    pub fn message_for(&self, registry: &GroupRegistry, code: &str) -> Option<ServerMsg> {
        let own_name = registry.get(code)?.pair_name();
        Some(ServerMsg::ScoreboardUpdate {
            entries: self.entries(registry),
            own_name,
        })
    }
}
