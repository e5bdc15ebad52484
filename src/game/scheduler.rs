//! Deferred work keyed by the logical tick clock

use std::collections::BTreeMap;

use super::world::EntityId;

pub type TaskId = u64;

/// Work to run once its tick comes due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Staging countdown elapsed
    BeginRound,
    /// Lifetime of a bullet or impact overlay ran out
    Expire(EntityId),
}

/// Table of scheduled tasks ordered by due tick, then by insertion
#[derive(Debug, Default)]
pub struct Scheduler {
    entries: BTreeMap<(u64, TaskId), Task>,
    next_id: TaskId,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to fire `delay` ticks after `now`
    pub fn schedule(&mut self, now: u64, delay: u64, task: Task) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert((now + delay, id), task);
        id
    }

    /// Cancel a pending task. Returns false if it already fired or never existed.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let key = self.entries.keys().find(|(_, task_id)| *task_id == id).copied();
        key.is_some_and(|key| self.entries.remove(&key).is_some())
    }

    /// Remove and return every task due at or before `now`, in due order
    pub fn drain_due(&mut self, now: u64) -> Vec<Task> {
        let later = self.entries.split_off(&(now + 1, 0));
        let due = std::mem::replace(&mut self.entries, later);
        due.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
