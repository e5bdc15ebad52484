//! Round state machine bookkeeping: phase, pending and admitted groups

use std::collections::BTreeSet;

use serde::Serialize;

use super::scheduler::TaskId;
use super::scoreboard::ScoreBoard;

/// Phase of the single shared round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// No countdown, no world
    Idle,
    /// Countdown running; ready groups queue for the next round
    Staging,
    /// World populated and goals counted
    Active,
}

impl RoundPhase {
    pub fn as_u8(self) -> u8 {
        match self {
            RoundPhase::Idle => 0,
            RoundPhase::Staging => 1,
            RoundPhase::Active => 2,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => RoundPhase::Staging,
            2 => RoundPhase::Active,
            _ => RoundPhase::Idle,
        }
    }
}

/// What a newly ready group should trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First ready group: enter Staging and start the countdown
    StartStaging,
    /// Queued for the round the running countdown will start
    Queued,
    /// Round already Active: join it now
    JoinActive,
    /// Already pending or admitted
    Unchanged,
}

/// Where a withdrawn group was, and whether that set is now empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Withdrawal {
    Pending { now_empty: bool },
    Admitted { now_empty: bool },
    NotEntered,
}

#[derive(Debug)]
pub struct RoundLifecycle {
    phase: RoundPhase,
    pending: BTreeSet<String>,
    admitted: BTreeSet<String>,
    staging_task: Option<TaskId>,
    staging_due: u64,
    pub scoreboard: ScoreBoard,
}

impl RoundLifecycle {
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::Idle,
            pending: BTreeSet::new(),
            admitted: BTreeSet::new(),
            staging_task: None,
            staging_due: 0,
            scoreboard: ScoreBoard::new(),
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn pending(&self) -> &BTreeSet<String> {
        &self.pending
    }

    pub fn admitted(&self) -> &BTreeSet<String> {
        &self.admitted
    }

    pub fn is_admitted(&self, code: &str) -> bool {
        self.admitted.contains(code)
    }

    /// Tick at which the running countdown fires
    pub fn staging_due(&self) -> Option<u64> {
        self.staging_task.map(|_| self.staging_due)
    }

    /// Record a group whose seats are both ready
    pub fn on_group_ready(&mut self, code: &str) -> Admission {
        if self.pending.contains(code) || self.admitted.contains(code) {
            return Admission::Unchanged;
        }
        match self.phase {
            RoundPhase::Idle => {
                self.pending.insert(code.to_string());
                Admission::StartStaging
            }
            RoundPhase::Staging => {
                self.pending.insert(code.to_string());
                Admission::Queued
            }
            RoundPhase::Active => {
                self.admitted.insert(code.to_string());
                self.scoreboard.insert(code);
                Admission::JoinActive
            }
        }
    }

    /// Idle -> Staging with the countdown task that will begin the round
    pub fn begin_staging(&mut self, task: TaskId, due: u64) {
        self.phase = RoundPhase::Staging;
        self.staging_task = Some(task);
        self.staging_due = due;
    }

    /// Remove a group from the pending or admitted set
    pub fn withdraw(&mut self, code: &str) -> Withdrawal {
        if self.pending.remove(code) {
            return Withdrawal::Pending {
                now_empty: self.pending.is_empty(),
            };
        }
        if self.admitted.remove(code) {
            self.scoreboard.remove(code);
            return Withdrawal::Admitted {
                now_empty: self.admitted.is_empty(),
            };
        }
        Withdrawal::NotEntered
    }

    /// Staging -> Active. Pending groups become admitted with zero scores.
    /// Returns the admitted codes, empty if nobody was waiting.
    pub fn activate(&mut self) -> Vec<String> {
        self.staging_task = None;
        if self.pending.is_empty() {
            self.phase = RoundPhase::Idle;
            return Vec::new();
        }
        self.phase = RoundPhase::Active;
        self.admitted = std::mem::take(&mut self.pending);
        self.scoreboard.reset(self.admitted.iter());
        self.admitted.iter().cloned().collect()
    }

    /// Return to Idle, dropping every group and score. Returns the countdown
    /// task to cancel, if one was running.
    pub fn reset(&mut self) -> Option<TaskId> {
        self.phase = RoundPhase::Idle;
        self.pending.clear();
        self.admitted.clear();
        self.scoreboard.clear();
        self.staging_task.take()
    }
}

impl Default for RoundLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_ready_group_starts_staging() {
        let mut round = RoundLifecycle::new();
        assert_eq!(round.on_group_ready("ABCD"), Admission::StartStaging);
        round.begin_staging(7, 300);
        assert_eq!(round.phase(), RoundPhase::Staging);
        assert_eq!(round.staging_due(), Some(300));

        assert_eq!(round.on_group_ready("WXYZ"), Admission::Queued);
        assert_eq!(round.on_group_ready("WXYZ"), Admission::Unchanged);
        assert_eq!(round.pending().len(), 2);
    }

    #[test]
    fn activation_moves_pending_to_admitted() {
        let mut round = RoundLifecycle::new();
        round.on_group_ready("ABCD");
        round.begin_staging(1, 300);
        round.on_group_ready("WXYZ");

        assert_eq!(round.activate(), vec!["ABCD".to_string(), "WXYZ".to_string()]);
        assert_eq!(round.phase(), RoundPhase::Active);
        assert!(round.pending().is_empty());
        assert_eq!(round.scoreboard.score("ABCD"), Some(0));
        assert_eq!(round.staging_due(), None);
    }

    #[test]
    fn activation_without_pending_returns_to_idle() {
        let mut round = RoundLifecycle::new();
        round.on_group_ready("ABCD");
        round.begin_staging(1, 300);
        assert_eq!(round.withdraw("ABCD"), Withdrawal::Pending { now_empty: true });
        assert!(round.activate().is_empty());
        assert_eq!(round.phase(), RoundPhase::Idle);
    }

    #[test]
    fn active_round_admits_late_groups_immediately() {
        let mut round = RoundLifecycle::new();
        round.on_group_ready("ABCD");
        round.begin_staging(1, 300);
        round.activate();

        assert_eq!(round.on_group_ready("LATE"), Admission::JoinActive);
        assert!(round.is_admitted("LATE"));
        assert_eq!(round.scoreboard.score("LATE"), Some(0));

        assert_eq!(round.withdraw("LATE"), Withdrawal::Admitted { now_empty: false });
        assert_eq!(round.scoreboard.score("LATE"), None);
        assert_eq!(round.withdraw("LATE"), Withdrawal::NotEntered);
    }

    #[test]
    fn reset_returns_running_countdown() {
        let mut round = RoundLifecycle::new();
        round.on_group_ready("ABCD");
        round.begin_staging(9, 300);
        assert_eq!(round.reset(), Some(9));
        assert_eq!(round.phase(), RoundPhase::Idle);
        assert!(round.pending().is_empty());
        assert_eq!(round.reset(), None);
    }

    #[test]
    fn phase_round_trips_through_u8() {
        for phase in [RoundPhase::Idle, RoundPhase::Staging, RoundPhase::Active] {
            assert_eq!(RoundPhase::from_u8(phase.as_u8()), phase);
        }
    }
}
