//! Authoritative session ledger.
//!
//! Applies store operations to one user's session record. Both the in-memory
//! store and the store service go through this type, so a start, cancel or
//! complete means the same thing everywhere.

use fast_types::{FastHistory, FastStatus, FastingSession, GoalHours, Time, NANOS_PER_HOUR};

/// Whole hours from `start` to `now`, zero if `now` is earlier.
pub fn elapsed_hours_between(start: Time, now: Time) -> u64 {
    now.as_nanos().saturating_sub(start.as_nanos()) / NANOS_PER_HOUR
}

/// One user's authoritative session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastLedger {
    session: FastingSession,
}

impl FastLedger {
    /// Wrap an existing session record.
    pub fn new(session: FastingSession) -> Self {
        Self { session }
    }

    /// Ledger for a user who never fasted.
    pub fn empty(now: Time) -> Self {
        Self::new(FastingSession::not_started(now))
    }

    /// Start a fast, replacing whatever session exists.
    ///
    /// Returns `false` (and changes nothing) if the goal is out of range.
    pub fn start(&mut self, goal_hours: u32, now: Time) -> bool {
        let Some(goal) = GoalHours::new(goal_hours) else {
            return false;
        };
        self.session = FastingSession {
            status: FastStatus::InProgress { elapsed_hours: 0 },
            goal_hours: goal.get(),
            start_time: Some(now),
            timestamp: now,
            reflection_journal: String::new(),
        };
        true
    }

    /// Discard the running fast. No history is written.
    ///
    /// Returns `false` if no fast is running.
    pub fn cancel(&mut self, now: Time) -> bool {
        if !self.session.is_in_progress() {
            return false;
        }
        self.session = FastingSession::not_started(now);
        true
    }

    /// Finish the running fast.
    ///
    /// Returns the history entry to append, or `None` if no fast is running.
    /// The session keeps its goal and start time so views can show what was
    /// completed.
    pub fn complete(&mut self, reflection: &str, now: Time) -> Option<FastHistory> {
        if !self.session.is_in_progress() {
            return None;
        }
        let start_time = self.session.start_time?;

        self.session.status = FastStatus::Completed;
        self.session.timestamp = now;
        self.session.reflection_journal = reflection.to_string();

        Some(FastHistory {
            start_time,
            end_time: now,
            goal_hours: self.session.goal_hours,
            timestamp: now,
            reflection_journal: reflection.to_string(),
        })
    }

    /// Recompute elapsed hours of the running fast.
    ///
    /// Returns `false` if no fast is running.
    pub fn recompute(&mut self, now: Time) -> bool {
        let Some(start_time) = self.session.start_time else {
            return false;
        };
        if !self.session.is_in_progress() {
            return false;
        }
        self.session.status = FastStatus::InProgress {
            elapsed_hours: elapsed_hours_between(start_time, now),
        };
        self.session.timestamp = now;
        true
    }

    /// The current record.
    pub fn session(&self) -> &FastingSession {
        &self.session
    }

    /// Take the record out of the ledger.
    pub fn into_session(self) -> FastingSession {
        self.session
    }
}
