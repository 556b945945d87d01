//! Fasting session records.
//!
//! The store owns these records. Clients hold read-through copies.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{FastError, Time};

/// Smallest goal a fast can be started with.
pub const MIN_GOAL_HOURS: u32 = 1;

/// Largest goal a fast can be started with.
pub const MAX_GOAL_HOURS: u32 = 72;

/// Lifecycle status of a user's fasting session.
///
/// Only `InProgress` carries an elapsed count, so a "completed with elapsed
/// hours" record cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FastStatus {
    /// No active or completed session.
    NotStarted,
    /// A session is active.
    InProgress {
        /// Whole hours since the session started, as last computed by the store.
        elapsed_hours: u64,
    },
    /// The most recent session ran to completion.
    Completed,
}

impl fmt::Display for FastStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::InProgress { elapsed_hours } => write!(f, "in progress ({elapsed_hours}h)"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A validated fasting goal in whole hours, within
/// [`MIN_GOAL_HOURS`]..=[`MAX_GOAL_HOURS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct GoalHours(u32);

impl GoalHours {
    /// Validate a goal. Returns `None` outside the allowed range.
    pub fn new(hours: u32) -> Option<Self> {
        (MIN_GOAL_HOURS..=MAX_GOAL_HOURS)
            .contains(&hours)
            .then_some(Self(hours))
    }

    /// The goal in hours.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for GoalHours {
    type Error = FastError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            FastError::InvalidData(format!(
                "goal hours must be between {MIN_GOAL_HOURS} and {MAX_GOAL_HOURS}, got {value}"
            ))
        })
    }
}

impl From<GoalHours> for u32 {
    fn from(goal: GoalHours) -> Self {
        goal.0
    }
}

impl fmt::Display for GoalHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.0)
    }
}

/// The single fasting session record a user has at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastingSession {
    /// Lifecycle status.
    pub status: FastStatus,
    /// Target duration set at start (0 before the first start).
    pub goal_hours: u32,
    /// When the session started. Present once a session has started.
    pub start_time: Option<Time>,
    /// Last time the store touched this record.
    pub timestamp: Time,
    /// Reflection text attached at completion.
    pub reflection_journal: String,
}

impl FastingSession {
    /// The record a user has before their first fast.
    pub fn not_started(timestamp: Time) -> Self {
        Self {
            status: FastStatus::NotStarted,
            goal_hours: 0,
            start_time: None,
            timestamp,
            reflection_journal: String::new(),
        }
    }

    /// Check if a fast is active.
    pub fn is_in_progress(&self) -> bool {
        matches!(self.status, FastStatus::InProgress { .. })
    }

    /// Check if the most recent fast was completed.
    pub fn is_completed(&self) -> bool {
        matches!(self.status, FastStatus::Completed)
    }

    /// Elapsed hours of the active fast, if any.
    pub fn elapsed_hours(&self) -> Option<u64> {
        match self.status {
            FastStatus::InProgress { elapsed_hours } => Some(elapsed_hours),
            _ => None,
        }
    }

    /// Check the lifecycle invariants of this record.
    ///
    /// An in-progress session must have a start time and a positive goal.
    pub fn validate(&self) -> Result<(), FastError> {
        if self.is_in_progress() {
            if self.start_time.is_none() {
                return Err(FastError::InvalidSession(
                    "in-progress session has no start time".into(),
                ));
            }
            if self.goal_hours == 0 {
                return Err(FastError::InvalidSession(
                    "in-progress session has a zero goal".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Immutable record of a completed fast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastHistory {
    /// When the fast started.
    pub start_time: Time,
    /// When the fast was completed.
    pub end_time: Time,
    /// The goal the fast was started with.
    pub goal_hours: u32,
    /// When the store recorded this entry.
    pub timestamp: Time,
    /// Reflection written at completion.
    pub reflection_journal: String,
}

impl FastHistory {
    /// Whole hours between start and completion.
    pub fn duration_hours(&self) -> u64 {
        self.end_time.saturating_since(self.start_time).as_secs() / 3600
    }
}
