//! Fasting session state machine.
//!
//! This module provides a pure, side-effect-free state machine for the
//! lifecycle of one user's fast. The state machine takes events as input and
//! produces a new state plus a list of actions to execute.
//!
//! The store is authoritative. Intents never move the state on their own:
//! they produce store actions, and the state only changes when a snapshot
//! from the store arrives ([`Event::SnapshotReceived`]).

use fast_types::{
    FastError, FastStatus, FastingSession, GoalHours, Time, MAX_GOAL_HOURS, MIN_GOAL_HOURS,
};
use thiserror::Error;

/// Session state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FastState {
    /// No fast has been started, or the last one was cancelled.
    #[default]
    NotStarted,
    /// A fast is running.
    InProgress {
        /// Goal the fast was started with.
        goal_hours: GoalHours,
        /// When the store recorded the start.
        start_time: Time,
        /// Whole hours elapsed, as last reported by the store.
        elapsed_hours: u64,
    },
    /// The most recent fast was completed.
    Completed,
}

impl FastState {
    /// Create a new state machine in the NotStarted state.
    pub fn new() -> Self {
        Self::NotStarted
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (fast-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // Starting is allowed from every state; a running fast is replaced
            (state, Event::StartRequested { goal_hours }) => match GoalHours::new(goal_hours) {
                Some(goal_hours) => (state, vec![Action::StartNewFast { goal_hours }]),
                None => (
                    state,
                    vec![Action::Reject(Rejection::GoalOutOfRange {
                        requested: goal_hours,
                    })],
                ),
            },

            (state @ Self::InProgress { .. }, Event::CancelRequested) => {
                (state, vec![Action::CancelCurrentFast])
            }
            (state @ Self::InProgress { .. }, Event::CompleteRequested { reflection }) => {
                (state, vec![Action::CompleteFast { reflection }])
            }
            (state, Event::CancelRequested | Event::CompleteRequested { .. }) => {
                (state, vec![Action::Reject(Rejection::NotInProgress)])
            }

            (state, Event::MutationApplied) => (state, vec![Action::RefreshProgress]),
            (state, Event::MutationDeclined) => (
                state,
                vec![
                    Action::Reject(Rejection::StoreDeclined),
                    Action::RefreshProgress,
                ],
            ),

            (state, Event::RefreshRequested) => (state, vec![Action::RefreshProgress]),

            (state @ Self::InProgress { .. }, Event::PollTick) => {
                (state, vec![Action::RefreshProgress])
            }
            (state, Event::PollTick) => (state, vec![Action::StopPolling]),

            (old, Event::SnapshotReceived { state: new }) => {
                let mut actions = Vec::new();
                match (old.is_in_progress(), new.is_in_progress()) {
                    (false, true) => actions.push(Action::StartPolling),
                    (true, false) => actions.push(Action::StopPolling),
                    _ => {}
                }
                (new, actions)
            }
        }
    }

    /// Check if a fast is running.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress { .. })
    }

    /// Elapsed hours of the running fast.
    pub fn elapsed_hours(&self) -> Option<u64> {
        match self {
            Self::InProgress { elapsed_hours, .. } => Some(*elapsed_hours),
            _ => None,
        }
    }

    /// Goal of the running fast.
    pub fn goal_hours(&self) -> Option<GoalHours> {
        match self {
            Self::InProgress { goal_hours, .. } => Some(*goal_hours),
            _ => None,
        }
    }
}

impl TryFrom<&FastingSession> for FastState {
    type Error = FastError;

    /// Interpret a store snapshot, rejecting records that break the session
    /// invariants.
    fn try_from(session: &FastingSession) -> Result<Self, Self::Error> {
        session.validate()?;
        match session.status {
            FastStatus::NotStarted => Ok(Self::NotStarted),
            FastStatus::Completed => Ok(Self::Completed),
            FastStatus::InProgress { elapsed_hours } => {
                let goal_hours = GoalHours::try_from(session.goal_hours)?;
                let start_time = session.start_time.ok_or_else(|| {
                    FastError::InvalidSession("in-progress session has no start time".into())
                })?;
                Ok(Self::InProgress {
                    goal_hours,
                    start_time,
                    elapsed_hours,
                })
            }
        }
    }
}

/// Events that drive the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// User asked to start a fast.
    StartRequested {
        /// Requested goal, not yet validated.
        goal_hours: u32,
    },
    /// User asked to abandon the running fast.
    CancelRequested,
    /// User asked to finish the running fast.
    CompleteRequested {
        /// Reflection to record with the fast.
        reflection: String,
    },
    /// The store accepted a start, cancel or complete.
    MutationApplied,
    /// The store answered `false` to a start, cancel or complete.
    MutationDeclined,
    /// User or view asked for fresh progress.
    RefreshRequested,
    /// The poll interval elapsed.
    PollTick,
    /// A validated snapshot arrived from the store.
    SnapshotReceived {
        /// State interpreted from the snapshot.
        state: FastState,
    },
}

/// Actions to be executed by fast-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Call `start_new_fast` on the store.
    StartNewFast {
        /// Validated goal.
        goal_hours: GoalHours,
    },
    /// Call `cancel_current_fast` on the store.
    CancelCurrentFast,
    /// Call `complete_fast` on the store.
    CompleteFast {
        /// Reflection to record.
        reflection: String,
    },
    /// Recompute and re-read progress from the store.
    RefreshProgress,
    /// Begin the periodic poll.
    StartPolling,
    /// End the periodic poll.
    StopPolling,
    /// Report a business-rule failure to the caller.
    Reject(Rejection),
}

/// Why an intent was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Goal outside the allowed range. Nothing was sent to the store.
    #[error("goal must be between {MIN_GOAL_HOURS} and {MAX_GOAL_HOURS} hours, got {requested}")]
    GoalOutOfRange {
        /// The goal that was asked for.
        requested: u32,
    },
    /// The operation needs a running fast.
    #[error("no fast is in progress")]
    NotInProgress,
    /// The store refused the operation.
    #[error("the store declined the request")]
    StoreDeclined,
}
