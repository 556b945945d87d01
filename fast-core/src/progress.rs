//! Display math for a running fast.
//!
//! Everything here is derived from the store-reported elapsed hours. Nothing
//! accumulates time locally.

use serde::Serialize;
use std::fmt;

use crate::FastState;

/// Elapsed time split for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ElapsedDisplay {
    /// Whole hours.
    pub hours: u64,
    /// Minutes past the hour.
    pub minutes: u64,
}

impl ElapsedDisplay {
    /// Split store-reported elapsed hours into hours and minutes.
    ///
    /// The store reports whole hours, so `minutes` is 0 until the store
    /// starts reporting finer granularity.
    pub fn from_hours(elapsed_hours: u64) -> Self {
        let total_minutes = elapsed_hours.saturating_mul(60);
        Self {
            hours: total_minutes / 60,
            minutes: total_minutes % 60,
        }
    }
}

impl fmt::Display for ElapsedDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.hours, self.minutes)
    }
}

/// Percentage of the goal reached, clamped to `0.0..=100.0`.
///
/// A zero goal yields 0.
pub fn progress_percent(elapsed_hours: u64, goal_hours: u32) -> f64 {
    if goal_hours == 0 {
        return 0.0;
    }
    (elapsed_hours as f64 / goal_hours as f64 * 100.0).min(100.0)
}

/// Which hourly encouragement to show: `min(elapsed, len - 1)`.
///
/// `None` when there are no encouragements.
pub fn encouragement_index(elapsed_hours: u64, len: usize) -> Option<usize> {
    let last = len.checked_sub(1)?;
    Some(usize::try_from(elapsed_hours).map_or(last, |h| h.min(last)))
}

/// Derived display fields for a running fast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FastProgress {
    /// Elapsed time.
    pub elapsed: ElapsedDisplay,
    /// Goal in hours.
    pub goal_hours: u32,
    /// Percentage of the goal reached.
    pub percent: f64,
    /// Index into the hourly encouragements.
    pub encouragement_index: Option<usize>,
    /// Whether the goal has been reached.
    pub goal_reached: bool,
}

impl FastProgress {
    /// Progress for `state`, or `None` when no fast is running.
    pub fn from_state(state: &FastState, encouragement_count: usize) -> Option<Self> {
        match state {
            FastState::InProgress {
                goal_hours,
                elapsed_hours,
                ..
            } => {
                let goal = goal_hours.get();
                Some(Self {
                    elapsed: ElapsedDisplay::from_hours(*elapsed_hours),
                    goal_hours: goal,
                    percent: progress_percent(*elapsed_hours, goal),
                    encouragement_index: encouragement_index(*elapsed_hours, encouragement_count),
                    goal_reached: *elapsed_hours >= u64::from(goal),
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fast_types::{GoalHours, Time};

    #[test]
    fn elapsed_display_whole_hours() {
        assert_eq!(
            ElapsedDisplay::from_hours(8),
            ElapsedDisplay { hours: 8, minutes: 0 }
        );
        assert_eq!(ElapsedDisplay::from_hours(0).to_string(), "0h 0m");
    }

    #[test]
    fn percent_is_monotone_and_clamped() {
        let mut last = 0.0;
        for elapsed in 0..=10 {
            let p = progress_percent(elapsed, 6);
            assert!(p >= last);
            assert!(p <= 100.0);
            last = p;
        }
        assert_eq!(progress_percent(7, 6), 100.0);
        assert_eq!(progress_percent(3, 6), 50.0);
    }

    #[test]
    fn percent_with_zero_goal() {
        assert_eq!(progress_percent(5, 0), 0.0);
    }

    #[test]
    fn encouragement_index_clamps_to_last() {
        assert_eq!(encouragement_index(9, 6), Some(5));
        assert_eq!(encouragement_index(0, 6), Some(0));
        assert_eq!(encouragement_index(3, 6), Some(3));
        assert_eq!(encouragement_index(u64::MAX, 6), Some(5));
    }

    #[test]
    fn encouragement_index_empty_list() {
        assert_eq!(encouragement_index(2, 0), None);
    }

    #[test]
    fn progress_from_running_state() {
        let state = FastState::InProgress {
            goal_hours: GoalHours::new(8).unwrap(),
            start_time: Time::from_secs(0),
            elapsed_hours: 8,
        };
        let progress = FastProgress::from_state(&state, 6).unwrap();

        assert_eq!(progress.elapsed.hours, 8);
        assert_eq!(progress.percent, 100.0);
        assert_eq!(progress.encouragement_index, Some(5));
        assert!(progress.goal_reached);
    }

    #[test]
    fn no_progress_outside_running_fast() {
        assert!(FastProgress::from_state(&FastState::Completed, 6).is_none());
        assert!(FastProgress::from_state(&FastState::NotStarted, 6).is_none());
    }
}
