//! Time source seam.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fast_types::Time;

/// Where the store reads "now" from.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> Time;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        Time::now()
    }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock stopped at `start`.
    pub fn new(start: Time) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(start.as_nanos())),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let by = by.as_nanos().min(u64::MAX as u128) as u64;
        let _ = self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_add(by))
            });
    }

    /// Jump to `time`.
    pub fn set(&self, time: Time) {
        self.nanos.store(time.as_nanos(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Time {
        Time::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(Time::from_secs(100));
        clock.advance(Duration::from_secs(3600));
        assert_eq!(clock.now(), Time::from_secs(3700));
    }

    #[test]
    fn clones_share_time() {
        let clock = ManualClock::new(Time::from_secs(0));
        let other = clock.clone();
        other.set(Time::from_secs(42));
        assert_eq!(clock.now(), Time::from_secs(42));
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now() > Time::from_secs(1_577_836_800));
    }
}
