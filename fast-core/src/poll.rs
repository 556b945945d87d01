//! Poll policy for progress refreshes.
//!
//! [`PollGate`] keeps periodic refreshes from overlapping. [`MutationEpoch`]
//! lets a caller discard a read that started before a mutation landed.

use std::time::Duration;

/// Default interval between progress polls while a fast is running.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// What to do with a poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// No refresh is running; start one.
    Refresh,
    /// A refresh is running; one follow-up has been queued behind it.
    Coalesced,
}

/// At most one periodic refresh in flight, at most one queued behind it.
///
/// ```text
/// on_tick() -> Refresh     (idle -> in flight)
/// on_tick() -> Coalesced   (pending follow-up recorded)
/// on_tick() -> Coalesced   (still one follow-up)
/// finish()  -> true        (run the follow-up, still in flight)
/// finish()  -> false       (idle)
/// ```
#[derive(Debug, Default, Clone)]
pub struct PollGate {
    in_flight: bool,
    pending: bool,
}

impl PollGate {
    /// Create an idle gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tick.
    pub fn on_tick(&mut self) -> TickDecision {
        if self.in_flight {
            self.pending = true;
            TickDecision::Coalesced
        } else {
            self.in_flight = true;
            TickDecision::Refresh
        }
    }

    /// Mark the running refresh done.
    ///
    /// Returns `true` if a follow-up refresh should run now; the gate stays
    /// in flight for it.
    pub fn finish(&mut self) -> bool {
        if self.pending {
            self.pending = false;
            true
        } else {
            self.in_flight = false;
            false
        }
    }

    /// Drop any queued follow-up. A running refresh stays in flight until
    /// it calls [`finish`](Self::finish).
    pub fn cancel_pending(&mut self) {
        self.pending = false;
    }

    /// Check if a refresh is running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}

/// Proof of when a read began, checked against [`MutationEpoch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadToken(u64);

/// Counter bumped by every applied mutation.
///
/// A read that began under an older epoch may have observed the store before
/// the mutation and must not overwrite the newer snapshot.
#[derive(Debug, Default, Clone)]
pub struct MutationEpoch(u64);

impl MutationEpoch {
    /// Start at epoch 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the epoch a read starts under.
    pub fn begin_read(&self) -> ReadToken {
        ReadToken(self.0)
    }

    /// A mutation was applied.
    pub fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// Check whether no mutation landed since `token` was taken.
    pub fn is_current(&self, token: ReadToken) -> bool {
        self.0 == token.0
    }
}
