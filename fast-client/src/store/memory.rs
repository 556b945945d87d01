//! In-memory store for tests and demos.
//!
//! Applies operations through [`FastLedger`] against a [`ManualClock`], so
//! elapsed time only moves when a test advances the clock.

use super::{FastingStore, StoreError};
use async_trait::async_trait;
use fast_core::{Clock, FastLedger, ManualClock};
use fast_types::{FastHistory, FastingContent, FastingSession, Time};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-process authoritative store for one user.
///
/// Clones share state, so a test can keep a handle while the controller
/// owns another.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
    clock: ManualClock,
}

#[derive(Debug)]
struct MemoryStoreInner {
    ledger: FastLedger,
    has_record: bool,
    history: Vec<FastHistory>,
    content: FastingContent,
    calls: Vec<&'static str>,
    fail_next: Option<String>,
    decline_next_mutation: bool,
}

impl MemoryStore {
    /// Create a store whose clock starts at `start`.
    pub fn new(start: Time) -> Self {
        Self::with_clock(ManualClock::new(start))
    }

    /// Create a store driven by an existing clock.
    pub fn with_clock(clock: ManualClock) -> Self {
        let inner = MemoryStoreInner {
            ledger: FastLedger::empty(clock.now()),
            has_record: false,
            history: Vec::new(),
            content: FastingContent::builtin(),
            calls: Vec::new(),
            fail_next: None,
            decline_next_mutation: false,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            clock,
        }
    }

    /// Replace the served content.
    pub fn with_content(self, content: FastingContent) -> Self {
        self.inner.lock().unwrap().content = content;
        self
    }

    /// The clock the store reads.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Move store time forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Names of every operation called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Number of calls to the named operation.
    pub fn call_count(&self, operation: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.calls.iter().filter(|c| **c == operation).count()
    }

    /// Cause the next call to fail as unreachable.
    pub fn fail_next_call(&self, error: &str) {
        self.inner.lock().unwrap().fail_next = Some(error.to_string());
    }

    /// Cause the next start, cancel or complete to answer `false`.
    pub fn decline_next_mutation(&self) {
        self.inner.lock().unwrap().decline_next_mutation = true;
    }

    /// Number of history entries.
    pub fn history_len(&self) -> usize {
        self.inner.lock().unwrap().history.len()
    }

    /// Run an operation against the locked state, honoring injected failures.
    fn call<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut MemoryStoreInner, Time) -> R,
    ) -> Result<R, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(operation);

        if let Some(error) = inner.fail_next.take() {
            return Err(StoreError::Unreachable(error));
        }

        Ok(f(&mut *inner, self.clock.now()))
    }

    fn mutate(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut MemoryStoreInner, Time) -> bool,
    ) -> Result<bool, StoreError> {
        self.call(operation, |inner, now| {
            if std::mem::take(&mut inner.decline_next_mutation) {
                return false;
            }
            f(inner, now)
        })
    }
}

#[async_trait]
impl FastingStore for MemoryStore {
    async fn start_new_fast(&self, goal_hours: u32) -> Result<bool, StoreError> {
        self.mutate("startNewFast", |inner, now| {
            let started = inner.ledger.start(goal_hours, now);
            inner.has_record |= started;
            started
        })
    }

    async fn complete_fast(&self, reflection_journal: &str) -> Result<bool, StoreError> {
        self.mutate("completeFast", |inner, now| {
            match inner.ledger.complete(reflection_journal, now) {
                Some(entry) => {
                    inner.history.push(entry);
                    true
                }
                None => false,
            }
        })
    }

    async fn cancel_current_fast(&self) -> Result<bool, StoreError> {
        self.mutate("cancelCurrentFast", |inner, now| inner.ledger.cancel(now))
    }

    async fn update_fasting_progress(&self) -> Result<bool, StoreError> {
        self.call("updateFastingProgress", |inner, now| {
            inner.ledger.recompute(now)
        })
    }

    async fn get_fasting_progress(&self) -> Result<FastingSession, StoreError> {
        self.call("getFastingProgress", |inner, _| {
            inner.ledger.session().clone()
        })
    }

    async fn get_all_fasting_sessions(&self) -> Result<Vec<FastingSession>, StoreError> {
        self.call("getAllFastingSessions", |inner, _| {
            if inner.has_record {
                vec![inner.ledger.session().clone()]
            } else {
                Vec::new()
            }
        })
    }

    async fn get_fasting_history(&self) -> Result<Vec<FastHistory>, StoreError> {
        self.call("getFastingHistory", |inner, _| inner.history.clone())
    }

    async fn get_fasting_content(&self) -> Result<FastingContent, StoreError> {
        self.call("getFastingContent", |inner, _| inner.content.clone())
    }
}
