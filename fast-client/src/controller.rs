//! FastingController - the interface views use for a user's fast.
//!
//! # Architecture
//!
//! The controller uses the pure state machine from fast-core for lifecycle
//! rules and interprets its actions to perform store calls and run the poll
//! timer.
//!
//! ```text
//! View → FastingController → FastingStore → store service
//!              ↓
//!        fast-core (pure state machine)
//! ```
//!
//! The store is authoritative. Elapsed time is never computed locally: every
//! displayed value comes from the last snapshot the store returned.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;

use fast_core::{
    Action, Event, FastProgress, FastState, MutationEpoch, PollGate, Rejection, TickDecision,
    POLL_INTERVAL,
};
use fast_types::{FastError, FastHistory, FastingContent, FastingSession};
use thiserror::Error;
use tokio::sync::{watch, Mutex, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::store::{FastingStore, StoreError};

/// Controller errors.
///
/// Business-rule failures are not errors; they come back as
/// [`FastOutcome::Rejected`].
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The store call failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The store returned a session that breaks the lifecycle invariants.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(#[from] FastError),
}

/// Configuration for FastingController.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// How often to refresh progress while a fast is running.
    pub poll_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
        }
    }
}

impl ControllerConfig {
    /// Set the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Result of a lifecycle intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastOutcome {
    /// The store applied the operation.
    Applied,
    /// The operation was refused.
    Rejected(Rejection),
}

impl FastOutcome {
    /// Check if the operation was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// What views read: the last store snapshot and its interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The record as returned by the store.
    pub session: FastingSession,
    /// The record interpreted as a lifecycle state.
    pub state: FastState,
    /// Set when a later store call failed; the record may be out of date.
    pub stale: bool,
}

/// The fasting session controller for one user.
///
/// Cheap to share behind an `Arc`; dropping the last handle stops polling.
pub struct FastingController<S: FastingStore + 'static> {
    inner: Arc<Inner<S>>,
}

struct Inner<S: FastingStore + 'static> {
    store: S,
    config: ControllerConfig,
    state: Mutex<ControllerState>,
    content: OnceCell<FastingContent>,
    snapshots: watch::Sender<Option<SessionSnapshot>>,
    poller: StdMutex<Option<JoinHandle<()>>>,
}

#[derive(Default)]
struct ControllerState {
    machine: FastState,
    snapshot: Option<SessionSnapshot>,
    epoch: MutationEpoch,
    gate: PollGate,
}

impl<S: FastingStore + 'static> FastingController<S> {
    /// Create a new controller.
    ///
    /// Nothing is read from the store until [`refresh_progress`] is called.
    ///
    /// [`refresh_progress`]: Self::refresh_progress
    pub fn new(store: S, config: ControllerConfig) -> Self {
        let (snapshots, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                state: Mutex::new(ControllerState::default()),
                content: OnceCell::new(),
                snapshots,
                poller: StdMutex::new(None),
            }),
        }
    }

    /// Start a fast of `goal_hours`.
    ///
    /// Goals outside 1..=72 are rejected without contacting the store.
    pub async fn start_fast(&self, goal_hours: u32) -> Result<FastOutcome, ControllerError> {
        self.inner
            .dispatch(Event::StartRequested { goal_hours })
            .await
    }

    /// Complete the running fast with a reflection.
    ///
    /// A controller that has not read the store yet refreshes first, so a
    /// fast started elsewhere can be completed.
    pub async fn complete_fast(&self, reflection: &str) -> Result<FastOutcome, ControllerError> {
        self.inner.ensure_snapshot().await?;
        self.inner
            .dispatch(Event::CompleteRequested {
                reflection: reflection.to_string(),
            })
            .await
    }

    /// Abandon the running fast. No history is written.
    ///
    /// Refreshes first when no snapshot has been read yet.
    pub async fn cancel_fast(&self) -> Result<FastOutcome, ControllerError> {
        self.inner.ensure_snapshot().await?;
        self.inner.dispatch(Event::CancelRequested).await
    }

    /// Ask the store to recompute progress and replace the cached snapshot.
    pub async fn refresh_progress(&self) -> Result<SessionSnapshot, ControllerError> {
        self.inner.refresh().await
    }

    /// The cached snapshot, if one has been read.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        self.inner.state.lock().await.snapshot.clone()
    }

    /// The current lifecycle state.
    pub async fn state(&self) -> FastState {
        self.inner.state.lock().await.machine.clone()
    }

    /// Display fields for the running fast, or `None` when none is running.
    pub async fn progress(&self) -> Result<Option<FastProgress>, ControllerError> {
        let count = self.content().await?.hourly_encouragement.len();
        let state = self.state().await;
        Ok(FastProgress::from_state(&state, count))
    }

    /// The static content, fetched once per controller.
    pub async fn content(&self) -> Result<&FastingContent, ControllerError> {
        let content = self
            .inner
            .content
            .get_or_try_init(|| self.inner.store.get_fasting_content())
            .await?;
        Ok(content)
    }

    /// The user's completed fasts, oldest first.
    pub async fn history(&self) -> Result<Vec<FastHistory>, ControllerError> {
        Ok(self.inner.store.get_fasting_history().await?)
    }

    /// Every session record of the user.
    pub async fn all_sessions(&self) -> Result<Vec<FastingSession>, ControllerError> {
        Ok(self.inner.store.get_all_fasting_sessions().await?)
    }

    /// Receive every snapshot replacement.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionSnapshot>> {
        self.inner.snapshots.subscribe()
    }

    /// Check if the poll timer is running.
    pub fn is_polling(&self) -> bool {
        self.inner.is_polling()
    }

    /// Stop polling. Lifecycle calls still work; a later transition into
    /// a running fast starts polling again.
    pub fn shutdown(&self) {
        self.inner.stop_poller();
    }

    /// Get the store (for testing).
    pub fn store(&self) -> &S {
        &self.inner.store
    }
}

impl<S: FastingStore + 'static> Inner<S> {
    /// Feed one event to the state machine and run the resulting actions
    /// (and the actions they lead to) to completion.
    async fn dispatch(self: &Arc<Self>, event: Event) -> Result<FastOutcome, ControllerError> {
        let mut outcome = FastOutcome::Applied;
        let mut queue: VecDeque<Action> = self.step(event).await.into();

        while let Some(action) = queue.pop_front() {
            match action {
                Action::StartNewFast { goal_hours } => {
                    let accepted = self
                        .store_call(self.store.start_new_fast(goal_hours.get()))
                        .await?;
                    queue.extend(self.mutation_result(accepted).await);
                }
                Action::CancelCurrentFast => {
                    let accepted = self.store_call(self.store.cancel_current_fast()).await?;
                    queue.extend(self.mutation_result(accepted).await);
                }
                Action::CompleteFast { reflection } => {
                    let accepted = self
                        .store_call(self.store.complete_fast(&reflection))
                        .await?;
                    queue.extend(self.mutation_result(accepted).await);
                }
                Action::RefreshProgress => {
                    self.refresh().await?;
                }
                Action::StartPolling => self.start_poller(),
                Action::StopPolling => self.stop_poller(),
                Action::Reject(rejection) => {
                    tracing::debug!(%rejection, "intent rejected");
                    if outcome.is_applied() {
                        outcome = FastOutcome::Rejected(rejection);
                    }
                }
            }
        }

        Ok(outcome)
    }

    async fn step(&self, event: Event) -> Vec<Action> {
        let mut state = self.state.lock().await;
        let (machine, actions) = state.machine.clone().on_event(event);
        state.machine = machine;
        actions
    }

    async fn mutation_result(&self, accepted: bool) -> Vec<Action> {
        if accepted {
            self.state.lock().await.epoch.bump();
            self.step(Event::MutationApplied).await
        } else {
            self.step(Event::MutationDeclined).await
        }
    }

    /// Await a store call, marking the snapshot stale if it fails.
    async fn store_call<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ControllerError> {
        match call.await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.mark_stale().await;
                Err(e.into())
            }
        }
    }

    /// Recompute and read progress, then replace the snapshot.
    ///
    /// A read that began before a mutation landed is discarded and retried.
    async fn refresh(self: &Arc<Self>) -> Result<SessionSnapshot, ControllerError> {
        loop {
            let token = self.state.lock().await.epoch.begin_read();

            let session = self
                .store_call(async {
                    self.store.update_fasting_progress().await?;
                    self.store.get_fasting_progress().await
                })
                .await?;
            let state = FastState::try_from(&session)?;

            let (snapshot, actions) = {
                let mut guard = self.state.lock().await;
                if !guard.epoch.is_current(token) {
                    tracing::debug!("discarding progress read that began before a mutation");
                    continue;
                }

                let (machine, actions) = guard.machine.clone().on_event(Event::SnapshotReceived {
                    state: state.clone(),
                });
                guard.machine = machine;

                let snapshot = SessionSnapshot {
                    session,
                    state,
                    stale: false,
                };
                guard.snapshot = Some(snapshot.clone());
                (snapshot, actions)
            };

            tracing::debug!(
                status = %snapshot.session.status,
                goal_hours = snapshot.session.goal_hours,
                "progress refreshed"
            );
            self.snapshots.send_replace(Some(snapshot.clone()));

            for action in actions {
                match action {
                    Action::StartPolling => self.start_poller(),
                    Action::StopPolling => self.stop_poller(),
                    _ => {}
                }
            }
            return Ok(snapshot);
        }
    }

    async fn ensure_snapshot(self: &Arc<Self>) -> Result<(), ControllerError> {
        if self.state.lock().await.snapshot.is_none() {
            self.refresh().await?;
        }
        Ok(())
    }

    async fn mark_stale(&self) {
        let mut state = self.state.lock().await;
        if let Some(snapshot) = state.snapshot.as_mut() {
            snapshot.stale = true;
            self.snapshots.send_replace(Some(snapshot.clone()));
        }
    }

    // ===========================================
    // Polling
    // ===========================================

    fn start_poller(self: &Arc<Self>) {
        let mut slot = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let period = self.config.poll_interval;
        *slot = Some(tokio::spawn(poll_loop(Arc::downgrade(self), period)));
        tracing::debug!(?period, "progress polling started");
    }

    fn stop_poller(&self) {
        let mut slot = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
            tracing::debug!("progress polling stopped");
        }
    }

    fn is_polling(&self) -> bool {
        let slot = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn on_poll_tick(self: &Arc<Self>) {
        for action in self.step(Event::PollTick).await {
            match action {
                Action::RefreshProgress => {
                    let decision = self.state.lock().await.gate.on_tick();
                    match decision {
                        TickDecision::Refresh => {
                            tokio::spawn(Arc::clone(self).poll_refresh());
                        }
                        TickDecision::Coalesced => {
                            tracing::debug!("previous poll still running, tick coalesced");
                        }
                    }
                }
                Action::StopPolling => self.stop_poller(),
                _ => {}
            }
        }
    }

    /// Refresh for the poller, running one queued follow-up if ticks
    /// arrived meanwhile.
    ///
    /// The gate stays in flight until this returns, even if polling stops
    /// and restarts meanwhile, so a new poller cannot overlap it.
    async fn poll_refresh(self: Arc<Self>) {
        loop {
            if let Err(e) = self.refresh().await {
                tracing::warn!(error = %e, "progress poll failed, snapshot marked stale");
            }
            let mut state = self.state.lock().await;
            if !self.is_polling() {
                state.gate.cancel_pending();
            }
            if !state.gate.finish() {
                break;
            }
        }
    }
}

impl<S: FastingStore + 'static> Drop for Inner<S> {
    fn drop(&mut self) {
        if let Some(handle) = self
            .poller
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}

async fn poll_loop<S: FastingStore + 'static>(inner: Weak<Inner<S>>, period: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.on_poll_tick().await;
    }
}
