//! Request handling for the fasting store.
//!
//! `FastStore` owns storage, limits and metrics, and turns one decoded
//! [`Envelope`] into one [`Response`]. Lifecycle rules live in
//! [`FastLedger`]; this module loads the caller's record, applies the ledger
//! operation under a per-user lock and persists the result.

use crate::config::Config;
use crate::content::load_content;
use crate::error::{ProtocolError, ServerError, StorageError};
use crate::limits::RateLimits;
use crate::storage::{FastStorage, SqliteStorage};
use dashmap::DashMap;
use fast_core::{Clock, FastLedger, SystemClock};
use fast_types::{
    CompleteFast, Envelope, ErrorCode, FastingContent, FastingSession, Request, Response,
    StartNewFast, UserId,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Operational metrics for monitoring store activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct StoreMetrics {
    /// Total requests decoded and dispatched.
    pub requests_total: AtomicU64,
    /// Fasts started.
    pub fasts_started: AtomicU64,
    /// Fasts completed (history entries written).
    pub fasts_completed: AtomicU64,
    /// Fasts cancelled.
    pub fasts_cancelled: AtomicU64,
    /// Mutations the ledger declined.
    pub declined_total: AtomicU64,
    /// Sessions recomputed by the progress task.
    pub recomputed_total: AtomicU64,
    /// Total rate limit rejections (user + global).
    pub rate_limit_hits: AtomicU64,
    /// Total malformed or unauthenticated requests.
    pub protocol_errors: AtomicU64,
    /// Total storage failures.
    pub errors_total: AtomicU64,
}

/// The authoritative fasting store.
pub struct FastStore {
    config: Config,
    storage: Arc<dyn FastStorage>,
    clock: Arc<dyn Clock>,
    rate_limits: RateLimits,
    metrics: StoreMetrics,
    content: FastingContent,
    /// Serializes mutations per caller.
    user_locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for FastStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastStore")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("rate_limits", &self.rate_limits)
            .field("metrics", &self.metrics)
            .field("locked_users", &self.user_locks.len())
            .finish_non_exhaustive()
    }
}

impl FastStore {
    /// Create a store on the system clock.
    pub fn new(config: Config, storage: Arc<dyn FastStorage>, content: FastingContent) -> Self {
        Self::with_clock(config, storage, content, Arc::new(SystemClock))
    }

    /// Open the SQLite database and content named by `config`.
    pub async fn open(config: Config) -> Result<Self, ServerError> {
        let content = load_content(&config.content)?;
        let storage = SqliteStorage::new(&config.storage.database).await?;
        Ok(Self::new(config, Arc::new(storage), content))
    }

    /// Create a store with an explicit clock.
    pub fn with_clock(
        config: Config,
        storage: Arc<dyn FastStorage>,
        content: FastingContent,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rate_limits = RateLimits::new(&config.limits);
        Self {
            config,
            storage,
            clock,
            rate_limits,
            metrics: StoreMetrics::default(),
            content,
            user_locks: DashMap::new(),
        }
    }

    /// Get the store configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the storage layer.
    pub fn storage(&self) -> &dyn FastStorage {
        self.storage.as_ref()
    }

    /// Get access to the rate limiters.
    pub fn rate_limits(&self) -> &RateLimits {
        &self.rate_limits
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    /// Decode and serve a MessagePack envelope.
    pub async fn handle_bytes(&self, bytes: &[u8]) -> Response {
        match Envelope::from_bytes(bytes) {
            Ok(envelope) => self.handle(envelope).await,
            Err(e) => self.protocol_error(ProtocolError::from(e)),
        }
    }

    /// Serve one request.
    pub async fn handle(&self, envelope: Envelope) -> Response {
        let Envelope {
            caller, request, ..
        } = envelope;

        if caller.as_bytes().iter().all(|b| *b == 0) {
            return self.protocol_error(ProtocolError::NotAuthenticated);
        }

        if let Err(e) = self.rate_limits.check_global() {
            return self.rate_limited(&caller, e);
        }
        if let Err(e) = self.rate_limits.check_user(&caller) {
            return self.rate_limited(&caller, e);
        }

        self.metrics.requests_total.fetch_add(1, Ordering::Relaxed);
        debug!(user = %caller, op = request.name(), "handling request");

        let result = match request {
            Request::StartNewFast(StartNewFast { goal_hours }) => self
                .start_new_fast(&caller, goal_hours)
                .await
                .map(accepted),
            Request::CompleteFast(CompleteFast { reflection_journal }) => {
                let limit = self.config.server.max_reflection_len;
                if reflection_journal.len() > limit {
                    warn!(
                        user = %caller,
                        len = reflection_journal.len(),
                        limit,
                        "reflection too long"
                    );
                    return accepted(self.declined(&caller, "completeFast"));
                }
                self.complete_fast(&caller, &reflection_journal)
                    .await
                    .map(accepted)
            }
            Request::CancelCurrentFast => self.cancel_current_fast(&caller).await.map(accepted),
            Request::UpdateFastingProgress => {
                self.update_fasting_progress(&caller).await.map(accepted)
            }
            Request::GetFastingProgress => self
                .get_fasting_progress(&caller)
                .await
                .map(Response::Session),
            Request::GetAllFastingSessions => self
                .get_all_fasting_sessions(&caller)
                .await
                .map(|sessions| Response::Sessions { sessions }),
            Request::GetFastingHistory => self
                .storage
                .history(&caller)
                .await
                .map(|entries| Response::History { entries }),
            Request::GetFastingContent => Ok(Response::Content(self.content.clone())),
        };

        result.unwrap_or_else(|e| {
            self.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
            error!(user = %caller, error = %e, "storage failure");
            Response::error(ErrorCode::Internal, "storage failure")
        })
    }

    /// Start (or restart) the caller's fast.
    pub async fn start_new_fast(
        &self,
        user: &UserId,
        goal_hours: u32,
    ) -> Result<bool, StorageError> {
        let lock = self.user_lock(user);
        let _guard = lock.lock().await;

        let mut ledger = self.load_ledger(user).await?;
        if !ledger.start(goal_hours, self.clock.now()) {
            return Ok(self.declined(user, "startNewFast"));
        }
        self.storage.save_session(user, ledger.session()).await?;
        self.metrics.fasts_started.fetch_add(1, Ordering::Relaxed);
        debug!(user = %user, goal_hours, "fast started");
        Ok(true)
    }

    /// Complete the caller's running fast and record its history entry.
    pub async fn complete_fast(
        &self,
        user: &UserId,
        reflection: &str,
    ) -> Result<bool, StorageError> {
        let lock = self.user_lock(user);
        let _guard = lock.lock().await;

        let mut ledger = self.load_ledger(user).await?;
        let Some(entry) = ledger.complete(reflection, self.clock.now()) else {
            return Ok(self.declined(user, "completeFast"));
        };
        self.storage
            .commit_completion(user, ledger.session(), &entry)
            .await?;
        self.metrics.fasts_completed.fetch_add(1, Ordering::Relaxed);
        debug!(user = %user, hours = entry.duration_hours(), "fast completed");
        Ok(true)
    }

    /// Discard the caller's running fast.
    pub async fn cancel_current_fast(&self, user: &UserId) -> Result<bool, StorageError> {
        let lock = self.user_lock(user);
        let _guard = lock.lock().await;

        let mut ledger = self.load_ledger(user).await?;
        if !ledger.cancel(self.clock.now()) {
            return Ok(self.declined(user, "cancelCurrentFast"));
        }
        self.storage.save_session(user, ledger.session()).await?;
        self.metrics.fasts_cancelled.fetch_add(1, Ordering::Relaxed);
        debug!(user = %user, "fast cancelled");
        Ok(true)
    }

    /// Recompute elapsed hours of the caller's running fast.
    pub async fn update_fasting_progress(&self, user: &UserId) -> Result<bool, StorageError> {
        let lock = self.user_lock(user);
        let _guard = lock.lock().await;

        let mut ledger = self.load_ledger(user).await?;
        if !ledger.recompute(self.clock.now()) {
            return Ok(false);
        }
        self.storage.save_session(user, ledger.session()).await?;
        Ok(true)
    }

    /// The caller's session as last computed.
    pub async fn get_fasting_progress(
        &self,
        user: &UserId,
    ) -> Result<FastingSession, StorageError> {
        Ok(self
            .storage
            .load_session(user)
            .await?
            .unwrap_or_else(|| FastingSession::not_started(self.clock.now())))
    }

    /// Every session record of the caller (zero or one).
    pub async fn get_all_fasting_sessions(
        &self,
        user: &UserId,
    ) -> Result<Vec<FastingSession>, StorageError> {
        Ok(self.storage.load_session(user).await?.into_iter().collect())
    }

    /// Recompute every in-progress session. Returns how many were updated.
    ///
    /// A failure for one user is logged and does not stop the sweep.
    pub async fn recompute_all(&self) -> Result<u64, StorageError> {
        let users = self.storage.in_progress_users().await?;
        let mut updated = 0;

        for user in users {
            match self.update_fasting_progress(&user).await {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(e) => {
                    self.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
                    error!(user = %user, error = %e, "failed to recompute session");
                }
            }
        }

        self.metrics
            .recomputed_total
            .fetch_add(updated, Ordering::Relaxed);
        Ok(updated)
    }

    /// Drop lock entries nobody holds.
    pub fn prune_user_locks(&self) {
        self.user_locks
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    async fn load_ledger(&self, user: &UserId) -> Result<FastLedger, StorageError> {
        Ok(match self.storage.load_session(user).await? {
            Some(session) => FastLedger::new(session),
            None => FastLedger::empty(self.clock.now()),
        })
    }

    fn user_lock(&self, user: &UserId) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(*user)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn declined(&self, user: &UserId, op: &'static str) -> bool {
        self.metrics.declined_total.fetch_add(1, Ordering::Relaxed);
        debug!(user = %user, op, "mutation declined");
        false
    }

    fn rate_limited(&self, user: &UserId, e: crate::limits::RateLimitError) -> Response {
        self.metrics.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
        warn!(user = %user, error = %e, "request rate limited");
        Response::error(ErrorCode::RateLimited, e.to_string())
    }

    fn protocol_error(&self, e: ProtocolError) -> Response {
        self.metrics.protocol_errors.fetch_add(1, Ordering::Relaxed);
        warn!(error = %e, "rejected request");
        let code = match e {
            ProtocolError::NotAuthenticated => ErrorCode::NotAuthenticated,
            ProtocolError::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
            ProtocolError::InvalidEnvelope(_) => ErrorCode::BadRequest,
        };
        Response::error(code, e.to_string())
    }
}

fn accepted(accepted: bool) -> Response {
    Response::Accepted { accepted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use fast_core::ManualClock;
    use fast_types::{FastStatus, Time, PROTOCOL_VERSION};
    use std::time::Duration;

    const HOUR: Duration = Duration::from_secs(3600);

    async fn store_with(config: Config) -> (FastStore, ManualClock) {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let clock = ManualClock::new(Time::from_secs(1_700_000_000));
        let store = FastStore::with_clock(
            config,
            Arc::new(storage),
            FastingContent::builtin(),
            Arc::new(clock.clone()),
        );
        (store, clock)
    }

    async fn store() -> (FastStore, ManualClock) {
        store_with(Config::default()).await
    }

    fn call(user: UserId, request: Request) -> Envelope {
        Envelope::new(user, request)
    }

    fn start(goal_hours: u32) -> Request {
        Request::StartNewFast(StartNewFast { goal_hours })
    }

    fn complete(reflection: &str) -> Request {
        Request::CompleteFast(CompleteFast {
            reflection_journal: reflection.to_string(),
        })
    }

    fn error_code(response: &Response) -> Option<ErrorCode> {
        match response {
            Response::Error(reply) => Some(reply.code),
            _ => None,
        }
    }

    // ===========================================
    // Lifecycle
    // ===========================================

    #[tokio::test]
    async fn unknown_user_reads_not_started() {
        let (store, _) = store().await;
        let user = UserId::derive("alice");

        let response = store.handle(call(user, Request::GetFastingProgress)).await;
        let Response::Session(session) = response else {
            panic!("expected session, got {response:?}");
        };
        assert_eq!(session.status, FastStatus::NotStarted);

        let response = store.handle(call(user, Request::GetAllFastingSessions)).await;
        assert_eq!(response, Response::Sessions { sessions: vec![] });
    }

    #[tokio::test]
    async fn start_validates_goal() {
        let (store, _) = store().await;
        let user = UserId::derive("alice");

        for goal in [0, 73] {
            let response = store.handle(call(user, start(goal))).await;
            assert_eq!(response, Response::Accepted { accepted: false });
        }
        assert!(store.storage().load_session(&user).await.unwrap().is_none());

        let response = store.handle(call(user, start(72))).await;
        assert_eq!(response, Response::Accepted { accepted: true });
    }

    #[tokio::test]
    async fn progress_only_moves_on_update() {
        let (store, clock) = store().await;
        let user = UserId::derive("alice");
        store.handle(call(user, start(12))).await;

        clock.advance(5 * HOUR);
        let session = store.get_fasting_progress(&user).await.unwrap();
        assert_eq!(session.elapsed_hours(), Some(0));

        let response = store.handle(call(user, Request::UpdateFastingProgress)).await;
        assert_eq!(response, Response::Accepted { accepted: true });
        let session = store.get_fasting_progress(&user).await.unwrap();
        assert_eq!(session.elapsed_hours(), Some(5));
    }

    #[tokio::test]
    async fn complete_writes_history_once() {
        let (store, clock) = store().await;
        let user = UserId::derive("alice");
        store.handle(call(user, start(8))).await;
        clock.advance(8 * HOUR);

        let response = store.handle(call(user, complete("Grateful"))).await;
        assert_eq!(response, Response::Accepted { accepted: true });
        let response = store.handle(call(user, complete("again"))).await;
        assert_eq!(response, Response::Accepted { accepted: false });

        let response = store.handle(call(user, Request::GetFastingHistory)).await;
        let Response::History { entries } = response else {
            panic!("expected history, got {response:?}");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reflection_journal, "Grateful");
        assert_eq!(entries[0].duration_hours(), 8);

        let session = store.get_fasting_progress(&user).await.unwrap();
        assert_eq!(session.status, FastStatus::Completed);
        assert_eq!(store.metrics().fasts_completed.load(Ordering::Relaxed), 1);
        assert_eq!(store.metrics().declined_total.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn cancel_resets_without_history() {
        let (store, _) = store().await;
        let user = UserId::derive("alice");

        let response = store.handle(call(user, Request::CancelCurrentFast)).await;
        assert_eq!(response, Response::Accepted { accepted: false });

        store.handle(call(user, start(24))).await;
        let response = store.handle(call(user, Request::CancelCurrentFast)).await;
        assert_eq!(response, Response::Accepted { accepted: true });

        let session = store.get_fasting_progress(&user).await.unwrap();
        assert_eq!(session.status, FastStatus::NotStarted);
        assert!(store.storage().history(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let (store, _) = store().await;
        let alice = UserId::derive("alice");
        let bob = UserId::derive("bob");

        store.handle(call(alice, start(16))).await;

        let bob_session = store.get_fasting_progress(&bob).await.unwrap();
        assert_eq!(bob_session.status, FastStatus::NotStarted);
        let response = store.handle(call(bob, Request::CancelCurrentFast)).await;
        assert_eq!(response, Response::Accepted { accepted: false });
    }

    #[tokio::test]
    async fn recompute_all_updates_running_fasts() {
        let (store, clock) = store().await;
        let alice = UserId::derive("alice");
        let bob = UserId::derive("bob");
        store.handle(call(alice, start(16))).await;
        store.handle(call(bob, start(4))).await;
        store.handle(call(bob, Request::CancelCurrentFast)).await;

        clock.advance(3 * HOUR);
        assert_eq!(store.recompute_all().await.unwrap(), 1);

        let session = store.get_fasting_progress(&alice).await.unwrap();
        assert_eq!(session.elapsed_hours(), Some(3));
    }

    #[tokio::test]
    async fn concurrent_completes_record_one_entry() {
        let (store, _) = store().await;
        let store = Arc::new(store);
        let user = UserId::derive("alice");
        store.handle(call(user, start(8))).await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.complete_fast(&user, &format!("r{i}")).await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(store.storage().count_history().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn serves_content() {
        let (store, _) = store().await;
        let response = store
            .handle(call(UserId::derive("alice"), Request::GetFastingContent))
            .await;
        assert_eq!(response, Response::Content(FastingContent::builtin()));
    }

    // ===========================================
    // Rejections
    // ===========================================

    #[tokio::test]
    async fn zero_caller_is_not_authenticated() {
        let (store, _) = store().await;
        let nobody = UserId::from_bytes(&[0u8; 32]).unwrap();

        let response = store.handle(call(nobody, Request::GetFastingProgress)).await;
        assert_eq!(error_code(&response), Some(ErrorCode::NotAuthenticated));
    }

    #[tokio::test]
    async fn garbage_bytes_are_bad_request() {
        let (store, _) = store().await;
        let response = store.handle_bytes(b"not msgpack").await;
        assert_eq!(error_code(&response), Some(ErrorCode::BadRequest));
        assert_eq!(store.metrics().protocol_errors.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn other_versions_are_rejected() {
        let (store, _) = store().await;
        let mut envelope = call(UserId::derive("alice"), Request::GetFastingContent);
        envelope.version = PROTOCOL_VERSION + 1;

        let response = store.handle_bytes(&envelope.to_bytes().unwrap()).await;
        assert_eq!(error_code(&response), Some(ErrorCode::UnsupportedVersion));
    }

    #[tokio::test]
    async fn long_reflection_declines_completion() {
        let mut config = Config::default();
        config.server.max_reflection_len = 4;
        let (store, _) = store_with(config).await;
        let user = UserId::derive("alice");
        store.handle(call(user, start(8))).await;

        let response = store.handle(call(user, complete("too long"))).await;
        assert_eq!(response, Response::Accepted { accepted: false });
        assert_eq!(store.metrics().declined_total.load(Ordering::Relaxed), 1);
        assert_eq!(store.metrics().protocol_errors.load(Ordering::Relaxed), 0);
        assert!(store.storage().history(&user).await.unwrap().is_empty());

        let session = store.get_fasting_progress(&user).await.unwrap();
        assert!(session.is_in_progress());
    }

    #[tokio::test]
    async fn excess_requests_are_rate_limited() {
        let config = Config {
            limits: LimitsConfig {
                requests_per_minute: 3,
                global_requests_per_second: 1000,
            },
            ..Config::default()
        };
        let (store, _) = store_with(config).await;
        let user = UserId::derive("alice");

        for _ in 0..3 {
            let response = store.handle(call(user, Request::GetFastingProgress)).await;
            assert!(error_code(&response).is_none());
        }
        let response = store.handle(call(user, Request::GetFastingProgress)).await;
        assert_eq!(error_code(&response), Some(ErrorCode::RateLimited));
        assert_eq!(store.metrics().rate_limit_hits.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.database = dir.path().join("fast.db");

        let store = FastStore::open(config).await.unwrap();
        let user = UserId::derive("alice");
        assert!(store.start_new_fast(&user, 8).await.unwrap());
        assert!(dir.path().join("fast.db").exists());
    }

    #[tokio::test]
    async fn open_reports_bad_content_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.database = dir.path().join("fast.db");
        config.content.path = Some(dir.path().join("missing.toml"));

        let result = FastStore::open(config).await;
        assert!(matches!(result, Err(ServerError::Content(_))));
    }

    #[tokio::test]
    async fn prune_drops_idle_locks() {
        let (store, _) = store().await;
        let user = UserId::derive("alice");
        store.handle(call(user, start(8))).await;
        assert_eq!(store.user_locks.len(), 1);

        store.prune_user_locks();
        assert_eq!(store.user_locks.len(), 0);
    }
}
