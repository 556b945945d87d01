//! Storage layer for fast-store.
//!
//! Holds one session record per user plus an append-only history of
//! completed fasts.

mod sqlite;

pub use sqlite::SqliteStorage;

use crate::error::StorageResult;
use async_trait::async_trait;
use fast_types::{FastHistory, FastingSession, UserId};

/// Trait for session storage backends.
#[async_trait]
pub trait FastStorage: Send + Sync {
    /// Load a user's session record.
    ///
    /// Returns `None` if the user never started a fast.
    async fn load_session(&self, user: &UserId) -> StorageResult<Option<FastingSession>>;

    /// Insert or replace a user's session record.
    async fn save_session(&self, user: &UserId, session: &FastingSession) -> StorageResult<()>;

    /// Save a completed session and append its history entry atomically.
    async fn commit_completion(
        &self,
        user: &UserId,
        session: &FastingSession,
        entry: &FastHistory,
    ) -> StorageResult<()>;

    /// All history entries for a user, oldest first.
    async fn history(&self, user: &UserId) -> StorageResult<Vec<FastHistory>>;

    /// Users whose session is currently in progress.
    async fn in_progress_users(&self) -> StorageResult<Vec<UserId>>;

    /// Number of sessions currently in progress (for metrics).
    async fn count_in_progress(&self) -> StorageResult<u64>;

    /// Total number of history entries (for metrics).
    async fn count_history(&self) -> StorageResult<u64>;
}
