//! Store abstraction for the fasting controller.
//!
//! The store is the authority for session state, elapsed time and history.
//! The controller only talks to it through [`FastingStore`].
//!
//! # Implementations
//!
//! - [`MemoryStore`] - in-process store with a manual clock and fault
//!   injection, for tests and demos
//! - [`HttpStore`] - MessagePack-over-HTTP client of the store service

mod http;
mod memory;

pub use http::{HttpStore, HttpStoreConfig};
pub use memory::MemoryStore;

use async_trait::async_trait;
use fast_types::{ErrorCode, ErrorReply, FastHistory, FastingContent, FastingSession};
use thiserror::Error;

/// Store call errors.
///
/// Business outcomes (a declined start, nothing to cancel) are `Ok(false)`;
/// these are transport and protocol failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// The caller identity was not accepted.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The store is throttling this caller.
    #[error("rate limited")]
    RateLimited,

    /// The call did not finish in time.
    #[error("store call timed out")]
    Timeout,

    /// The reply could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The store failed to serve the call.
    #[error("store error ({status}): {message}")]
    Server {
        /// HTTP status, or 0 when the failure came from an error reply.
        status: u16,
        /// Detail from the store.
        message: String,
    },
}

impl From<ErrorReply> for StoreError {
    fn from(reply: ErrorReply) -> Self {
        match reply.code {
            ErrorCode::NotAuthenticated => Self::NotAuthenticated,
            ErrorCode::RateLimited => Self::RateLimited,
            ErrorCode::BadRequest | ErrorCode::UnsupportedVersion => Self::Protocol(reply.message),
            ErrorCode::Internal => Self::Server {
                status: 0,
                message: reply.message,
            },
        }
    }
}

/// The remote store contract.
///
/// Every mutation is keyed by the caller identity the implementation was
/// built with.
#[async_trait]
pub trait FastingStore: Send + Sync {
    /// Start a fast. `false` if the store declined.
    async fn start_new_fast(&self, goal_hours: u32) -> Result<bool, StoreError>;

    /// Complete the running fast. `false` if nothing was running.
    async fn complete_fast(&self, reflection_journal: &str) -> Result<bool, StoreError>;

    /// Cancel the running fast. `false` if nothing was running.
    async fn cancel_current_fast(&self) -> Result<bool, StoreError>;

    /// Recompute elapsed hours from the store clock.
    async fn update_fasting_progress(&self) -> Result<bool, StoreError>;

    /// Read the caller's current session.
    async fn get_fasting_progress(&self) -> Result<FastingSession, StoreError>;

    /// Read all session records of the caller.
    async fn get_all_fasting_sessions(&self) -> Result<Vec<FastingSession>, StoreError>;

    /// Read the caller's completed fasts, oldest first.
    async fn get_fasting_history(&self) -> Result<Vec<FastHistory>, StoreError>;

    /// Read the static content.
    async fn get_fasting_content(&self) -> Result<FastingContent, StoreError>;
}
