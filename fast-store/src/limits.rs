//! Rate limiting for fast-store.
//!
//! Requests are limited per caller and across the whole store. Both limiters
//! come from the governor crate; the per-caller one is keyed by [`UserId`]
//! and backed by a DashMap.

use crate::config::LimitsConfig;
use fast_types::UserId;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Type alias for a keyed rate limiter using DashMap.
type KeyedLimiter<K> = RateLimiter<
    K,
    dashmap::DashMap<K, InMemoryState>,
    DefaultClock,
    NoOpMiddleware<governor::clock::QuantaInstant>,
>;

/// Type alias for a direct (non-keyed) rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiters for the store.
#[derive(Clone)]
pub struct RateLimits {
    /// Limits requests per caller, configured via `limits.requests_per_minute`.
    user_limiter: Arc<KeyedLimiter<UserId>>,

    /// Caps aggregate throughput even when every caller is within its quota.
    global_limiter: Arc<DirectLimiter>,
}

impl std::fmt::Debug for RateLimits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimits")
            .field("user_limiter", &"KeyedLimiter<UserId>")
            .field("global_limiter", &"DirectLimiter")
            .finish()
    }
}

impl RateLimits {
    /// Create rate limiters from configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configured values are zero.
    pub fn new(config: &LimitsConfig) -> Self {
        let per_minute =
            NonZeroU32::new(config.requests_per_minute).expect("requests_per_minute must be > 0");
        let global_rps = NonZeroU32::new(config.global_requests_per_second)
            .expect("global_requests_per_second must be > 0");

        Self {
            user_limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
            global_limiter: Arc::new(RateLimiter::direct(Quota::per_second(global_rps))),
        }
    }

    /// Check if a request from `user` is allowed.
    pub fn check_user(&self, user: &UserId) -> Result<(), RateLimitError> {
        self.user_limiter
            .check_key(user)
            .map_err(|_| RateLimitError::UserLimitExceeded)
    }

    /// Check if the store-wide request rate is within limits.
    pub fn check_global(&self) -> Result<(), RateLimitError> {
        self.global_limiter
            .check()
            .map_err(|_| RateLimitError::GlobalLimitExceeded)
    }

    /// Number of tracked caller keys (for metrics).
    pub fn user_keys_count(&self) -> usize {
        self.user_limiter.len()
    }

    /// Evict idle callers from the keyed limiter.
    ///
    /// `retain_recent()` drops entries whose cells have fully recharged.
    /// Called periodically from the progress task.
    pub fn shrink(&self) {
        self.user_limiter.retain_recent();
    }
}

/// Rate limit error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// Too many requests from this caller.
    #[error("user rate limit exceeded")]
    UserLimitExceeded,
    /// Too many requests across all callers.
    #[error("global rate limit exceeded")]
    GlobalLimitExceeded,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(per_minute: u32, global: u32) -> LimitsConfig {
        LimitsConfig {
            requests_per_minute: per_minute,
            global_requests_per_second: global,
        }
    }

    #[test]
    fn create_rate_limits() {
        let limits = RateLimits::new(&LimitsConfig::default());
        assert_eq!(limits.user_keys_count(), 0);
    }

    #[test]
    fn user_limit_allows_within_quota() {
        let limits = RateLimits::new(&config(5, 1000));
        let user = UserId::derive("alice");

        for _ in 0..5 {
            assert!(limits.check_user(&user).is_ok());
        }

        assert_eq!(
            limits.check_user(&user),
            Err(RateLimitError::UserLimitExceeded)
        );
    }

    #[test]
    fn different_users_have_independent_limits() {
        let limits = RateLimits::new(&config(2, 1000));
        let alice = UserId::derive("alice");
        let bob = UserId::derive("bob");

        assert!(limits.check_user(&alice).is_ok());
        assert!(limits.check_user(&alice).is_ok());
        assert!(limits.check_user(&alice).is_err());

        assert!(limits.check_user(&bob).is_ok());
        assert!(limits.check_user(&bob).is_ok());
        assert!(limits.check_user(&bob).is_err());
        assert_eq!(limits.user_keys_count(), 2);
    }

    #[test]
    fn global_rate_limiter_rejects_excess() {
        let limits = RateLimits::new(&config(100, 5));

        for _ in 0..5 {
            assert!(limits.check_global().is_ok());
        }

        assert_eq!(
            limits.check_global(),
            Err(RateLimitError::GlobalLimitExceeded)
        );
    }

    #[test]
    fn rate_limits_are_debug() {
        let limits = RateLimits::new(&LimitsConfig::default());
        assert!(format!("{limits:?}").contains("RateLimits"));
    }

    #[test]
    fn rate_limit_error_display() {
        assert_eq!(
            RateLimitError::UserLimitExceeded.to_string(),
            "user rate limit exceeded"
        );
        assert_eq!(
            RateLimitError::GlobalLimitExceeded.to_string(),
            "global rate limit exceeded"
        );
    }

    #[test]
    fn shrink_keeps_limiter_usable() {
        let limits = RateLimits::new(&LimitsConfig::default());
        let user = UserId::derive("alice");
        let _ = limits.check_user(&user);

        limits.shrink();
        assert!(limits.check_user(&user).is_ok());
    }

    #[test]
    #[should_panic(expected = "requests_per_minute must be > 0")]
    fn zero_quota_panics() {
        RateLimits::new(&config(0, 10));
    }
}
