//! Identity and ordering types.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::FastError;

/// Nanoseconds in one minute.
pub const NANOS_PER_MINUTE: u64 = 60 * 1_000_000_000;

/// Nanoseconds in one hour.
pub const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MINUTE;

/// The identity a store caller acts as.
///
/// 32 bytes, displayed as URL-safe base64. The store keys every session and
/// history record by this value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId([u8; 32]);

impl UserId {
    /// Create a new random UserId.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(bytes)
    }

    /// Derive a stable UserId from a label.
    ///
    /// Same label, same id. Used for fixtures and single-user deployments.
    pub fn derive(label: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"unplugged-user-id-v1");
        hasher.update(label.as_bytes());
        let result = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Create a UserId from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() == 32 {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(bytes);
            Some(Self(arr))
        } else {
            None
        }
    }

    /// Get the raw bytes of this UserId.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self.0))
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", &self.to_string()[..8])
    }
}

impl FromStr for UserId {
    type Err = FastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s.trim())
            .map_err(|e| FastError::InvalidData(format!("user id is not base64: {e}")))?;
        Self::from_bytes(&bytes).ok_or_else(|| {
            FastError::InvalidData(format!("user id must be 32 bytes, got {}", bytes.len()))
        })
    }
}

/// An instant in nanoseconds since the Unix epoch.
///
/// Assigned by the store's clock. Clients never compute elapsed time from
/// their own clock; they only display what the store reports.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Time(u64);

impl Time {
    /// Create a Time from nanoseconds since the epoch.
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create a Time from whole seconds since the epoch.
    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos().min(u64::MAX as u128) as u64)
            .unwrap_or(0);
        Self(nanos)
    }

    /// Nanoseconds since the epoch.
    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Whole seconds since the epoch.
    pub fn as_secs(&self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(&self, earlier: Time) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// This instant moved forward by `duration`.
    pub fn plus(&self, duration: Duration) -> Self {
        let nanos = duration.as_nanos().min(u64::MAX as u128) as u64;
        Self(self.0.saturating_add(nanos))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Time({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_roundtrip() {
        let original = UserId::random();
        let restored = UserId::from_bytes(original.as_bytes()).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn user_id_base64_display() {
        let id = UserId::random();
        assert_eq!(id.to_string().len(), 43); // 32 bytes = 43 base64 chars (no padding)
    }

    #[test]
    fn user_id_parses_its_display_form() {
        let id = UserId::derive("alice");
        let parsed: UserId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn user_id_parse_rejects_garbage() {
        assert!("not base64!".parse::<UserId>().is_err());
        assert!("AAAA".parse::<UserId>().is_err()); // 3 bytes
    }

    #[test]
    fn user_id_derive_is_deterministic() {
        assert_eq!(UserId::derive("same"), UserId::derive("same"));
        assert_ne!(UserId::derive("one"), UserId::derive("two"));
    }

    #[test]
    fn user_id_from_invalid_length_fails() {
        assert!(UserId::from_bytes(&[0u8; 16]).is_none());
        assert!(UserId::from_bytes(&[0u8; 64]).is_none());
    }

    #[test]
    fn time_ordering() {
        assert!(Time::from_secs(100) < Time::from_secs(200));
    }

    #[test]
    fn time_since_saturates() {
        let early = Time::from_secs(10);
        let late = Time::from_secs(70);
        assert_eq!(late.saturating_since(early), Duration::from_secs(60));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
    }

    #[test]
    fn time_plus_hours() {
        let start = Time::from_secs(1_700_000_000);
        let later = start.plus(Duration::from_secs(3 * 3600));
        assert_eq!(later.as_nanos() - start.as_nanos(), 3 * NANOS_PER_HOUR);
    }

    #[test]
    fn time_plus_saturates() {
        let t = Time::from_nanos(u64::MAX - 1);
        assert_eq!(t.plus(Duration::from_secs(1)).as_nanos(), u64::MAX);
    }
}
