//! Error types for the fasting tracker.

use thiserror::Error;

/// Errors that can occur when encoding, decoding or validating records.
#[derive(Debug, Error)]
pub enum FastError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Invalid protocol version
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Invalid data format
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A session record breaks a lifecycle invariant
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// Not authenticated
    #[error("not authenticated")]
    NotAuthenticated,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FastError::UnsupportedVersion(9);
        assert_eq!(err.to_string(), "unsupported protocol version: 9");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FastError>();
    }
}
