//! Error types for fast-store.

use std::path::PathBuf;

/// Main error type for fast-store operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Content file error.
    #[error("content error: {0}")]
    Content(#[from] crate::content::ContentError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row cannot be turned back into a record.
    #[error("corrupt row for user {user}: {reason}")]
    Corrupt {
        /// The user whose row is corrupt.
        user: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Database path error.
    #[error("invalid database path: {path}")]
    InvalidPath {
        /// The invalid path.
        path: PathBuf,
    },
}

/// Protocol layer errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The envelope could not be decoded.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(#[source] fast_types::FastError),

    /// The envelope speaks another protocol version.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    /// The caller identity is not usable.
    #[error("caller not authenticated")]
    NotAuthenticated,
}

impl From<fast_types::FastError> for ProtocolError {
    fn from(e: fast_types::FastError) -> Self {
        match e {
            fast_types::FastError::UnsupportedVersion(v) => Self::UnsupportedVersion(v),
            fast_types::FastError::NotAuthenticated => Self::NotAuthenticated,
            other => Self::InvalidEnvelope(other),
        }
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_errors_keep_their_number() {
        let err: ProtocolError = fast_types::FastError::UnsupportedVersion(3).into();
        assert!(matches!(err, ProtocolError::UnsupportedVersion(3)));
    }
}
