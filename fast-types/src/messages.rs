//! Store protocol messages.
//!
//! One [`Request`] variant per store operation. Requests travel inside an
//! [`Envelope`](crate::Envelope); the store answers with a [`Response`].

use serde::{Deserialize, Serialize};

use crate::{FastError, FastHistory, FastingContent, FastingSession};

/// All store operations a caller can invoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Start (or restart) a fast
    StartNewFast(StartNewFast),
    /// Complete the active fast with a reflection
    CompleteFast(CompleteFast),
    /// Discard the active fast without history
    CancelCurrentFast,
    /// Recompute elapsed hours from the store clock
    UpdateFastingProgress,
    /// Read the caller's current session
    GetFastingProgress,
    /// Read every session record of the caller
    GetAllFastingSessions,
    /// Read the caller's completed fasts
    GetFastingHistory,
    /// Read the static fasting content
    GetFastingContent,
}

impl Request {
    /// Operation name, for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartNewFast(_) => "startNewFast",
            Self::CompleteFast(_) => "completeFast",
            Self::CancelCurrentFast => "cancelCurrentFast",
            Self::UpdateFastingProgress => "updateFastingProgress",
            Self::GetFastingProgress => "getFastingProgress",
            Self::GetAllFastingSessions => "getAllFastingSessions",
            Self::GetFastingHistory => "getFastingHistory",
            Self::GetFastingContent => "getFastingContent",
        }
    }

    /// Whether this request changes the session lifecycle.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::StartNewFast(_) | Self::CompleteFast(_) | Self::CancelCurrentFast
        )
    }
}

/// Start a fast with the given goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartNewFast {
    /// Target duration in hours. Validated by the store.
    pub goal_hours: u32,
}

/// Complete the active fast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteFast {
    /// Reflection to attach to the session and its history entry
    pub reflection_journal: String,
}

/// All store replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Outcome of a boolean operation
    Accepted {
        /// `false` when the store declined the operation
        accepted: bool,
    },
    /// A single session snapshot
    Session(FastingSession),
    /// Session records
    Sessions {
        /// The records
        sessions: Vec<FastingSession>,
    },
    /// Completed fasts, oldest first
    History {
        /// The entries
        entries: Vec<FastHistory>,
    },
    /// Static content
    Content(FastingContent),
    /// The request could not be served
    Error(ErrorReply),
}

impl Response {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FastError> {
        rmp_serde::to_vec_named(self).map_err(FastError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FastError> {
        rmp_serde::from_slice(bytes).map_err(FastError::Deserialization)
    }

    /// Shorthand for an error reply.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorReply {
            code,
            message: message.into(),
        })
    }
}

/// Why the store refused to serve a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The caller identity was missing or unknown
    NotAuthenticated,
    /// The caller or the store exceeded a request quota
    RateLimited,
    /// The request was malformed
    BadRequest,
    /// The envelope carried a protocol version the store does not speak
    UnsupportedVersion,
    /// The store failed internally
    Internal,
}

/// Error payload of [`Response::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    /// Machine-readable code
    pub code: ErrorCode,
    /// Human-readable detail
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FastStatus, Time};

    #[test]
    fn session_response_roundtrip() {
        let response = Response::Session(FastingSession {
            status: FastStatus::InProgress { elapsed_hours: 4 },
            goal_hours: 12,
            start_time: Some(Time::from_secs(1_700_000_000)),
            timestamp: Time::from_secs(1_700_014_400),
            reflection_journal: String::new(),
        });

        let bytes = response.to_bytes().unwrap();
        let restored = Response::from_bytes(&bytes).unwrap();

        assert_eq!(restored, response);
    }

    #[test]
    fn accepted_response_roundtrip() {
        let bytes = Response::Accepted { accepted: false }.to_bytes().unwrap();
        let restored = Response::from_bytes(&bytes).unwrap();
        assert_eq!(restored, Response::Accepted { accepted: false });
    }

    #[test]
    fn error_response_carries_code() {
        let bytes = Response::error(ErrorCode::RateLimited, "slow down")
            .to_bytes()
            .unwrap();
        match Response::from_bytes(&bytes).unwrap() {
            Response::Error(reply) => {
                assert_eq!(reply.code, ErrorCode::RateLimited);
                assert_eq!(reply.message, "slow down");
            }
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let result = Response::from_bytes(&[0xc1, 0x00, 0xff]);
        assert!(matches!(result, Err(FastError::Deserialization(_))));
    }

    #[test]
    fn only_lifecycle_requests_are_mutations() {
        assert!(Request::StartNewFast(StartNewFast { goal_hours: 8 }).is_mutation());
        assert!(Request::CancelCurrentFast.is_mutation());
        assert!(!Request::UpdateFastingProgress.is_mutation());
        assert!(!Request::GetFastingHistory.is_mutation());
    }

    #[test]
    fn request_names_match_store_operations() {
        assert_eq!(Request::GetFastingProgress.name(), "getFastingProgress");
        assert_eq!(
            Request::CompleteFast(CompleteFast {
                reflection_journal: String::new()
            })
            .name(),
            "completeFast"
        );
    }
}
