//! Envelope - the wire wrapper for every store request.

use serde::{Deserialize, Serialize};

use crate::{FastError, Request, UserId};

/// Protocol version spoken by this crate.
pub const PROTOCOL_VERSION: u8 = 1;

/// Wraps a request with the caller identity.
///
/// The store keys all state by `caller`; it never trusts a user id found
/// anywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Protocol version (currently 1)
    pub version: u8,
    /// Identity the request acts as
    pub caller: UserId,
    /// The operation
    pub request: Request,
}

impl Envelope {
    /// Create a new envelope at the current protocol version.
    pub fn new(caller: UserId, request: Request) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            caller,
            request,
        }
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, FastError> {
        rmp_serde::to_vec_named(self).map_err(FastError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    ///
    /// Rejects envelopes from other protocol versions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FastError> {
        let envelope: Self = rmp_serde::from_slice(bytes).map_err(FastError::Deserialization)?;
        if envelope.version != PROTOCOL_VERSION {
            return Err(FastError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope)
    }
}
