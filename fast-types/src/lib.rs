//! # fast-types
//!
//! Wire format types for the Unplugged fasting tracker.
//!
//! This crate provides the foundational types shared by the store service
//! and the fasting controller:
//! - [`UserId`], [`Time`] - Identity and ordering types
//! - [`FastingSession`], [`FastStatus`], [`FastHistory`] - Session records
//! - [`FastingContent`], [`VerseReference`] - Read-only descriptive content
//! - [`Envelope`], [`Request`], [`Response`] - Store protocol messages
//! - [`FastError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod content;
mod envelope;
mod error;
mod ids;
mod messages;
mod session;

pub use content::{FastingContent, VerseReference};
pub use envelope::{Envelope, PROTOCOL_VERSION};
pub use error::FastError;
pub use ids::{Time, UserId, NANOS_PER_HOUR, NANOS_PER_MINUTE};
pub use messages::{CompleteFast, ErrorCode, ErrorReply, Request, Response, StartNewFast};
pub use session::{
    FastHistory, FastStatus, FastingSession, GoalHours, MAX_GOAL_HOURS, MIN_GOAL_HOURS,
};
