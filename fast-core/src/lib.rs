//! # fast-core
//!
//! Pure fasting logic for Unplugged (no I/O, instant tests).
//!
//! This crate implements the session state machine, progress math and the
//! authoritative session ledger without any network or disk I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. Time is passed in explicitly (or read through the
//! [`Clock`] seam), so the same input always gives the same output.
//!
//! The actual I/O (store calls, polling timers) is performed by `fast-client`,
//! which interprets the actions produced by [`FastState::on_event`]. The store
//! service in `fast-store` applies mutations through [`FastLedger`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod ledger;
pub mod poll;
pub mod progress;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{elapsed_hours_between, FastLedger};
pub use poll::{MutationEpoch, PollGate, ReadToken, TickDecision, POLL_INTERVAL};
pub use progress::{encouragement_index, progress_percent, ElapsedDisplay, FastProgress};
pub use state::{Action, Event, FastState, Rejection};
