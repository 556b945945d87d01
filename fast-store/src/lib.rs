//! # fast-store
//!
//! Authoritative store for Unplugged fasting sessions.
//!
//! This crate implements the service that:
//! - Owns one fasting session record per user
//! - Applies start, cancel and complete under a per-user lock
//! - Appends completed fasts to an immutable history
//! - Recomputes elapsed hours in the background
//!
//! ## Architecture
//!
//! ```text
//! fast-client ──┐                      ┌── fast-client
//!               │  POST /v1/call       │
//!               │  (MessagePack)       │
//!           ┌───┴──────────────────────┴───┐
//!           │          fast-store          │
//!           │  FastLedger + rate limits    │
//!           │  ┌────────────────────────┐  │
//!           │  │ SQLite (sessions,      │  │
//!           │  │         history)       │  │
//!           │  └────────────────────────┘  │
//!           └──────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod content;
pub mod error;
pub mod http;
pub mod limits;
pub mod progress;
pub mod server;
pub mod storage;
