//! # fast-client
//!
//! Fasting session controller for Unplugged.
//!
//! This is the library views use to drive a user's fast.
//!
//! ## Features
//!
//! - **Store-authoritative**: every displayed value comes from the store
//! - **Pure State Machine**: uses fast-core for side-effect-free lifecycle rules
//! - **Store Abstraction**: pluggable store (HTTP, in-memory)
//! - **Polling**: refreshes progress every minute while a fast is running
//!
//! ## Example
//!
//! ```ignore
//! use fast_client::{ControllerConfig, FastingController, HttpStore, HttpStoreConfig};
//!
//! let store = HttpStore::new(HttpStoreConfig::new("http://127.0.0.1:8080", user_id))?;
//! let controller = FastingController::new(store, ControllerConfig::default());
//!
//! controller.refresh_progress().await?;
//! controller.start_fast(24).await?;
//! let progress = controller.progress().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod controller;
pub mod store;

pub use controller::{
    ControllerConfig, ControllerError, FastOutcome, FastingController, SessionSnapshot,
};
pub use store::{FastingStore, HttpStore, HttpStoreConfig, MemoryStore, StoreError};
