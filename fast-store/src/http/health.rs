//! `GET /health`: liveness plus a storage probe.
//!
//! The probe counts running and completed fasts. If either query fails the
//! store still answers, with `"degraded"` and zero counts.

use crate::server::FastStore;
use crate::storage::FastStorage;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

static STARTED_AT: OnceLock<Instant> = OnceLock::new();

/// Record when the store came up. Later calls keep the first instant.
pub fn init_start_time() {
    STARTED_AT.get_or_init(Instant::now);
}

/// Whether storage answered the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreHealth {
    /// Storage answered.
    Ok,
    /// Storage queries failed; counts are zero.
    Degraded,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Storage probe result.
    pub status: StoreHealth,
    /// Crate version of the running store.
    pub version: &'static str,
    /// Fasts in progress across all users.
    pub active_fasts: u64,
    /// History entries across all users.
    pub completed_fasts: u64,
    /// Seconds since [`init_start_time`], 0 if it was never called.
    pub uptime_seconds: u64,
}

impl HealthStatus {
    /// Probe `storage` and build the report.
    pub async fn probe(storage: &dyn FastStorage) -> Self {
        let counts = async {
            let active = storage.count_in_progress().await?;
            let completed = storage.count_history().await?;
            Ok::<_, crate::error::StorageError>((active, completed))
        };

        let (status, active_fasts, completed_fasts) = match counts.await {
            Ok((active, completed)) => (StoreHealth::Ok, active, completed),
            Err(e) => {
                tracing::warn!(error = %e, "health probe could not query storage");
                (StoreHealth::Degraded, 0, 0)
            }
        };

        Self {
            status,
            version: env!("CARGO_PKG_VERSION"),
            active_fasts,
            completed_fasts,
            uptime_seconds: STARTED_AT
                .get()
                .map_or(0, |started| started.elapsed().as_secs()),
        }
    }
}

/// Serve the health report.
pub async fn health_handler(Extension(store): Extension<Arc<FastStore>>) -> Json<HealthStatus> {
    Json(HealthStatus::probe(store.storage()).await)
}
