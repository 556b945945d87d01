//! Background progress task.
//!
//! Periodically recomputes elapsed hours for every fast in progress, so a
//! caller that only reads still sees a recent count. It also evicts idle
//! rate limiter and lock entries.

use crate::config::ProgressConfig;
use crate::server::FastStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Spawn the background progress task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_progress_task(
    store: Arc<FastStore>,
    config: ProgressConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Progress task disabled");
            return;
        }

        let interval_secs = config.interval_secs.max(1);
        tracing::info!("Progress task started (interval: {}s)", interval_secs);

        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;
            run_once(&store).await;
        }
    })
}

async fn run_once(store: &FastStore) {
    match store.recompute_all().await {
        Ok(0) => tracing::debug!("Progress: no fasts in progress"),
        Ok(updated) => tracing::info!("Progress: recomputed {} sessions", updated),
        Err(e) => tracing::error!("Progress error: {}", e),
    }

    store.rate_limits().shrink();
    store.prune_user_locks();
}
