//! Prometheus metrics endpoint.

use crate::server::FastStore;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Gauges come from storage (best effort); counters are monotonic since
/// startup.
pub async fn metrics_handler(Extension(store): Extension<Arc<FastStore>>) -> impl IntoResponse {
    let m = store.metrics();

    let active = store.storage().count_in_progress().await.unwrap_or(0);
    let history = store.storage().count_history().await.unwrap_or(0);
    let tracked_users = store.rate_limits().user_keys_count();

    let requests = m.requests_total.load(Ordering::Relaxed);
    let started = m.fasts_started.load(Ordering::Relaxed);
    let completed = m.fasts_completed.load(Ordering::Relaxed);
    let cancelled = m.fasts_cancelled.load(Ordering::Relaxed);
    let declined = m.declined_total.load(Ordering::Relaxed);
    let recomputed = m.recomputed_total.load(Ordering::Relaxed);
    let rate_limits = m.rate_limit_hits.load(Ordering::Relaxed);
    let protocol_errors = m.protocol_errors.load(Ordering::Relaxed);
    let errors = m.errors_total.load(Ordering::Relaxed);

    let body = format!(
        r#"# HELP fast_store_info Server information
# TYPE fast_store_info gauge
fast_store_info{{version="{version}"}} 1

# HELP fast_store_active_fasts Fasts currently in progress
# TYPE fast_store_active_fasts gauge
fast_store_active_fasts {active}

# HELP fast_store_history_entries Completed fasts in the database
# TYPE fast_store_history_entries gauge
fast_store_history_entries {history}

# HELP fast_store_rate_limited_users Callers tracked by the rate limiter
# TYPE fast_store_rate_limited_users gauge
fast_store_rate_limited_users {tracked_users}

# HELP fast_store_requests_total Total requests dispatched
# TYPE fast_store_requests_total counter
fast_store_requests_total {requests}

# HELP fast_store_fasts_started_total Fasts started
# TYPE fast_store_fasts_started_total counter
fast_store_fasts_started_total {started}

# HELP fast_store_fasts_completed_total Fasts completed
# TYPE fast_store_fasts_completed_total counter
fast_store_fasts_completed_total {completed}

# HELP fast_store_fasts_cancelled_total Fasts cancelled
# TYPE fast_store_fasts_cancelled_total counter
fast_store_fasts_cancelled_total {cancelled}

# HELP fast_store_declined_total Mutations declined by the lifecycle rules
# TYPE fast_store_declined_total counter
fast_store_declined_total {declined}

# HELP fast_store_recomputed_total Sessions recomputed by the progress task
# TYPE fast_store_recomputed_total counter
fast_store_recomputed_total {recomputed}

# HELP fast_store_rate_limit_hits_total Total rate limit rejections
# TYPE fast_store_rate_limit_hits_total counter
fast_store_rate_limit_hits_total {rate_limits}

# HELP fast_store_protocol_errors_total Malformed or unauthenticated requests
# TYPE fast_store_protocol_errors_total counter
fast_store_protocol_errors_total {protocol_errors}

# HELP fast_store_errors_total Storage failures
# TYPE fast_store_errors_total counter
fast_store_errors_total {errors}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::SqliteStorage;
    use fast_types::{FastingContent, UserId};

    #[tokio::test]
    async fn metrics_report_counters() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        let store = Arc::new(FastStore::new(
            Config::default(),
            Arc::new(storage),
            FastingContent::builtin(),
        ));
        store
            .start_new_fast(&UserId::derive("alice"), 12)
            .await
            .unwrap();

        let response = metrics_handler(Extension(store)).await.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(text.contains("fast_store_active_fasts 1"));
        assert!(text.contains("fast_store_fasts_started_total 1"));
        assert!(text.contains("# TYPE fast_store_errors_total counter"));
    }
}
