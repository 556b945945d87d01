//! HTTP endpoints for fast-store.
//!
//! `POST /v1/call` carries MessagePack envelopes; `/health` and `/metrics`
//! are for operators.

pub mod health;
mod metrics;

use crate::server::FastStore;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Router};
use fast_types::{ErrorCode, Response};
use std::sync::Arc;

pub use health::{init_start_time, HealthStatus, StoreHealth};

/// Content type of `/v1/call` bodies.
pub const MSGPACK_CONTENT_TYPE: &str = "application/msgpack";

/// Build the HTTP router with all endpoints.
pub fn build_router(store: Arc<FastStore>) -> Router {
    let body_limit = store.config().server.max_request_bytes;
    let mut router = Router::new()
        .route("/v1/call", post(call_handler))
        .route("/health", get(health::health_handler));

    if store.config().http.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(Extension(store))
}

/// Serve one envelope.
async fn call_handler(
    Extension(store): Extension<Arc<FastStore>>,
    body: Bytes,
) -> impl IntoResponse {
    let response = store.handle_bytes(&body).await;
    let status = status_for(&response);

    match response.to_bytes() {
        Ok(bytes) => (status, [(CONTENT_TYPE, MSGPACK_CONTENT_TYPE)], bytes).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn status_for(response: &Response) -> StatusCode {
    match response {
        Response::Error(reply) => match reply.code {
            ErrorCode::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::BadRequest | ErrorCode::UnsupportedVersion => StatusCode::BAD_REQUEST,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        },
        _ => StatusCode::OK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::SqliteStorage;
    use axum::body::Body;
    use axum::http::Request;
    use fast_types::{Envelope, FastingContent, StartNewFast, UserId};
    use tower::util::ServiceExt;

    async fn test_store(config: Config) -> Arc<FastStore> {
        let storage = SqliteStorage::in_memory().await.unwrap();
        Arc::new(FastStore::new(
            config,
            Arc::new(storage),
            FastingContent::builtin(),
        ))
    }

    fn call_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/call")
            .header(CONTENT_TYPE, MSGPACK_CONTENT_TYPE)
            .body(Body::from(body))
            .unwrap()
    }

    async fn decode(response: axum::response::Response) -> Response {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        Response::from_bytes(&bytes).unwrap()
    }

    #[tokio::test]
    async fn call_endpoint_serves_envelopes() {
        let app = build_router(test_store(Config::default()).await);
        let envelope = Envelope::new(
            UserId::derive("alice"),
            fast_types::Request::StartNewFast(StartNewFast { goal_hours: 12 }),
        );

        let response = app
            .oneshot(call_request(envelope.to_bytes().unwrap()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            MSGPACK_CONTENT_TYPE
        );
        assert_eq!(decode(response).await, Response::Accepted { accepted: true });
    }

    #[tokio::test]
    async fn malformed_envelope_is_400() {
        let app = build_router(test_store(Config::default()).await);

        let response = app.oneshot(call_request(vec![0xc1])).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(decode(response).await, Response::Error(_)));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut config = Config::default();
        config.server.max_request_bytes = 16;
        let app = build_router(test_store(config).await);

        let response = app.oneshot(call_request(vec![0u8; 64])).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = build_router(test_store(Config::default()).await);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_ok() {
        let app = build_router(test_store(Config::default()).await);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_can_be_disabled() {
        let mut config = Config::default();
        config.http.metrics_enabled = false;
        let app = build_router(test_store(config).await);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn error_codes_map_to_statuses() {
        let cases = [
            (ErrorCode::NotAuthenticated, StatusCode::UNAUTHORIZED),
            (ErrorCode::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (ErrorCode::BadRequest, StatusCode::BAD_REQUEST),
            (ErrorCode::UnsupportedVersion, StatusCode::BAD_REQUEST),
            (ErrorCode::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (code, status) in cases {
            assert_eq!(status_for(&Response::error(code, "x")), status);
        }
        assert_eq!(
            status_for(&Response::Accepted { accepted: false }),
            StatusCode::OK
        );
    }
}
