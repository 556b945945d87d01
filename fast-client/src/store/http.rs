//! HTTP client for the store service.
//!
//! Every call POSTs a MessagePack [`Envelope`] to `{base_url}/v1/call` and
//! decodes a MessagePack [`Response`].

use super::{FastingStore, StoreError};
use async_trait::async_trait;
use fast_types::{
    CompleteFast, Envelope, FastHistory, FastingContent, FastingSession, Request, Response,
    StartNewFast, UserId,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;

/// Content type of request and response bodies.
pub const MSGPACK_CONTENT_TYPE: &str = "application/msgpack";

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StoreError::Timeout
        } else if e.is_connect() || e.is_request() {
            StoreError::Unreachable(e.to_string())
        } else {
            StoreError::Protocol(e.to_string())
        }
    }
}

/// HTTP store configuration.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Base URL of the store service, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    /// Identity every call acts as.
    pub caller: UserId,
    /// Per-call timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl HttpStoreConfig {
    /// Create a configuration with the default timeout.
    pub fn new(base_url: &str, caller: UserId) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            caller,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Store client speaking the envelope protocol over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStore {
    config: HttpStoreConfig,
    http: reqwest::Client,
}

impl HttpStore {
    /// Create a new HTTP store client.
    pub fn new(config: HttpStoreConfig) -> Result<Self, StoreError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            config,
            http: builder.build()?,
        })
    }

    /// The identity calls act as.
    pub fn caller(&self) -> UserId {
        self.config.caller
    }

    /// URL of the call endpoint.
    pub fn call_url(&self) -> String {
        format!("{}/v1/call", self.config.base_url)
    }

    async fn call(&self, request: Request) -> Result<Response, StoreError> {
        let operation = request.name();
        let body = Envelope::new(self.config.caller, request)
            .to_bytes()
            .map_err(|e| StoreError::Protocol(e.to_string()))?;

        let response = self
            .http
            .post(self.call_url())
            .header(CONTENT_TYPE, MSGPACK_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        tracing::debug!(operation, status = status.as_u16(), "store call finished");

        match Response::from_bytes(&bytes) {
            Ok(Response::Error(reply)) => Err(reply.into()),
            Ok(response) if status.is_success() => Ok(response),
            _ if status == StatusCode::TOO_MANY_REQUESTS => Err(StoreError::RateLimited),
            _ if status == StatusCode::UNAUTHORIZED => Err(StoreError::NotAuthenticated),
            Ok(_) => Err(StoreError::Server {
                status: status.as_u16(),
                message: format!("unexpected reply to {operation}"),
            }),
            Err(_) if !status.is_success() => Err(StoreError::Server {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            }),
            Err(e) => Err(StoreError::Protocol(e.to_string())),
        }
    }

    async fn call_accepted(&self, request: Request) -> Result<bool, StoreError> {
        match self.call(request).await? {
            Response::Accepted { accepted } => Ok(accepted),
            other => Err(unexpected("Accepted", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &Response) -> StoreError {
    StoreError::Protocol(format!("expected {expected} reply, got {got:?}"))
}

#[async_trait]
impl FastingStore for HttpStore {
    async fn start_new_fast(&self, goal_hours: u32) -> Result<bool, StoreError> {
        self.call_accepted(Request::StartNewFast(StartNewFast { goal_hours }))
            .await
    }

    async fn complete_fast(&self, reflection_journal: &str) -> Result<bool, StoreError> {
        self.call_accepted(Request::CompleteFast(CompleteFast {
            reflection_journal: reflection_journal.to_string(),
        }))
        .await
    }

    async fn cancel_current_fast(&self) -> Result<bool, StoreError> {
        self.call_accepted(Request::CancelCurrentFast).await
    }

    async fn update_fasting_progress(&self) -> Result<bool, StoreError> {
        self.call_accepted(Request::UpdateFastingProgress).await
    }

    async fn get_fasting_progress(&self) -> Result<FastingSession, StoreError> {
        match self.call(Request::GetFastingProgress).await? {
            Response::Session(session) => Ok(session),
            other => Err(unexpected("Session", &other)),
        }
    }

    async fn get_all_fasting_sessions(&self) -> Result<Vec<FastingSession>, StoreError> {
        match self.call(Request::GetAllFastingSessions).await? {
            Response::Sessions { sessions } => Ok(sessions),
            other => Err(unexpected("Sessions", &other)),
        }
    }

    async fn get_fasting_history(&self) -> Result<Vec<FastHistory>, StoreError> {
        match self.call(Request::GetFastingHistory).await? {
            Response::History { entries } => Ok(entries),
            other => Err(unexpected("History", &other)),
        }
    }

    async fn get_fasting_content(&self) -> Result<FastingContent, StoreError> {
        match self.call(Request::GetFastingContent).await? {
            Response::Content(content) => Ok(content),
            other => Err(unexpected("Content", &other)),
        }
    }
}
