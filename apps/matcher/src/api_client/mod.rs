//! API client, the single point of entry for every backend call.
//!
//! Every request passes through `interceptor::prepare` (bearer token, tenant
//! id) on the way out. On the way back, an expired access token triggers one
//! coordinated refresh attempt, and every other failure is surfaced through
//! `SessionEvents` before being returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use crate::auth::guard::LOGIN_PATH;
use crate::config::REQUEST_TIMEOUT;
use crate::storage::CredentialStore;

pub mod events;
pub mod interceptor;
pub mod refresh;
pub mod request;

pub use events::{ConsoleEvents, RecordingEvents, SessionEvent, SessionEvents};
pub use refresh::{RefreshCoordinator, RefreshTicket, RefreshUnavailable, TokenRefresher};
pub use request::{ApiRequest, MultipartBody, MultipartPart, RequestBody};

/// Server message that marks an expired access token.
pub const EXPIRED_TOKEN_MESSAGE: &str = "jwt expired";
pub const SESSION_EXPIRED_NOTICE: &str = "Session expired. Please log in again.";
pub const GENERIC_FAILURE: &str = "Something went wrong!";
pub const NETWORK_FAILURE: &str = "Network error. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error (status {status}): {}", .message.as_deref().unwrap_or(GENERIC_FAILURE))]
    Server { status: u16, message: Option<String> },

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Token refresh not implemented")]
    RefreshUnavailable,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// The message the backend put in its error body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired(_))
    }

    fn is_expired_token(&self) -> bool {
        self.server_message() == Some(EXPIRED_TOKEN_MESSAGE)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<Value>,
}

/// Extracts `message` from a JSON error body. Validation failures often send
/// a list of messages; those are joined.
fn error_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.message? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Array(items) if !items.is_empty() => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    }
}

/// A successful response with its body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Bytes,
}

impl ApiResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(ApiError::Json)
    }
}

pub struct ApiClientBuilder {
    base_url: String,
    store: CredentialStore,
    events: Arc<dyn SessionEvents>,
    refresher: Arc<dyn TokenRefresher>,
    timeout: Duration,
}

impl ApiClientBuilder {
    pub fn events(mut self, events: Arc<dyn SessionEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = refresher;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        reqwest::Url::parse(&self.base_url).map_err(|e| {
            ApiError::InvalidRequest(format!("invalid base URL '{}': {e}", self.base_url))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()?;

        Ok(ApiClient {
            inner: Arc::new(Inner {
                http,
                base_url: self.base_url.trim_end_matches('/').to_string(),
                store: self.store,
                events: self.events,
                refresher: self.refresher,
                refresh: RefreshCoordinator::new(),
            }),
        })
    }
}

/// Cheap to clone; clones share credentials and refresh coordination.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    base_url: String,
    store: CredentialStore,
    events: Arc<dyn SessionEvents>,
    refresher: Arc<dyn TokenRefresher>,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    /// Defaults: console notifications, no refresh endpoint, 120 s timeout.
    pub fn builder(base_url: impl Into<String>, store: CredentialStore) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            store,
            events: Arc::new(ConsoleEvents),
            refresher: Arc::new(RefreshUnavailable),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.inner.store
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_refreshing()
    }

    /// Requests parked behind the in-flight refresh.
    pub fn pending_refresh_waiters(&self) -> usize {
        self.inner.refresh.waiting()
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut request = request;
        loop {
            let prepared = interceptor::prepare(request, &self.inner.store);
            let error = match self.dispatch(&prepared).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            if error.is_expired_token() && !prepared.retry {
                request = self.recover_session(prepared).await?;
                continue;
            }

            self.report(&error);
            return Err(error);
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.send(ApiRequest::post(path).json(body)).await?.json()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url(&request.path);
        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(body) => builder.multipart(body.to_form()?),
        };

        debug!("{} {}", request.method, url);
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return Ok(ApiResponse { status, body });
        }

        Err(ApiError::Server {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    /// Runs or waits for a token refresh. Returns the request ready to be
    /// replayed with the new token.
    async fn recover_session(&self, request: ApiRequest) -> Result<ApiRequest, ApiError> {
        let mut replay = request;
        replay.retry = true;

        match self.inner.refresh.begin_refresh_or_wait() {
            RefreshTicket::Wait(outcome) => {
                debug!(
                    "Refresh in progress; queueing {} {}",
                    replay.method, replay.path
                );
                match outcome.await {
                    Ok(Ok(token)) => {
                        replay.set_bearer(&token)?;
                        Ok(replay)
                    }
                    Ok(Err(reason)) => Err(ApiError::SessionExpired(reason)),
                    Err(_) => Err(ApiError::SessionExpired(
                        "token refresh was abandoned".to_string(),
                    )),
                }
            }
            RefreshTicket::Lead(lease) => {
                info!("Access token expired; attempting refresh");

                let refresh_token = self.inner.store.refresh_token();
                match self.inner.refresher.refresh(refresh_token).await {
                    Ok(session) => {
                        self.inner.store.store_session(&session);
                        lease.complete(Ok(session.access_token.clone()));
                        replay.set_bearer(&session.access_token)?;
                        Ok(replay)
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        warn!("Token refresh failed: {reason}");
                        self.inner.store.clear();
                        lease.complete(Err(reason.clone()));
                        self.inner.events.notify_error(SESSION_EXPIRED_NOTICE);
                        self.inner.events.redirect(LOGIN_PATH);
                        Err(ApiError::SessionExpired(reason))
                    }
                }
            }
        }
    }

    fn report(&self, error: &ApiError) {
        match error {
            ApiError::Server { status, message } => {
                warn!("Request failed with status {status}");
                self.inner
                    .events
                    .notify_error(message.as_deref().unwrap_or(GENERIC_FAILURE));
            }
            ApiError::Network(e) => {
                warn!("Request failed without a response: {e}");
                self.inner.events.notify_error(NETWORK_FAILURE);
            }
            _ => {}
        }
    }
}
