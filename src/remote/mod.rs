//! HTTP client for the remote comment API
//!
//! [`RemoteClient`] performs exactly one `GET <base_url>/<id>` per call to
//! [`RemoteClient::fetch_comment`] and classifies every failure as a
//! [`FetchError`]. Retrying is left to [`crate::retry`].

use crate::config::RemoteConfig;
use crate::error::{Error, FetchError, Result};
use crate::types::ExternalComment;
use reqwest::header::{
    ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use url::Url;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest error-response body kept in a [`FetchError`]
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Client for the remote comment API
///
/// Cheap to clone; clones share the connection pool and the in-flight limit.
#[derive(Clone, Debug)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: Url,
    in_flight: Arc<Semaphore>,
    response_timeout: Duration,
    max_response_bytes: usize,
    max_request_bytes: usize,
}

impl RemoteClient {
    /// Build a client from the remote section of the configuration
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the base URL or a static header value is invalid.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", config.base_url, e),
            key: Some("remote.base_url".into()),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config {
                message: format!("base URL '{}' cannot carry a path", config.base_url),
                key: Some("remote.base_url".into()),
            });
        }

        let http = reqwest::Client::builder()
            .default_headers(default_headers(config)?)
            .connect_timeout(config.connect_timeout)
            .timeout(config.response_timeout)
            .pool_max_idle_per_host(config.max_connections)
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            in_flight: Arc::new(Semaphore::new(config.max_connections.max(1))),
            response_timeout: config.response_timeout,
            max_response_bytes: config.max_response_bytes,
            max_request_bytes: config.max_request_bytes,
        })
    }

    /// The configured base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of a single comment: `id` becomes one percent-encoded path segment
    pub fn comment_url(&self, id: &str) -> std::result::Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidRequest(format!("cannot append to {}", self.base_url)))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// Fetch a single comment by its external identifier
    ///
    /// One attempt, no retries. Non-2xx answers become [`FetchError::Client`] or
    /// [`FetchError::Server`]; a body that is not a comment becomes [`FetchError::Decode`].
    pub async fn fetch_comment(&self, id: &str) -> std::result::Result<ExternalComment, FetchError> {
        if id.is_empty() {
            return Err(FetchError::InvalidRequest("comment id is empty".into()));
        }

        let url = self.comment_url(id)?;
        let request = self
            .http
            .get(url)
            .header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string())
            .build()
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;

        let body = self.execute(request).await?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Send a request and return the body of a 2xx response
    pub(crate) async fn execute(
        &self,
        request: reqwest::Request,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        self.check_request_size(&request)?;

        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|e| FetchError::Transport(format!("client closed: {}", e)))?;

        let method = request.method().clone();
        let url = request.url().to_string();
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        tracing::info!(%method, %url, request_id = %request_id, "sending request");
        let started = Instant::now();

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        tracing::info!(
            %method,
            %url,
            request_id = %request_id,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "received response"
        );

        if status.is_client_error() || status.is_server_error() {
            // The body is only informational here; a broken body must not hide the status
            let body = self
                .read_body(response)
                .await
                .map(|bytes| error_body_text(&bytes))
                .unwrap_or_default();
            let status = status.as_u16();
            return Err(if status < 500 {
                FetchError::Client { status, body }
            } else {
                FetchError::Server { status, body }
            });
        }

        self.read_body(response).await
    }

    fn check_request_size(&self, request: &reqwest::Request) -> std::result::Result<(), FetchError> {
        // Streamed bodies have no byte view; trust the declared length instead
        let size = match request.body().and_then(|body| body.as_bytes()) {
            Some(bytes) => bytes.len(),
            None => request
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0),
        };
        if size > self.max_request_bytes {
            return Err(FetchError::RequestTooLarge {
                size,
                limit: self.max_request_bytes,
            });
        }
        Ok(())
    }

    /// Buffer a response body, failing as soon as it exceeds the configured limit
    async fn read_body(
        &self,
        mut response: reqwest::Response,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        let limit = self.max_response_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(FetchError::PayloadTooLarge { limit });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(e))? {
            if body.len() + chunk.len() > limit {
                return Err(FetchError::PayloadTooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.response_timeout)
        } else if err.is_builder() {
            FetchError::InvalidRequest(err.to_string())
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

fn default_headers(config: &RemoteConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent).map_err(|e| Error::Config {
            message: format!("invalid user agent '{}': {}", config.user_agent, e),
            key: Some("remote.user_agent".into()),
        })?,
    );

    if let Some(token) = &config.bearer_token {
        let mut value =
            HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| Error::Config {
                message: "bearer token contains characters not allowed in a header".into(),
                key: Some("remote.bearer_token".into()),
            })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

fn error_body_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect()
}
