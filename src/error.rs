//! Error types for comment-sync
//!
//! This module provides the error taxonomy of the sync pipeline:
//! - [`FetchError`] for the remote comment API (transport, HTTP status, decode, limits)
//! - [`PersistError`] for the comment store
//! - [`Error`] for the orchestrated operation as seen by callers
//! - HTTP status code mapping and structured error bodies for the REST API

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for comment-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for comment-sync
///
/// Returned by [`CommentSync::get_external_comment_by_id`](crate::CommentSync::get_external_comment_by_id)
/// and by startup code. Fetch-stage failures only reach callers as [`Error::NotFound`]
/// (or [`Error::UpstreamUnavailable`] when configured); persistence failures always
/// surface as [`Error::PersistFailed`].
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "remote.base_url")
        key: Option<String>,
    },

    /// The external comment could not be obtained
    #[error("comment {0} not found")]
    NotFound(String),

    /// The fetched comment could not be saved
    #[error("failed to persist comment: {0}")]
    PersistFailed(#[from] PersistError),

    /// The remote API kept failing (only with `FetchFailurePolicy::Surface`)
    #[error("upstream unavailable for comment {id}: {reason}")]
    UpstreamUnavailable {
        /// The comment identifier that was requested
        id: String,
        /// Description of the last fetch failure
        reason: String,
    },

    /// Shutdown in progress - in-flight work was abandoned
    #[error("shutdown in progress: request abandoned")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Anything else
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Failures of a single call to the remote comment API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection could not be established or was lost (DNS, refused, reset)
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote answered with a 4xx status
    #[error("client error {status}: {body}")]
    Client {
        /// HTTP status code
        status: u16,
        /// Response body (possibly empty)
        body: String,
    },

    /// Remote answered with a 5xx status
    #[error("server error {status}: {body}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body (possibly empty)
        body: String,
    },

    /// No complete response within the response timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Response body was not a valid comment
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Response body exceeded the in-memory buffer limit
    #[error("response body exceeds {limit} bytes")]
    PayloadTooLarge {
        /// Configured limit in bytes
        limit: usize,
    },

    /// Request body exceeded the outbound limit; nothing was sent
    #[error("request body of {size} bytes exceeds {limit} bytes")]
    RequestTooLarge {
        /// Actual body size in bytes
        size: usize,
        /// Configured limit in bytes
        limit: usize,
    },

    /// The request could not be built (bad URL or header value)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// HTTP status carried by `Client`/`Server` errors
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Client { status, .. } | FetchError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for a genuine "404 Not Found" from the remote API
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Comment store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    /// A uniqueness constraint other than the external id conflict key failed
    #[error("duplicate key violation: {0}")]
    DuplicateKey(String),

    /// The store could not be reached (pool closed or exhausted, I/O, busy or locked)
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Any other store failure
    #[error("store error: {0}")]
    Other(String),
}

impl PersistError {
    /// Classify a sqlx error, prefixing the message with what was being attempted
    pub(crate) fn from_sqlx(context: &str, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => PersistError::StoreUnavailable(format!("{context}: {err}")),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PersistError::DuplicateKey(format!("{context}: {err}"))
            }
            sqlx::Error::Database(db) if db.code().is_some_and(|c| is_unavailable_code(&c)) => {
                PersistError::StoreUnavailable(format!("{context}: {err}"))
            }
            _ => PersistError::Other(format!("{context}: {err}")),
        }
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14), including extended codes
fn is_unavailable_code(code: &str) -> bool {
    code.parse::<i32>()
        .map(|c| matches!(c & 0xff, 5 | 6 | 14))
        .unwrap_or(false)
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "comment 999 not found",
///     "details": {
///       "comment_id": "999"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "persist_failed")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::UpstreamUnavailable { .. } => 502,
            Error::ShuttingDown => 503,
            Error::PersistFailed(_) => 500,
            Error::Config { .. } => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Unexpected(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::NotFound(_) => "not_found",
            Error::PersistFailed(_) => "persist_failed",
            Error::UpstreamUnavailable { .. } => "upstream_unavailable",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Unexpected(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();

        // Store and internal failures are logged with their cause; callers get a fixed message
        let (message, details) = match &error {
            Error::NotFound(id) => (
                error.to_string(),
                Some(serde_json::json!({ "comment_id": id })),
            ),
            Error::UpstreamUnavailable { id, .. } => (
                format!("upstream service unavailable for comment {id}"),
                Some(serde_json::json!({ "comment_id": id })),
            ),
            Error::PersistFailed(_) => ("failed to save comment".to_string(), None),
            Error::ShuttingDown => (error.to_string(), None),
            Error::Config { .. } | Error::Io(_) | Error::ApiServerError(_) | Error::Unexpected(_) => {
                ("internal server error".to_string(), None)
            }
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
