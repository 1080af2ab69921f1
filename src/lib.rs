//! # comment-sync
//!
//! Fetches comments from a remote JSON API, stores them in a local SQLite
//! database with an idempotent upsert, and returns the stored record.
//!
//! ## Design Philosophy
//!
//! comment-sync is designed to be:
//! - **Resilient** - Transient remote failures are retried with capped exponential backoff
//! - **Idempotent** - Re-syncing a comment updates the existing row in place
//! - **Explicit** - Every stage reports typed errors; configuration is an immutable value
//!
//! ## Quick Start
//!
//! ```no_run
//! use comment_sync::{CommentSync, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let sync = CommentSync::new(config).await?;
//!
//!     let comment = sync.get_external_comment_by_id("1").await?;
//!     println!("stored comment {} at {}", comment.external_id, comment.updated_at);
//!
//!     sync.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// HTTP client for the remote comment API
pub mod remote;
/// Retry logic with exponential backoff
pub mod retry;
/// Fetch-transform-persist orchestration
pub mod sync;
/// Mapping from remote comments to storable records
pub mod transform;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{Config, FetchFailurePolicy};
pub use db::Database;
pub use error::{ApiError, Error, ErrorDetail, FetchError, PersistError, Result, ToHttpStatus};
pub use remote::RemoteClient;
pub use retry::{IsRetryable, RetryError};
pub use sync::CommentSync;
pub use types::{ExternalComment, StoredComment, SyncStage};

use std::sync::Arc;

/// Serve the REST API until a termination signal arrives, then shut down.
///
/// On SIGTERM/SIGINT the service stops accepting requests, in-flight syncs are
/// cancelled, the server drains and the store is closed.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use comment_sync::{CommentSync, Config, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::load(None)?;
///     let sync = Arc::new(CommentSync::new(config.clone()).await?);
///
///     run_with_shutdown(sync, Arc::new(config)).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(sync: Arc<CommentSync>, config: Arc<Config>) -> Result<()> {
    let token = sync.shutdown_token();
    let mut server = tokio::spawn(api::start_api_server(sync.clone(), config));

    let early_exit = tokio::select! {
        _ = wait_for_signal() => None,
        result = &mut server => Some(result),
    };

    let result = match early_exit {
        Some(result) => result,
        None => {
            token.cancel();
            server.await
        }
    };

    sync.shutdown().await;

    result.map_err(|e| Error::Unexpected(format!("API server task failed: {}", e)))?
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
