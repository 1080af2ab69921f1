//! Retry logic with exponential backoff
//!
//! This module provides bounded retries for transient failures. Delays grow
//! exponentially from `initial_delay`, are capped at `max_delay`, and can carry
//! jitter to prevent thundering herd. Retries stop as soon as the supplied
//! [`CancellationToken`] fires.
//!
//! # Example
//!
//! ```no_run
//! use comment_sync::retry::{IsRetryable, with_retry};
//! use comment_sync::config::RetryConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() {
//! let config = RetryConfig::default();
//! let cancel = CancellationToken::new();
//! let result = with_retry(&config, &cancel, || async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! })
//! .await;
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{FetchError, PersistError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            // Connection problems and slow peers are transient
            FetchError::Transport(_) | FetchError::Timeout(_) => true,
            // Any error response is retried, 4xx included
            FetchError::Client { .. } | FetchError::Server { .. } => true,
            // A body we cannot read or a request we cannot send will not get better
            FetchError::Decode(_)
            | FetchError::PayloadTooLarge { .. }
            | FetchError::RequestTooLarge { .. }
            | FetchError::InvalidRequest(_) => false,
        }
    }
}

impl IsRetryable for PersistError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Final failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; `last_error` is from the final attempt
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    Exhausted {
        /// Total attempts made (initial call included)
        attempts: u32,
        /// Error returned by the last attempt
        last_error: E,
    },

    /// The operation failed with an error that is not worth retrying
    #[error("{0}")]
    Permanent(E),

    /// The cancellation token fired before the operation completed
    #[error("operation cancelled")]
    Cancelled,
}

impl<E> RetryError<E> {
    /// The underlying operation error, if there is one
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Exhausted { last_error, .. } => Some(last_error),
            RetryError::Permanent(e) => Some(e),
            RetryError::Cancelled => None,
        }
    }

    /// Borrow the underlying operation error, if there is one
    pub fn inner(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { last_error, .. } => Some(last_error),
            RetryError::Permanent(e) => Some(e),
            RetryError::Cancelled => None,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (max retries, delays, backoff multiplier, jitter)
/// * `cancel` - Token that aborts the current attempt or backoff sleep
/// * `operation` - Async closure that returns `Result<T, E>` where `E` implements [`IsRetryable`]
///
/// # Returns
///
/// The first successful result, [`RetryError::Permanent`] for a non-retryable error,
/// [`RetryError::Exhausted`] once `1 + max_retries` attempts have failed, or
/// [`RetryError::Cancelled`].
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut retries: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            outcome = operation() => outcome,
        };

        match outcome {
            Ok(result) => {
                if retries > 0 {
                    tracing::info!(attempts = retries + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && retries < config.max_retries => {
                retries += 1;

                let delay = backoff_delay(config, retries);
                let delay = if config.jitter {
                    add_jitter(delay)
                        .max(config.initial_delay)
                        .min(config.max_delay)
                } else {
                    delay
                };

                tracing::warn!(
                    error = %e,
                    attempt = retries,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed, retrying"
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = retries + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: retries + 1,
                        last_error: e,
                    });
                }
                tracing::error!(
                    error = %e,
                    attempts = retries + 1,
                    "Operation failed with non-retryable error"
                );
                return Err(RetryError::Permanent(e));
            }
        }
    }
}

/// Un-jittered delay before retry number `retry` (1-based)
///
/// `initial_delay * backoff_multiplier^(retry - 1)`, capped at `max_delay`.
/// A multiplier that would produce a non-positive delay yields `initial_delay`.
pub fn backoff_delay(config: &RetryConfig, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
    let secs = config.initial_delay.as_secs_f64() * config.backoff_multiplier.powi(exponent);
    if secs.is_nan() || secs <= 0.0 {
        return config.initial_delay.min(config.max_delay);
    }
    if secs >= config.max_delay.as_secs_f64() {
        return config.max_delay;
    }
    Duration::from_secs_f64(secs)
}

/// Add random jitter of up to +/-50% to a delay
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(-0.5..=0.5);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
