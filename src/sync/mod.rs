//! Fetch, transform and persist a single remote comment
//!
//! [`CommentSync`] ties the pipeline together. Each call runs the stages of
//! [`SyncStage`] in order:
//!
//! 1. **Fetching** - [`RemoteClient::fetch_comment`] wrapped in [`with_retry`]
//! 2. **Transforming** - [`to_new_comment`]
//! 3. **Persisting** - [`Database::upsert_comment`]
//!
//! Fetch failures are reported according to [`FetchFailurePolicy`]; persistence
//! failures are always returned as [`Error::PersistFailed`].

use crate::config::{Config, FetchFailurePolicy};
use crate::db::Database;
use crate::error::{Error, FetchError, Result};
use crate::remote::RemoteClient;
use crate::retry::{RetryError, with_retry};
use crate::transform::to_new_comment;
use crate::types::{StoredComment, SyncStage};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The comment sync service
///
/// Cheap to share behind an `Arc`; every call is independent.
#[derive(Debug)]
pub struct CommentSync {
    db: Arc<Database>,
    client: RemoteClient,
    config: Arc<Config>,
    shutdown: CancellationToken,
}

impl CommentSync {
    /// Validate `config`, open the store and build the remote client
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let db = Database::with_config(&config.persistence).await?;
        Self::with_parts(Arc::new(config), Arc::new(db))
    }

    /// Build the service around an already opened store
    ///
    /// `config` is validated here as well, since it may not have come through
    /// [`Config::load`].
    pub fn with_parts(config: Arc<Config>, db: Arc<Database>) -> Result<Self> {
        config.validate()?;
        let client = RemoteClient::new(&config.remote)?;
        Ok(Self {
            db,
            client,
            config,
            shutdown: CancellationToken::new(),
        })
    }

    /// Fetch comment `id` from the remote API, store it and return the stored row
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when the remote API did not deliver the comment
    ///   (every fetch failure under [`FetchFailurePolicy::DegradeToNotFound`],
    ///   only a remote 404 under [`FetchFailurePolicy::Surface`])
    /// - [`Error::UpstreamUnavailable`] for other fetch failures under
    ///   [`FetchFailurePolicy::Surface`]
    /// - [`Error::PersistFailed`] when the store rejected the write
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) was called
    pub async fn get_external_comment_by_id(&self, id: &str) -> Result<StoredComment> {
        if self.shutdown.is_cancelled() {
            return Err(Error::ShuttingDown);
        }

        tracing::debug!(comment_id = %id, stage = %SyncStage::Fetching, "sync stage");
        let fetched = with_retry(&self.config.retry, &self.shutdown, || {
            self.client.fetch_comment(id)
        })
        .await;

        let dto = match fetched {
            Ok(dto) => dto,
            Err(RetryError::Cancelled) => {
                tracing::info!(comment_id = %id, stage = %SyncStage::Failed, "sync abandoned by shutdown");
                return Err(Error::ShuttingDown);
            }
            Err(e) => return Err(self.fetch_failure(id, e)),
        };

        tracing::debug!(comment_id = %id, stage = %SyncStage::Transforming, "sync stage");
        let record = to_new_comment(dto);

        tracing::debug!(comment_id = %id, stage = %SyncStage::Persisting, "sync stage");
        let stored = self.db.upsert_comment(&record).await.map_err(|e| {
            tracing::error!(
                comment_id = %id,
                stage = %SyncStage::Failed,
                error = %e,
                "failed to persist comment"
            );
            Error::PersistFailed(e)
        })?;

        tracing::info!(
            comment_id = %id,
            stage = %SyncStage::Done,
            id = stored.id,
            external_id = stored.external_id,
            "comment synced"
        );
        Ok(stored)
    }

    fn fetch_failure(&self, id: &str, err: RetryError<FetchError>) -> Error {
        let remote_not_found = err.inner().is_some_and(FetchError::is_not_found);

        tracing::warn!(
            comment_id = %id,
            stage = %SyncStage::Failed,
            error = %err,
            policy = ?self.config.fetch_failure_policy,
            "could not fetch comment"
        );

        match self.config.fetch_failure_policy {
            FetchFailurePolicy::DegradeToNotFound => Error::NotFound(id.to_string()),
            FetchFailurePolicy::Surface if remote_not_found => Error::NotFound(id.to_string()),
            FetchFailurePolicy::Surface => Error::UpstreamUnavailable {
                id: id.to_string(),
                reason: err.to_string(),
            },
        }
    }

    /// Read a comment from the store without contacting the remote API
    pub async fn get_stored_comment(&self, external_id: i64) -> Result<StoredComment> {
        if self.shutdown.is_cancelled() {
            return Err(Error::ShuttingDown);
        }
        self.db
            .get_comment_by_external_id(external_id)
            .await?
            .ok_or_else(|| Error::NotFound(external_id.to_string()))
    }

    /// Stop the service
    ///
    /// In-flight calls abandon their current attempt or backoff and return
    /// [`Error::ShuttingDown`], as do all later calls. The store is closed.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");
        self.shutdown.cancel();
        self.db.close().await;
        tracing::info!("Shutdown complete");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token cancelled by [`shutdown`](Self::shutdown)
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// The comment store
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// The active configuration
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }
}
