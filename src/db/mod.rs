//! Database layer for comment-sync
//!
//! Handles SQLite persistence of synced comments.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`comments`] - Comment upsert and lookups

use crate::error::PersistError;
use crate::types::StoredComment;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod comments;
mod migrations;

/// Comment ready to be written to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    /// Identifier assigned by the remote API (conflict key)
    pub external_id: i64,
    /// Group (post) the comment belongs to
    pub group_id: i64,
    /// Comment title
    pub name: String,
    /// Author email
    pub email: String,
    /// Comment text
    pub body: String,
    /// Candidate creation time; ignored when the comment already exists
    pub created_at: DateTime<Utc>,
    /// Candidate update time; the stored value never moves backwards
    pub updated_at: DateTime<Utc>,
}

/// Comment record from database
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    /// Unique database ID
    pub id: i64,
    /// Identifier assigned by the remote API
    pub external_id: i64,
    /// Group (post) the comment belongs to
    pub group_id: i64,
    /// Comment title
    pub name: String,
    /// Author email
    pub email: String,
    /// Comment text
    pub body: String,
    /// Unix timestamp in milliseconds when first stored
    pub created_at: i64,
    /// Unix timestamp in milliseconds when last written
    pub updated_at: i64,
}

impl TryFrom<CommentRow> for StoredComment {
    type Error = PersistError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(StoredComment {
            id: row.id,
            external_id: row.external_id,
            group_id: row.group_id,
            name: row.name,
            email: row.email,
            body: row.body,
            created_at: from_millis("created_at", row.created_at)?,
            updated_at: from_millis("updated_at", row.updated_at)?,
        })
    }
}

fn from_millis(column: &str, millis: i64) -> Result<DateTime<Utc>, PersistError> {
    Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
        PersistError::Other(format!("stored {column} {millis} is out of range"))
    })
}

/// Database handle for comment-sync
#[derive(Debug)]
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
