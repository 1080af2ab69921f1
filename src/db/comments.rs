//! Comment upsert and lookups.

use crate::error::PersistError;
use crate::types::StoredComment;

use super::{CommentRow, Database, NewComment};

type PersistResult<T> = std::result::Result<T, PersistError>;

impl Database {
    /// Insert a comment or update the existing row with the same `external_id`
    ///
    /// One statement: on conflict the mutable fields are overwritten, `created_at`
    /// is kept and `updated_at` becomes the later of the stored and new values.
    /// Returns the row as stored.
    pub async fn upsert_comment(&self, comment: &NewComment) -> PersistResult<StoredComment> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (
                external_id, group_id, name, email, body, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(external_id) DO UPDATE SET
                group_id = excluded.group_id,
                name = excluded.name,
                email = excluded.email,
                body = excluded.body,
                updated_at = MAX(comments.updated_at, excluded.updated_at)
            RETURNING
                id, external_id, group_id, name, email, body, created_at, updated_at
            "#,
        )
        .bind(comment.external_id)
        .bind(comment.group_id)
        .bind(&comment.name)
        .bind(&comment.email)
        .bind(&comment.body)
        .bind(comment.created_at.timestamp_millis())
        .bind(comment.updated_at.timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PersistError::from_sqlx("Failed to upsert comment", e))?;

        tracing::debug!(
            id = row.id,
            external_id = row.external_id,
            "comment upserted"
        );

        row.try_into()
    }

    /// Get a stored comment by its remote identifier
    pub async fn get_comment_by_external_id(
        &self,
        external_id: i64,
    ) -> PersistResult<Option<StoredComment>> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, external_id, group_id, name, email, body, created_at, updated_at
            FROM comments
            WHERE external_id = ?
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PersistError::from_sqlx("Failed to get comment", e))?;

        row.map(StoredComment::try_from).transpose()
    }

    /// Number of stored comments
    pub async fn count_comments(&self) -> PersistResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PersistError::from_sqlx("Failed to count comments", e))
    }
}
