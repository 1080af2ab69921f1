//! Database lifecycle and schema migrations.

use crate::config::PersistenceConfig;
use crate::error::{PersistError, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;

use super::Database;

impl Database {
    /// Create a new database connection with default pool settings
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn new(path: &Path) -> Result<Self> {
        Self::with_config(&PersistenceConfig {
            database_path: path.to_path_buf(),
            ..PersistenceConfig::default()
        })
        .await
    }

    /// Create a database connection sized by `config`
    pub async fn with_config(config: &PersistenceConfig) -> Result<Self> {
        let path = &config.database_path;

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PersistError::StoreUnavailable(format!(
                    "Failed to create database directory: {}",
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.acquire_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| PersistError::from_sqlx("Failed to connect to database", e))?;

        let db = Self { pool };

        // Run migrations
        db.run_migrations().await?;

        tracing::info!(path = %path.display(), "comment store ready");
        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| PersistError::from_sqlx("Failed to acquire connection", e))?;

        // Create schema version table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| PersistError::from_sqlx("Failed to create schema_version table", e))?;

        // Check current version
        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| PersistError::from_sqlx("Failed to query schema version", e))?;

        if current_version.unwrap_or(0) < 1 {
            Self::migrate_v1(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: Create the comments table
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying database migration v1");

        // Wrap migration in a transaction so partial failures don't leave the DB in a broken state
        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(|e| PersistError::from_sqlx("Failed to begin transaction", e))?;

        let result = async {
            sqlx::query(
                r#"
                CREATE TABLE comments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    external_id INTEGER NOT NULL UNIQUE,
                    group_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL,
                    body TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                )
                "#,
            )
            .execute(&mut *conn)
            .await
            .map_err(|e| PersistError::from_sqlx("Failed to create comments table", e))?;

            sqlx::query("CREATE INDEX idx_comments_group_id ON comments(group_id)")
                .execute(&mut *conn)
                .await
                .map_err(|e| PersistError::from_sqlx("Failed to create group index", e))?;

            Self::record_migration(&mut *conn, 1).await
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| PersistError::from_sqlx("Failed to commit migration v1", e))?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e.into());
            }
        }

        tracing::info!("Database migration v1 complete");
        Ok(())
    }

    async fn record_migration(
        conn: &mut SqliteConnection,
        version: i64,
    ) -> std::result::Result<(), PersistError> {
        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *conn)
            .await
            .map_err(|e| PersistError::from_sqlx("Failed to record migration", e))?;
        Ok(())
    }

    /// Close the connection pool; later queries fail with [`PersistError::StoreUnavailable`]
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
