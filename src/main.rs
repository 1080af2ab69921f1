//! comment-sync service binary
//!
//! Usage: `comment-sync [config.json]`. Without an argument the config path is
//! taken from `COMMENT_SYNC_CONFIG`; without either, defaults are used. A `.env`
//! file in the working directory is loaded first.

use comment_sync::{CommentSync, Config, run_with_shutdown};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "comment-sync exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> comment_sync::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("COMMENT_SYNC_CONFIG").map(PathBuf::from));

    let config = Config::load(config_path.as_deref())?;
    tracing::info!(
        base_url = %config.remote.base_url,
        database = %config.persistence.database_path.display(),
        policy = ?config.fetch_failure_policy,
        "configuration loaded"
    );

    let sync = Arc::new(CommentSync::new(config.clone()).await?);
    run_with_shutdown(sync, Arc::new(config)).await
}
