//! REST API server module
//!
//! Exposes the comment sync operation over HTTP, together with a local read
//! endpoint, a health check and the OpenAPI 3.1 document.

use crate::{CommentSync, Config, Result};
use axum::{Router, http::HeaderValue, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Comments
/// - `GET /api/v1/external/comments/:id` - Fetch a comment from the remote API, store it, return it
/// - `GET /api/v1/comments/:external_id` - Read a previously stored comment
///
/// ## System
/// - `GET /api/v1/health` - Health check
/// - `GET /api/v1/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(sync: Arc<CommentSync>, config: Arc<Config>) -> Router {
    let state = AppState::new(sync);

    let router = Router::new()
        // Comments
        .route(
            "/api/v1/external/comments/:id",
            get(routes::sync_external_comment),
        )
        .route(
            "/api/v1/comments/:external_id",
            get(routes::get_stored_comment),
        )
        // System
        .route("/api/v1/health", get(routes::health_check))
        .route("/api/v1/openapi.json", get(routes::openapi_spec));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config (outermost)
    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed origins
/// are allowed. Methods and headers are unrestricted.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the sync service's shutdown token is cancelled, then stops
/// accepting connections and lets in-flight requests finish.
///
/// # Example
///
/// ```no_run
/// use comment_sync::{CommentSync, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let sync = Arc::new(CommentSync::new(config.clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// comment_sync::api::start_api_server(sync, Arc::new(config)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(sync: Arc<CommentSync>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    serve(listener, sync, config).await
}

/// Serve the API on an already bound listener until shutdown
pub async fn serve(listener: TcpListener, sync: Arc<CommentSync>, config: Arc<Config>) -> Result<()> {
    if let Ok(address) = listener.local_addr() {
        tracing::info!(address = %address, "API server listening");
    }

    let shutdown = sync.shutdown_token();
    let app = create_router(sync, config);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
