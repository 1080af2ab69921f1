//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the comment-sync REST API using
//! utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the comment-sync REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "comment-sync REST API",
        version = "0.1.0",
        description = "Fetches comments from a remote API, stores them locally and returns the stored record",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Comments
        crate::api::routes::sync_external_comment,
        crate::api::routes::get_stored_comment,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::StoredComment,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "comments", description = "Comments - Sync remote comments and read stored ones"),
        (name = "system", description = "System - Health and API documentation"),
    )
)]
pub struct ApiDoc;
