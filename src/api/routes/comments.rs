//! Comment handlers.

use crate::Result;
use crate::api::AppState;
use crate::types::StoredComment;
use axum::{
    Json,
    extract::{Path, State},
};

/// GET /external/comments/:id - Fetch, store and return a remote comment
#[utoipa::path(
    get,
    path = "/api/v1/external/comments/{id}",
    tag = "comments",
    params(
        ("id" = String, Path, description = "Comment identifier in the remote API")
    ),
    responses(
        (status = 200, description = "Comment fetched and stored", body = StoredComment),
        (status = 404, description = "Remote API did not deliver the comment", body = crate::error::ApiError),
        (status = 500, description = "Comment could not be saved", body = crate::error::ApiError),
        (status = 502, description = "Remote API unavailable (surface policy only)", body = crate::error::ApiError),
        (status = 503, description = "Service is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn sync_external_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredComment>> {
    let stored = state.sync.get_external_comment_by_id(&id).await?;
    Ok(Json(stored))
}

/// GET /comments/:external_id - Read a stored comment
#[utoipa::path(
    get,
    path = "/api/v1/comments/{external_id}",
    tag = "comments",
    params(
        ("external_id" = i64, Path, description = "Comment identifier in the remote API")
    ),
    responses(
        (status = 200, description = "Stored comment", body = StoredComment),
        (status = 404, description = "Comment has not been synced", body = crate::error::ApiError)
    )
)]
pub async fn get_stored_comment(
    State(state): State<AppState>,
    Path(external_id): Path<i64>,
) -> Result<Json<StoredComment>> {
    let stored = state.sync.get_stored_comment(external_id).await?;
    Ok(Json(stored))
}
