//! Upload API handler
//!
//! POST /api/images (multipart). Every part that carries a filename is one
//! upload item; items are ingested concurrently and reported individually.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::models::{UploadItem, UploadSummary};
use crate::AppState;

/// Most files accepted in one multipart request
pub const MAX_FILES_PER_REQUEST: usize = 20;

/// POST /api/images
///
/// 200 when at least one item succeeded, 400 when every item failed.
pub async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<UploadSummary>)> {
    let mut items = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if items.len() == MAX_FILES_PER_REQUEST {
            return Err(ApiError::BadRequest(format!(
                "Too many files (limit {})",
                MAX_FILES_PER_REQUEST
            )));
        }

        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read {}: {}", file_name, e)))?;

        items.push(UploadItem::new(file_name, content_type, data.to_vec()));
    }

    if items.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded".to_string()));
    }

    tracing::info!(files = items.len(), "Upload received");
    let summary = state.orchestrator.ingest_batch(items).await;

    let status = if summary.succeeded > 0 {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(summary)))
}

/// Build upload routes
///
/// The request body limit leaves room for a full batch of maximum-size
/// files; oversize single files are rejected per item.
pub fn upload_routes(max_file_size: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(64 * 1024)
        .saturating_mul(MAX_FILES_PER_REQUEST);

    Router::new()
        .route("/api/images", post(upload_images))
        .layer(DefaultBodyLimit::max(body_limit))
}
