//! Maintenance API handlers
//!
//! POST /api/images/dedup, POST /api/images/previews/backfill,
//! GET /api/annotator/models

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::services::{backfill_previews, sweep_duplicates, AnnotatorError, BackfillReport, DedupReport, ModelInfo};
use crate::AppState;

/// GET /api/annotator/models response
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub data: Vec<ModelInfo>,
}

/// POST /api/images/dedup
///
/// Synchronous; returns once every duplicate group is collapsed.
pub async fn deduplicate(State(state): State<AppState>) -> ApiResult<Json<DedupReport>> {
    let report = sweep_duplicates(state.catalog.as_ref(), &state.storage).await?;
    Ok(Json(report))
}

/// POST /api/images/previews/backfill
pub async fn backfill(State(state): State<AppState>) -> ApiResult<Json<BackfillReport>> {
    let root = state.storage.root().to_path_buf();
    let encoder = state.encoder.clone();
    let report = tokio::task::spawn_blocking(move || backfill_previews(&root, &encoder)).await?;
    Ok(Json(report))
}

/// GET /api/annotator/models
///
/// 400 when the annotator is not configured, 502 when the provider fails.
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Json<ModelsResponse>> {
    let data = state.annotator_client.list_models().await.map_err(|e| match e {
        AnnotatorError::NotConfigured => {
            ApiError::BadRequest("Annotator API URL and key must be configured".to_string())
        }
        other => ApiError::Upstream(other.to_string()),
    })?;

    Ok(Json(ModelsResponse { data }))
}

/// Build maintenance routes
pub fn maintenance_routes() -> Router<AppState> {
    Router::new()
        .route("/api/images/dedup", post(deduplicate))
        .route("/api/images/previews/backfill", post(backfill))
        .route("/api/annotator/models", get(list_models))
}
