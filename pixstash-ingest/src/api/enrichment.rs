//! Enrichment job API handlers
//!
//! POST /api/images/enrichment, GET /api/images/enrichment,
//! POST /api/images/enrichment/cancel

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{EnrichmentStatus, StartOutcome};
use crate::AppState;

/// POST /api/images/enrichment response
#[derive(Debug, Serialize)]
pub struct StartEnrichmentResponse {
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /api/images/enrichment/cancel response
#[derive(Debug, Serialize)]
pub struct CancelEnrichmentResponse {
    pub cancelled: bool,
}

/// POST /api/images/enrichment
///
/// 202 when a run started, 200 when nothing needs enrichment,
/// 409 when a run is already active.
pub async fn start_enrichment(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<StartEnrichmentResponse>)> {
    match state.enrichment.start().await? {
        StartOutcome::Started { run_id, total } => Ok((
            StatusCode::ACCEPTED,
            Json(StartEnrichmentResponse {
                started: true,
                run_id: Some(run_id),
                total: Some(total),
                message: None,
            }),
        )),
        StartOutcome::NothingToDo => Ok((
            StatusCode::OK,
            Json(StartEnrichmentResponse {
                started: false,
                run_id: None,
                total: None,
                message: Some("no images need enrichment".to_string()),
            }),
        )),
    }
}

/// GET /api/images/enrichment
pub async fn enrichment_status(State(state): State<AppState>) -> Json<EnrichmentStatus> {
    Json(state.enrichment.status())
}

/// POST /api/images/enrichment/cancel
pub async fn cancel_enrichment(State(state): State<AppState>) -> Json<CancelEnrichmentResponse> {
    Json(CancelEnrichmentResponse {
        cancelled: state.enrichment.cancel(),
    })
}

/// Build enrichment routes
pub fn enrichment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/images/enrichment", post(start_enrichment).get(enrichment_status))
        .route("/api/images/enrichment/cancel", post(cancel_enrichment))
}
