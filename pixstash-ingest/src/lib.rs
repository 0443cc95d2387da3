//! pixstash-ingest library interface
//!
//! Exposes the pipeline services and the HTTP router for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use pixstash_common::config::TomlConfig;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::AnnotatorConfigResolver;
use crate::db::{AssetCatalog, SqliteCatalog};
use crate::services::{
    Annotator, AnnotatorError, AssetStorage, EnrichmentJobManager, HttpAnnotator, IngestOrchestrator,
    VariantEncoder,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub catalog: Arc<SqliteCatalog>,
    pub storage: AssetStorage,
    pub encoder: Arc<VariantEncoder>,
    pub orchestrator: IngestOrchestrator,
    /// Process-wide enrichment job; at most one run at a time
    pub enrichment: Arc<EnrichmentJobManager>,
    /// Provider client used for model listing
    pub annotator_client: Arc<HttpAnnotator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    pub max_file_size: u64,
}

impl AppState {
    /// Wire the pipeline against the real annotator provider
    pub fn new(
        db: SqlitePool,
        uploads_root: impl Into<PathBuf>,
        toml_config: &TomlConfig,
    ) -> Result<Self, AnnotatorError> {
        let resolver = Arc::new(AnnotatorConfigResolver::new(
            db.clone(),
            AnnotatorConfigResolver::static_from_toml(toml_config),
        ));
        let client = Arc::new(HttpAnnotator::new(resolver)?);
        let annotator: Arc<dyn Annotator> = client.clone();

        Ok(Self::with_annotator(db, uploads_root, toml_config, annotator, client))
    }

    /// Wire the pipeline with a caller-supplied annotator
    ///
    /// `client` still serves model listing.
    pub fn with_annotator(
        db: SqlitePool,
        uploads_root: impl Into<PathBuf>,
        toml_config: &TomlConfig,
        annotator: Arc<dyn Annotator>,
        client: Arc<HttpAnnotator>,
    ) -> Self {
        let catalog = Arc::new(SqliteCatalog::new(db.clone()));
        let dyn_catalog: Arc<dyn AssetCatalog> = catalog.clone();
        let storage = AssetStorage::new(uploads_root);
        let encoder = Arc::new(VariantEncoder::new(toml_config.encoding.clone()));
        let max_file_size = toml_config.upload.max_file_size;

        let orchestrator = IngestOrchestrator::new(
            dyn_catalog.clone(),
            storage.clone(),
            encoder.clone(),
            annotator.clone(),
            max_file_size,
        );
        let enrichment = Arc::new(EnrichmentJobManager::new(
            dyn_catalog,
            storage.clone(),
            annotator,
            toml_config.enrichment.concurrency,
        ));

        Self {
            db,
            catalog,
            storage,
            encoder,
            orchestrator,
            enrichment,
            annotator_client: client,
            startup_time: Utc::now(),
            max_file_size,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::upload_routes(state.max_file_size))
        .merge(api::enrichment_routes())
        .merge(api::maintenance_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
