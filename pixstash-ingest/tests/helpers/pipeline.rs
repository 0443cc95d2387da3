//! Pipeline fixture: in-memory catalog plus a temporary asset root

use pixstash_common::config::EncodingConfig;
use pixstash_ingest::db::{AssetCatalog, SqliteCatalog};
use pixstash_ingest::services::{
    Annotator, AssetStorage, EnrichmentJobManager, IngestOrchestrator, VariantEncoder,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

/// Default per-file limit used by the fixture (10 MiB)
pub const TEST_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Holds the temp dir alive for the duration of a test
pub struct TestPipeline {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub catalog: Arc<SqliteCatalog>,
    pub storage: AssetStorage,
    pub encoder: Arc<VariantEncoder>,
}

impl TestPipeline {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let pool = pixstash_common::db::init_memory_database()
            .await
            .expect("Failed to create in-memory database");

        Self {
            storage: AssetStorage::new(dir.path().join("uploads")),
            catalog: Arc::new(SqliteCatalog::new(pool.clone())),
            encoder: Arc::new(VariantEncoder::new(EncodingConfig::default())),
            pool,
            dir,
        }
    }

    pub fn dyn_catalog(&self) -> Arc<dyn AssetCatalog> {
        self.catalog.clone()
    }

    pub fn orchestrator(&self, annotator: Arc<dyn Annotator>) -> IngestOrchestrator {
        self.orchestrator_with_limit(annotator, TEST_MAX_FILE_SIZE)
    }

    pub fn orchestrator_with_limit(&self, annotator: Arc<dyn Annotator>, max_file_size: u64) -> IngestOrchestrator {
        IngestOrchestrator::new(
            self.dyn_catalog(),
            self.storage.clone(),
            self.encoder.clone(),
            annotator,
            max_file_size,
        )
    }

    pub fn enrichment(&self, annotator: Arc<dyn Annotator>, concurrency: usize) -> Arc<EnrichmentJobManager> {
        Arc::new(EnrichmentJobManager::new(
            self.dyn_catalog(),
            self.storage.clone(),
            annotator,
            concurrency,
        ))
    }
}
