//! Ingest Orchestrator
//!
//! Per-upload pipeline, each stage aborting the item on failure:
//! 1. Hash the original bytes and consult the dedup gate
//! 2. Decode and encode the variant set
//! 3. Allocate a unique base name under today's date directory
//! 4. Write the three variants
//! 5. Annotate the thumbnail (best-effort)
//! 6. Insert the catalog record (atomic per content hash)
//!
//! A store failure in step 6 leaves the written variants on disk.
//! Items of one multi-file upload run concurrently and independently.

use chrono::Utc;
use futures::future::join_all;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::db::{AssetCatalog, InsertOutcome};
use crate::error::{IngestError, IngestResult};
use crate::models::{join_tags, AssetRecord, NewAsset, UploadItem, UploadResult, UploadSummary, DEFAULT_CATEGORY};
use crate::services::annotator_client::Annotator;
use crate::services::asset_storage::AssetStorage;
use crate::services::hasher::{check_duplicate, hash_reader, HashResult};
use crate::services::variant_encoder::VariantEncoder;

/// Successful ingest of one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// New asset stored
    Created(AssetRecord),
    /// Content already known; the existing asset is returned
    Existing(AssetRecord),
}

impl IngestOutcome {
    pub fn asset(&self) -> &AssetRecord {
        match self {
            IngestOutcome::Created(asset) | IngestOutcome::Existing(asset) => asset,
        }
    }
}

/// Sequences the ingest pipeline for uploaded items
#[derive(Clone)]
pub struct IngestOrchestrator {
    catalog: Arc<dyn AssetCatalog>,
    storage: AssetStorage,
    encoder: Arc<VariantEncoder>,
    annotator: Arc<dyn Annotator>,
    max_file_size: u64,
}

impl IngestOrchestrator {
    pub fn new(
        catalog: Arc<dyn AssetCatalog>,
        storage: AssetStorage,
        encoder: Arc<VariantEncoder>,
        annotator: Arc<dyn Annotator>,
        max_file_size: u64,
    ) -> Self {
        Self {
            catalog,
            storage,
            encoder,
            annotator,
            max_file_size,
        }
    }

    /// Ingest one uploaded item
    pub async fn ingest(&self, item: UploadItem) -> IngestResult<IngestOutcome> {
        let file_name = item.file_name.clone();
        let size = item.data.len() as u64;
        if size > self.max_file_size {
            return Err(IngestError::InvalidInput(format!(
                "file too large: {} bytes (limit {})",
                size, self.max_file_size
            )));
        }

        let hint = item.extension().or_else(|| item.content_type.clone());
        let data = Arc::new(item.data);

        // Stage 1: hash + dedup gate
        let hash = {
            let data = Arc::clone(&data);
            tokio::task::spawn_blocking(move || hash_reader(&mut Cursor::new(data.as_slice()))).await??
        };

        if let HashResult::Duplicate(existing) = check_duplicate(self.catalog.as_ref(), &hash).await? {
            info!(file = %file_name, asset_id = existing.id, "Upload matches existing asset");
            return Ok(IngestOutcome::Existing(existing));
        }

        // Stage 2: decode + encode
        let set = {
            let encoder = Arc::clone(&self.encoder);
            let data = Arc::clone(&data);
            tokio::task::spawn_blocking(move || encoder.encode(&data, hint.as_deref())).await??
        };

        // Stages 3-4: naming + persistence
        let location = self.storage.allocate(set.output);
        self.storage.write_variants(&location, &set).await?;
        debug!(
            file = %file_name,
            stored_name = %location.stored_name,
            width = set.width,
            height = set.height,
            "Variants written"
        );

        // Stage 5: annotation, any outcome accepted
        let (tags, category) = match self.annotator.annotate(&set.thumbnail).await.annotation() {
            Some((tags, category)) => (
                join_tags(tags),
                if category.is_empty() {
                    DEFAULT_CATEGORY.to_string()
                } else {
                    category.to_string()
                },
            ),
            None => (String::new(), DEFAULT_CATEGORY.to_string()),
        };

        // Stage 6: catalog insert
        let new_asset = NewAsset {
            url: location.url.clone(),
            stored_name: location.stored_name.clone(),
            size_bytes: set.main.len() as i64,
            mime_type: set.mime_type().to_string(),
            width: set.width,
            height: set.height,
            content_hash: hash,
            category,
            tags,
            created_at: Utc::now(),
        };

        match self.catalog.insert_if_absent(&new_asset).await {
            Ok(InsertOutcome::Inserted(asset)) => {
                info!(file = %file_name, asset_id = asset.id, url = %asset.url, "Asset stored");
                Ok(IngestOutcome::Created(asset))
            }
            Ok(InsertOutcome::Existing(existing)) => {
                // Lost the race to a concurrent identical upload
                info!(
                    file = %file_name,
                    asset_id = existing.id,
                    "Concurrent upload stored first, discarding own variants"
                );
                if let Err(e) = self.storage.remove_variants(&location.paths).await {
                    warn!(error = %e, stored_name = %location.stored_name, "Failed to remove discarded variants");
                }
                Ok(IngestOutcome::Existing(existing))
            }
            Err(e) => {
                error!(
                    file = %file_name,
                    stored_name = %location.stored_name,
                    error = %e,
                    "Catalog insert failed, variants left on disk"
                );
                Err(IngestError::Store(e))
            }
        }
    }

    /// Ingest several items concurrently; results keep input order
    pub async fn ingest_batch(&self, items: Vec<UploadItem>) -> UploadSummary {
        let results = join_all(items.into_iter().map(|item| async move {
            let file_name = item.file_name.clone();
            match self.ingest(item).await {
                Ok(IngestOutcome::Created(asset)) => UploadResult::created(file_name, asset),
                Ok(IngestOutcome::Existing(asset)) => UploadResult::existing(file_name, asset),
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Upload failed");
                    UploadResult::failed(file_name, e.to_string())
                }
            }
        }))
        .await;

        let summary = UploadSummary::from_results(results);
        info!(succeeded = summary.succeeded, failed = summary.failed, "Upload batch finished");
        summary
    }
}
