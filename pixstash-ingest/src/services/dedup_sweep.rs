//! Deduplication Sweep
//!
//! Collapses every group of records sharing a content hash down to its
//! earliest member. For each later member the three variant files are
//! removed (missing files ignored), then the record is deleted.
//!
//! Runs to completion within one call. Only committed records are seen;
//! an ingest still in flight is not protected against.

use serde::Serialize;
use tracing::{info, warn};

use crate::db::AssetCatalog;
use crate::services::asset_storage::AssetStorage;

/// Result of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    /// Hashes that had more than one record
    pub groups: usize,
    /// Records removed
    pub removed: usize,
}

/// Remove every duplicate but the earliest record per content hash
///
/// Per-record failures are logged and that record is left in place;
/// a failure to list the groups is returned.
pub async fn sweep_duplicates(catalog: &dyn AssetCatalog, storage: &AssetStorage) -> sqlx::Result<DedupReport> {
    let groups = catalog.list_duplicate_groups().await?;
    let mut report = DedupReport {
        groups: groups.len(),
        removed: 0,
    };

    for group in &groups {
        let Some((keep, duplicates)) = group.records.split_first() else {
            continue;
        };

        for duplicate in duplicates {
            match storage.paths_for_url(&duplicate.url) {
                Some(paths) => {
                    if let Err(e) = storage.remove_variants(&paths).await {
                        warn!(asset_id = duplicate.id, error = %e, "Failed to remove duplicate variants");
                    }
                }
                None => warn!(asset_id = duplicate.id, url = %duplicate.url, "Duplicate URL outside the asset root"),
            }

            match catalog.delete_by_id(duplicate.id).await {
                Ok(()) => {
                    report.removed += 1;
                    info!(
                        hash = %group.content_hash,
                        kept = keep.id,
                        removed = duplicate.id,
                        "Removed duplicate asset"
                    );
                }
                Err(e) => warn!(asset_id = duplicate.id, error = %e, "Failed to delete duplicate record"),
            }
        }
    }

    info!(groups = report.groups, removed = report.removed, "Deduplication sweep finished");
    Ok(report)
}
