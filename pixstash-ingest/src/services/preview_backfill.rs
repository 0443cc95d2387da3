//! Preview backfill
//!
//! Walks the asset root and writes the missing preview variant for every
//! main variant that lacks one, using the encoder's preview policy.
//! Thumbnails and previews themselves are skipped, as are extensions the
//! encoder does not rasterize.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::IngestResult;
use crate::services::asset_storage::{VariantPaths, PREVIEW_SUFFIX, THUMB_SUFFIX};
use crate::services::variant_encoder::VariantEncoder;

/// Main-variant extensions eligible for backfill
const BACKFILL_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// Result of one backfill pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Previews written
    pub processed: usize,
    /// Main variants that already had a preview
    pub skipped: usize,
    /// Main variants that could not be read, decoded or written
    pub errors: usize,
}

/// Write missing previews beneath `root`
///
/// Blocking; callers run it under `tokio::task::spawn_blocking`.
pub fn backfill_previews(root: &Path, encoder: &VariantEncoder) -> BackfillReport {
    let mut report = BackfillReport::default();

    for entry in WalkDir::new(root).into_iter().filter_map(|e| match e {
        Ok(entry) => Some(entry),
        Err(err) => {
            warn!(error = %err, "Skipping unreadable directory entry");
            None
        }
    }) {
        if !entry.file_type().is_file() || !is_main_variant(entry.path()) {
            continue;
        }

        let paths = VariantPaths::from_main(entry.path());
        if paths.preview.exists() {
            report.skipped += 1;
            continue;
        }

        match write_preview(entry.path(), &paths.preview, encoder) {
            Ok(()) => {
                debug!(path = %paths.preview.display(), "Preview written");
                report.processed += 1;
            }
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Preview backfill failed");
                report.errors += 1;
            }
        }
    }

    info!(
        processed = report.processed,
        skipped = report.skipped,
        errors = report.errors,
        "Preview backfill finished"
    );
    report
}

fn is_main_variant(path: &Path) -> bool {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    if stem.ends_with(THUMB_SUFFIX) || stem.ends_with(PREVIEW_SUFFIX) {
        return false;
    }

    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| BACKFILL_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn write_preview(main: &Path, preview: &Path, encoder: &VariantEncoder) -> IngestResult<()> {
    let data = std::fs::read(main)?;
    let bytes = encoder.preview_from_bytes(&data)?;
    std::fs::write(preview, bytes)?;
    Ok(())
}
