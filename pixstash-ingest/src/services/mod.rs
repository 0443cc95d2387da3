//! Service modules for the image ingest pipeline
//!
//! Leaves first: hashing, encoding, storage and annotation; then the
//! orchestrator and the maintenance passes built on them.

pub mod annotator_client;
pub mod asset_storage;
pub mod dedup_sweep;
pub mod enrichment_job;
pub mod hasher;
pub mod ingest_orchestrator;
pub mod preview_backfill;
pub mod variant_encoder;

pub use annotator_client::{AnnotationOutcome, Annotator, AnnotatorError, HttpAnnotator, ModelInfo};
pub use asset_storage::{AssetStorage, VariantPaths};
pub use dedup_sweep::{sweep_duplicates, DedupReport};
pub use enrichment_job::EnrichmentJobManager;
pub use hasher::{hash_bytes, hash_reader, HashResult};
pub use ingest_orchestrator::{IngestOrchestrator, IngestOutcome};
pub use preview_backfill::{backfill_previews, BackfillReport};
pub use variant_encoder::{OutputFormat, SourceFormat, VariantEncoder, VariantSet};
