//! Data models for pixstash-ingest
//!
//! - Asset catalog records
//! - Upload boundary (items in, per-item results out)
//! - Batch enrichment job status

pub mod asset;
pub mod enrichment;
pub mod upload;

pub use asset::{join_tags, AssetRecord, NewAsset, DEFAULT_CATEGORY};
pub use enrichment::{EnrichmentStatus, StartOutcome};
pub use upload::{UploadItem, UploadResult, UploadSummary};
