//! Database access for pixstash-ingest

pub mod assets;
pub mod settings;

pub use assets::{AssetCatalog, DuplicateGroup, InsertOutcome, SqliteCatalog};
