//! HTTP API handlers for pixstash-ingest
//!
//! A thin layer over the pipeline services; authentication, settings CRUD
//! and static file serving live elsewhere.

pub mod enrichment;
pub mod health;
pub mod maintenance;
pub mod upload;

pub use enrichment::enrichment_routes;
pub use health::health_routes;
pub use maintenance::maintenance_routes;
pub use upload::upload_routes;
