//! Test Helper Utilities
//!
//! Shared utilities for testing pixstash-ingest

#![allow(dead_code)]

pub mod annotators;
pub mod catalogs;
pub mod fake_provider;
pub mod image_generator;
pub mod pipeline;

// Re-export commonly used items
pub use annotators::{PanickingAnnotator, ScriptedAnnotator};
pub use catalogs::FaultyCatalog;
pub use fake_provider::{FakeProvider, ProviderReply};
pub use image_generator::{gif_bytes, png_bytes, SVG_64X32};
pub use pipeline::TestPipeline;
