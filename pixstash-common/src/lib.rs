//! # pixstash common library
//!
//! Shared code for the pixstash services:
//! - Error type used across crates
//! - Configuration loading (TOML, environment, compiled defaults)
//! - Database initialization for the asset catalog

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;

pub use error::{Error, Result};
