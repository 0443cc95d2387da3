//! Database initialization for the asset catalog

pub mod init;

pub use init::*;
