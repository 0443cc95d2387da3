//! pixstash-ingest - Image Ingestion Service
//!
//! Accepts image uploads, deduplicates them by content hash, writes the
//! main/thumbnail/preview variants and tags them through a vision annotator.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pixstash_common::config::{
    default_config_path, load_toml_config, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use pixstash_ingest::AppState;

#[derive(Debug, Parser)]
#[command(name = "pixstash-ingest", version, about = "Image ingestion service")]
struct Args {
    /// Root folder holding the catalog database and uploads
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen port (overrides the config file)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before logging is up, so a load failure goes to stderr
    let config_path = args.config.clone().or_else(default_config_path);
    let (toml_config, config_error) = match &config_path {
        Some(path) => match load_toml_config(path) {
            Ok(config) => (config, None),
            Err(e) => (TomlConfig::default(), Some(e)),
        },
        None => (TomlConfig::default(), None),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        "Starting pixstash-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if let Some(e) = config_error {
        warn!(error = %e, "Config file unusable, using defaults");
    }

    // Step 1: Resolve root folder
    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder)
        .with_toml_value(toml_config.root_folder.clone())
        .resolve();

    // Step 2: Create root folder layout if missing
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    // Step 3: Open or create database
    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = pixstash_common::db::init_database(&db_path).await?;

    let uploads_path = initializer.uploads_path();
    info!("Uploads: {}", uploads_path.display());

    let state = AppState::new(db_pool, uploads_path, &toml_config)?;
    let app = pixstash_ingest::build_router(state);

    let port = args.port.unwrap_or(toml_config.server.port);
    let addr = format!("{}:{}", toml_config.server.bind_address, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
