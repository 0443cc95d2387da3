//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `PIXSTASH_ROOT_FOLDER`
//! 3. TOML config file `root_folder`
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "PIXSTASH_ROOT_FOLDER";
/// Environment variable overriding the TOML config file location
pub const CONFIG_PATH_ENV: &str = "PIXSTASH_CONFIG";
/// Environment variables overriding the static annotator configuration
pub const AI_API_URL_ENV: &str = "PIXSTASH_AI_API_URL";
pub const AI_API_KEY_ENV: &str = "PIXSTASH_AI_API_KEY";
pub const AI_MODEL_ENV: &str = "PIXSTASH_AI_MODEL";

/// Catalog database file name inside the root folder
pub const DATABASE_FILE: &str = "pixstash.db";
/// Asset root directory name inside the root folder
pub const UPLOADS_DIR: &str = "uploads";

/// Complete TOML configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub encoding: EncodingConfig,
    pub enrichment: EnrichmentConfig,
    pub annotator: AnnotatorConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

/// `[upload]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted upload, in bytes
    pub max_file_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

/// `[encoding]` section: variant quality levels and bounding boxes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub main_quality: u8,
    pub thumbnail_max_dimension: u32,
    pub thumbnail_quality: u8,
    pub preview_max_width: u32,
    pub preview_max_height: u32,
    pub preview_quality: u8,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            main_quality: 85,
            thumbnail_max_dimension: 300,
            thumbnail_quality: 75,
            preview_max_width: 1920,
            preview_max_height: 1080,
            preview_quality: 75,
        }
    }
}

/// `[enrichment]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Worker pool size for the batch enrichment job
    pub concurrency: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self { concurrency: 3 }
    }
}

/// Annotator endpoint settings.
///
/// Used both as the static `[annotator]` TOML section and as the JSON value
/// stored under the `ai_config` settings key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

impl AnnotatorConfig {
    /// Both endpoint and key are present
    pub fn is_configured(&self) -> bool {
        !self.api_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// Apply `PIXSTASH_AI_*` environment overrides (non-empty values only)
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = non_empty_env(AI_API_URL_ENV) {
            self.api_url = url;
        }
        if let Some(key) = non_empty_env(AI_API_KEY_ENV) {
            self.api_key = key;
        }
        if let Some(model) = non_empty_env(AI_MODEL_ENV) {
            self.model = model;
        }
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Default TOML config file location for the platform
///
/// `PIXSTASH_CONFIG` wins over the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = non_empty_env(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("pixstash").join("config.toml"))
}

/// Load TOML configuration
///
/// Missing file → defaults (with a warning). Unreadable or unparsable file → error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using defaults"
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("pixstash"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\pixstash"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("pixstash"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/pixstash"))
        } else {
            dirs::data_local_dir()
                .map(|d| d.join("pixstash"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/pixstash"))
        };

        Self { root_folder }
    }
}

/// Resolves the root folder from CLI → ENV → TOML → compiled default
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml_value(mut self, path: Option<PathBuf>) -> Self {
        self.toml_value = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!(path = %path.display(), "Root folder from command line");
            return path.clone();
        }

        if let Some(path) = non_empty_env(ROOT_FOLDER_ENV) {
            info!(path = %path, "Root folder from environment");
            return PathBuf::from(path);
        }

        if let Some(path) = &self.toml_value {
            info!(path = %path.display(), "Root folder from TOML config");
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout on first run
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder and the asset root beneath it
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.uploads_path())?;
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.root_folder.join(UPLOADS_DIR)
    }
}
