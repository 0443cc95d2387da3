//! Configuration resolution for pixstash-ingest
//!
//! The annotator endpoint is resolved per call with Database → ENV → TOML
//! priority, so a configuration saved at runtime takes effect without a
//! restart.

use pixstash_common::config::{AnnotatorConfig, TomlConfig};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::db::settings;

/// Resolves the annotator configuration
///
/// The stored `ai_config` triple wins whenever its `api_url` is non-empty;
/// otherwise the static configuration (TOML overridden by environment) is used.
#[derive(Debug, Clone)]
pub struct AnnotatorConfigResolver {
    db: Option<SqlitePool>,
    static_config: AnnotatorConfig,
}

impl AnnotatorConfigResolver {
    /// Resolver backed by the settings table
    pub fn new(db: SqlitePool, static_config: AnnotatorConfig) -> Self {
        Self {
            db: Some(db),
            static_config,
        }
    }

    /// Resolver with no database tier
    pub fn static_only(static_config: AnnotatorConfig) -> Self {
        Self {
            db: None,
            static_config,
        }
    }

    /// Static tier from the TOML `[annotator]` section plus `PIXSTASH_AI_*`
    pub fn static_from_toml(toml_config: &TomlConfig) -> AnnotatorConfig {
        toml_config.annotator.clone().with_env_overrides()
    }

    pub async fn resolve(&self) -> AnnotatorConfig {
        if let Some(db) = &self.db {
            match settings::get_ai_config(db).await {
                Ok(Some(stored)) if !stored.api_url.trim().is_empty() => {
                    debug!("Annotator config from database");
                    return stored;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Stored annotator config unreadable, using static config");
                }
            }
        }

        debug!("Annotator config from static configuration");
        self.static_config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixstash_common::db::init_memory_database;

    fn static_config() -> AnnotatorConfig {
        AnnotatorConfig {
            api_url: "http://static.example".to_string(),
            api_key: "static-key".to_string(),
            model: "static-model".to_string(),
        }
    }

    #[tokio::test]
    async fn test_static_when_nothing_stored() {
        let pool = init_memory_database().await.unwrap();
        let resolver = AnnotatorConfigResolver::new(pool, static_config());

        assert_eq!(resolver.resolve().await, static_config());
    }

    #[tokio::test]
    async fn test_stored_config_wins() {
        let pool = init_memory_database().await.unwrap();
        let stored = AnnotatorConfig {
            api_url: "http://stored.example".to_string(),
            api_key: "stored-key".to_string(),
            model: "stored-model".to_string(),
        };
        settings::set_ai_config(&pool, &stored).await.unwrap();

        let resolver = AnnotatorConfigResolver::new(pool, static_config());
        assert_eq!(resolver.resolve().await, stored);
    }

    #[tokio::test]
    async fn test_stored_config_without_url_is_ignored() {
        let pool = init_memory_database().await.unwrap();
        let stored = AnnotatorConfig {
            api_url: "  ".to_string(),
            api_key: "stored-key".to_string(),
            model: "stored-model".to_string(),
        };
        settings::set_ai_config(&pool, &stored).await.unwrap();

        let resolver = AnnotatorConfigResolver::new(pool, static_config());
        assert_eq!(resolver.resolve().await, static_config());
    }

    #[tokio::test]
    async fn test_unreadable_stored_config_falls_back() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO settings (key, value) VALUES ('ai_config', '{broken')")
            .execute(&pool)
            .await
            .unwrap();

        let resolver = AnnotatorConfigResolver::new(pool, static_config());
        assert_eq!(resolver.resolve().await, static_config());
    }
}
