//! Settings database operations
//!
//! Get/set accessors over the `settings` key-value table.

use pixstash_common::config::AnnotatorConfig;
use pixstash_common::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Settings key holding the installation-stored annotator configuration
pub const AI_CONFIG_KEY: &str = "ai_config";

/// Get the stored annotator configuration
///
/// **Returns:** Some(config) if stored, None if the key is absent
pub async fn get_ai_config(db: &Pool<Sqlite>) -> Result<Option<AnnotatorConfig>> {
    match get_setting(db, AI_CONFIG_KEY).await? {
        Some(value) => {
            let config = serde_json::from_str(&value)
                .map_err(|e| Error::Config(format!("Parse {} failed: {}", AI_CONFIG_KEY, e)))?;
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

/// Store the annotator configuration
pub async fn set_ai_config(db: &Pool<Sqlite>, config: &AnnotatorConfig) -> Result<()> {
    let value = serde_json::to_string(config).map_err(|source| Error::Encode {
        key: AI_CONFIG_KEY,
        source,
    })?;
    set_setting(db, AI_CONFIG_KEY, &value).await
}

/// Generic setting getter (internal)
async fn get_setting(db: &Pool<Sqlite>, key: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    Ok(row.map(|(value,)| value))
}

/// Generic setting setter (internal)
async fn set_setting(db: &Pool<Sqlite>, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
