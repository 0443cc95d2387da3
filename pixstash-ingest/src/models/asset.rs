//! Asset catalog records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category assigned when the annotator supplies none
pub const DEFAULT_CATEGORY: &str = "other";

/// Tag list delimiter in the stored `tags` column
const TAG_DELIMITER: char = ',';

/// Persistent asset record
///
/// `size_bytes`, `mime_type`, `width` and `height` describe the main
/// (compressed) variant; `content_hash` is the SHA-256 of the original upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: i64,
    pub url: String,
    #[serde(rename = "filename")]
    pub stored_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "hash")]
    pub content_hash: String,
    pub category: String,
    pub tags: String,
    pub created_at: DateTime<Utc>,
}

/// Asset record before the catalog assigns its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAsset {
    pub url: String,
    pub stored_name: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub content_hash: String,
    pub category: String,
    pub tags: String,
    pub created_at: DateTime<Utc>,
}

impl NewAsset {
    /// Attach the catalog-assigned id
    pub fn with_id(self, id: i64) -> AssetRecord {
        AssetRecord {
            id,
            url: self.url,
            stored_name: self.stored_name,
            size_bytes: self.size_bytes,
            mime_type: self.mime_type,
            width: self.width,
            height: self.height,
            content_hash: self.content_hash,
            category: self.category,
            tags: self.tags,
            created_at: self.created_at,
        }
    }
}

/// Join tags into the stored delimited form
pub fn join_tags(tags: &[String]) -> String {
    tags.join(&TAG_DELIMITER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tags: &str) -> AssetRecord {
        NewAsset {
            url: "/uploads/20240101/a.jpg".to_string(),
            stored_name: "a.jpg".to_string(),
            size_bytes: 1,
            mime_type: "image/jpeg".to_string(),
            width: 1,
            height: 1,
            content_hash: "h".to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            tags: tags.to_string(),
            created_at: Utc::now(),
        }
        .with_id(7)
    }

    #[test]
    fn test_join_tags() {
        let tags = vec!["cat".to_string(), "window".to_string()];
        assert_eq!(join_tags(&tags), "cat,window");
        assert_eq!(join_tags(&[]), "");
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(record("cat")).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["filename"], "a.jpg");
        assert_eq!(value["hash"], "h");
        assert_eq!(value["category"], "other");
    }
}
