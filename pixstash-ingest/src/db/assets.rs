//! Asset catalog operations
//!
//! Keyed record store for asset metadata. `content_hash` is the dedup
//! identity; the store does not enforce its uniqueness, so callers choose
//! between `insert` (plain) and `insert_if_absent` (atomic per hash).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{AssetRecord, NewAsset};

const SELECT_COLUMNS: &str = "id, url, stored_name, size_bytes, mime_type, width, height, \
                              content_hash, category, tags, created_at";

/// Outcome of an insert-if-absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No live record had this hash; the new record was stored
    Inserted(AssetRecord),
    /// A record with this hash already existed; nothing was written
    Existing(AssetRecord),
}

/// Records sharing one content hash, earliest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub content_hash: String,
    pub records: Vec<AssetRecord>,
}

/// Asset catalog consumed by the ingest pipeline and maintenance passes
#[async_trait]
pub trait AssetCatalog: Send + Sync {
    /// Earliest live record with this content hash
    async fn find_by_hash(&self, hash: &str) -> sqlx::Result<Option<AssetRecord>>;

    /// Store a record unconditionally, returning its id
    async fn insert(&self, asset: &NewAsset) -> sqlx::Result<i64>;

    /// Store a record unless one with the same hash exists
    async fn insert_if_absent(&self, asset: &NewAsset) -> sqlx::Result<InsertOutcome>;

    async fn update_tags_and_category(&self, id: i64, tags: &str, category: &str) -> sqlx::Result<()>;

    /// Records not yet enriched (empty tags), by id
    async fn list_with_empty_tags(&self) -> sqlx::Result<Vec<AssetRecord>>;

    /// Every hash with more than one live record
    async fn list_duplicate_groups(&self) -> sqlx::Result<Vec<DuplicateGroup>>;

    async fn delete_by_id(&self, id: i64) -> sqlx::Result<()>;
}

/// SQLite-backed catalog over the `images` table
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load a record by id
    pub async fn find_by_id(&self, id: i64) -> sqlx::Result<Option<AssetRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM images WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(asset_from_row).transpose()
    }

    /// All records, by id
    pub async fn list_all(&self) -> sqlx::Result<Vec<AssetRecord>> {
        let rows = sqlx::query(&format!("SELECT {} FROM images ORDER BY id ASC", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(asset_from_row).collect()
    }

    pub async fn count(&self) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await
    }
}

#[async_trait]
impl AssetCatalog for SqliteCatalog {
    async fn find_by_hash(&self, hash: &str) -> sqlx::Result<Option<AssetRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM images WHERE content_hash = ? ORDER BY id ASC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(asset_from_row).transpose()
    }

    async fn insert(&self, asset: &NewAsset) -> sqlx::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO images (url, stored_name, size_bytes, mime_type, width, height,
                                content_hash, category, tags, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&asset.url)
        .bind(&asset.stored_name)
        .bind(asset.size_bytes)
        .bind(&asset.mime_type)
        .bind(i64::from(asset.width))
        .bind(i64::from(asset.height))
        .bind(&asset.content_hash)
        .bind(&asset.category)
        .bind(&asset.tags)
        .bind(asset.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn insert_if_absent(&self, asset: &NewAsset) -> sqlx::Result<InsertOutcome> {
        // Single statement: SQLite serializes writers, so the existence check
        // and the insert cannot interleave with another insert.
        let result = sqlx::query(
            r#"
            INSERT INTO images (url, stored_name, size_bytes, mime_type, width, height,
                                content_hash, category, tags, created_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (SELECT 1 FROM images WHERE content_hash = ?)
            "#,
        )
        .bind(&asset.url)
        .bind(&asset.stored_name)
        .bind(asset.size_bytes)
        .bind(&asset.mime_type)
        .bind(i64::from(asset.width))
        .bind(i64::from(asset.height))
        .bind(&asset.content_hash)
        .bind(&asset.category)
        .bind(&asset.tags)
        .bind(asset.created_at.to_rfc3339())
        .bind(&asset.content_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(InsertOutcome::Inserted(
                asset.clone().with_id(result.last_insert_rowid()),
            ));
        }

        // The existing record may have been deleted since the statement ran
        match self.find_by_hash(&asset.content_hash).await? {
            Some(existing) => Ok(InsertOutcome::Existing(existing)),
            None => Err(sqlx::Error::RowNotFound),
        }
    }

    async fn update_tags_and_category(&self, id: i64, tags: &str, category: &str) -> sqlx::Result<()> {
        let result = sqlx::query("UPDATE images SET tags = ?, category = ? WHERE id = ?")
            .bind(tags)
            .bind(category)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }

    async fn list_with_empty_tags(&self) -> sqlx::Result<Vec<AssetRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM images WHERE tags = '' ORDER BY id ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(asset_from_row).collect()
    }

    async fn list_duplicate_groups(&self) -> sqlx::Result<Vec<DuplicateGroup>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM images
            WHERE content_hash IN (
                SELECT content_hash FROM images GROUP BY content_hash HAVING COUNT(*) > 1
            )
            ORDER BY content_hash ASC, id ASC
            "#,
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut groups: Vec<DuplicateGroup> = Vec::new();
        for row in &rows {
            let record = asset_from_row(row)?;
            match groups.last_mut() {
                Some(group) if group.content_hash == record.content_hash => group.records.push(record),
                _ => groups.push(DuplicateGroup {
                    content_hash: record.content_hash.clone(),
                    records: vec![record],
                }),
            }
        }

        Ok(groups)
    }

    async fn delete_by_id(&self, id: i64) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn asset_from_row(row: &SqliteRow) -> sqlx::Result<AssetRecord> {
    let created_at_str: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
        .with_timezone(&Utc);

    let width: i64 = row.try_get("width")?;
    let height: i64 = row.try_get("height")?;

    Ok(AssetRecord {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        stored_name: row.try_get("stored_name")?,
        size_bytes: row.try_get("size_bytes")?,
        mime_type: row.try_get("mime_type")?,
        width: u32::try_from(width).unwrap_or(0),
        height: u32::try_from(height).unwrap_or(0),
        content_hash: row.try_get("content_hash")?,
        category: row.try_get("category")?,
        tags: row.try_get("tags")?,
        created_at,
    })
}
