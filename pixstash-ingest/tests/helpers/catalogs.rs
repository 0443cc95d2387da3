//! Catalog double delegating to SQLite with injectable misbehaviour

use async_trait::async_trait;
use pixstash_ingest::db::{AssetCatalog, DuplicateGroup, InsertOutcome, SqliteCatalog};
use pixstash_ingest::models::{AssetRecord, NewAsset};
use std::sync::Arc;
use std::time::Duration;

pub struct FaultyCatalog {
    inner: Arc<SqliteCatalog>,
    blind_hash_lookup: bool,
    list_delay: Option<Duration>,
    fail_inserts: bool,
}

impl FaultyCatalog {
    pub fn new(inner: Arc<SqliteCatalog>) -> Self {
        Self {
            inner,
            blind_hash_lookup: false,
            list_delay: None,
            fail_inserts: false,
        }
    }

    /// `find_by_hash` never matches, so every upload reaches the insert
    pub fn blind_hash_lookup(mut self) -> Self {
        self.blind_hash_lookup = true;
        self
    }

    /// Sleep before loading the enrichment selection
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Every insert fails as if the pool were exhausted
    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl AssetCatalog for FaultyCatalog {
    async fn find_by_hash(&self, hash: &str) -> sqlx::Result<Option<AssetRecord>> {
        if self.blind_hash_lookup {
            return Ok(None);
        }
        self.inner.find_by_hash(hash).await
    }

    async fn insert(&self, asset: &NewAsset) -> sqlx::Result<i64> {
        if self.fail_inserts {
            return Err(sqlx::Error::PoolTimedOut);
        }
        self.inner.insert(asset).await
    }

    async fn insert_if_absent(&self, asset: &NewAsset) -> sqlx::Result<InsertOutcome> {
        if self.fail_inserts {
            return Err(sqlx::Error::PoolTimedOut);
        }
        self.inner.insert_if_absent(asset).await
    }

    async fn update_tags_and_category(&self, id: i64, tags: &str, category: &str) -> sqlx::Result<()> {
        self.inner.update_tags_and_category(id, tags, category).await
    }

    async fn list_with_empty_tags(&self) -> sqlx::Result<Vec<AssetRecord>> {
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.list_with_empty_tags().await
    }

    async fn list_duplicate_groups(&self) -> sqlx::Result<Vec<DuplicateGroup>> {
        self.inner.list_duplicate_groups().await
    }

    async fn delete_by_id(&self, id: i64) -> sqlx::Result<()> {
        self.inner.delete_by_id(id).await
    }
}
