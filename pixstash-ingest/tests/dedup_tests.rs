//! Integration tests for the duplicate sweep

mod helpers;

use chrono::Utc;
use helpers::{png_bytes, ScriptedAnnotator, TestPipeline};
use pixstash_ingest::db::AssetCatalog;
use pixstash_ingest::models::{AssetRecord, NewAsset, UploadItem};
use pixstash_ingest::services::{sweep_duplicates, OutputFormat, VariantPaths};

/// Insert a second catalog row for `original`'s content, with its own files
async fn insert_copy(pipeline: &TestPipeline, original: &AssetRecord) -> (i64, VariantPaths) {
    let location = pipeline.storage.allocate(OutputFormat::Jpeg);
    std::fs::create_dir_all(location.paths.main.parent().unwrap()).unwrap();
    for path in location.paths.all() {
        std::fs::write(path, b"copy").unwrap();
    }

    let id = pipeline
        .catalog
        .insert(&NewAsset {
            url: location.url.clone(),
            stored_name: location.stored_name.clone(),
            size_bytes: 4,
            mime_type: "image/jpeg".to_string(),
            width: original.width,
            height: original.height,
            content_hash: original.content_hash.clone(),
            category: "other".to_string(),
            tags: String::new(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    (id, location.paths)
}

async fn ingest_one(pipeline: &TestPipeline, seed: u8) -> AssetRecord {
    pipeline
        .orchestrator(ScriptedAnnotator::empty().into_arc())
        .ingest(UploadItem::new("orig.png", None, png_bytes(16, 16, seed)))
        .await
        .unwrap()
        .asset()
        .clone()
}

#[tokio::test]
async fn test_sweep_keeps_earliest_and_removes_files() {
    let pipeline = TestPipeline::new().await;
    let original = ingest_one(&pipeline, 1).await;
    let (copy_a, paths_a) = insert_copy(&pipeline, &original).await;
    let (copy_b, paths_b) = insert_copy(&pipeline, &original).await;
    assert!(copy_a > original.id && copy_b > copy_a);

    let report = sweep_duplicates(pipeline.catalog.as_ref(), &pipeline.storage)
        .await
        .unwrap();

    assert_eq!(report.groups, 1);
    assert_eq!(report.removed, 2);

    let remaining = pipeline.catalog.list_all().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, original.id);

    for path in paths_a.all().into_iter().chain(paths_b.all()) {
        assert!(!path.exists(), "{} should be removed", path.display());
    }
    let kept = pipeline.storage.paths_for_url(&original.url).unwrap();
    for path in kept.all() {
        assert!(path.exists(), "{} should be kept", path.display());
    }
}

#[tokio::test]
async fn test_sweep_without_duplicates_is_a_no_op() {
    let pipeline = TestPipeline::new().await;
    ingest_one(&pipeline, 1).await;
    ingest_one(&pipeline, 2).await;

    let report = sweep_duplicates(pipeline.catalog.as_ref(), &pipeline.storage)
        .await
        .unwrap();

    assert_eq!(report.groups, 0);
    assert_eq!(report.removed, 0);
    assert_eq!(pipeline.catalog.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_sweep_tolerates_missing_files() {
    let pipeline = TestPipeline::new().await;
    let original = ingest_one(&pipeline, 3).await;
    let (_, paths) = insert_copy(&pipeline, &original).await;
    for path in paths.all() {
        std::fs::remove_file(path).unwrap();
    }

    let report = sweep_duplicates(pipeline.catalog.as_ref(), &pipeline.storage)
        .await
        .unwrap();

    assert_eq!(report.removed, 1);
    assert!(pipeline.catalog.list_duplicate_groups().await.unwrap().is_empty());
}
