//! Batch Enrichment Job
//!
//! Re-runs the annotator over every asset whose tags are still empty.
//!
//! # Run slot
//! A single global slot, taken with a compare-and-swap. A start while the
//! slot is held is rejected with `JobError::Conflict`; there is no queue.
//! Until the run task is spawned the slot is held by a `SlotGuard` local
//! to `start`; after that a `RunGuard` owned by the task releases it, so
//! neither a dropped start request nor a panicking run can leave it taken.
//!
//! # Progress
//! `(total, completed, running)` plus per-run counters, all atomics.
//! Every selected item increments `completed` exactly once, including
//! items skipped after a cancel, so a finished run always ends with
//! `completed == total`.
//!
//! # Concurrency
//! `futures::stream::buffer_unordered(concurrency)` over the selection.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::AssetCatalog;
use crate::error::JobError;
use crate::models::{join_tags, AssetRecord, EnrichmentStatus, StartOutcome};
use crate::services::annotator_client::{AnnotationOutcome, Annotator};
use crate::services::asset_storage::{read_file, AssetStorage};

#[derive(Debug, Default)]
struct Progress {
    total: AtomicUsize,
    completed: AtomicUsize,
    updated: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    running: AtomicBool,
    cancelled: AtomicBool,
}

impl Progress {
    fn reset(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        self.updated.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
        self.skipped.store(0, Ordering::SeqCst);
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct RunMeta {
    run_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    cancel_token: Option<CancellationToken>,
}

/// How one item ended
enum ItemOutcome {
    Updated,
    NoAnnotation,
    Failed,
    Skipped,
}

/// Owns the enrichment run slot, progress and worker pool
pub struct EnrichmentJobManager {
    catalog: Arc<dyn AssetCatalog>,
    storage: AssetStorage,
    annotator: Arc<dyn Annotator>,
    concurrency: usize,
    slot: AtomicBool,
    progress: Progress,
    meta: Mutex<RunMeta>,
    idle_tx: watch::Sender<bool>,
}

impl EnrichmentJobManager {
    pub fn new(
        catalog: Arc<dyn AssetCatalog>,
        storage: AssetStorage,
        annotator: Arc<dyn Annotator>,
        concurrency: usize,
    ) -> Self {
        let (idle_tx, _) = watch::channel(true);
        Self {
            catalog,
            storage,
            annotator,
            concurrency: concurrency.max(1),
            slot: AtomicBool::new(false),
            progress: Progress::default(),
            meta: Mutex::new(RunMeta::default()),
            idle_tx,
        }
    }

    /// Start a run over all un-tagged assets
    ///
    /// Returns `NothingToDo` without entering the running state when no
    /// asset needs enrichment.
    pub async fn start(self: &Arc<Self>) -> Result<StartOutcome, JobError> {
        let slot = SlotGuard::acquire(&self.slot).ok_or(JobError::Conflict)?;

        // Dropping this future while the selection loads releases the slot
        let items = self.catalog.list_with_empty_tags().await?;

        if items.is_empty() {
            info!("Enrichment requested but no un-tagged assets");
            return Ok(StartOutcome::NothingToDo);
        }

        let total = items.len();
        let run_id = Uuid::new_v4();
        let cancel_token = CancellationToken::new();

        self.progress.reset(total);
        {
            let mut meta = self.meta();
            meta.run_id = Some(run_id);
            meta.started_at = Some(Utc::now());
            meta.finished_at = None;
            meta.cancel_token = Some(cancel_token.clone());
        }
        self.progress.running.store(true, Ordering::SeqCst);
        self.idle_tx.send_replace(false);

        info!(run_id = %run_id, total, concurrency = self.concurrency, "Enrichment run started");

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = RunGuard {
                manager: Arc::clone(&manager),
            };
            manager.run(items, cancel_token).await;
        });
        slot.disarm();

        Ok(StartOutcome::Started { run_id, total })
    }

    /// Request cancellation of the active run
    ///
    /// Returns false when no run is active.
    pub fn cancel(&self) -> bool {
        if !self.progress.running.load(Ordering::SeqCst) {
            return false;
        }

        let meta = self.meta();
        match &meta.cancel_token {
            Some(token) => {
                token.cancel();
                self.progress.cancelled.store(true, Ordering::SeqCst);
                info!(run_id = ?meta.run_id, "Enrichment run cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Progress snapshot for polling
    pub fn status(&self) -> EnrichmentStatus {
        let meta = self.meta();
        EnrichmentStatus {
            total: self.progress.total.load(Ordering::SeqCst),
            completed: self.progress.completed.load(Ordering::SeqCst),
            running: self.progress.running.load(Ordering::SeqCst),
            updated: self.progress.updated.load(Ordering::SeqCst),
            failed: self.progress.failed.load(Ordering::SeqCst),
            skipped: self.progress.skipped.load(Ordering::SeqCst),
            cancelled: self.progress.cancelled.load(Ordering::SeqCst),
            run_id: meta.run_id,
            started_at: meta.started_at,
            finished_at: meta.finished_at,
        }
    }

    pub fn is_running(&self) -> bool {
        self.progress.running.load(Ordering::SeqCst)
    }

    /// Resolves once no run is active
    pub async fn wait_until_idle(&self) {
        let mut idle_rx = self.idle_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = idle_rx.wait_for(|idle| *idle).await;
    }

    async fn run(&self, items: Vec<AssetRecord>, cancel_token: CancellationToken) {
        stream::iter(items)
            .map(|asset| {
                let cancel_token = cancel_token.clone();
                async move {
                    let outcome = self.process_item(&asset, &cancel_token).await;
                    self.record(outcome);
                }
            })
            .buffer_unordered(self.concurrency)
            .for_each(|_| async {})
            .await;
    }

    fn record(&self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Updated => {
                self.progress.updated.fetch_add(1, Ordering::SeqCst);
            }
            ItemOutcome::Failed => {
                self.progress.failed.fetch_add(1, Ordering::SeqCst);
            }
            ItemOutcome::Skipped => {
                self.progress.skipped.fetch_add(1, Ordering::SeqCst);
            }
            ItemOutcome::NoAnnotation => {}
        }
        self.progress.completed.fetch_add(1, Ordering::SeqCst);
    }

    async fn process_item(&self, asset: &AssetRecord, cancel_token: &CancellationToken) -> ItemOutcome {
        if cancel_token.is_cancelled() {
            return ItemOutcome::Skipped;
        }

        let Some(image) = self.load_annotation_input(asset).await else {
            return ItemOutcome::Failed;
        };

        let outcome = tokio::select! {
            _ = cancel_token.cancelled() => return ItemOutcome::Skipped,
            outcome = self.annotator.annotate(&image) => outcome,
        };

        let (tags, category) = match &outcome {
            AnnotationOutcome::Annotated { tags, category } if !tags.is_empty() => (tags, category),
            AnnotationOutcome::Retryable(reason) => {
                debug!(asset_id = asset.id, reason = %reason, "Annotation transiently unavailable");
                return ItemOutcome::NoAnnotation;
            }
            _ => return ItemOutcome::NoAnnotation,
        };

        let category = if category.is_empty() {
            asset.category.as_str()
        } else {
            category.as_str()
        };

        match self
            .catalog
            .update_tags_and_category(asset.id, &join_tags(tags), category)
            .await
        {
            Ok(()) => {
                debug!(asset_id = asset.id, category = %category, "Asset enriched");
                ItemOutcome::Updated
            }
            Err(e) => {
                warn!(asset_id = asset.id, error = %e, "Failed to store enrichment");
                ItemOutcome::Failed
            }
        }
    }

    /// Thumbnail bytes, falling back to the main variant
    async fn load_annotation_input(&self, asset: &AssetRecord) -> Option<Vec<u8>> {
        let Some(paths) = self.storage.paths_for_url(&asset.url) else {
            warn!(asset_id = asset.id, url = %asset.url, "Asset URL outside the asset root");
            return None;
        };

        match read_file(&paths.thumbnail).await {
            Ok(bytes) => return Some(bytes),
            Err(e) => debug!(asset_id = asset.id, error = %e, "Thumbnail unreadable, trying main variant"),
        }

        match read_file(&paths.main).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(asset_id = asset.id, error = %e, "Asset variants unreadable");
                None
            }
        }
    }

    fn meta(&self) -> MutexGuard<'_, RunMeta> {
        self.meta.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finish(&self) {
        {
            let mut meta = self.meta();
            meta.finished_at = Some(Utc::now());
            meta.cancel_token = None;
        }
        self.progress.running.store(false, Ordering::SeqCst);
        self.slot.store(false, Ordering::SeqCst);
        self.idle_tx.send_replace(true);

        info!(
            total = self.progress.total.load(Ordering::SeqCst),
            completed = self.progress.completed.load(Ordering::SeqCst),
            updated = self.progress.updated.load(Ordering::SeqCst),
            failed = self.progress.failed.load(Ordering::SeqCst),
            skipped = self.progress.skipped.load(Ordering::SeqCst),
            "Enrichment run finished"
        );
    }
}

/// Releases the run slot when the run task ends, including by panic
struct RunGuard {
    manager: Arc<EnrichmentJobManager>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.manager.finish();
    }
}

/// Holds the run slot while `start` is still loading the selection
struct SlotGuard<'a> {
    slot: &'a AtomicBool,
    armed: bool,
}

impl<'a> SlotGuard<'a> {
    fn acquire(slot: &'a AtomicBool) -> Option<Self> {
        slot.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { slot, armed: true })
    }

    /// Hand the slot over to the run task
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.slot.store(false, Ordering::SeqCst);
        }
    }
}
