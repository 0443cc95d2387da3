//! In-process annotator doubles

use async_trait::async_trait;
use pixstash_ingest::services::{AnnotationOutcome, Annotator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Annotator returning a fixed outcome and counting calls
pub struct ScriptedAnnotator {
    outcome: AnnotationOutcome,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedAnnotator {
    pub fn new(outcome: AnnotationOutcome) -> Self {
        Self {
            outcome,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Always annotates with the given tags and category
    pub fn tagging(tags: &[&str], category: &str) -> Self {
        Self::new(AnnotationOutcome::Annotated {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            category: category.to_string(),
        })
    }

    /// Always fails transiently (provider down)
    pub fn failing() -> Self {
        Self::new(AnnotationOutcome::Retryable("provider unavailable".to_string()))
    }

    pub fn empty() -> Self {
        Self::new(AnnotationOutcome::Empty)
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most calls observed in progress at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Annotator for ScriptedAnnotator {
    async fn annotate(&self, _image: &[u8]) -> AnnotationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Annotator that panics on every call
pub struct PanickingAnnotator;

#[async_trait]
impl Annotator for PanickingAnnotator {
    async fn annotate(&self, _image: &[u8]) -> AnnotationOutcome {
        panic!("annotator blew up");
    }
}
