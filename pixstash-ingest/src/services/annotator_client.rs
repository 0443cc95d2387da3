//! Annotator client
//!
//! Calls an OpenAI-compatible vision chat-completions endpoint for
//! descriptive tags and a category. Annotation is always best-effort: every
//! failure folds into a non-annotated `AnnotationOutcome` and is never
//! raised to the caller. No retry is performed here; `Retryable` marks the
//! failures a later pass could usefully try again.
//!
//! Model listing is a synchronous configuration action and surfaces its
//! failures as `AnnotatorError`.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AnnotatorConfigResolver;
use pixstash_common::config::AnnotatorConfig;

/// Upper bound for one annotation request
pub const ANNOTATION_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound for one model listing request
pub const MODELS_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body kept in `AnnotatorError::Api`
const MAX_ERROR_BODY: usize = 200;

const ANNOTATION_PROMPT: &str = r#"You are an image analysis assistant. Analyze this image and reply with JSON only.

Requirements:
1. "tags": an array of 3 to 8 short keywords describing the image content. If a specific character or person can be identified (anime character, game character, celebrity), put the name first.
2. "category": exactly one of: anime, people, landscape, film, game, food, animals, art, space, technology, minimal, vehicles, other

Example: {"tags": ["hatsune miku", "twin tails", "blue hair", "stage", "concert"], "category": "anime"}

Return only the JSON object, without markdown formatting or any other text."#;

/// Annotator client errors
#[derive(Debug, Error)]
pub enum AnnotatorError {
    /// Endpoint URL or API key missing
    #[error("annotator not configured")]
    NotConfigured,

    /// Transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded its timeout
    #[error("request timed out")]
    Timeout,

    /// Non-success HTTP status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body or message content did not conform
    #[error("Parse error: {0}")]
    Parse(String),
}

impl AnnotatorError {
    /// Transient failures worth a later attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            AnnotatorError::Network(_) | AnnotatorError::Timeout => true,
            AnnotatorError::Api { status, .. } => *status == 429 || *status >= 500,
            AnnotatorError::NotConfigured | AnnotatorError::Parse(_) => false,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AnnotatorError::Timeout
        } else {
            AnnotatorError::Network(err.to_string())
        }
    }
}

/// Result of one annotation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationOutcome {
    Annotated { tags: Vec<String>, category: String },
    /// No annotation possible for this input or configuration
    Empty,
    /// Transient failure; a later attempt may succeed
    Retryable(String),
}

impl AnnotationOutcome {
    /// Tags and category when annotated, otherwise None
    pub fn annotation(&self) -> Option<(&[String], &str)> {
        match self {
            AnnotationOutcome::Annotated { tags, category } => Some((tags.as_slice(), category.as_str())),
            _ => None,
        }
    }

    fn from_error(err: &AnnotatorError) -> Self {
        if err.is_retryable() {
            AnnotationOutcome::Retryable(err.to_string())
        } else {
            AnnotationOutcome::Empty
        }
    }
}

/// Source of image annotations
#[async_trait]
pub trait Annotator: Send + Sync {
    /// Annotate raw image bytes (the thumbnail variant)
    async fn annotate(&self, image: &[u8]) -> AnnotationOutcome;
}

/// One entry of the provider's model list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAnnotation {
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    category: String,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelInfo>,
}

/// HTTP annotator over an OpenAI-compatible endpoint
#[derive(Clone)]
pub struct HttpAnnotator {
    http_client: reqwest::Client,
    resolver: Arc<AnnotatorConfigResolver>,
    annotation_timeout: Duration,
    models_timeout: Duration,
}

impl HttpAnnotator {
    pub fn new(resolver: Arc<AnnotatorConfigResolver>) -> Result<Self, AnnotatorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("pixstash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnnotatorError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            resolver,
            annotation_timeout: ANNOTATION_TIMEOUT,
            models_timeout: MODELS_TIMEOUT,
        })
    }

    /// Override both request timeouts
    pub fn with_timeouts(mut self, annotation: Duration, models: Duration) -> Self {
        self.annotation_timeout = annotation;
        self.models_timeout = models;
        self
    }

    /// List models offered by the resolved provider
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, AnnotatorError> {
        let config = self.resolver.resolve().await;
        if !config.is_configured() {
            return Err(AnnotatorError::NotConfigured);
        }

        let url = models_url(&config.api_url);
        debug!(url = %url, "Listing annotator models");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&config.api_key)
            .timeout(self.models_timeout)
            .send()
            .await
            .map_err(AnnotatorError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnnotatorError::Api {
                status: status.as_u16(),
                message: truncate(&body),
            });
        }

        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| AnnotatorError::Parse(format!("models response: {}", e)))?;

        Ok(models.data)
    }

    async fn request_annotation(
        &self,
        config: &AnnotatorConfig,
        image: &[u8],
    ) -> Result<(Vec<String>, String), AnnotatorError> {
        let data_url = format!(
            "data:{};base64,{}",
            sniff_mime_type(image),
            base64::engine::general_purpose::STANDARD.encode(image)
        );

        let body = json!({
            "model": config.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": ANNOTATION_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }]
        });

        let response = self
            .http_client
            .post(chat_completions_url(&config.api_url))
            .bearer_auth(&config.api_key)
            .timeout(self.annotation_timeout)
            .json(&body)
            .send()
            .await
            .map_err(AnnotatorError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnnotatorError::Api {
                status: status.as_u16(),
                message: truncate(&body),
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnnotatorError::Parse(format!("chat response: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AnnotatorError::Parse("response has no message content".to_string()))?;

        parse_annotation(&content)
    }
}

#[async_trait]
impl Annotator for HttpAnnotator {
    async fn annotate(&self, image: &[u8]) -> AnnotationOutcome {
        let config = self.resolver.resolve().await;
        if !config.is_configured() {
            debug!("Annotator not configured, skipping annotation");
            return AnnotationOutcome::Empty;
        }

        match self.request_annotation(&config, image).await {
            Ok((tags, category)) if tags.is_empty() && category.is_empty() => AnnotationOutcome::Empty,
            Ok((tags, category)) => {
                debug!(tags = %tags.join(","), category = %category, "Annotation succeeded");
                AnnotationOutcome::Annotated { tags, category }
            }
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Annotation failed");
                AnnotationOutcome::from_error(&e)
            }
        }
    }
}

/// Chat completions endpoint for a configured base URL
///
/// `…/chat/completions` is kept, `…/v1` gains `/chat/completions`, anything
/// else gains `/v1/chat/completions`.
pub fn chat_completions_url(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{}/chat/completions", base)
    } else {
        format!("{}/v1/chat/completions", base)
    }
}

/// Model listing endpoint for a configured base URL
pub fn models_url(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let base = base.strip_suffix("/chat/completions").unwrap_or(base);
    if base.ends_with("/v1") {
        format!("{}/models", base)
    } else {
        format!("{}/v1/models", base)
    }
}

/// Remove a surrounding markdown code fence (```json … ``` or ``` … ```)
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Parse message content into cleaned tags and category
fn parse_annotation(content: &str) -> Result<(Vec<String>, String), AnnotatorError> {
    let raw: RawAnnotation = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| AnnotatorError::Parse(format!("annotation content: {}", e)))?;

    let tags = raw
        .tags
        .iter()
        .map(|tag| tag.replace(',', "").trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();

    Ok((tags, raw.category.trim().to_string()))
}

fn sniff_mime_type(image: &[u8]) -> &'static str {
    if String::from_utf8_lossy(&image[..image.len().min(1024)]).contains("<svg") {
        return "image/svg+xml";
    }
    image::guess_format(image)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/jpeg")
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_completions_url() {
        assert_eq!(
            chat_completions_url("https://api.example.com"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://api.example.com/"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://api.example.com/v1"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://api.example.com/v1/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_models_url() {
        assert_eq!(models_url("https://api.example.com"), "https://api.example.com/v1/models");
        assert_eq!(models_url("https://api.example.com/"), "https://api.example.com/v1/models");
        assert_eq!(models_url("https://api.example.com/v1"), "https://api.example.com/v1/models");
        assert_eq!(models_url("https://api.example.com/v1/"), "https://api.example.com/v1/models");
        assert_eq!(
            models_url("https://api.example.com/v1/chat/completions"),
            "https://api.example.com/v1/models"
        );
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_annotation_cleans_tags() {
        let (tags, category) =
            parse_annotation(r#"{"tags": [" cat ", "", "window, sill", "sun"], "category": " animals "}"#).unwrap();
        assert_eq!(tags, vec!["cat", "window sill", "sun"]);
        assert_eq!(category, "animals");
    }

    #[test]
    fn test_parse_annotation_rejects_non_json() {
        assert!(matches!(
            parse_annotation("I think this is a cat."),
            Err(AnnotatorError::Parse(_))
        ));
        assert!(matches!(
            parse_annotation(r#"{"tags": "cat", "category": "animals"}"#),
            Err(AnnotatorError::Parse(_))
        ));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AnnotatorError::Timeout.is_retryable());
        assert!(AnnotatorError::Network("reset".into()).is_retryable());
        assert!(AnnotatorError::Api { status: 429, message: String::new() }.is_retryable());
        assert!(AnnotatorError::Api { status: 503, message: String::new() }.is_retryable());
        assert!(!AnnotatorError::Api { status: 401, message: String::new() }.is_retryable());
        assert!(!AnnotatorError::Parse("x".into()).is_retryable());
        assert!(!AnnotatorError::NotConfigured.is_retryable());
    }

    #[test]
    fn test_outcome_annotation_accessor() {
        let outcome = AnnotationOutcome::Annotated {
            tags: vec!["cat".to_string()],
            category: "animals".to_string(),
        };
        let (tags, category) = outcome.annotation().unwrap();
        assert_eq!(tags, ["cat".to_string()]);
        assert_eq!(category, "animals");

        assert!(AnnotationOutcome::Empty.annotation().is_none());
        assert!(AnnotationOutcome::Retryable("timeout".into()).annotation().is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_annotator_is_empty() {
        let resolver = Arc::new(AnnotatorConfigResolver::static_only(AnnotatorConfig::default()));
        let annotator = HttpAnnotator::new(resolver).unwrap();

        assert_eq!(annotator.annotate(b"bytes").await, AnnotationOutcome::Empty);
        assert!(matches!(annotator.list_models().await, Err(AnnotatorError::NotConfigured)));
    }
}
