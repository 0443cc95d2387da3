//! Fake OpenAI-compatible vision provider
//!
//! Serves `/v1/chat/completions` and `/v1/models` on an ephemeral local port
//! and records the last request it saw.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pixstash_common::config::AnnotatorConfig;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the provider answers
#[derive(Debug, Clone)]
pub enum ProviderReply {
    /// 200 with this string as the first choice's message content
    Content(String),
    /// Error status with a plain body
    Status(u16, String),
    /// Sleep, then answer like `Content`
    Delayed(Duration, String),
}

#[derive(Default)]
struct Recorded {
    authorization: Option<String>,
    body: Option<Value>,
}

struct ProviderState {
    reply: Mutex<ProviderReply>,
    recorded: Mutex<Recorded>,
    requests: AtomicUsize,
}

/// Running fake provider; the server task lives until the test runtime ends
pub struct FakeProvider {
    pub base_url: String,
    state: Arc<ProviderState>,
}

impl FakeProvider {
    pub async fn start(reply: ProviderReply) -> Self {
        let state = Arc::new(ProviderState {
            reply: Mutex::new(reply),
            recorded: Mutex::new(Recorded::default()),
            requests: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .route("/v1/models", get(models))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake provider");
        let addr = listener.local_addr().expect("Fake provider has no address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Annotator config pointing at this provider
    pub fn config(&self) -> AnnotatorConfig {
        AnnotatorConfig {
            api_url: self.base_url.clone(),
            api_key: "test-key".to_string(),
            model: "vision-small".to_string(),
        }
    }

    pub fn set_reply(&self, reply: ProviderReply) {
        *self.state.reply.lock().unwrap() = reply;
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.recorded.lock().unwrap().authorization.clone()
    }

    pub fn last_body(&self) -> Option<Value> {
        self.state.recorded.lock().unwrap().body.clone()
    }
}

fn record(state: &ProviderState, headers: &HeaderMap, body: Option<Value>) -> ProviderReply {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let mut recorded = state.recorded.lock().unwrap();
    recorded.authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if body.is_some() {
        recorded.body = body;
    }
    state.reply.lock().unwrap().clone()
}

fn completion(content: &str) -> Response {
    Json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

fn status(code: u16, body: String) -> Response {
    let code = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, body).into_response()
}

async fn chat_completions(
    State(state): State<Arc<ProviderState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    match record(&state, &headers, Some(body)) {
        ProviderReply::Content(content) => completion(&content),
        ProviderReply::Status(code, body) => status(code, body),
        ProviderReply::Delayed(delay, content) => {
            tokio::time::sleep(delay).await;
            completion(&content)
        }
    }
}

async fn models(State(state): State<Arc<ProviderState>>, headers: HeaderMap) -> Response {
    match record(&state, &headers, None) {
        ProviderReply::Status(code, body) => status(code, body),
        _ => Json(json!({
            "object": "list",
            "data": [
                { "id": "vision-small", "object": "model", "owned_by": "acme" },
                { "id": "vision-large", "object": "model" }
            ]
        }))
        .into_response(),
    }
}
