//! Axum-based HTTP surface.
//!
//! [`GatewayServer`] wires the file-backed registry, the built-in provider
//! client and the capability loader into a [`Dispatcher`], then serves it.
//!
//! # Endpoints
//!
//! | Method   | Path                   | Description                                   |
//! |----------|------------------------|-----------------------------------------------|
//! | `GET`    | `/health`              | Liveness check.                               |
//! | `GET`    | `/v1/models`           | Registered adapters, sorted by id.            |
//! | `POST`   | `/v1/models`           | Register or replace an adapter.               |
//! | `DELETE` | `/v1/models/{id}`      | Remove an adapter.                            |
//! | `POST`   | `/v1/chat/completions` | SSE chunks (`stream: true`) or one completion. |
//! | `POST`   | `/v1/embeddings`       | Embedding result.                             |
//!
//! Streamed responses carry trace events as extra chunks with empty `choices`
//! and a `trace` object, so OpenAI clients ignore them.

use crate::config::GatewaySettings;
use crate::dispatch::{DispatchStream, Dispatcher, collect_content};
use crate::error::{GatewayError, GatewayResult};
use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{delete, get, post},
};
use futures::StreamExt;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use switchyard_foundation::{BuiltinProviderClient, FileAdapterRegistry};
use switchyard_kernel::{
    AdapterConfig, AdapterRegistry, ChatRequest, DispatchItem, EmbeddingRequest, EmbeddingResult,
    TraceEvent,
};
use switchyard_plugins::CapabilityLoader;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

/// State injected into every handler.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
}

/// Build the router around an existing dispatcher.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/models", get(list_models_handler).post(register_model_handler))
        .route("/v1/models/{id}", delete(delete_model_handler))
        .route("/v1/chat/completions", post(chat_completions_handler))
        .route("/v1/embeddings", post(embeddings_handler))
        .with_state(AppState { dispatcher })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

pub struct GatewayServer {
    settings: GatewaySettings,
}

impl GatewayServer {
    pub fn new(settings: GatewaySettings) -> Self {
        Self { settings }
    }

    /// Open the registry under `data_dir` and assemble the dispatcher.
    pub fn build_dispatcher(&self) -> anyhow::Result<Dispatcher> {
        let registry = FileAdapterRegistry::open(&self.settings.data_dir).with_context(|| {
            format!("opening registry in {}", self.settings.data_dir.display())
        })?;
        let builtin = BuiltinProviderClient::new(self.settings.provider.timeouts())
            .context("building provider HTTP client")?;
        let loader = CapabilityLoader::new(self.settings.script.clone());
        Ok(Dispatcher::new(Arc::new(registry), builtin, Arc::new(loader)))
    }

    pub fn build_app(&self) -> anyhow::Result<Router> {
        Ok(router(Arc::new(self.build_dispatcher()?)))
    }

    /// Bind `host:port` and serve until the process exits.
    pub async fn start(self) -> anyhow::Result<()> {
        let app = self.build_app()?;
        let addr = self.settings.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        info!(addr = %addr, data_dir = %self.settings.data_dir.display(), "switchyard listening");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "switchyard" }))
}

async fn list_models_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut models = state.dispatcher.registry().list();
    models.sort_by(|a, b| a.id.cmp(&b.id));
    Json(json!({ "object": "list", "data": models }))
}

async fn register_model_handler(
    State(state): State<AppState>,
    Json(config): Json<AdapterConfig>,
) -> GatewayResult<Json<Value>> {
    config
        .validate()
        .map_err(|err| GatewayError::InvalidRequest(err.to_string()))?;
    let model_id = config.id.clone();
    state.dispatcher.registry().upsert(config)?;
    info!(model = %model_id, "adapter registered");
    Ok(Json(json!({ "status": "success", "model_id": model_id })))
}

async fn delete_model_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> GatewayResult<Json<Value>> {
    if !state.dispatcher.registry().delete(&id)? {
        return Err(GatewayError::AdapterNotFound(id));
    }
    info!(model = %id, "adapter removed");
    Ok(Json(json!({ "status": "success", "model_id": id })))
}

async fn chat_completions_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> GatewayResult<Response> {
    let model = request.target_model.clone();
    let streaming = request.streaming;
    let items = state.dispatcher.dispatch(request)?;
    let completion = Completion::new(model);

    if streaming {
        Ok(sse_response(completion, items).into_response())
    } else {
        let content = collect_content(items).await;
        Ok(Json(completion.message(&content)).into_response())
    }
}

async fn embeddings_handler(
    State(state): State<AppState>,
    Json(request): Json<EmbeddingRequest>,
) -> GatewayResult<Json<EmbeddingResult>> {
    Ok(Json(state.dispatcher.embed(request).await?))
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI response framing
// ─────────────────────────────────────────────────────────────────────────────

/// Identity shared by every chunk of one completion.
struct Completion {
    id: String,
    created: i64,
    model: String,
}

impl Completion {
    fn new(model: String) -> Self {
        Self {
            id: format!("chatcmpl-{}", Uuid::new_v4().simple()),
            created: chrono::Utc::now().timestamp(),
            model,
        }
    }

    fn content_chunk(&self, text: &str) -> Value {
        json!({
            "id": self.id,
            "object": "chat.completion.chunk",
            "created": self.created,
            "model": self.model,
            "choices": [{ "index": 0, "delta": { "content": text }, "finish_reason": null }],
        })
    }

    fn trace_chunk(&self, event: &TraceEvent) -> Value {
        json!({
            "id": format!("trace-{}", Uuid::new_v4().simple()),
            "object": "chat.completion.chunk",
            "created": self.created,
            "model": self.model,
            "choices": [],
            "trace": event,
        })
    }

    fn stop_chunk(&self) -> Value {
        json!({
            "id": self.id,
            "object": "chat.completion.chunk",
            "created": self.created,
            "model": self.model,
            "choices": [{ "index": 0, "delta": {}, "finish_reason": "stop" }],
        })
    }

    fn message(&self, content: &str) -> Value {
        json!({
            "id": self.id,
            "object": "chat.completion",
            "created": self.created,
            "model": self.model,
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop",
            }],
        })
    }
}

fn sse_response(
    completion: Completion,
    mut items: DispatchStream,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let frames = async_stream::stream! {
        while let Some(item) = items.next().await {
            let chunk = match item {
                DispatchItem::Delta(text) => completion.content_chunk(&text),
                DispatchItem::Trace(event) => completion.trace_chunk(&event),
            };
            yield Ok::<_, Infallible>(Event::default().data(chunk.to_string()));
        }
        yield Ok(Event::default().data(completion.stop_chunk().to_string()));
        yield Ok(Event::default().data("[DONE]"));
    };

    Sse::new(frames).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
