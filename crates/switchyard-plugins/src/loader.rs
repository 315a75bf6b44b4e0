//! Capability loader — resolves a custom adapter and runs its entry points.
//!
//! ```text
//!   AdapterConfig (kind = custom)
//!          │
//!          ▼
//!   native plugin registered for id? ──yes──► AdapterPlugin::generate_stream
//!          │ no                                        │
//!          ▼                                           ▼
//!   Rhai source ──► blocking worker ──emit──► channel ──► DeltaStream
//! ```
//!
//! Every failure inside an adapter, including a panic, comes out of the
//! returned stream as one [`AdapterError`] and ends it.

use crate::error::{EntryError, from_anyhow, from_panic};
use crate::output::render_chunk;
use crate::plugin::{AdapterPlugin, PluginCatalog};
use crate::script::{GENERATE_STREAM, GET_EMBEDDINGS, ScriptCall, ScriptSandbox, run_entry};
use futures::{FutureExt, StreamExt};
use serde_json::{Map, Value, json};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use switchyard_kernel::{
    AdapterConfig, AdapterError, AdapterResult, ChatRequest, DeltaStream, EmbeddingInput,
    EmbeddingResult, Message, Settings,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, instrument};

/// Chunks a script may emit before it blocks waiting for the consumer.
const EMIT_BUFFER: usize = 32;

/// Loads custom adapters from native plugins or Rhai source.
#[derive(Debug, Default)]
pub struct CapabilityLoader {
    catalog: PluginCatalog,
    sandbox: ScriptSandbox,
}

impl CapabilityLoader {
    pub fn new(sandbox: ScriptSandbox) -> Self {
        Self {
            catalog: PluginCatalog::new(),
            sandbox,
        }
    }

    /// Native plugins; register here to override script source for an id.
    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    pub fn sandbox(&self) -> &ScriptSandbox {
        &self.sandbox
    }

    /// Run the adapter's `generate_stream` entry point as a delta stream.
    ///
    /// Nothing runs until the stream is polled.
    pub fn load_and_stream(&self, config: &AdapterConfig, request: &ChatRequest) -> DeltaStream {
        let adapter_id = config.id.clone();
        match self.catalog.get(&config.id) {
            Some(plugin) => native_stream(
                plugin,
                adapter_id,
                request.messages.clone(),
                config.settings.clone(),
            ),
            None => {
                let args = [messages_json(&request.messages), settings_json(&config.settings)];
                script_stream(self.sandbox.clone(), adapter_id, config.source_code.clone(), args)
            }
        }
    }

    /// Run the adapter's `get_embeddings` entry point.
    #[instrument(skip(self, config, input), fields(adapter = %config.id))]
    pub async fn load_and_embed(
        &self,
        config: &AdapterConfig,
        input: &EmbeddingInput,
    ) -> AdapterResult<EmbeddingResult> {
        let id = config.id.as_str();
        let value = match self.catalog.get(id) {
            Some(plugin) => native_embeddings(plugin.as_ref(), id, input, &config.settings).await?,
            None => {
                let source = require_source(id, config.source_code.as_deref())?.to_string();
                let sandbox = self.sandbox.clone();
                let adapter_id = id.to_string();
                let input = serde_json::to_value(input).unwrap_or(Value::Null);
                let args = [input, settings_json(&config.settings)];
                tokio::task::spawn_blocking(move || {
                    run_entry(
                        &sandbox,
                        ScriptCall {
                            adapter_id: &adapter_id,
                            source: &source,
                            entry: GET_EMBEDDINGS,
                            args,
                            emitter: None,
                        },
                    )
                    .map_err(|err| err.into_adapter_error(&adapter_id))
                })
                .await
                .map_err(|err| AdapterError::execution(id, format!("script worker failed: {err}")))??
            }
        };
        normalize_embeddings(id, value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Native plugins
// ─────────────────────────────────────────────────────────────────────────────

fn native_stream(
    plugin: Arc<dyn AdapterPlugin>,
    adapter_id: String,
    messages: Vec<Message>,
    settings: Settings,
) -> DeltaStream {
    Box::pin(async_stream::stream! {
        debug!(adapter = %adapter_id, "running native plugin");
        let produced = catch_unwind(AssertUnwindSafe(|| plugin.generate_stream(&messages, &settings)));
        let output = match produced {
            Ok(Ok(output)) => output,
            Ok(Err(EntryError::Missing)) => {
                yield Err(AdapterError::missing_entry_point(adapter_id.as_str(), GENERATE_STREAM));
                return;
            }
            Ok(Err(EntryError::Failed(err))) => {
                yield Err(from_anyhow(&adapter_id, &err));
                return;
            }
            Err(panic) => {
                yield Err(from_panic(&adapter_id, panic));
                return;
            }
        };

        let mut values = output.into_values();
        loop {
            match AssertUnwindSafe(values.next()).catch_unwind().await {
                Ok(Some(Ok(value))) => {
                    if let Some(text) = render_chunk(value) {
                        yield Ok(text);
                    }
                }
                Ok(Some(Err(err))) => {
                    yield Err(from_anyhow(&adapter_id, &err));
                    break;
                }
                Ok(None) => break,
                Err(panic) => {
                    yield Err(from_panic(&adapter_id, panic));
                    break;
                }
            }
        }
    })
}

async fn native_embeddings(
    plugin: &dyn AdapterPlugin,
    adapter_id: &str,
    input: &EmbeddingInput,
    settings: &Settings,
) -> AdapterResult<Value> {
    let output = match catch_unwind(AssertUnwindSafe(|| plugin.get_embeddings(input, settings))) {
        Ok(Ok(output)) => output,
        Ok(Err(EntryError::Missing)) => {
            return Err(AdapterError::missing_entry_point(adapter_id, GET_EMBEDDINGS));
        }
        Ok(Err(EntryError::Failed(err))) => return Err(from_anyhow(adapter_id, &err)),
        Err(panic) => return Err(from_panic(adapter_id, panic)),
    };
    match AssertUnwindSafe(output.into_single()).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(from_anyhow(adapter_id, &err)),
        Err(panic) => Err(from_panic(adapter_id, panic)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rhai scripts
// ─────────────────────────────────────────────────────────────────────────────

fn script_stream(
    sandbox: ScriptSandbox,
    adapter_id: String,
    source: Option<String>,
    args: [Value; 2],
) -> DeltaStream {
    Box::pin(async_stream::stream! {
        let source = match require_source(&adapter_id, source.as_deref()) {
            Ok(source) => source.to_string(),
            Err(err) => {
                yield Err(err);
                return;
            }
        };

        debug!(adapter = %adapter_id, "running script adapter");
        let (tx, rx) = mpsc::channel(EMIT_BUFFER);
        let worker_id = adapter_id.clone();
        let worker = tokio::task::spawn_blocking(move || {
            run_entry(
                &sandbox,
                ScriptCall {
                    adapter_id: &worker_id,
                    source: &source,
                    entry: GENERATE_STREAM,
                    args,
                    emitter: Some(tx),
                },
            )
        });

        let mut emitted = ReceiverStream::new(rx);
        while let Some(value) = emitted.next().await {
            if let Some(text) = render_chunk(value) {
                yield Ok(text);
            }
        }

        match worker.await {
            Ok(Ok(returned)) => {
                for text in crate::output::expand(returned).into_iter().filter_map(render_chunk) {
                    yield Ok(text);
                }
            }
            Ok(Err(err)) => {
                yield Err(err.into_adapter_error(&adapter_id));
            }
            Err(join) => {
                let err = if join.is_panic() {
                    from_panic(&adapter_id, join.into_panic())
                } else {
                    AdapterError::execution(adapter_id.as_str(), "script worker was cancelled")
                };
                yield Err(err);
            }
        }
    })
}

fn require_source<'a>(adapter_id: &str, source: Option<&'a str>) -> AdapterResult<&'a str> {
    source
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AdapterError::execution(adapter_id, "custom adapter has no source code"))
}

fn messages_json(messages: &[Message]) -> Value {
    Value::Array(
        messages
            .iter()
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect(),
    )
}

fn settings_json(settings: &Settings) -> Value {
    Value::Object(settings.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Map<_, _>>())
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedding normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Validate an adapter's embedding answer and fill the optional fields.
pub fn normalize_embeddings(adapter_id: &str, value: Value) -> AdapterResult<EmbeddingResult> {
    let Value::Object(mut obj) = value else {
        return Err(AdapterError::InvalidResponse {
            adapter_id: adapter_id.to_string(),
            message: "embedding result must be an object".into(),
        });
    };

    if let Some(err) = obj.get("error") {
        let message = match err {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(AdapterError::execution(adapter_id, message));
    }

    obj.entry("model").or_insert_with(|| Value::from(adapter_id));
    obj.entry("object").or_insert_with(|| Value::from("list"));
    obj.entry("usage")
        .or_insert_with(|| json!({"prompt_tokens": 0, "total_tokens": 0}));

    serde_json::from_value(Value::Object(obj)).map_err(|err| AdapterError::InvalidResponse {
        adapter_id: adapter_id.to_string(),
        message: err.to_string(),
    })
}
