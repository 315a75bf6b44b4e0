//! Dispatch engine.
//!
//! [`Dispatcher::dispatch`] resolves the target adapter, then returns a lazy
//! stream that interleaves trace events with content deltas:
//!
//! ```text
//!  Trace  Gateway  → Adapter   "dispatch"               {adapter_kind, model}
//!  Delta  "Hel"
//!  Trace  Provider → Provider  "inference in progress"  (once, after first content)
//!  Delta  "lo"
//!  …
//!  Trace  Provider → Gateway   "response complete"      {total_duration_ms}
//! ```
//!
//! An adapter failure becomes one final delta (terse, or a full report when
//! the request is diagnostic) and the completion trace still follows. Error
//! deltas never trigger "inference in progress". Only an unknown adapter id
//! fails up front.

use crate::error::{GatewayError, GatewayResult};
use futures::{FutureExt, Stream, StreamExt};
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use switchyard_foundation::BuiltinProviderClient;
use switchyard_kernel::{
    AdapterConfig, AdapterError, AdapterKind, AdapterRegistry, ChatRequest, DeltaStream,
    DispatchItem, EmbeddingRequest, EmbeddingResult, TraceEvent,
};
use switchyard_plugins::CapabilityLoader;
use tracing::{debug, info, instrument, warn};

/// Output of one dispatch, in emission order.
pub type DispatchStream = Pin<Box<dyn Stream<Item = DispatchItem> + Send>>;

/// Routes normalized requests to built-in or custom adapters.
pub struct Dispatcher {
    registry: Arc<dyn AdapterRegistry>,
    builtin: BuiltinProviderClient,
    loader: Arc<CapabilityLoader>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<dyn AdapterRegistry>,
        builtin: BuiltinProviderClient,
        loader: Arc<CapabilityLoader>,
    ) -> Self {
        Self {
            registry,
            builtin,
            loader,
        }
    }

    pub fn registry(&self) -> &Arc<dyn AdapterRegistry> {
        &self.registry
    }

    pub fn loader(&self) -> &CapabilityLoader {
        &self.loader
    }

    fn resolve(&self, id: &str) -> GatewayResult<AdapterConfig> {
        self.registry
            .get(id)
            .ok_or_else(|| GatewayError::AdapterNotFound(id.to_string()))
    }

    /// Start a chat dispatch.
    ///
    /// Fails only with [`GatewayError::AdapterNotFound`]; nothing is sent
    /// upstream until the returned stream is polled.
    #[instrument(skip_all, fields(model = %request.target_model, diagnostic = request.diagnostic))]
    pub fn dispatch(&self, request: ChatRequest) -> GatewayResult<DispatchStream> {
        let config = self.resolve(&request.target_model)?;
        debug!(kind = %config.kind, "adapter resolved");

        let deltas = match config.kind {
            AdapterKind::Builtin => self.builtin.stream_chat(&config, &request),
            AdapterKind::Custom => self.loader.load_and_stream(&config, &request),
        };
        Ok(Box::pin(drive(config, request.diagnostic, deltas)))
    }

    /// Compute embeddings. Adapter failures are returned, not streamed.
    #[instrument(skip_all, fields(model = %request.target_model, count = request.input.len()))]
    pub async fn embed(&self, request: EmbeddingRequest) -> GatewayResult<EmbeddingResult> {
        let config = self.resolve(&request.target_model)?;
        let result = match config.kind {
            AdapterKind::Builtin => self.builtin.get_embeddings(&config, &request.input).await,
            AdapterKind::Custom => self.loader.load_and_embed(&config, &request.input).await,
        };
        result.map_err(|err| {
            warn!(error = %err, "embedding request failed");
            GatewayError::Adapter(err)
        })
    }
}

/// Wrap an adapter's delta stream with trace events and failure rendering.
fn drive(
    config: AdapterConfig,
    diagnostic: bool,
    mut deltas: DeltaStream,
) -> impl Stream<Item = DispatchItem> + Send {
    async_stream::stream! {
        yield DispatchItem::Trace(TraceEvent::dispatch(config.kind.as_str(), &config.id));
        let started = Instant::now();
        let mut in_progress = false;

        loop {
            let next = match AssertUnwindSafe(deltas.next()).catch_unwind().await {
                Ok(next) => next,
                Err(_) => Some(Err(AdapterError::execution(config.id.as_str(), "adapter panicked"))),
            };
            let Some(next) = next else { break };

            match next {
                Ok(text) => {
                    yield DispatchItem::Delta(text);
                    if !in_progress {
                        in_progress = true;
                        yield DispatchItem::Trace(TraceEvent::inference_in_progress());
                    }
                }
                Err(err) => {
                    warn!(adapter = %config.id, kind = err.kind_name(), error = %err, "adapter failed mid-stream");
                    let text = if diagnostic {
                        err.diagnostic_report()
                    } else {
                        err.terse_message()
                    };
                    yield DispatchItem::Delta(text);
                    break;
                }
            }
        }

        let elapsed = started.elapsed();
        info!(adapter = %config.id, elapsed_ms = elapsed.as_millis() as u64, "dispatch complete");
        yield DispatchItem::Trace(TraceEvent::response_complete(elapsed));
    }
}

/// Concatenate every content delta, dropping trace events.
pub async fn collect_content(stream: DispatchStream) -> String {
    stream
        .filter_map(|item| async move {
            match item {
                DispatchItem::Delta(text) => Some(text),
                DispatchItem::Trace(_) => None,
            }
        })
        .collect::<Vec<_>>()
        .await
        .concat()
}
