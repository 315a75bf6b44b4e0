//! Trace protocol — stage markers interleaved with dispatch output.
//!
//! A trace event describes who talked to whom at which stage of a dispatch.
//! Trace events are purely observational: they never change control flow or
//! the content of a response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Participant names used in `source` / `target`.
pub mod participant {
    pub const GATEWAY: &str = "Gateway";
    pub const ADAPTER: &str = "Adapter";
    pub const PROVIDER: &str = "Provider";
}

/// Action names emitted by the dispatch engine.
pub mod action {
    pub const DISPATCH: &str = "dispatch";
    pub const INFERENCE_IN_PROGRESS: &str = "inference in progress";
    pub const RESPONSE_COMPLETE: &str = "response complete";
}

/// One observability record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub source: String,
    pub target: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl TraceEvent {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            action: action.into(),
            data: None,
        }
    }

    /// Builder: attach one data field.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Dispatch start marker.
    pub fn dispatch(adapter_kind: &str, model: &str) -> Self {
        Self::new(participant::GATEWAY, participant::ADAPTER, action::DISPATCH)
            .with_data("adapter_kind", adapter_kind)
            .with_data("model", model)
    }

    /// Emitted once, when the first delta arrives.
    pub fn inference_in_progress() -> Self {
        Self::new(
            participant::PROVIDER,
            participant::PROVIDER,
            action::INFERENCE_IN_PROGRESS,
        )
    }

    /// Final marker carrying the total wall-clock duration.
    pub fn response_complete(elapsed: Duration) -> Self {
        Self::new(
            participant::PROVIDER,
            participant::GATEWAY,
            action::RESPONSE_COMPLETE,
        )
        .with_data("total_duration_ms", round_millis(elapsed))
    }

    /// Read back a data field.
    pub fn data_field(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(key))
    }
}

/// Milliseconds with two decimal places.
pub fn round_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}
