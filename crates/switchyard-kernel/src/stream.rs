//! Stream types shared by adapters and the dispatch engine.

use super::error::AdapterError;
use super::trace::TraceEvent;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Content deltas produced by one adapter, in emission order.
///
/// The first `Err` is terminal: consumers stop pulling after it.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, AdapterError>> + Send>>;

/// One item of dispatch output.
///
/// Serializes as `{"delta": "..."}` or `{"trace": {...}}` so consumers can
/// tell the two apart structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchItem {
    Delta(String),
    Trace(TraceEvent),
}

impl DispatchItem {
    pub fn as_delta(&self) -> Option<&str> {
        match self {
            DispatchItem::Delta(text) => Some(text),
            DispatchItem::Trace(_) => None,
        }
    }

    pub fn as_trace(&self) -> Option<&TraceEvent> {
        match self {
            DispatchItem::Trace(event) => Some(event),
            DispatchItem::Delta(_) => None,
        }
    }
}
