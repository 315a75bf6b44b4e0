//! Calling-convention normalization.
//!
//! An entry point may answer in any of four shapes. [`AdapterOutput`] names
//! them, and [`AdapterOutput::into_values`] flattens every shape into one
//! stream of JSON values:
//!
//! | Variant    | Produced by                 | Flattening                          |
//! |------------|-----------------------------|-------------------------------------|
//! | `Value`    | plain return                | array → elements, null → nothing    |
//! | `Deferred` | one-shot async computation  | awaited, then as `Value`            |
//! | `Iter`     | synchronous generator       | drained item by item                |
//! | `Stream`   | asynchronous generator      | drained item by item                |

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use serde_json::Value;

/// What an entry point hands back.
pub enum AdapterOutput {
    Value(Value),
    Deferred(BoxFuture<'static, anyhow::Result<Value>>),
    Iter(Box<dyn Iterator<Item = anyhow::Result<Value>> + Send>),
    Stream(BoxStream<'static, anyhow::Result<Value>>),
}

impl std::fmt::Debug for AdapterOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterOutput::Value(v) => f.debug_tuple("Value").field(v).finish(),
            AdapterOutput::Deferred(_) => f.write_str("Deferred(..)"),
            AdapterOutput::Iter(_) => f.write_str("Iter(..)"),
            AdapterOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl AdapterOutput {
    pub fn deferred<F>(fut: F) -> Self
    where
        F: std::future::Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        AdapterOutput::Deferred(Box::pin(fut))
    }

    pub fn iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = anyhow::Result<Value>>,
        I::IntoIter: Send + 'static,
    {
        AdapterOutput::Iter(Box::new(iter.into_iter()))
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = anyhow::Result<Value>> + Send + 'static,
    {
        AdapterOutput::Stream(stream.boxed())
    }

    /// Flatten into a stream of values.
    pub fn into_values(self) -> BoxStream<'static, anyhow::Result<Value>> {
        match self {
            AdapterOutput::Value(value) => stream::iter(expand(value).into_iter().map(Ok)).boxed(),
            AdapterOutput::Deferred(fut) => stream::once(fut)
                .flat_map(|result| {
                    let items: Vec<anyhow::Result<Value>> = match result {
                        Ok(value) => expand(value).into_iter().map(Ok).collect(),
                        Err(err) => vec![Err(err)],
                    };
                    stream::iter(items)
                })
                .boxed(),
            AdapterOutput::Iter(iter) => stream::iter(iter).boxed(),
            AdapterOutput::Stream(stream) => stream,
        }
    }

    /// Resolve to a single value (used for embeddings).
    ///
    /// Generators yielding exactly one item resolve to that item; otherwise
    /// the items are gathered into an array.
    pub async fn into_single(self) -> anyhow::Result<Value> {
        let mut items: Vec<Value> = match self {
            AdapterOutput::Value(value) => return Ok(value),
            AdapterOutput::Deferred(fut) => return fut.await,
            AdapterOutput::Iter(iter) => iter.collect::<anyhow::Result<_>>()?,
            AdapterOutput::Stream(stream) => {
                stream
                    .collect::<Vec<_>>()
                    .await
                    .into_iter()
                    .collect::<anyhow::Result<_>>()?
            }
        };
        if items.len() == 1 {
            Ok(items.remove(0))
        } else {
            Ok(Value::Array(items))
        }
    }
}

impl From<Value> for AdapterOutput {
    fn from(value: Value) -> Self {
        AdapterOutput::Value(value)
    }
}

/// Array → elements, null → nothing, anything else → itself.
pub fn expand(value: Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Text of one chunk: strings verbatim, other values as JSON.
/// Null and empty strings produce no delta.
pub fn render_chunk(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
