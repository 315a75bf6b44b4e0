//! Sandboxed Rhai back end for custom adapters.
//!
//! Every call builds a fresh [`Engine`] and compiles the adapter source into a
//! fresh AST, so concurrent dispatches never share interpreter state. The
//! engine has no filesystem or network access; execution is bounded by the
//! operation, call-depth and size limits of [`ScriptSandbox`].
//!
//! Host functions available to scripts:
//!
//! | Function                     | Effect                                      |
//! |------------------------------|---------------------------------------------|
//! | `emit(chunk)`                | forward one chunk to the response stream    |
//! | `log` `debug` `warn` `error` | write to the gateway log                    |
//! | `to_json(v)` `from_json(s)`  | JSON encode / decode                        |
//! | `now_ms()`                   | wall-clock milliseconds                     |

use crate::convert::{dynamic_to_json, json_to_dynamic};
use crate::error::{ScriptError, ScriptResult};
use rhai::{Dynamic, Engine, EvalAltResult, Position, Scope};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::Sender;
use tracing::{debug, error, info, warn};

/// Entry point for chat adapters.
pub const GENERATE_STREAM: &str = "generate_stream";
/// Entry point for embedding adapters.
pub const GET_EMBEDDINGS: &str = "get_embeddings";

/// Resource limits applied to every script engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSandbox {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for ScriptSandbox {
    fn default() -> Self {
        Self {
            max_operations: 1_000_000,
            max_call_levels: 64,
            max_string_size: 1_000_000,
            max_array_size: 10_000,
            max_map_size: 10_000,
        }
    }
}

/// One invocation of a script entry point.
pub struct ScriptCall<'a> {
    pub adapter_id: &'a str,
    pub source: &'a str,
    pub entry: &'static str,
    pub args: [Value; 2],
    /// Receives every `emit`ted chunk; `None` disables `emit`.
    pub emitter: Option<Sender<Value>>,
}

/// Compile and run one entry point, returning its value as JSON.
///
/// Blocks the calling thread; run it on a blocking worker. When `emitter` is
/// set and its receiver goes away, the script is terminated at its next
/// `emit` or progress check.
pub fn run_entry(sandbox: &ScriptSandbox, call: ScriptCall<'_>) -> ScriptResult<Value> {
    let ScriptCall {
        adapter_id,
        source,
        entry,
        args,
        emitter,
    } = call;

    let engine = build_engine(sandbox, adapter_id, emitter);
    let mut ast = engine.compile(source).map_err(|err| ScriptError::Compile {
        message: err.0.to_string(),
        position: err.1.to_string(),
    })?;
    ast.set_source(format!("adapter_{adapter_id}"));

    if !ast.iter_functions().any(|f| f.name == entry) {
        return Err(ScriptError::MissingEntry(entry));
    }

    let [first, second] = args;
    let mut scope = Scope::new();
    let out = engine
        .call_fn::<Dynamic>(
            &mut scope,
            &ast,
            entry,
            (json_to_dynamic(&first), json_to_dynamic(&second)),
        )
        .map_err(|err| runtime_error(&err))?;

    debug!(adapter = %adapter_id, entry, "script entry returned");
    Ok(dynamic_to_json(&out))
}

fn build_engine(sandbox: &ScriptSandbox, adapter_id: &str, emitter: Option<Sender<Value>>) -> Engine {
    let mut engine = Engine::new();
    engine.set_max_operations(sandbox.max_operations);
    engine.set_max_call_levels(sandbox.max_call_levels);
    engine.set_max_string_size(sandbox.max_string_size);
    engine.set_max_array_size(sandbox.max_array_size);
    engine.set_max_map_size(sandbox.max_map_size);

    let id = adapter_id.to_string();
    engine.on_print(move |text| info!(adapter = %id, "{text}"));
    let id = adapter_id.to_string();
    engine.on_debug(move |text, _, pos| debug!(adapter = %id, %pos, "{text}"));

    register_logging(&mut engine, adapter_id);
    register_helpers(&mut engine);
    register_emit(&mut engine, emitter);
    engine
}

fn register_logging(engine: &mut Engine, adapter_id: &str) {
    let id = adapter_id.to_string();
    engine.register_fn("log", move |msg: &str| info!(adapter = %id, "{msg}"));
    let id = adapter_id.to_string();
    engine.register_fn("debug", move |msg: &str| debug!(adapter = %id, "{msg}"));
    let id = adapter_id.to_string();
    engine.register_fn("warn", move |msg: &str| warn!(adapter = %id, "{msg}"));
    let id = adapter_id.to_string();
    engine.register_fn("error", move |msg: &str| error!(adapter = %id, "{msg}"));
}

fn register_helpers(engine: &mut Engine) {
    engine.register_fn("to_json", |value: Dynamic| -> String {
        dynamic_to_json(&value).to_string()
    });
    engine.register_fn("from_json", |text: &str| -> Dynamic {
        serde_json::from_str::<Value>(text)
            .map(|v| json_to_dynamic(&v))
            .unwrap_or(Dynamic::UNIT)
    });
    engine.register_fn("now_ms", || -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    });
}

fn register_emit(engine: &mut Engine, emitter: Option<Sender<Value>>) {
    if let Some(tx) = emitter.clone() {
        engine.on_progress(move |_ops| {
            if tx.is_closed() {
                Some("response stream closed".into())
            } else {
                None
            }
        });
    }

    engine.register_fn("emit", move |chunk: Dynamic| -> Result<(), Box<EvalAltResult>> {
        match &emitter {
            Some(tx) => tx
                .blocking_send(dynamic_to_json(&chunk))
                .map_err(|_| "response stream closed".into()),
            None => Err(format!("emit is only available in {GENERATE_STREAM}").into()),
        }
    });
}

/// Unwind nested function-call errors into frames, outermost first.
fn runtime_error(err: &EvalAltResult) -> ScriptError {
    let mut frames = Vec::new();
    let mut current = err;
    while let EvalAltResult::ErrorInFunctionCall(name, source, inner, pos) = current {
        frames.push(describe_frame(name, source, *pos));
        current = &**inner;
    }
    let pos = current.position();
    if !pos.is_none() {
        frames.push(format!("raised at {pos}"));
    }
    ScriptError::Runtime {
        message: current.to_string(),
        frames,
    }
}

fn describe_frame(name: &str, source: &str, pos: Position) -> String {
    if source.is_empty() {
        format!("fn {name} ({pos})")
    } else {
        format!("fn {name} in {source} ({pos})")
    }
}
