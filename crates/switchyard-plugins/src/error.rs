//! Typed errors for the capability loader.

use switchyard_kernel::AdapterError;
use thiserror::Error;

/// Outcome of invoking an entry point on a native plugin.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EntryError {
    /// The plugin does not implement this entry point.
    #[error("entry point not implemented")]
    Missing,

    /// The entry point ran and failed.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Errors raised by the Rhai script back end.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScriptError {
    #[error("compile error: {message}")]
    Compile { message: String, position: String },

    #[error("script does not define `{0}`")]
    MissingEntry(&'static str),

    #[error("{message}")]
    Runtime { message: String, frames: Vec<String> },
}

/// Convenience result alias for the script back end.
pub type ScriptResult<T> = Result<T, ScriptError>;

impl ScriptError {
    /// Attribute the failure to `adapter_id`.
    pub fn into_adapter_error(self, adapter_id: &str) -> AdapterError {
        match self {
            ScriptError::MissingEntry(entry) => AdapterError::missing_entry_point(adapter_id, entry),
            ScriptError::Compile { message, position } => AdapterError::Execution {
                adapter_id: adapter_id.to_string(),
                message: format!("compile error: {message}"),
                frames: vec![format!("adapter_{adapter_id} ({position})")],
            },
            ScriptError::Runtime { message, frames } => AdapterError::Execution {
                adapter_id: adapter_id.to_string(),
                message,
                frames,
            },
        }
    }
}

/// Convert a plugin's `anyhow` error, keeping its cause chain as frames.
pub(crate) fn from_anyhow(adapter_id: &str, err: &anyhow::Error) -> AdapterError {
    AdapterError::Execution {
        adapter_id: adapter_id.to_string(),
        message: err.to_string(),
        frames: err.chain().skip(1).map(|cause| cause.to_string()).collect(),
    }
}

/// Convert a caught panic payload.
pub(crate) fn from_panic(adapter_id: &str, payload: Box<dyn std::any::Any + Send>) -> AdapterError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    AdapterError::Execution {
        adapter_id: adapter_id.to_string(),
        message: format!("adapter panicked: {message}"),
        frames: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyhow_cause_chain_becomes_frames() {
        let err = anyhow::anyhow!("socket closed").context("calling upstream");
        match from_anyhow("remote", &err) {
            AdapterError::Execution { message, frames, .. } => {
                assert_eq!(message, "calling upstream");
                assert_eq!(frames, vec!["socket closed".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn panic_payloads_are_described() {
        let err = from_panic("p", Box::new("boom"));
        assert!(err.to_string().contains("adapter panicked: boom"));
        let err = from_panic("p", Box::new(String::from("owned")));
        assert!(err.to_string().contains("owned"));
    }

    #[test]
    fn missing_entry_keeps_name() {
        let err = ScriptError::MissingEntry("generate_stream").into_adapter_error("echo");
        assert_eq!(err, AdapterError::missing_entry_point("echo", "generate_stream"));
    }
}
