//! Error taxonomy shared by the provider client, loader and dispatch engine.
//!
//! [`AdapterError`] covers everything that can go wrong *while serving* a
//! request through an adapter. Once a dispatch stream has started these are
//! never thrown at the caller; the dispatch engine renders them as a terminal
//! content delta using [`AdapterError::terse_message`] or
//! [`AdapterError::diagnostic_report`].
//!
//! Malformed SSE frames have no variant: they are skipped by the decoder.

use thiserror::Error;

/// Failure while resolving or executing an adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AdapterError {
    /// A custom adapter does not export the entry point the request needs.
    #[error("adapter '{adapter_id}' does not export `{entry_point}`")]
    MissingEntryPoint {
        adapter_id: String,
        entry_point: String,
    },

    /// The remote provider answered with a non-2xx status.
    #[error("provider returned HTTP {status}: {body}")]
    ProviderHttp { status: u16, body: String },

    /// Network or timeout failure talking to the remote provider.
    #[error("connection error ({kind}): {message}")]
    Connection { kind: String, message: String },

    /// An extension failed while compiling or running.
    #[error("adapter '{adapter_id}' failed: {message}")]
    Execution {
        adapter_id: String,
        message: String,
        /// Call stack or cause chain, innermost last.
        frames: Vec<String>,
    },

    /// The adapter produced a value the gateway cannot interpret.
    #[error("adapter '{adapter_id}' returned an invalid response: {message}")]
    InvalidResponse { adapter_id: String, message: String },
}

impl AdapterError {
    pub fn missing_entry_point(adapter_id: impl Into<String>, entry_point: &str) -> Self {
        Self::MissingEntryPoint {
            adapter_id: adapter_id.into(),
            entry_point: entry_point.to_string(),
        }
    }

    pub fn connection(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn execution(adapter_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            adapter_id: adapter_id.into(),
            message: message.into(),
            frames: Vec::new(),
        }
    }

    /// Stable name of the failure class, used in diagnostic output and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AdapterError::MissingEntryPoint { .. } => "MissingEntryPoint",
            AdapterError::ProviderHttp { .. } => "ProviderHTTPError",
            AdapterError::Connection { .. } => "ConnectionError",
            AdapterError::Execution { .. } => "ExecutionError",
            AdapterError::InvalidResponse { .. } => "InvalidResponse",
        }
    }

    /// One-line message shown to end users.
    pub fn terse_message(&self) -> String {
        match self {
            AdapterError::ProviderHttp { status, body } => format!("Error: {status} - {body}"),
            AdapterError::Connection { kind, message } => {
                format!("Connection error: [{kind}] {message}")
            }
            other => format!("Error: {other}"),
        }
    }

    /// Multi-line report with every captured frame.
    pub fn diagnostic_report(&self) -> String {
        let mut report = format!("{}: {}\n", self.kind_name(), self);
        if let AdapterError::Execution { frames, .. } = self {
            for frame in frames {
                report.push_str("  at ");
                report.push_str(frame);
                report.push('\n');
            }
        }
        report
    }
}

/// Result alias for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Failure reading or writing the adapter registry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The configuration was rejected by [`AdapterConfig::validate`](crate::AdapterConfig::validate).
    #[error("invalid adapter config: {0}")]
    Invalid(String),

    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
