//! `switchyard-kernel` — contracts shared by every Switchyard crate.
//!
//! This crate defines the *data model and trait interfaces* of the gateway.
//! No network or scripting code lives here; that belongs in
//! `switchyard-foundation` (provider client, SSE, registries),
//! `switchyard-plugins` (capability loader) and `switchyard-gateway`
//! (dispatch engine, HTTP surface).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              switchyard-kernel  (this crate)                │
//! │  AdapterConfig  ChatRequest  Message  EmbeddingResult       │
//! │  TraceEvent / DispatchItem   AdapterError  RegistryError    │
//! │  AdapterRegistry trait       DeltaStream                    │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//!        ┌───────────────────┼────────────────────┐
//!        ▼                   ▼                    ▼
//!  switchyard-foundation  switchyard-plugins  switchyard-gateway
//! ```

pub mod adapter;
pub mod embedding;
pub mod error;
pub mod message;
pub mod registry;
pub mod request;
pub mod stream;
pub mod trace;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use adapter::{AdapterConfig, AdapterKind, AdapterPurpose, Settings};
pub use embedding::{EmbeddingInput, EmbeddingResult, EmbeddingUsage};
pub use error::{AdapterError, AdapterResult, RegistryError, RegistryResult};
pub use message::{Message, Role};
pub use registry::AdapterRegistry;
pub use request::{ChatRequest, EmbeddingRequest};
pub use stream::{DeltaStream, DispatchItem};
pub use trace::{TraceEvent, participant};
