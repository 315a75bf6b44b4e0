//! `switchyard-plugins` — the capability loader for custom adapters.
//!
//! A custom adapter is served by one of two back ends:
//!
//! - a **native plugin**: a Rust type implementing [`AdapterPlugin`],
//!   registered in the loader's [`PluginCatalog`] under the adapter id;
//! - a **Rhai script**: the adapter's `source_code`, compiled by a sandboxed
//!   engine for every call (see [`script`]).
//!
//! Whatever shape an entry point answers in ([`AdapterOutput`]), the
//! [`CapabilityLoader`] hands the dispatch engine one uniform delta stream.

pub mod convert;
pub mod error;
pub mod loader;
pub mod output;
pub mod plugin;
pub mod script;

pub use error::{EntryError, ScriptError, ScriptResult};
pub use loader::{CapabilityLoader, normalize_embeddings};
pub use output::AdapterOutput;
pub use plugin::{AdapterPlugin, PluginCatalog};
pub use script::{GENERATE_STREAM, GET_EMBEDDINGS, ScriptSandbox};
