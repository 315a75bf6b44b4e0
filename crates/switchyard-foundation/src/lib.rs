//! `switchyard-foundation` — concrete building blocks behind the kernel contracts.
//!
//! - [`sse`] — byte-chunk → line → content-delta decoding
//! - [`provider`] — [`BuiltinProviderClient`] for OpenAI-compatible endpoints
//! - [`registry`] — [`InMemoryAdapterRegistry`] and [`FileAdapterRegistry`]

pub mod provider;
pub mod registry;
pub mod sse;

pub use provider::{BuiltinProviderClient, ProviderTimeouts};
pub use registry::{FileAdapterRegistry, InMemoryAdapterRegistry};
pub use sse::{Frame, LineSplitter, decode_lines, parse_data_line, split_lines};
