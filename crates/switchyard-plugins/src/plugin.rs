//! Native adapter plugins and the catalog they are registered in.

use crate::error::EntryError;
use crate::output::AdapterOutput;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use switchyard_kernel::{EmbeddingInput, Message, Settings};
use tracing::info;

/// Entry points a native adapter can implement.
///
/// Both default to [`EntryError::Missing`], so a plugin only implements what
/// it serves. Anything the output needs must be owned (`'static`).
///
/// ```rust,ignore
/// struct Shout;
///
/// impl AdapterPlugin for Shout {
///     fn generate_stream(&self, messages: &[Message], _: &Settings) -> Result<AdapterOutput, EntryError> {
///         let last = messages.last().map(|m| m.content.to_uppercase()).unwrap_or_default();
///         Ok(AdapterOutput::Value(last.into()))
///     }
/// }
/// ```
pub trait AdapterPlugin: Send + Sync {
    fn generate_stream(
        &self,
        messages: &[Message],
        settings: &Settings,
    ) -> Result<AdapterOutput, EntryError> {
        let _ = (messages, settings);
        Err(EntryError::Missing)
    }

    fn get_embeddings(
        &self,
        input: &EmbeddingInput,
        settings: &Settings,
    ) -> Result<AdapterOutput, EntryError> {
        let _ = (input, settings);
        Err(EntryError::Missing)
    }
}

/// Native plugins keyed by adapter id.
#[derive(Default)]
pub struct PluginCatalog {
    plugins: RwLock<HashMap<String, Arc<dyn AdapterPlugin>>>,
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("ids", &self.ids())
            .finish()
    }
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin` for `adapter_id`, replacing any previous one.
    pub fn register(&self, adapter_id: impl Into<String>, plugin: Arc<dyn AdapterPlugin>) {
        let adapter_id = adapter_id.into();
        info!(adapter = %adapter_id, "native adapter plugin registered");
        self.plugins.write().insert(adapter_id, plugin);
    }

    pub fn unregister(&self, adapter_id: &str) -> bool {
        self.plugins.write().remove(adapter_id).is_some()
    }

    pub fn get(&self, adapter_id: &str) -> Option<Arc<dyn AdapterPlugin>> {
        self.plugins.read().get(adapter_id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.plugins.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
