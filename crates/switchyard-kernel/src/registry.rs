//! Adapter registry — kernel contract.
//!
//! The [`AdapterRegistry`] trait is the only way the dispatch engine learns
//! about adapters. Implementations (in-memory, JSON file, …) live in
//! `switchyard-foundation`.

use super::adapter::AdapterConfig;
use super::error::RegistryResult;

/// Durable mapping from adapter id to [`AdapterConfig`].
///
/// `get` and `list` return owned snapshots; callers never observe a config
/// changing underneath them.
pub trait AdapterRegistry: Send + Sync {
    /// Snapshot of one adapter.
    fn get(&self, id: &str) -> Option<AdapterConfig>;

    /// Snapshot of every adapter, in no particular order.
    fn list(&self) -> Vec<AdapterConfig>;

    /// Insert or overwrite (last write wins).
    fn upsert(&self, config: AdapterConfig) -> RegistryResult<()>;

    /// Remove an adapter. Returns `Ok(false)` when the id was not registered.
    fn delete(&self, id: &str) -> RegistryResult<bool>;
}
