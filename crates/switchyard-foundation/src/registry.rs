//! Adapter registry implementations.
//!
//! Both registries are copy-on-write: the live map sits behind an
//! `RwLock<Arc<_>>`, readers clone the `Arc` and release the lock at once,
//! writers build a fresh map and swap it in. A dispatch in flight therefore
//! keeps reading the snapshot it started with.
//!
//! [`FileAdapterRegistry`] persists to a data directory:
//!
//! ```text
//! <data_dir>/
//! ├── models.json          id → AdapterConfig
//! └── scripts/
//!     └── <id>.rhai        mirror of a custom adapter's source_code
//! ```
//!
//! `models.json` is authoritative. The script files are written after each
//! successful commit for operators to inspect and are never read back; the
//! loader compiles `source_code` from the config itself. Ids are restricted
//! by [`AdapterConfig::validate`] so every mirror stays inside `scripts/`.

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use switchyard_kernel::{AdapterConfig, AdapterKind, AdapterRegistry, RegistryResult};
use tracing::{debug, info, warn};

type AdapterMap = HashMap<String, AdapterConfig>;

// ─────────────────────────────────────────────────────────────────────────────
// InMemoryAdapterRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// Process-local registry.
#[derive(Debug, Default)]
pub struct InMemoryAdapterRegistry {
    current: RwLock<Arc<AdapterMap>>,
    writer: Mutex<()>,
}

impl InMemoryAdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with `configs` (later duplicates win).
    pub fn from_configs(configs: impl IntoIterator<Item = AdapterConfig>) -> Self {
        let map = configs
            .into_iter()
            .map(|cfg| (cfg.id.clone(), cfg))
            .collect::<AdapterMap>();
        Self {
            current: RwLock::new(Arc::new(map)),
            writer: Mutex::new(()),
        }
    }

    fn snapshot(&self) -> Arc<AdapterMap> {
        self.current.read().clone()
    }

    /// Apply `f` to a copy of the map, let `commit` see the result, then
    /// publish it. Nothing is published if `commit` fails.
    fn update<R>(
        &self,
        f: impl FnOnce(&mut AdapterMap) -> R,
        commit: impl FnOnce(&AdapterMap) -> RegistryResult<()>,
    ) -> RegistryResult<R> {
        let _guard = self.writer.lock();
        let mut next = (*self.snapshot()).clone();
        let out = f(&mut next);
        commit(&next)?;
        *self.current.write() = Arc::new(next);
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AdapterRegistry for InMemoryAdapterRegistry {
    fn get(&self, id: &str) -> Option<AdapterConfig> {
        self.snapshot().get(id).cloned()
    }

    fn list(&self) -> Vec<AdapterConfig> {
        self.snapshot().values().cloned().collect()
    }

    fn upsert(&self, config: AdapterConfig) -> RegistryResult<()> {
        config.validate()?;
        self.update(
            |map| {
                map.insert(config.id.clone(), config);
            },
            |_| Ok(()),
        )
    }

    fn delete(&self, id: &str) -> RegistryResult<bool> {
        self.update(|map| map.remove(id).is_some(), |_| Ok(()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FileAdapterRegistry
// ─────────────────────────────────────────────────────────────────────────────

const MODELS_FILE: &str = "models.json";
const SCRIPTS_DIR: &str = "scripts";

/// Registry backed by `models.json` in a data directory.
#[derive(Debug)]
pub struct FileAdapterRegistry {
    memory: InMemoryAdapterRegistry,
    models_path: PathBuf,
    scripts_dir: PathBuf,
}

impl FileAdapterRegistry {
    /// Open (or create) the registry rooted at `data_dir`.
    ///
    /// A missing or unreadable `models.json` yields an empty registry.
    pub fn open(data_dir: impl AsRef<Path>) -> RegistryResult<Self> {
        let data_dir = data_dir.as_ref();
        let scripts_dir = data_dir.join(SCRIPTS_DIR);
        fs::create_dir_all(&scripts_dir)?;

        let models_path = data_dir.join(MODELS_FILE);
        let configs = load_configs(&models_path);
        info!(path = %models_path.display(), count = configs.len(), "adapter registry loaded");

        Ok(Self {
            memory: InMemoryAdapterRegistry::from_configs(configs),
            models_path,
            scripts_dir,
        })
    }

    /// Where a custom adapter's source is mirrored.
    pub fn script_path(&self, id: &str) -> PathBuf {
        self.scripts_dir.join(format!("{id}.rhai"))
    }

    fn remove_mirror(&self, id: &str) {
        let script = self.script_path(id);
        if let Err(err) = fs::remove_file(&script) {
            debug!(path = %script.display(), error = %err, "no script file to remove");
        }
    }

    fn persist(&self, map: &AdapterMap) -> RegistryResult<()> {
        let json = serde_json::to_string_pretty(map)?;
        fs::write(&self.models_path, json)?;
        Ok(())
    }
}

impl AdapterRegistry for FileAdapterRegistry {
    fn get(&self, id: &str) -> Option<AdapterConfig> {
        self.memory.get(id)
    }

    fn list(&self) -> Vec<AdapterConfig> {
        self.memory.list()
    }

    fn upsert(&self, config: AdapterConfig) -> RegistryResult<()> {
        config.validate()?;
        debug!(adapter = %config.id, kind = %config.kind, "upserting adapter");
        let id = config.id.clone();
        let source = match config.kind {
            AdapterKind::Custom => config.source_code.clone(),
            AdapterKind::Builtin => None,
        };
        self.memory.update(
            |map| {
                map.insert(id.clone(), config);
            },
            |map| self.persist(map),
        )?;

        match source {
            Some(source) => {
                let script = self.script_path(&id);
                if let Err(err) = fs::write(&script, source) {
                    warn!(path = %script.display(), error = %err, "failed to mirror adapter source");
                }
            }
            None => self.remove_mirror(&id),
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> RegistryResult<bool> {
        let removed = self.memory.update(
            |map| map.remove(id).is_some(),
            |map| self.persist(map),
        )?;
        if removed {
            self.remove_mirror(id);
        }
        Ok(removed)
    }
}

/// Read `models.json`, accepting either an id → config object or a list.
fn load_configs(path: &Path) -> Vec<AdapterConfig> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    let parsed: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unreadable registry file");
            return Vec::new();
        }
    };

    let entries: Vec<Value> = match parsed {
        Value::Array(items) => items,
        Value::Object(map) => map
            .into_iter()
            .map(|(id, mut entry)| {
                if let Some(obj) = entry.as_object_mut() {
                    obj.entry("id").or_insert(Value::String(id));
                }
                entry
            })
            .collect(),
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let parsed = serde_json::from_value::<AdapterConfig>(entry)
                .map_err(|err| err.to_string())
                .and_then(|cfg| cfg.validate().map(|()| cfg).map_err(|err| err.to_string()));
            match parsed {
                Ok(cfg) => Some(cfg),
                Err(err) => {
                    warn!(error = %err, "skipping invalid registry entry");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_is_last_write_wins() {
        let reg = InMemoryAdapterRegistry::new();
        reg.upsert(AdapterConfig::builtin("gpt", "first")).unwrap();
        reg.upsert(AdapterConfig::builtin("gpt", "second")).unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("gpt").unwrap().name, "second");
    }

    #[test]
    fn delete_absent_is_false() {
        let reg = InMemoryAdapterRegistry::new();
        assert!(!reg.delete("ghost").unwrap());
    }

    #[test]
    fn snapshot_is_unaffected_by_later_writes() {
        let reg = InMemoryAdapterRegistry::from_configs([AdapterConfig::builtin("a", "A")]);
        let before = reg.snapshot();
        reg.upsert(AdapterConfig::builtin("b", "B")).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn invalid_config_is_not_stored() {
        let reg = InMemoryAdapterRegistry::new();
        assert!(reg.upsert(AdapterConfig::custom("x", "X", "  ")).is_err());
        assert!(reg.is_empty());
    }
}
