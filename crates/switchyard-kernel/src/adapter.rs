//! Adapter configuration — the unit the registry stores and dispatch reads.

use super::error::RegistryError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Free-form adapter settings (`base_url`, `api_key`, `model`, …).
pub type Settings = HashMap<String, serde_json::Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Purpose / kind
// ─────────────────────────────────────────────────────────────────────────────

/// What kind of request an adapter serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdapterPurpose {
    #[default]
    Chat,
    Embedding,
}

/// How an adapter is executed.
///
/// On the wire any value other than `"custom"` (for example `"openai"` or
/// `"anthropic"` in older registry files) selects the built-in client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// OpenAI-compatible HTTP client shipped with the gateway.
    Builtin,
    /// User-supplied extension resolved by the capability loader.
    #[default]
    Custom,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::Builtin => "builtin",
            AdapterKind::Custom => "custom",
        }
    }
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AdapterKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw.eq_ignore_ascii_case("custom") {
            AdapterKind::Custom
        } else {
            AdapterKind::Builtin
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AdapterConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Full description of one registered adapter.
///
/// `id` is globally unique and is the only key dispatch uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Unique model identifier (the `model` field of incoming requests).
    pub id: String,
    /// Human readable display name.
    pub name: String,
    #[serde(default)]
    pub purpose: AdapterPurpose,
    #[serde(default, alias = "type")]
    pub kind: AdapterKind,
    /// Extension source; required iff `kind` is [`AdapterKind::Custom`].
    #[serde(default, alias = "script_content", skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    #[serde(default, alias = "config")]
    pub settings: Settings,
}

impl AdapterConfig {
    /// Construct a built-in (OpenAI-compatible) chat adapter.
    pub fn builtin(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            purpose: AdapterPurpose::Chat,
            kind: AdapterKind::Builtin,
            source_code: None,
            settings: Settings::new(),
        }
    }

    /// Construct a custom chat adapter from extension source.
    pub fn custom(
        id: impl Into<String>,
        name: impl Into<String>,
        source_code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            purpose: AdapterPurpose::Chat,
            kind: AdapterKind::Custom,
            source_code: Some(source_code.into()),
            settings: Settings::new(),
        }
    }

    /// Builder: set the purpose.
    pub fn with_purpose(mut self, purpose: AdapterPurpose) -> Self {
        self.purpose = purpose;
        self
    }

    /// Builder: insert one setting.
    pub fn with_setting(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// String-valued setting, if present and a string.
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|v| v.as_str())
    }

    /// Sanity checks run before a config is accepted by a registry.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.id.trim().is_empty() {
            return Err(RegistryError::Invalid("adapter id cannot be empty".into()));
        }
        if !is_safe_id(&self.id) {
            return Err(RegistryError::Invalid(format!(
                "adapter id '{}' may only contain ASCII letters, digits, '.', '_' and '-', \
                 and must not start with '.'",
                self.id
            )));
        }
        match (self.kind, self.source_code.as_deref()) {
            (AdapterKind::Custom, None) => Err(RegistryError::Invalid(format!(
                "custom adapter '{}' requires source_code",
                self.id
            ))),
            (AdapterKind::Custom, Some(src)) if src.trim().is_empty() => Err(
                RegistryError::Invalid(format!("custom adapter '{}' has empty source_code", self.id)),
            ),
            _ => Ok(()),
        }
    }
}

/// Ids double as file names in persistent registries.
fn is_safe_id(id: &str) -> bool {
    !id.starts_with('.')
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}
