//! Gateway settings.
//!
//! Layered with the `config` crate, later layers overriding earlier ones:
//!
//! 1. built-in defaults ([`GatewaySettings::default`])
//! 2. an optional file named by `SWITCHYARD_CONFIG` (`.toml`, `.yaml`, `.json`)
//! 3. environment variables prefixed `SWITCHYARD_`, with `__` for nesting
//!
//! | Variable                                  | Default     |
//! |-------------------------------------------|-------------|
//! | `SWITCHYARD_HOST`                         | `0.0.0.0`   |
//! | `SWITCHYARD_PORT`                         | `8000`      |
//! | `SWITCHYARD_DATA_DIR`                     | `data`      |
//! | `SWITCHYARD_LOG_JSON`                     | `false`     |
//! | `SWITCHYARD_PROVIDER__CHAT_TIMEOUT_SECS`  | `60`        |
//! | `SWITCHYARD_SCRIPT__MAX_OPERATIONS`       | `1000000`   |

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use switchyard_foundation::ProviderTimeouts;
use switchyard_plugins::ScriptSandbox;
use thiserror::Error;

/// Environment variable naming the optional settings file.
pub const CONFIG_PATH_VAR: &str = "SWITCHYARD_CONFIG";
const ENV_PREFIX: &str = "SWITCHYARD";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("config error: {0}")]
    Load(#[from] config::ConfigError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Upstream provider timeouts, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub connect_timeout_secs: u64,
    pub chat_timeout_secs: u64,
    pub embedding_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        let timeouts = ProviderTimeouts::default();
        Self {
            connect_timeout_secs: timeouts.connect.as_secs(),
            chat_timeout_secs: timeouts.chat.as_secs(),
            embedding_timeout_secs: timeouts.embedding.as_secs(),
        }
    }
}

impl ProviderSettings {
    pub fn timeouts(&self) -> ProviderTimeouts {
        ProviderTimeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            chat: Duration::from_secs(self.chat_timeout_secs),
            embedding: Duration::from_secs(self.embedding_timeout_secs),
        }
    }
}

/// Everything the gateway binary needs to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub host: String,
    pub port: u16,
    /// Holds `models.json` and materialized scripts.
    pub data_dir: PathBuf,
    /// Emit logs as JSON lines.
    pub log_json: bool,
    pub provider: ProviderSettings,
    pub script: ScriptSandbox,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            data_dir: PathBuf::from("data"),
            log_json: false,
            provider: ProviderSettings::default(),
            script: ScriptSandbox::default(),
        }
    }
}

impl GatewaySettings {
    /// Load from the process environment.
    pub fn load() -> ConfigResult<Self> {
        let path = std::env::var(CONFIG_PATH_VAR).ok();
        Self::load_from(path.as_deref().map(Path::new), environment())
    }

    /// Load from an explicit file and environment source.
    pub fn load_from(path: Option<&Path>, env: Environment) -> ConfigResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = path {
            let format = detect_format(path)?;
            let content = std::fs::read_to_string(path)?;
            builder = builder.add_source(File::from_str(&content, format));
        }
        let settings = builder.add_source(env).build()?.try_deserialize()?;
        Ok(settings)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The `SWITCHYARD_*` environment source.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Config format from a file extension.
pub fn detect_format(path: &Path) -> ConfigResult<FileFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;
    match ext.to_lowercase().as_str() {
        "toml" => Ok(FileFormat::Toml),
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "json" => Ok(FileFormat::Json),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}
