//! Hub Central configuration file.
//!
//! One TOML document; every section is optional and falls back to its
//! defaults:
//!
//! ```toml
//! [bus]
//! [engine]
//! [[providers]]
//! [triggers]
//! [storage]
//! [logging]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hubcentral_engine::{EngineConfig, ProviderConfig};
use hubcentral_kernel::BusConfig;
use hubcentral_triggers::TriggerConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/hubcentral.toml";

/// Root of the configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub bus: BusConfig,
    pub engine: EngineConfig,
    pub providers: Vec<ProviderConfig>,
    pub triggers: TriggerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// `[storage]`: where notes live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the local markdown vault.
    pub vault_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            vault_dir: PathBuf::from("data/vault"),
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// `[logging]`: default filter and output format.  `RUST_LOG` overrides
/// `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
        }
    }
}

impl HubConfig {
    /// Load `path`.  A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
