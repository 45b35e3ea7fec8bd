//! Engine configuration.
//!
//! [`EngineConfig`] is the `[engine]` section and [`ProviderConfig`] one
//! `[[providers]]` entry of the Hub Central config file.

use std::sync::Arc;
use std::time::Duration;

use hubcentral_adapters::{OpenAiCompatProvider, ProviderAdapter, ScriptProvider};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::provider::Provider;

/// Tunables for the [`crate::ExecutionEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of tasks `execute_parallel` runs at once.
    ///
    /// Default: **5**.
    pub max_workers: usize,

    /// Per-attempt provider timeout for new tasks, in seconds.
    ///
    /// Default: **60 s**.
    pub default_timeout_secs: u64,

    /// Number of executed tasks retained in history.
    ///
    /// Default: **1000**.
    pub history_capacity: usize,

    /// How long an offline provider is skipped before it is retried, in
    /// seconds.  `0` keeps it offline until it succeeds again.
    ///
    /// Default: **300 s**.
    pub offline_cooldown_secs: u64,

    /// System prompt sent with every provider call.
    pub system_prompt: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            default_timeout_secs: 60,
            history_capacity: 1000,
            offline_cooldown_secs: 300,
            system_prompt: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn with_default_timeout_secs(mut self, secs: u64) -> Self {
        self.default_timeout_secs = secs;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_offline_cooldown_secs(mut self, secs: u64) -> Self {
        self.offline_cooldown_secs = secs;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub(crate) fn offline_cooldown(&self) -> Option<Duration> {
        (self.offline_cooldown_secs > 0).then(|| Duration::from_secs(self.offline_cooldown_secs))
    }
}

/// How a configured provider is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// `POST {base_url}/chat/completions`.
    #[default]
    OpenaiCompat,
    /// A local command reading the prompt on stdin.
    Script,
}

/// One `[[providers]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: Provider,
    #[serde(default)]
    pub kind: ProviderKind,
    /// Overrides [`Provider::default_base_url`].
    pub base_url: Option<String>,
    /// Overrides [`Provider::default_model`].
    pub model: Option<String>,
    /// Overrides [`Provider::default_api_key_env`].
    pub api_key_env: Option<String>,
    /// Command line for `kind = "script"`.
    pub command: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ProviderConfig {
    /// An OpenAI-compatible entry using the provider's defaults.
    pub fn openai_compat(provider: Provider) -> Self {
        Self {
            provider,
            kind: ProviderKind::OpenaiCompat,
            base_url: None,
            model: None,
            api_key_env: None,
            command: None,
            enabled: true,
        }
    }

    /// A script entry.
    pub fn script(provider: Provider, command: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::Script,
            command: Some(command.into()),
            ..Self::openai_compat(provider)
        }
    }

    /// Build the adapter described by this entry.
    pub fn build(&self) -> Result<Arc<dyn ProviderAdapter>> {
        let name = self.provider.as_str();
        match self.kind {
            ProviderKind::Script => {
                let command = self
                    .command
                    .as_deref()
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| EngineError::InvalidProviderConfig {
                        provider: name.to_string(),
                        reason: "script providers need a `command`".into(),
                    })?;
                Ok(Arc::new(ScriptProvider::new(name, command)))
            }
            ProviderKind::OpenaiCompat => {
                let base_url = self
                    .base_url
                    .as_deref()
                    .or(self.provider.default_base_url())
                    .ok_or_else(|| EngineError::InvalidProviderConfig {
                        provider: name.to_string(),
                        reason: "no `base_url` configured and no default endpoint".into(),
                    })?;
                let model = self
                    .model
                    .as_deref()
                    .unwrap_or(self.provider.default_model());

                let mut adapter = OpenAiCompatProvider::new(name, base_url, model);
                if let Some(var) = self
                    .api_key_env
                    .as_deref()
                    .or(self.provider.default_api_key_env())
                {
                    adapter = adapter.with_api_key_env(var);
                }
                Ok(Arc::new(adapter))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_workers, 5);
        assert_eq!(cfg.default_timeout_secs, 60);
        assert_eq!(cfg.offline_cooldown(), Some(Duration::from_secs(300)));
        assert_eq!(cfg.with_offline_cooldown_secs(0).offline_cooldown(), None);
    }

    #[test]
    fn provider_entry_parses_with_defaults() {
        let cfg: ProviderConfig = serde_json::from_str(r#"{"provider": "groq"}"#).unwrap();
        assert_eq!(cfg.provider, Provider::Groq);
        assert_eq!(cfg.kind, ProviderKind::OpenaiCompat);
        assert!(cfg.enabled);
        assert_eq!(cfg.build().unwrap().name(), "groq");
    }

    #[test]
    fn script_entry_requires_command() {
        let mut cfg = ProviderConfig::script(Provider::Manus, "cat");
        assert_eq!(cfg.build().unwrap().name(), "manus");
        cfg.command = None;
        assert!(matches!(cfg.build(), Err(EngineError::InvalidProviderConfig { .. })));
    }

    #[test]
    fn manus_over_http_needs_base_url() {
        let cfg = ProviderConfig::openai_compat(Provider::Manus);
        assert!(cfg.build().is_err());
        let cfg = ProviderConfig {
            base_url: Some("http://localhost:5000/v1".into()),
            ..cfg
        };
        assert!(cfg.build().is_ok());
    }
}
