//! Event bus configuration.
//!
//! [`BusConfig`] is the `[bus]` section of the Hub Central config file.  All
//! fields have defaults so a partial (or absent) section is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the [`crate::EventBus`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Maximum number of processed events retained in history.
    ///
    /// Default: **1000**.
    pub history_capacity: usize,

    /// How long the idle worker parks before re-checking the queues, in
    /// milliseconds.
    ///
    /// Default: **100 ms**.
    pub idle_backoff_ms: u64,

    /// Upper bound on how long `stop` waits for the worker to drain.
    ///
    /// Default: **5 s**.
    pub shutdown_timeout_secs: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
            idle_backoff_ms: 100,
            shutdown_timeout_secs: 5,
        }
    }
}

impl BusConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the history ring buffer capacity.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Set the idle backoff (in milliseconds).
    pub fn with_idle_backoff_ms(mut self, ms: u64) -> Self {
        self.idle_backoff_ms = ms;
        self
    }

    /// Set the shutdown join timeout (in seconds).
    pub fn with_shutdown_timeout_secs(mut self, secs: u64) -> Self {
        self.shutdown_timeout_secs = secs;
        self
    }

    pub(crate) fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms.max(1))
    }

    pub(crate) fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = BusConfig::default();
        assert_eq!(cfg.history_capacity, 1000);
        assert_eq!(cfg.idle_backoff_ms, 100);
        assert_eq!(cfg.shutdown_timeout_secs, 5);
    }

    #[test]
    fn partial_toml_section_fills_defaults() {
        let cfg: BusConfig = serde_json::from_str(r#"{"history_capacity": 10}"#).unwrap();
        assert_eq!(cfg.history_capacity, 10);
        assert_eq!(cfg.idle_backoff_ms, 100);
    }

    #[test]
    fn zero_backoff_is_clamped() {
        let cfg = BusConfig::new().with_idle_backoff_ms(0);
        assert_eq!(cfg.idle_backoff(), Duration::from_millis(1));
    }
}
