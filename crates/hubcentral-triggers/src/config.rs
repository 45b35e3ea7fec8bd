//! Trigger subsystem configuration.
//!
//! [`TriggerConfig`] is the `[triggers]` section of the Hub Central config
//! file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the trigger registry and scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// JSON file holding the persisted trigger set.
    ///
    /// Default: **`data/triggers.json`**.
    pub store_path: PathBuf,

    /// Scheduler tick period, in milliseconds.
    ///
    /// Default: **1000 ms**.
    pub tick_ms: u64,

    /// Install the built-in bus triggers and maintenance jobs.
    ///
    /// Default: **true**.
    pub install_builtin: bool,

    /// Bus error count above which the error alert fires.
    ///
    /// Default: **10**.
    pub error_alert_threshold: u64,

    /// Period of the built-in `health_check` job, in seconds.  `0` disables
    /// the job.
    ///
    /// Default: **300 s**.
    pub health_check_interval_secs: u64,

    /// Period of the built-in `auto_backup` job, in seconds.  `0` disables
    /// the job.
    ///
    /// Default: **3600 s**.
    pub backup_interval_secs: u64,

    /// Local `HH:MM` time of the built-in `daily_summary` job.  An empty
    /// string disables the job.
    ///
    /// Default: **`23:00`**.
    pub daily_summary_time: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data/triggers.json"),
            tick_ms: 1000,
            install_builtin: true,
            error_alert_threshold: 10,
            health_check_interval_secs: 300,
            backup_interval_secs: 3600,
            daily_summary_time: "23:00".into(),
        }
    }
}

impl TriggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn with_tick_ms(mut self, ms: u64) -> Self {
        self.tick_ms = ms;
        self
    }

    pub fn with_install_builtin(mut self, install: bool) -> Self {
        self.install_builtin = install;
        self
    }

    pub fn with_error_alert_threshold(mut self, threshold: u64) -> Self {
        self.error_alert_threshold = threshold;
        self
    }

    pub fn with_health_check_interval_secs(mut self, secs: u64) -> Self {
        self.health_check_interval_secs = secs;
        self
    }

    pub fn with_backup_interval_secs(mut self, secs: u64) -> Self {
        self.backup_interval_secs = secs;
        self
    }

    pub fn with_daily_summary_time(mut self, time: impl Into<String>) -> Self {
        self.daily_summary_time = time.into();
        self
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = TriggerConfig::default();
        assert_eq!(cfg.store_path, PathBuf::from("data/triggers.json"));
        assert_eq!(cfg.tick(), Duration::from_secs(1));
        assert!(cfg.install_builtin);
        assert_eq!(cfg.error_alert_threshold, 10);
        assert_eq!(cfg.health_check_interval_secs, 300);
        assert_eq!(cfg.backup_interval_secs, 3600);
        assert_eq!(cfg.daily_summary_time, "23:00");
    }

    #[test]
    fn partial_section_fills_defaults() {
        let cfg: TriggerConfig = serde_json::from_str(r#"{"tick_ms": 250}"#).unwrap();
        assert_eq!(cfg.tick(), Duration::from_millis(250));
        assert!(cfg.install_builtin);
    }
}
