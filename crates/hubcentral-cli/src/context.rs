//! The orchestration context.
//!
//! [`HubContext`] builds every component once from a [`HubConfig`] and is
//! passed to the commands that need it.

use std::sync::Arc;

use anyhow::{Context, Result};
use hubcentral_adapters::{MemoryStorage, StorageManager, VaultStorage};
use hubcentral_engine::ExecutionEngine;
use hubcentral_kernel::EventBus;
use hubcentral_triggers::{
    ActionContext, ActionRegistry, BuiltinTriggers, JsonFileStore, TriggerRegistry, install_builtin,
};
use tracing::info;

use crate::config::HubConfig;

/// Every running component of a Hub Central instance.
pub struct HubContext {
    pub config: HubConfig,
    pub bus: EventBus,
    pub engine: ExecutionEngine,
    pub storage: Arc<StorageManager>,
    pub triggers: TriggerRegistry,
    /// `None` when `[triggers] install_builtin` is off.
    pub builtin: Option<BuiltinTriggers>,
}

impl HubContext {
    /// Wire the components.  Nothing is started.
    pub async fn build(config: HubConfig) -> Result<Self> {
        let bus = EventBus::with_config(config.bus.clone());

        let engine = ExecutionEngine::new(config.engine.clone());
        let providers = engine
            .register_configured(&config.providers)
            .context("failed to register providers")?;
        engine.attach_bus(bus.clone()).await;
        info!(providers, "execution engine ready");

        let storage = Arc::new(StorageManager::new());
        storage
            .register(
                "vault",
                Arc::new(VaultStorage::new("vault", &config.storage.vault_dir)),
                0,
            )
            .await;
        storage
            .register("memory", Arc::new(MemoryStorage::new("memory")), 10)
            .await;

        let deps = ActionContext::new()
            .with_storage(Arc::clone(&storage))
            .with_engine(engine.clone())
            .with_bus(&bus);
        let store = Arc::new(JsonFileStore::new(&config.triggers.store_path));
        let triggers = TriggerRegistry::open(store, ActionRegistry::new(), deps, &config.triggers)
            .await
            .with_context(|| {
                format!(
                    "failed to load triggers from {}",
                    config.triggers.store_path.display()
                )
            })?;

        let builtin = if config.triggers.install_builtin {
            let builtin = install_builtin(&bus, &triggers, &config.triggers)
                .await
                .context("failed to install built-in triggers")?;
            Some(builtin)
        } else {
            None
        };

        Ok(Self {
            config,
            bus,
            engine,
            storage,
            triggers,
            builtin,
        })
    }

    /// Start the bus worker, the trigger scheduler and the maintenance jobs.
    pub async fn start(&self) {
        self.bus.start().await;
        self.triggers.start_scheduler().await;
        if let Some(builtin) = &self.builtin {
            builtin.start_maintenance().await;
        }
        info!("hub central started");
    }

    /// Stop the schedulers, drain the bus and flush the trigger set.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(builtin) = &self.builtin {
            builtin.stop_maintenance().await;
        }
        self.triggers.stop_scheduler().await;
        self.bus.stop().await.context("event bus did not stop cleanly")?;
        self.triggers.save().await.context("failed to save triggers")?;
        info!("hub central stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubcentral_triggers::{NewTrigger, TriggerConfig, TriggerType};
    use serde_json::json;

    fn config_in(dir: &std::path::Path) -> HubConfig {
        let mut config = HubConfig::default();
        config.storage.vault_dir = dir.join("vault");
        config.triggers = TriggerConfig::new()
            .with_store_path(dir.join("triggers.json"))
            .with_tick_ms(50);
        config
    }

    #[tokio::test]
    async fn build_start_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let hub = HubContext::build(config_in(dir.path())).await.unwrap();
        assert_eq!(hub.storage.names().await, vec!["vault", "memory"]);
        assert_eq!(hub.bus.triggers().await.len(), 8);
        let builtin = hub.builtin.as_ref().unwrap();
        assert_eq!(builtin.maintenance_jobs().await.len(), 3);

        hub.triggers
            .create(NewTrigger::new("hook", TriggerType::Webhook).with_config(json!({ "source": "*" })))
            .await
            .unwrap();

        hub.start().await;
        assert!(hub.bus.is_running());
        assert!(hub.triggers.scheduler_running());
        hub.shutdown().await.unwrap();
        assert!(!hub.bus.is_running());

        let reopened = HubContext::build(config_in(dir.path())).await.unwrap();
        assert_eq!(reopened.triggers.len().await, 1);
    }

    #[tokio::test]
    async fn builtin_triggers_are_optional() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.triggers.install_builtin = false;
        let hub = HubContext::build(config).await.unwrap();
        assert!(hub.bus.triggers().await.is_empty());
        assert!(hub.builtin.is_none());
    }
}
