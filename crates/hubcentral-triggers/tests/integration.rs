//! Integration tests for the hubcentral-triggers crate.
//!
//! These tests run the registry against a real JSON file store, the
//! scheduler tick loop and a live event bus with the execution engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hubcentral_adapters::{
    MemoryStorage, ProviderAdapter, ProviderResult, StorageAdapter, StorageManager,
};
use hubcentral_engine::{EngineConfig, ExecutionEngine, Provider};
use hubcentral_kernel::{BusConfig, EventBus, EventType, Priority};
use hubcentral_triggers::{
    ActionContext, ActionRegistry, JsonFileStore, MemoryStore, NewTrigger, TriggerConfig,
    TriggerRegistry, TriggerStatus, TriggerStore, TriggerType, install_builtin,
};
use serde_json::{Map, Value, json};

struct Echo;

#[async_trait]
impl ProviderAdapter for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    async fn call(&self, prompt: &str, _: Option<&str>, _: Duration) -> ProviderResult<String> {
        Ok(format!("echo: {prompt}"))
    }
}

async fn memory_registry(tick_ms: u64) -> TriggerRegistry {
    TriggerRegistry::open(
        Arc::new(MemoryStore::new()),
        ActionRegistry::new(),
        ActionContext::new(),
        &TriggerConfig::new().with_tick_ms(tick_ms),
    )
    .await
    .unwrap()
}

fn every_seconds(name: &str, seconds: u64) -> NewTrigger {
    NewTrigger::new(name, TriggerType::Scheduled).with_config(json!({
        "schedule_type": "interval",
        "interval": seconds,
        "unit": "seconds"
    }))
}

// ═══════════════════════════════════════════════════════════════════════
//  Scheduling
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn interval_trigger_runs_repeatedly() {
    let registry = memory_registry(50).await;
    let trigger = registry.create(every_seconds("five seconds", 5)).await.unwrap();

    registry.start_scheduler().await;
    assert!(registry.scheduler_running());
    tokio::time::sleep(Duration::from_secs(11)).await;
    registry.stop_scheduler().await;

    let trigger = registry.read(&trigger.id).await.unwrap();
    assert!(trigger.run_count >= 2, "ran {} times", trigger.run_count);
    assert!(trigger.last_run.is_some());
}

#[tokio::test]
async fn disabled_trigger_only_runs_manually() {
    let registry = memory_registry(20).await;
    let trigger = registry
        .create(every_seconds("paused", 1).with_enabled(false))
        .await
        .unwrap();

    registry.start_scheduler().await;
    assert!(registry.scheduled_jobs().await.is_empty());
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(registry.read(&trigger.id).await.unwrap().run_count, 0);

    let outcome = registry.execute(&trigger.id, Map::new()).await.unwrap();
    assert!(outcome.success);
    assert_eq!(registry.read(&trigger.id).await.unwrap().run_count, 1);
    registry.stop_scheduler().await;
}

#[tokio::test]
async fn toggling_installs_and_removes_jobs() {
    let registry = memory_registry(1000).await;
    let trigger = registry.create(every_seconds("tick", 30)).await.unwrap();
    assert_eq!(registry.scheduled_jobs().await.len(), 1);

    let off = registry.toggle(&trigger.id).await.unwrap();
    assert!(!off.enabled);
    assert_eq!(off.status, TriggerStatus::Disabled);
    assert!(registry.scheduled_jobs().await.is_empty());

    let on = registry.toggle(&trigger.id).await.unwrap();
    assert_eq!(on.enabled, trigger.enabled);
    assert_eq!(on.status, trigger.status);
    assert_eq!(registry.scheduled_jobs().await.len(), 1);

    registry.delete(&trigger.id).await.unwrap();
    assert!(registry.scheduled_jobs().await.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
//  CRUD & persistence
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn crud_lifecycle() {
    let registry = memory_registry(1000).await;
    let a = registry
        .create(NewTrigger::new("a", TriggerType::Webhook).with_config(json!({ "source": "n8n" })))
        .await
        .unwrap();
    let b = registry
        .create(NewTrigger::new("b", TriggerType::Event).with_config(json!({ "event_type": "note_created" })))
        .await
        .unwrap();

    let ids: Vec<String> = registry.list().await.into_iter().map(|t| t.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&a.id) && ids.contains(&b.id));

    registry.delete(&a.id).await.unwrap();
    assert!(registry.read(&a.id).await.is_err());
    assert!(registry.delete(&a.id).await.is_err());
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn triggers_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("triggers.json");
    let config = TriggerConfig::new().with_store_path(&path);

    let first = TriggerRegistry::open(
        Arc::new(JsonFileStore::new(&path)),
        ActionRegistry::new(),
        ActionContext::new(),
        &config,
    )
    .await
    .unwrap();
    let trigger = first
        .create(
            NewTrigger::new("hook", TriggerType::Webhook)
                .with_config(json!({ "source": "*" }))
                .with_description("catch all"),
        )
        .await
        .unwrap();
    first.execute(&trigger.id, Map::new()).await.unwrap();

    // Another tool annotates the record on disk.
    let mut raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    raw["triggers"][0]["owner"] = json!("ops");
    std::fs::write(&path, raw.to_string()).unwrap();

    let second = TriggerRegistry::open(
        Arc::new(JsonFileStore::new(&path)),
        ActionRegistry::new(),
        ActionContext::new(),
        &config,
    )
    .await
    .unwrap();
    let reloaded = second.read(&trigger.id).await.unwrap();
    assert_eq!(reloaded.description, "catch all");
    assert_eq!(reloaded.run_count, 1);

    second.toggle(&trigger.id).await.unwrap();
    let stored = JsonFileStore::new(&path).load().await.unwrap();
    assert_eq!(stored[0].extra["owner"], "ops");
    assert!(!stored[0].enabled);
}

#[tokio::test]
async fn bulk_operations_report_per_id() {
    let registry = memory_registry(1000).await;
    let mut ids = Vec::new();
    for name in ["a", "b", "c"] {
        let trigger = registry
            .create(NewTrigger::new(name, TriggerType::Webhook).with_config(json!({ "source": name })))
            .await
            .unwrap();
        ids.push(trigger.id);
    }
    ids.push("trg_deadbeef".to_string());

    let results = registry.bulk_set_enabled(&ids, false).await;
    assert_eq!(results.iter().filter(|r| r.success).count(), 3);
    assert!(!results[3].success);
    assert_eq!(registry.stats().await.disabled, 3);

    let results = registry.bulk_delete(&ids[..2]).await;
    assert!(results.iter().all(|r| r.success));
    assert_eq!(registry.len().await, 1);
}

// ═══════════════════════════════════════════════════════════════════════
//  Bus and engine wiring
// ═══════════════════════════════════════════════════════════════════════

struct Wired {
    bus: EventBus,
    registry: TriggerRegistry,
    storage: Arc<MemoryStorage>,
}

async fn wired() -> Wired {
    let bus = EventBus::with_config(BusConfig::new().with_idle_backoff_ms(5));
    bus.start().await;

    let engine = ExecutionEngine::new(EngineConfig::new());
    engine.register_provider(Provider::Gemini, Arc::new(Echo));
    engine.attach_bus(bus.clone()).await;

    let storage = Arc::new(MemoryStorage::new("memory"));
    let manager = Arc::new(StorageManager::new());
    manager.register("memory", storage.clone(), 0).await;

    let config = TriggerConfig::new();
    let deps = ActionContext::new()
        .with_storage(manager)
        .with_engine(engine)
        .with_bus(&bus);
    let registry = TriggerRegistry::open(Arc::new(MemoryStore::new()), ActionRegistry::new(), deps, &config)
        .await
        .unwrap();
    install_builtin(&bus, &registry, &config).await.unwrap();

    Wired {
        bus,
        registry,
        storage,
    }
}

#[tokio::test]
async fn webhook_event_creates_a_note() {
    let hub = wired().await;
    hub.registry
        .create(
            NewTrigger::new("orders", TriggerType::Webhook)
                .with_config(json!({ "source": "n8n" }))
                .with_action(json!({
                    "type": "create_note",
                    "path": "N8N",
                    "title": "order {order}",
                    "template": "Order {order} from {source}"
                })),
        )
        .await
        .unwrap();

    hub.bus
        .create_event(
            EventType::Webhook,
            "api",
            json!({ "source": "n8n", "data": { "order": 7 } }),
            Priority::Normal,
        )
        .await;

    let note = hub.storage.load("N8N/order 7.md").await.unwrap();
    assert_eq!(note["content"], "Order 7 from n8n");
    hub.bus.stop().await.unwrap();
}

#[tokio::test]
async fn folder_event_runs_ai_analysis() {
    let hub = wired().await;
    let trigger = hub
        .registry
        .create(
            NewTrigger::new("project notes", TriggerType::Event)
                .with_config(json!({
                    "event_type": "note_created",
                    "conditions": { "folder": "Projetos" }
                }))
                .with_action(json!({
                    "type": "run_ai_analysis",
                    "prompt": "Summarize {path}",
                    "provider": "gemini"
                })),
        )
        .await
        .unwrap();

    for path in ["Projetos/alpha.md", "Inbox/beta.md"] {
        hub.bus
            .create_event(
                EventType::FileChange,
                "watcher",
                json!({ "event_type": "note_created", "path": path }),
                Priority::Normal,
            )
            .await;
    }

    let trigger = hub.registry.read(&trigger.id).await.unwrap();
    assert_eq!(trigger.run_count, 1);
    assert_eq!(trigger.error_count, 0);

    hub.bus.stop().await.unwrap();
    let ai_events = hub
        .bus
        .history(100)
        .await
        .into_iter()
        .filter(|e| e.event_type == EventType::AiResponse)
        .count();
    assert_eq!(ai_events, 1);
}
