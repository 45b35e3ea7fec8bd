//! Built-in bus triggers.
//!
//! These condition triggers bridge the kernel's [`EventBus`] into the
//! trigger registry and storage:
//!
//! | Name                  | Fires on                     | Does                                             |
//! |-----------------------|------------------------------|--------------------------------------------------|
//! | `file_change_bridge`  | `file_change`                | `process_event(payload.event_type, payload)`     |
//! | `new_note_handler`    | `file_change` with `action: created` | logs the new note path                   |
//! | `webhook_bridge`      | `webhook`                    | per-source handling, then `process_webhook`      |
//! | `ai_response_logger`  | `ai_response`                | logs the response and appends it to the AI log   |
//! | `error_alert`         | any but `notification`       | past the error threshold, raises a `notification` and writes an alert note |
//! | `health_check`        | `scheduled` with `job: health_check`  | see [`maintenance`](crate::maintenance) |
//! | `auto_backup`         | `scheduled` with `job: auto_backup`   | see [`maintenance`](crate::maintenance) |
//! | `daily_summary`       | `scheduled` with `job: daily_summary` | see [`maintenance`](crate::maintenance) |
//!
//! Bus trigger actions run inline in `create_event`, so everything here runs
//! on the producer's task.  The closures hold weak handles only: the bus owns
//! them, and the registry (through the engine) may own the bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use futures::FutureExt;
use hubcentral_kernel::{Event, EventBus, EventType, HandlerResult, Priority, WeakEventBus};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::actions::ActionContext;
use crate::config::TriggerConfig;
use crate::error::Result;
use crate::maintenance::{self, AUTO_BACKUP, DAILY_SUMMARY, HEALTH_CHECK, save_note};
use crate::registry::{ExecutionOutcome, TriggerRegistry, WeakTriggerRegistry};
use crate::scheduler::{FireFn, ScheduledJob, Scheduler};

/// Append-only JSON-lines log of AI responses on the primary storage.
pub const AI_LOG_PATH: &str = "Hub Central/Logs/ai_responses.jsonl";

const ALERT_FOLDER: &str = "Hub Central/Alerts";

/// Bus ids of the installed built-in triggers, plus the scheduler that
/// publishes the maintenance jobs.
pub struct BuiltinTriggers {
    pub file_change: Uuid,
    pub new_note: Uuid,
    pub webhook: Uuid,
    pub ai_response: Uuid,
    pub error_alert: Uuid,
    pub health_check: Uuid,
    pub auto_backup: Uuid,
    pub daily_summary: Uuid,
    bus: WeakEventBus,
    maintenance: Scheduler,
}

impl BuiltinTriggers {
    /// Start publishing the maintenance jobs' `scheduled` events.
    pub async fn start_maintenance(&self) {
        let bus = self.bus.clone();
        let fire: FireFn = Arc::new(move |job: String| {
            let bus = bus.clone();
            async move {
                let Some(bus) = bus.upgrade() else {
                    return;
                };
                let priority = maintenance::priority(&job);
                bus.create_event(EventType::Scheduled, "scheduler", json!({ "job": job }), priority)
                    .await;
            }
            .boxed()
        });
        self.maintenance.start(fire).await;
    }

    pub async fn stop_maintenance(&self) {
        self.maintenance.stop().await;
    }

    pub async fn maintenance_jobs(&self) -> Vec<ScheduledJob> {
        self.maintenance.jobs().await
    }
}

/// Register the built-in triggers on `bus` and install the enabled
/// maintenance jobs.  The maintenance scheduler is not started.
///
/// Fails without registering anything when a maintenance schedule in
/// `config` is invalid.
pub async fn install_builtin(
    bus: &EventBus,
    registry: &TriggerRegistry,
    config: &TriggerConfig,
) -> Result<BuiltinTriggers> {
    let schedules = maintenance::schedules(config)?;

    let weak = registry.downgrade();
    let file_change = bus
        .register_trigger(
            "file_change_bridge",
            |e: &Event| e.event_type == EventType::FileChange,
            move |event| bridge_file_change(weak.clone(), event),
        )
        .await;

    let new_note = bus
        .register_trigger(
            "new_note_handler",
            |e: &Event| e.event_type == EventType::FileChange && e.payload_str("action") == Some("created"),
            |event| async move { handle_new_note(&event) },
        )
        .await;

    let weak = registry.downgrade();
    let webhook = bus
        .register_trigger(
            "webhook_bridge",
            |e: &Event| e.event_type == EventType::Webhook,
            move |event| bridge_webhook(weak.clone(), event),
        )
        .await;

    let weak = registry.downgrade();
    let ai_response = bus
        .register_trigger(
            "ai_response_logger",
            |e: &Event| e.event_type == EventType::AiResponse,
            move |event| log_ai_response(weak.clone(), event),
        )
        .await;

    let alert = Arc::new(ErrorAlert {
        bus: bus.downgrade(),
        registry: registry.downgrade(),
        threshold: config.error_alert_threshold,
        next_alert_above: AtomicU64::new(config.error_alert_threshold),
    });
    let error_alert = bus
        .register_trigger(
            "error_alert",
            |e: &Event| e.event_type != EventType::Notification,
            move |_event| {
                let alert = Arc::clone(&alert);
                async move { alert.check().await }
            },
        )
        .await;

    let weak = registry.downgrade();
    let health_check = bus
        .register_trigger(
            HEALTH_CHECK,
            |e: &Event| maintenance::is_job(e, HEALTH_CHECK),
            move |_event| {
                let weak = weak.clone();
                async move {
                    let registry = weak.upgrade().ok_or_else(registry_gone)?;
                    maintenance::health_check(registry.deps())
                        .await
                        .map_err(|e| e.to_string())
                }
            },
        )
        .await;

    let weak = registry.downgrade();
    let auto_backup = bus
        .register_trigger(
            AUTO_BACKUP,
            |e: &Event| maintenance::is_job(e, AUTO_BACKUP),
            move |_event| {
                let weak = weak.clone();
                async move {
                    let registry = weak.upgrade().ok_or_else(registry_gone)?;
                    maintenance::auto_backup(registry.deps())
                        .await
                        .map_err(|e| e.to_string())
                }
            },
        )
        .await;

    let weak = registry.downgrade();
    let weak_bus = bus.downgrade();
    let daily_summary = bus
        .register_trigger(
            DAILY_SUMMARY,
            |e: &Event| maintenance::is_job(e, DAILY_SUMMARY),
            move |_event| {
                let weak = weak.clone();
                let weak_bus = weak_bus.clone();
                async move {
                    let registry = weak.upgrade().ok_or_else(registry_gone)?;
                    let bus = weak_bus.upgrade().ok_or("event bus dropped")?;
                    let status = bus.get_status().await;
                    let stats = registry.stats().await;
                    maintenance::daily_summary(registry.deps(), &status, &stats)
                        .await
                        .map_err(|e| e.to_string())
                }
            },
        )
        .await;

    let scheduler = Scheduler::new(config.tick());
    for (job, schedule) in schedules {
        scheduler.install_job(job.to_string(), job.to_string(), schedule).await;
    }

    tracing::info!("built-in bus triggers installed");
    Ok(BuiltinTriggers {
        file_change,
        new_note,
        webhook,
        ai_response,
        error_alert,
        health_check,
        auto_backup,
        daily_summary,
        bus: bus.downgrade(),
        maintenance: scheduler,
    })
}

fn registry_gone() -> String {
    "trigger registry dropped".to_string()
}

/// Whether `deps` can write notes.
fn has_storage(deps: &ActionContext) -> bool {
    deps.storage_manager().is_ok()
}

// ---------------------------------------------------------------------------
// Bridges
// ---------------------------------------------------------------------------

async fn bridge_file_change(registry: WeakTriggerRegistry, event: Event) -> HandlerResult {
    let Some(registry) = registry.upgrade() else {
        return Ok(Value::Null);
    };
    let event_type = match event.payload_str("event_type") {
        Some(event_type) => event_type.to_string(),
        None => format!("file_{}", event.payload_str("action").unwrap_or("changed")),
    };
    let outcomes = registry.process_event(&event_type, &event.payload).await;
    Ok(summarize(&event_type, &outcomes))
}

fn handle_new_note(event: &Event) -> HandlerResult {
    let path = event.payload_str("path").unwrap_or_default();
    tracing::info!(path, source = %event.source, "new note detected");
    Ok(json!({ "processed": path }))
}

async fn bridge_webhook(registry: WeakTriggerRegistry, event: Event) -> HandlerResult {
    let Some(registry) = registry.upgrade() else {
        return Ok(Value::Null);
    };
    let source = event
        .payload_str("source")
        .unwrap_or(event.source.as_str())
        .to_string();
    let data = match event.payload.get("data") {
        Some(data) => data.clone(),
        None => event.payload.clone(),
    };
    tracing::info!(source = %source, event_id = %event.id, "webhook received");
    let handled = route_webhook(&source, &data);
    let outcomes = registry.process_webhook(&source, data).await;

    let mut result = summarize(&source, &outcomes);
    result["handled"] = handled;
    Ok(result)
}

/// Source-specific handling of an incoming webhook body.
fn route_webhook(source: &str, data: &Value) -> Value {
    match source {
        "github" => {
            let action = str_at(data, &["action"]);
            let repository = str_at(data, &["repository", "name"]);
            tracing::info!(action, repository, "github webhook");
            json!({ "processed": true, "type": "github", "action": action, "repository": repository })
        }
        "n8n" => {
            let workflow = str_at(data, &["workflow"]);
            tracing::info!(workflow, "n8n webhook");
            json!({ "processed": true, "type": "n8n", "workflow": workflow })
        }
        "whatsapp" => {
            let sender = str_at(data, &["sender"]);
            tracing::info!(sender, "whatsapp webhook");
            json!({ "processed": true, "type": "whatsapp", "sender": sender })
        }
        "email" => {
            let subject = str_at(data, &["subject"]);
            let from = str_at(data, &["from"]);
            tracing::info!(subject, from, "email webhook");
            json!({ "processed": true, "type": "email", "subject": subject, "from": from })
        }
        other => {
            tracing::info!(source = other, body = %data, "generic webhook");
            json!({ "processed": true, "type": "generic" })
        }
    }
}

/// The string at a nested key path, or `""`.
fn str_at<'a>(data: &'a Value, path: &[&str]) -> &'a str {
    path.iter()
        .try_fold(data, |value, key| value.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn summarize(key: &str, outcomes: &[ExecutionOutcome]) -> Value {
    let failed = outcomes.iter().filter(|o| !o.success).count();
    json!({
        "matched": key,
        "executed": outcomes.len(),
        "failed": failed,
    })
}

// ---------------------------------------------------------------------------
// AI response logger
// ---------------------------------------------------------------------------

fn ai_log_entry(event: &Event) -> Value {
    let payload = &event.payload;
    let text_len = |field: &str| payload.get(field).and_then(Value::as_str).map_or(0, |s| s.chars().count());

    json!({
        "timestamp": event.timestamp,
        "task_id": payload.get("task_id"),
        "provider": payload.get("provider").and_then(Value::as_str).unwrap_or("unknown"),
        "model": payload.get("model").and_then(Value::as_str).unwrap_or("unknown"),
        "category": payload.get("category"),
        "success": payload.get("success").and_then(Value::as_bool).unwrap_or(false),
        "latency_ms": payload.get("execution_time_ms").and_then(Value::as_u64).unwrap_or(0),
        "prompt_length": text_len("prompt"),
        "response_length": text_len("response"),
    })
}

async fn log_ai_response(registry: WeakTriggerRegistry, event: Event) -> HandlerResult {
    let mut entry = ai_log_entry(&event);
    tracing::info!(
        target: "hubcentral::ai",
        provider = %entry["provider"],
        success = %entry["success"],
        latency_ms = %entry["latency_ms"],
        response_length = %entry["response_length"],
        "ai response"
    );

    if let Some(registry) = registry.upgrade()
        && has_storage(registry.deps())
    {
        let stored = append_ai_log(registry.deps(), &entry).await;
        if let Err(e) = &stored {
            tracing::warn!(error = %e, path = AI_LOG_PATH, "failed to store ai response");
        }
        entry["stored"] = Value::Bool(stored.is_ok());
    }
    Ok(entry)
}

async fn append_ai_log(deps: &ActionContext, entry: &Value) -> Result<()> {
    let line = format!("{}\n", serde_json::to_string(entry)?);
    let adapter = deps.storage(None).await?;
    adapter
        .save(&json!({ "content": line, "mode": "append" }), Some(AI_LOG_PATH))
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Error alert
// ---------------------------------------------------------------------------

/// Raises one notification each time the bus error count climbs another
/// `threshold` past the last alert, and records it as a note.
struct ErrorAlert {
    bus: WeakEventBus,
    registry: WeakTriggerRegistry,
    threshold: u64,
    next_alert_above: AtomicU64,
}

impl ErrorAlert {
    async fn check(&self) -> HandlerResult {
        let Some(bus) = self.bus.upgrade() else {
            return Ok(Value::Null);
        };
        let errors = bus.get_status().await.errors;

        let limit = self.next_alert_above.load(Ordering::Acquire);
        if errors <= limit {
            return Ok(json!({ "alerted": false, "errors": errors }));
        }
        if self
            .next_alert_above
            .compare_exchange(limit, errors + self.threshold, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Another event raised this alert concurrently.
            return Ok(json!({ "alerted": false, "errors": errors }));
        }

        let message = format!("{errors} errors recorded by the event bus");
        tracing::warn!(errors, threshold = self.threshold, "bus error threshold exceeded");
        bus.create_event(
            EventType::Notification,
            "triggers",
            json!({
                "title": "Hub Central error alert",
                "message": message,
                "errors": errors,
            }),
            Priority::High,
        )
        .await;

        let note = self.write_note(errors, &message).await;
        Ok(json!({ "alerted": true, "errors": errors, "note": note }))
    }

    async fn write_note(&self, errors: u64, message: &str) -> Option<Value> {
        let registry = self.registry.upgrade()?;
        if !has_storage(registry.deps()) {
            return None;
        }
        let now = Local::now();
        let title = format!("ErrorAlert_{}_{errors}", now.format("%Y%m%d_%H%M"));
        let content = format!("# Error alert\n\n{message}\n\nDate: {}\n", now.to_rfc3339());
        match save_note(registry.deps(), ALERT_FOLDER, &title, content).await {
            Ok(saved) => saved.get("note_created").cloned(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to write error alert note");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionRegistry;
    use crate::model::{NewTrigger, TriggerType};
    use crate::store::MemoryStore;
    use hubcentral_adapters::{MemoryStorage, StorageAdapter, StorageManager};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct Hub {
        bus: EventBus,
        registry: TriggerRegistry,
        memory: Arc<MemoryStorage>,
        builtin: BuiltinTriggers,
    }

    async fn setup_with(config: TriggerConfig) -> Hub {
        let bus = EventBus::new();
        let memory = Arc::new(MemoryStorage::new("memory"));
        let manager = Arc::new(StorageManager::new());
        manager.register("memory", memory.clone(), 0).await;

        let registry = TriggerRegistry::open(
            Arc::new(MemoryStore::new()),
            ActionRegistry::new(),
            ActionContext::new().with_storage(manager).with_bus(&bus),
            &config,
        )
        .await
        .unwrap();
        let builtin = install_builtin(&bus, &registry, &config).await.unwrap();
        Hub {
            bus,
            registry,
            memory,
            builtin,
        }
    }

    async fn setup(threshold: u64) -> Hub {
        setup_with(TriggerConfig::new().with_error_alert_threshold(threshold)).await
    }

    async fn fire_job(bus: &EventBus, job: &str) {
        bus.create_event(EventType::Scheduled, "scheduler", json!({ "job": job }), Priority::Normal)
            .await;
    }

    async fn trigger_count(bus: &EventBus, name: &str) -> u64 {
        bus.triggers()
            .await
            .into_iter()
            .find(|t| t.name == name)
            .map_or(0, |t| t.trigger_count)
    }

    #[tokio::test]
    async fn file_changes_reach_event_triggers() {
        let hub = setup(10).await;
        let projects = hub
            .registry
            .create(
                NewTrigger::new("projects", TriggerType::Event).with_config(json!({
                    "event_type": "note_created",
                    "conditions": { "folder": "Projetos" }
                })),
            )
            .await
            .unwrap();
        let created = hub
            .registry
            .create(NewTrigger::new("any file", TriggerType::Event).with_config(json!({ "event_type": "file_created" })))
            .await
            .unwrap();

        let payload = json!({ "event_type": "note_created", "path": "Projetos/alpha.md" });
        hub.bus.create_event(EventType::FileChange, "watcher", payload, Priority::Normal).await;
        let payload = json!({ "event_type": "note_created", "path": "Diario/today.md" });
        hub.bus.create_event(EventType::FileChange, "watcher", payload, Priority::Normal).await;
        let payload = json!({ "action": "created", "path": "x.md" });
        hub.bus.create_event(EventType::FileChange, "watcher", payload, Priority::Normal).await;

        assert_eq!(hub.registry.read(&projects.id).await.unwrap().run_count, 1);
        assert_eq!(hub.registry.read(&created.id).await.unwrap().run_count, 1);
    }

    #[tokio::test]
    async fn new_note_handler_only_sees_creations() {
        let hub = setup(10).await;
        let payload = json!({ "action": "modified", "path": "Inbox/a.md" });
        hub.bus.create_event(EventType::FileChange, "watcher", payload, Priority::Normal).await;
        assert_eq!(trigger_count(&hub.bus, "new_note_handler").await, 0);

        let payload = json!({ "action": "created", "path": "Inbox/b.md" });
        hub.bus.create_event(EventType::FileChange, "watcher", payload, Priority::Normal).await;
        assert_eq!(trigger_count(&hub.bus, "new_note_handler").await, 1);
        assert_eq!(trigger_count(&hub.bus, "file_change_bridge").await, 2);
    }

    #[tokio::test]
    async fn webhook_events_reach_webhook_triggers() {
        let hub = setup(10).await;
        let n8n = hub
            .registry
            .create(
                NewTrigger::new("n8n", TriggerType::Webhook)
                    .with_config(json!({ "source": "n8n" }))
                    .with_action(json!({ "type": "log_event", "message": "got {item}" })),
            )
            .await
            .unwrap();

        let payload = json!({ "source": "n8n", "data": { "item": "order" } });
        hub.bus.create_event(EventType::Webhook, "api", payload, Priority::Normal).await;
        let payload = json!({ "source": "github", "data": {} });
        hub.bus.create_event(EventType::Webhook, "api", payload, Priority::Normal).await;

        assert_eq!(hub.registry.read(&n8n.id).await.unwrap().run_count, 1);
        assert_eq!(trigger_count(&hub.bus, "webhook_bridge").await, 2);
    }

    #[test]
    fn webhooks_are_routed_by_source() {
        let github = route_webhook(
            "github",
            &json!({ "action": "opened", "repository": { "name": "hub" } }),
        );
        assert_eq!(github["type"], "github");
        assert_eq!(github["action"], "opened");
        assert_eq!(github["repository"], "hub");

        let email = route_webhook("email", &json!({ "subject": "Invoice", "from": "a@b.c" }));
        assert_eq!(email["subject"], "Invoice");
        assert_eq!(email["from"], "a@b.c");

        assert_eq!(route_webhook("whatsapp", &json!({ "sender": "+55" }))["sender"], "+55");
        assert_eq!(route_webhook("n8n", &json!({}))["workflow"], "");
        assert_eq!(route_webhook("zapier", &json!([1]))["type"], "generic");
    }

    #[tokio::test]
    async fn error_alert_latches_and_writes_notes() {
        let hub = setup(2).await;
        let bus = &hub.bus;

        bus.register_trigger("always fails", |_| true, |_| async { Err::<Value, String>("nope".into()) })
            .await;
        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notifications);
        bus.register_trigger(
            "count notifications",
            |e: &Event| e.event_type == EventType::Notification,
            move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Null)
                }
            },
        )
        .await;

        for _ in 0..4 {
            bus.create_event(EventType::System, "test", json!({}), Priority::Normal).await;
        }
        assert_eq!(notifications.load(Ordering::SeqCst), 1);

        // The alert itself is a failing event here, so the count is now 5
        // and the next alert needs more than 5.
        bus.create_event(EventType::System, "test", json!({}), Priority::Normal).await;
        assert_eq!(notifications.load(Ordering::SeqCst), 1);

        bus.create_event(EventType::System, "test", json!({}), Priority::Normal).await;
        assert_eq!(notifications.load(Ordering::SeqCst), 2);

        let alerts = hub.memory.list(Some("Hub Central/Alerts/")).await.unwrap();
        assert_eq!(alerts.len(), 2);
        let note = hub.memory.load(&alerts[0]).await.unwrap();
        assert!(note["content"].as_str().unwrap().contains("errors recorded by the event bus"));
    }

    #[test]
    fn ai_response_entry() {
        let event: Event = serde_json::from_value(json!({
            "id": Uuid::now_v7(),
            "type": "ai_response",
            "source": "execution_engine",
            "payload": {
                "provider": "gemini",
                "success": true,
                "execution_time_ms": 42,
                "prompt": "hello",
                "response": "hi there"
            },
            "priority": "low",
            "timestamp": "2026-01-01T00:00:00Z",
            "sequence": 0,
            "processed": false,
            "result": null
        }))
        .unwrap();

        let entry = ai_log_entry(&event);
        assert_eq!(entry["provider"], "gemini");
        assert_eq!(entry["model"], "unknown");
        assert_eq!(entry["latency_ms"], 42);
        assert_eq!(entry["prompt_length"], 5);
        assert_eq!(entry["response_length"], 8);
    }

    #[tokio::test]
    async fn ai_responses_are_appended_to_the_log() {
        let hub = setup(10).await;
        for provider in ["gemini", "ollama"] {
            let payload = json!({ "provider": provider, "success": true, "prompt": "p", "response": "r" });
            hub.bus
                .create_event(EventType::AiResponse, "execution_engine", payload, Priority::Low)
                .await;
        }

        let log = hub.memory.load(AI_LOG_PATH).await.unwrap();
        let lines: Vec<Value> = log["content"]
            .as_str()
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["provider"], "gemini");
        assert_eq!(lines[1]["provider"], "ollama");
    }

    #[tokio::test]
    async fn health_check_writes_a_note() {
        let hub = setup(10).await;
        fire_job(&hub.bus, HEALTH_CHECK).await;

        let notes = hub.memory.list(Some("Hub Central/Health/")).await.unwrap();
        assert_eq!(notes.len(), 1);
        let note = hub.memory.load(&notes[0]).await.unwrap();
        let content = note["content"].as_str().unwrap();
        assert!(content.starts_with("# Health Check - "));
        assert!(content.contains("- **memory**: healthy"), "{content}");
        assert_eq!(trigger_count(&hub.bus, AUTO_BACKUP).await, 0);
    }

    #[tokio::test]
    async fn auto_backup_copies_the_primary_storage() {
        let hub = setup(10).await;
        hub.memory
            .save(&json!({ "content": "idea" }), Some("Notes/a.md"))
            .await
            .unwrap();
        fire_job(&hub.bus, AUTO_BACKUP).await;

        let copies = hub.memory.list(Some("Backups/")).await.unwrap();
        assert_eq!(copies.len(), 1);
        assert!(copies[0].ends_with("/Notes/a.md"), "{}", copies[0]);
        assert_eq!(hub.memory.load(&copies[0]).await.unwrap()["content"], "idea");
    }

    #[tokio::test]
    async fn daily_summary_records_counters() {
        let hub = setup(10).await;
        hub.bus.create_event(EventType::System, "test", json!({}), Priority::Normal).await;
        fire_job(&hub.bus, DAILY_SUMMARY).await;

        let notes = hub.memory.list(Some("Hub Central/Summaries/")).await.unwrap();
        assert_eq!(notes.len(), 1);
        let note = hub.memory.load(&notes[0]).await.unwrap();
        let content = note["content"].as_str().unwrap();
        assert!(content.starts_with("# Daily Summary - "));
        assert!(content.contains("| Errors | 0 |"), "{content}");
        assert!(content.contains("| Trigger runs | 0 |"), "{content}");
    }

    #[tokio::test]
    async fn maintenance_scheduler_publishes_jobs() {
        let config = TriggerConfig::new()
            .with_tick_ms(50)
            .with_health_check_interval_secs(1)
            .with_backup_interval_secs(0)
            .with_daily_summary_time("");
        let hub = setup_with(config).await;

        let jobs = hub.builtin.maintenance_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].trigger_id, HEALTH_CHECK);

        hub.builtin.start_maintenance().await;
        tokio::time::sleep(Duration::from_millis(1400)).await;
        hub.builtin.stop_maintenance().await;

        assert!(trigger_count(&hub.bus, HEALTH_CHECK).await >= 1);
        assert!(!hub.memory.list(Some("Hub Central/Health/")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_summary_time_installs_nothing() {
        let bus = EventBus::new();
        let registry = TriggerRegistry::open(
            Arc::new(MemoryStore::new()),
            ActionRegistry::new(),
            ActionContext::new(),
            &TriggerConfig::new(),
        )
        .await
        .unwrap();
        let config = TriggerConfig::new().with_daily_summary_time("25:61");
        assert!(install_builtin(&bus, &registry, &config).await.is_err());
        assert!(bus.triggers().await.is_empty());
    }
}
