//! Built-in maintenance jobs.
//!
//! A dedicated [`Scheduler`](crate::Scheduler) publishes `scheduled` events
//! carrying `{"job": <name>}` on the bus, and one bus trigger per job does
//! the work:
//!
//! | Job             | Default         | Does                                        |
//! |-----------------|-----------------|---------------------------------------------|
//! | `health_check`  | every 300 s     | writes a storage and provider health note   |
//! | `auto_backup`   | every 3600 s    | runs `backup_vault` on the primary storage  |
//! | `daily_summary` | daily at 23:00  | writes a note with the bus and trigger counters |

use std::time::Duration;

use chrono::Local;
use hubcentral_engine::ProviderState;
use hubcentral_kernel::{BusStatus, Event, EventType, Priority};
use serde_json::{Map, Value, json};

use crate::actions::{ActionContext, ActionHandler, BackupVault, CreateNote};
use crate::config::TriggerConfig;
use crate::error::Result;
use crate::registry::TriggerStats;
use crate::schedule::Schedule;

pub const HEALTH_CHECK: &str = "health_check";
pub const AUTO_BACKUP: &str = "auto_backup";
pub const DAILY_SUMMARY: &str = "daily_summary";

const HEALTH_FOLDER: &str = "Hub Central/Health";
const SUMMARY_FOLDER: &str = "Hub Central/Summaries";

/// The enabled jobs and their schedules.
pub(crate) fn schedules(config: &TriggerConfig) -> Result<Vec<(&'static str, Schedule)>> {
    let mut jobs = Vec::new();
    if config.health_check_interval_secs > 0 {
        let period = Duration::from_secs(config.health_check_interval_secs);
        jobs.push((HEALTH_CHECK, Schedule::Interval(period)));
    }
    if config.backup_interval_secs > 0 {
        let period = Duration::from_secs(config.backup_interval_secs);
        jobs.push((AUTO_BACKUP, Schedule::Interval(period)));
    }
    let time = config.daily_summary_time.trim();
    if !time.is_empty() {
        let mut spec = Map::new();
        spec.insert("schedule_type".into(), Value::from("daily"));
        spec.insert("time".into(), Value::from(time));
        jobs.push((DAILY_SUMMARY, Schedule::from_config(&spec)?));
    }
    Ok(jobs)
}

pub(crate) fn priority(job: &str) -> Priority {
    if job == HEALTH_CHECK {
        Priority::Low
    } else {
        Priority::Normal
    }
}

/// Whether `event` is the scheduled firing of `job`.
pub(crate) fn is_job(event: &Event, job: &str) -> bool {
    event.event_type == EventType::Scheduled && event.payload_str("job") == Some(job)
}

/// Write `{folder}/{title}.md` through the `create_note` action.
pub(crate) async fn save_note(
    deps: &ActionContext,
    folder: &str,
    title: &str,
    content: String,
) -> Result<Value> {
    let mut params = Map::new();
    params.insert("type".into(), Value::from("create_note"));
    params.insert("path".into(), Value::from(folder));
    params.insert("title".into(), Value::from(title));
    params.insert("template".into(), Value::from(content));
    CreateNote.run(&params, &Map::new(), deps).await
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

pub(crate) async fn health_check(deps: &ActionContext) -> Result<Value> {
    let now = Local::now();
    let mut lines = vec![
        format!("# Health Check - {}", now.format("%d/%m/%Y %H:%M")),
        String::new(),
        "## Storage".to_string(),
        String::new(),
    ];

    let mut storage = Map::new();
    for (name, health) in deps.storage_manager()?.health_check_all().await {
        lines.push(format!("- **{name}**: {}", health.status));
        storage.insert(name, serde_json::to_value(&health)?);
    }

    let mut providers = Map::new();
    if let Ok(engine) = deps.engine() {
        lines.extend([String::new(), "## Providers".to_string(), String::new()]);
        for (provider, state) in engine.decision().provider_states() {
            let status = provider_status(&state);
            lines.push(format!("- **{}**: {status}", provider.as_str()));
            providers.insert(
                provider.as_str().to_string(),
                json!({ "status": status, "avg_latency_ms": state.avg_latency_ms }),
            );
        }
    }

    let title = format!("HealthCheck_{}", now.format("%Y%m%d_%H%M"));
    let note = save_note(deps, HEALTH_FOLDER, &title, lines.join("\n")).await?;
    tracing::info!(
        storage = storage.len(),
        providers = providers.len(),
        "health check recorded"
    );
    Ok(json!({
        "storage": storage,
        "providers": providers,
        "note": note.get("note_created"),
    }))
}

fn provider_status(state: &ProviderState) -> &'static str {
    match (state.enabled, state.online) {
        (false, _) => "disabled",
        (true, true) => "online",
        (true, false) => "offline",
    }
}

pub(crate) async fn auto_backup(deps: &ActionContext) -> Result<Value> {
    let result = BackupVault.run(&Map::new(), &Map::new(), deps).await?;
    tracing::info!("automatic backup finished");
    Ok(result)
}

pub(crate) async fn daily_summary(
    deps: &ActionContext,
    bus: &BusStatus,
    triggers: &TriggerStats,
) -> Result<Value> {
    let now = Local::now();
    let uptime_hours = bus.uptime_secs as f64 / 3600.0;
    let content = format!(
        "# Daily Summary - {date}\n\
         \n\
         ## Hub Central statistics\n\
         \n\
         | Metric | Value |\n\
         |--------|-------|\n\
         | Events processed | {events} |\n\
         | Bus triggers fired | {fired} |\n\
         | Errors | {errors} |\n\
         | Trigger runs | {runs} |\n\
         | Trigger errors | {trigger_errors} |\n\
         | Uptime | {uptime_hours:.2} hours |\n\
         \n\
         ---\n\
         *Generated by Hub Central*\n",
        date = now.format("%d/%m/%Y"),
        events = bus.events_processed,
        fired = bus.triggers_fired,
        errors = bus.errors,
        runs = triggers.total_runs,
        trigger_errors = triggers.total_errors,
    );

    let title = format!("Summary_{}", now.format("%Y-%m-%d"));
    let note = save_note(deps, SUMMARY_FOLDER, &title, content).await?;
    tracing::info!(
        events_processed = bus.events_processed,
        errors = bus.errors,
        "daily summary written"
    );
    Ok(json!({
        "date": now.format("%Y-%m-%d").to_string(),
        "events_processed": bus.events_processed,
        "triggers_fired": bus.triggers_fired,
        "errors": bus.errors,
        "trigger_runs": triggers.total_runs,
        "uptime_hours": (uptime_hours * 100.0).round() / 100.0,
        "note": note.get("note_created"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_jobs() {
        let jobs = schedules(&TriggerConfig::default()).unwrap();
        let names: Vec<&str> = jobs.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec![HEALTH_CHECK, AUTO_BACKUP, DAILY_SUMMARY]);
        assert_eq!(jobs[0].1.to_string(), "every 300s");
        assert_eq!(jobs[2].1.to_string(), "daily at 23:00");
    }

    #[test]
    fn disabled_jobs_are_skipped() {
        let config = TriggerConfig::new()
            .with_health_check_interval_secs(0)
            .with_backup_interval_secs(0)
            .with_daily_summary_time("");
        assert!(schedules(&config).unwrap().is_empty());
        assert!(schedules(&TriggerConfig::new().with_daily_summary_time("25:61")).is_err());
    }
}
