//! Operational actions: notifications, log lines, scripts and backups.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use hubcentral_adapters::StorageAdapter;
use hubcentral_kernel::{EventType, Priority};
use serde_json::{Map, Value, json};

use super::{ActionContext, ActionHandler, ActionKind, rendered, str_param};
use crate::error::{Result, TriggerError};

/// Environment variable carrying the execution context into scripts.
pub const CONTEXT_ENV: &str = "HUBCENTRAL_CONTEXT";

const SCRIPT_TIMEOUT: Duration = Duration::from_secs(60);
const BACKUP_SCRIPT_TIMEOUT: Duration = Duration::from_secs(300);
const DEFAULT_BACKUP_FOLDER: &str = "Backups";

fn timeout_param(params: &Map<String, Value>, default: Duration) -> Duration {
    params
        .get("timeout_secs")
        .and_then(Value::as_u64)
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Output of a finished command.
struct CommandOutput {
    stdout: String,
    stderr: String,
    code: i32,
}

/// Run `program args...` with the context exported, killing it on timeout.
async fn run_command(
    program: &str,
    args: &[&str],
    context: &Map<String, Value>,
    timeout: Duration,
) -> Result<CommandOutput> {
    let context_json = serde_json::to_string(context)?;
    let mut command = tokio::process::Command::new(program);
    command
        .args(args)
        .env(CONTEXT_ENV, context_json)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(TriggerError::Execution(format!("failed to run `{program}`: {e}")));
        }
        Err(_) => {
            return Err(TriggerError::Execution(format!(
                "`{program}` timed out after {}s",
                timeout.as_secs()
            )));
        }
    };

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        code: output.status.code().unwrap_or(-1),
    })
}

// ---------------------------------------------------------------------------
// send_notification
// ---------------------------------------------------------------------------

/// `send_notification`: log the rendered message and publish it as a
/// `notification` event when a bus is attached.
pub struct SendNotification;

#[async_trait]
impl ActionHandler for SendNotification {
    fn kind(&self) -> ActionKind {
        ActionKind::SendNotification
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
        deps: &ActionContext,
    ) -> Result<Value> {
        let title = rendered(params, "title", context)
            .unwrap_or_else(|| "Hub Central notification".into());
        let message = rendered(params, "message", context).unwrap_or_default();
        let trigger_id = context
            .get("trigger")
            .and_then(|t| t.get("id"))
            .cloned()
            .unwrap_or(Value::Null);

        tracing::info!(title = %title, message = %message, "notification");

        let published = match deps.bus() {
            Some(bus) => {
                let priority = match str_param(params, "priority") {
                    Some(p) => p.parse().unwrap_or(Priority::Normal),
                    None => Priority::Normal,
                };
                bus.create_event(
                    EventType::Notification,
                    "triggers",
                    json!({ "title": title, "message": message, "trigger_id": trigger_id }),
                    priority,
                )
                .await;
                true
            }
            None => false,
        };

        Ok(json!({
            "notification_sent": true,
            "published": published,
            "title": title,
            "message": message,
        }))
    }
}

// ---------------------------------------------------------------------------
// log_event
// ---------------------------------------------------------------------------

/// `log_event`: emit the rendered `message` at `level`.
pub struct LogEvent;

#[async_trait]
impl ActionHandler for LogEvent {
    fn kind(&self) -> ActionKind {
        ActionKind::LogEvent
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
        _deps: &ActionContext,
    ) -> Result<Value> {
        let message = rendered(params, "message", context).unwrap_or_else(|| "Event recorded".into());
        let level = str_param(params, "level").unwrap_or("info");
        match level {
            "debug" => tracing::debug!(target: "hubcentral::events", "{message}"),
            "warn" | "warning" => tracing::warn!(target: "hubcentral::events", "{message}"),
            "error" => tracing::error!(target: "hubcentral::events", "{message}"),
            _ => tracing::info!(target: "hubcentral::events", "{message}"),
        }
        Ok(json!({ "logged": true, "level": level, "message": message }))
    }
}

// ---------------------------------------------------------------------------
// custom_script
// ---------------------------------------------------------------------------

/// `custom_script`: run `script` through `sh -c` (or PowerShell when
/// `script_type = "powershell"`).  A non-zero exit is a failure.
pub struct CustomScript;

#[async_trait]
impl ActionHandler for CustomScript {
    fn kind(&self) -> ActionKind {
        ActionKind::CustomScript
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
        _deps: &ActionContext,
    ) -> Result<Value> {
        let script = str_param(params, "script").ok_or_else(|| {
            TriggerError::Execution("`custom_script` needs a `script` parameter".into())
        })?;
        let timeout = timeout_param(params, SCRIPT_TIMEOUT);

        let output = match str_param(params, "script_type").unwrap_or("shell") {
            "powershell" => run_command("powershell", &["-Command", script], context, timeout).await?,
            "shell" | "sh" | "bash" => run_command("sh", &["-c", script], context, timeout).await?,
            other => {
                return Err(TriggerError::Execution(format!("unknown script_type `{other}`")));
            }
        };

        if output.code != 0 {
            return Err(TriggerError::Execution(format!(
                "script exited with status {}: {}",
                output.code,
                output.stderr.trim()
            )));
        }

        Ok(json!({
            "script_executed": true,
            "stdout": output.stdout,
            "stderr": output.stderr,
            "return_code": output.code,
        }))
    }
}

// ---------------------------------------------------------------------------
// backup_vault
// ---------------------------------------------------------------------------

/// `backup_vault`: run `command` if given, otherwise copy every document of
/// the source storage into `{backup_folder}/{timestamp}/` on the target
/// storage.
pub struct BackupVault;

#[async_trait]
impl ActionHandler for BackupVault {
    fn kind(&self) -> ActionKind {
        ActionKind::BackupVault
    }

    async fn run(
        &self,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
        deps: &ActionContext,
    ) -> Result<Value> {
        if let Some(command) = str_param(params, "command") {
            let timeout = timeout_param(params, BACKUP_SCRIPT_TIMEOUT);
            let output = run_command("sh", &["-c", command], context, timeout).await?;
            if output.code != 0 {
                return Err(TriggerError::Execution(format!(
                    "backup command exited with status {}: {}",
                    output.code,
                    output.stderr.trim()
                )));
            }
            return Ok(json!({ "backup_completed": true, "output": output.stdout }));
        }

        let source = deps.storage(str_param(params, "storage")).await?;
        let target = match str_param(params, "target_storage") {
            Some(name) => deps.storage(Some(name)).await?,
            None => source.clone(),
        };
        let folder = rendered(params, "backup_folder", context)
            .unwrap_or_else(|| DEFAULT_BACKUP_FOLDER.into());
        let folder = folder.trim_matches('/').to_string();
        let destination = format!("{folder}/{}", Local::now().format("%Y%m%d_%H%M%S"));

        let mut copied = 0usize;
        for path in source.list(None).await? {
            if path.starts_with(&format!("{folder}/")) {
                continue;
            }
            let mut document = source.load(&path).await?;
            if let Some(map) = document.as_object_mut() {
                map.remove("path");
            }
            target.save(&document, Some(&format!("{destination}/{path}"))).await?;
            copied += 1;
        }

        tracing::info!(
            source = source.id(),
            target = target.id(),
            destination = %destination,
            documents = copied,
            "vault backup completed"
        );
        Ok(json!({
            "backup_completed": true,
            "destination": destination,
            "documents": copied,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::tests::{memory_deps, obj};
    use hubcentral_kernel::{BusConfig, EventBus};

    #[tokio::test]
    async fn script_output_and_context_env() {
        let params = obj(json!({ "script": "printf '%s' \"$HUBCENTRAL_CONTEXT\"" }));
        let context = obj(json!({ "answer": 42 }));
        let out = CustomScript
            .run(&params, &context, &ActionContext::new())
            .await
            .unwrap();
        assert_eq!(out["return_code"], 0);
        assert_eq!(out["stdout"], r#"{"answer":42}"#);
    }

    #[tokio::test]
    async fn failing_script_is_an_error() {
        let params = obj(json!({ "script": "echo boom >&2; exit 4" }));
        let err = CustomScript
            .run(&params, &Map::new(), &ActionContext::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("status 4: boom"));
    }

    #[tokio::test]
    async fn slow_script_times_out() {
        let params = obj(json!({ "script": "sleep 5", "timeout_secs": 1 }));
        let err = CustomScript
            .run(&params, &Map::new(), &ActionContext::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn notification_is_published_on_the_bus() {
        let bus = EventBus::with_config(BusConfig::new().with_idle_backoff_ms(5));
        bus.start().await;
        let deps = ActionContext::new().with_bus(&bus);

        let params = obj(json!({ "title": "Alert", "message": "{what} happened" }));
        let context = obj(json!({ "what": "something", "trigger": { "id": "trg_1" } }));
        let out = SendNotification.run(&params, &context, &deps).await.unwrap();
        assert_eq!(out["published"], true);
        assert_eq!(out["message"], "something happened");

        bus.stop().await.unwrap();
        let events = bus.history(10).await;
        let note = events
            .iter()
            .find(|e| e.event_type == EventType::Notification)
            .unwrap();
        assert_eq!(note.payload["trigger_id"], "trg_1");
    }

    #[tokio::test]
    async fn log_event_renders_message() {
        let out = LogEvent
            .run(
                &obj(json!({ "message": "saw {n}", "level": "warning" })),
                &obj(json!({ "n": 3 })),
                &ActionContext::new(),
            )
            .await
            .unwrap();
        assert_eq!(out["message"], "saw 3");
    }

    #[tokio::test]
    async fn backup_copies_every_document_once() {
        let (deps, memory) = memory_deps().await;
        for path in ["a.md", "Projects/b.md"] {
            memory.save(&json!({ "content": path }), Some(path)).await.unwrap();
        }

        let out = BackupVault.run(&Map::new(), &Map::new(), &deps).await.unwrap();
        assert_eq!(out["documents"], 2);
        let destination = out["destination"].as_str().unwrap().to_string();
        assert!(destination.starts_with("Backups/"));

        let copy = memory.load(&format!("{destination}/Projects/b.md")).await.unwrap();
        assert_eq!(copy["content"], "Projects/b.md");

        // Earlier backups are not copied into new ones.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let out = BackupVault.run(&Map::new(), &Map::new(), &deps).await.unwrap();
        assert_eq!(out["documents"], 2);
    }

    #[tokio::test]
    async fn backup_command_variant() {
        let params = obj(json!({ "command": "echo done" }));
        let out = BackupVault
            .run(&params, &Map::new(), &ActionContext::new())
            .await
            .unwrap();
        assert_eq!(out["output"], "done\n");
    }
}
