//! Trigger registry.
//!
//! The [`TriggerRegistry`] owns the live trigger set, persists it through a
//! [`TriggerStore`] after every mutation, keeps `scheduled` triggers installed
//! in its [`Scheduler`], and runs trigger actions for all four activation
//! paths (scheduled, event, webhook, intelligent) plus manual execution.
//!
//! # Locking
//!
//! Executions snapshot the trigger under the read lock, run the action with
//! no lock held, then update counters on the *live* record under the write
//! lock.  Writes to the store are serialized by a separate mutex and always
//! save the latest in-memory state, so a failed write is repaired by the
//! next successful one.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Instant;

use chrono::{DateTime, Local, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};

use crate::actions::{ActionContext, ActionKind, ActionRegistry, DEFAULT_ACTION};
use crate::conditions::{
    event_conditions_hold, intelligent_condition_holds, validate_event_config,
    validate_intelligent_config, validate_webhook_config,
};
use crate::config::TriggerConfig;
use crate::error::{Result, TriggerError};
use crate::model::{
    NewTrigger, Trigger, TriggerStatus, TriggerType, TriggerUpdate, merge_object, new_trigger_id,
};
use crate::schedule::Schedule;
use crate::scheduler::{FireFn, ScheduledJob, Scheduler};
use crate::store::TriggerStore;
use crate::templates::{self, TriggerTemplate};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of running one trigger's action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub trigger_id: String,
    pub trigger_name: String,
    pub action: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Aggregate counters over the trigger set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerStats {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub total_runs: u64,
    pub total_errors: u64,
}

/// What `execute` would do for a trigger, without doing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryRun {
    pub trigger_id: String,
    pub name: String,
    pub trigger_type: TriggerType,
    pub action: ActionKind,
    pub parameters: Map<String, Value>,
    /// Whether automatic activation paths would run it.
    pub would_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Local>>,
}

/// Per-id outcome of a bulk operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResult {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkResult {
    fn ok(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: true,
            error: None,
        }
    }

    fn failed(id: impl Into<String>, error: impl ToString) -> Self {
        Self {
            id: id.into(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// How `import` combines incoming records with the current set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Insert new ids and overwrite existing ones.
    #[default]
    Merge,
    /// Drop the current set first.
    Replace,
}

// ---------------------------------------------------------------------------
// TriggerRegistry
// ---------------------------------------------------------------------------

/// Shared handle to the trigger set.  Cheap to clone.
#[derive(Clone)]
pub struct TriggerRegistry {
    inner: Arc<RegistryInner>,
}

/// Non-owning handle to a [`TriggerRegistry`], for callbacks stored inside
/// components the registry itself keeps alive.
#[derive(Clone)]
pub struct WeakTriggerRegistry {
    inner: Weak<RegistryInner>,
}

impl WeakTriggerRegistry {
    pub fn upgrade(&self) -> Option<TriggerRegistry> {
        self.inner.upgrade().map(|inner| TriggerRegistry { inner })
    }
}

struct RegistryInner {
    triggers: RwLock<HashMap<String, Trigger>>,
    store: Arc<dyn TriggerStore>,
    /// Serializes writes to `store`.
    persist_lock: Mutex<()>,
    actions: ActionRegistry,
    deps: ActionContext,
    scheduler: Scheduler,
}

impl TriggerRegistry {
    /// Load the persisted trigger set and build a registry around it.
    ///
    /// The scheduler is not started; see [`Self::start_scheduler`].
    pub async fn open(
        store: Arc<dyn TriggerStore>,
        actions: ActionRegistry,
        deps: ActionContext,
        config: &TriggerConfig,
    ) -> Result<Self> {
        let loaded = store.load().await?;
        let mut triggers = HashMap::with_capacity(loaded.len());
        for trigger in loaded {
            if triggers.contains_key(&trigger.id) {
                tracing::warn!(trigger_id = %trigger.id, "duplicate trigger id in store, keeping the last");
            }
            triggers.insert(trigger.id.clone(), trigger);
        }
        tracing::info!(count = triggers.len(), "trigger registry opened");

        Ok(Self {
            inner: Arc::new(RegistryInner {
                triggers: RwLock::new(triggers),
                store,
                persist_lock: Mutex::new(()),
                actions,
                deps,
                scheduler: Scheduler::new(config.tick()),
            }),
        })
    }

    pub fn downgrade(&self) -> WeakTriggerRegistry {
        WeakTriggerRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Collaborators handed to action handlers.
    pub fn deps(&self) -> &ActionContext {
        &self.inner.deps
    }

    pub async fn len(&self) -> usize {
        self.inner.triggers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.triggers.read().await.is_empty()
    }

    // -- CRUD ---------------------------------------------------------------

    /// Validate and store a new trigger.
    pub async fn create(&self, mut new: NewTrigger) -> Result<Trigger> {
        let config = into_object(std::mem::take(&mut new.config), "config")?;
        let action = into_object(std::mem::take(&mut new.action), "action")?;
        validate(new.trigger_type, &config, &action)?;

        let mut trigger = Trigger::from_new(new, config, action);
        {
            let mut triggers = self.inner.triggers.write().await;
            if triggers.contains_key(&trigger.id) {
                trigger.id = unused_id(|id| triggers.contains_key(id), new_trigger_id);
            }
            triggers.insert(trigger.id.clone(), trigger.clone());
        }

        tracing::info!(
            trigger_id = %trigger.id,
            trigger_name = %trigger.name,
            trigger_type = %trigger.trigger_type,
            "trigger created"
        );
        self.sync_schedule(&trigger).await;
        self.persist().await;
        Ok(trigger)
    }

    pub async fn read(&self, id: &str) -> Result<Trigger> {
        self.inner
            .triggers
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Every trigger, oldest first.
    pub async fn list(&self) -> Vec<Trigger> {
        let mut triggers: Vec<Trigger> = self.inner.triggers.read().await.values().cloned().collect();
        sort_by_age(&mut triggers);
        triggers
    }

    /// Apply a partial update.  `config` and `action` merge key by key.
    pub async fn update(&self, id: &str, update: TriggerUpdate) -> Result<Trigger> {
        let updated = {
            let mut triggers = self.inner.triggers.write().await;
            let current = triggers.get(id).ok_or_else(|| not_found(id))?;
            let mut next = current.clone();
            apply_update(&mut next, update);
            validate(next.trigger_type, &next.config, &next.action)?;
            next.updated_at = Utc::now();
            triggers.insert(id.to_string(), next.clone());
            next
        };

        tracing::info!(trigger_id = %id, "trigger updated");
        self.sync_schedule(&updated).await;
        self.persist().await;
        Ok(updated)
    }

    /// Remove a trigger, returning the removed record.
    pub async fn delete(&self, id: &str) -> Result<Trigger> {
        let removed = self
            .inner
            .triggers
            .write()
            .await
            .remove(id)
            .ok_or_else(|| not_found(id))?;

        tracing::info!(trigger_id = %id, trigger_name = %removed.name, "trigger deleted");
        self.inner.scheduler.uninstall(id).await;
        self.persist().await;
        Ok(removed)
    }

    /// Flip `enabled` (and the matching status).
    pub async fn toggle(&self, id: &str) -> Result<Trigger> {
        let toggled = {
            let mut triggers = self.inner.triggers.write().await;
            let trigger = triggers.get_mut(id).ok_or_else(|| not_found(id))?;
            trigger.set_enabled(!trigger.enabled);
            trigger.updated_at = Utc::now();
            trigger.clone()
        };

        tracing::info!(trigger_id = %id, enabled = toggled.enabled, "trigger toggled");
        self.sync_schedule(&toggled).await;
        self.persist().await;
        Ok(toggled)
    }

    // -- Execution ----------------------------------------------------------

    /// Run a trigger's action now, whether or not it is enabled.
    pub async fn execute(&self, id: &str, context: Map<String, Value>) -> Result<ExecutionOutcome> {
        let trigger = self.read(id).await?;
        Ok(self.run(trigger, context).await)
    }

    /// Scheduler entry point.  Disabled or deleted triggers are skipped.
    pub async fn execute_scheduled(&self, id: &str) -> Option<ExecutionOutcome> {
        let trigger = self.inner.triggers.read().await.get(id).cloned();
        let Some(trigger) = trigger else {
            tracing::debug!(trigger_id = %id, "scheduled trigger no longer exists");
            self.inner.scheduler.uninstall(id).await;
            return None;
        };
        if !trigger.enabled {
            tracing::debug!(trigger_id = %id, "skipping disabled scheduled trigger");
            return None;
        }

        let mut context = Map::new();
        context.insert("source".into(), Value::String("scheduler".into()));
        Some(self.run(trigger, context).await)
    }

    /// Run every enabled `event` trigger whose `event_type` matches and whose
    /// conditions hold for `payload`.
    pub async fn process_event(&self, event_type: &str, payload: &Value) -> Vec<ExecutionOutcome> {
        let matching = self
            .enabled_of(TriggerType::Event, |t| {
                t.config.get("event_type").and_then(Value::as_str) == Some(event_type)
                    && event_conditions_hold(&t.config, payload)
            })
            .await;
        tracing::debug!(event_type, matched = matching.len(), "event processed by triggers");
        self.run_all(matching, payload_context(payload)).await
    }

    /// Run every enabled `webhook` trigger whose `source` matches (or is `*`).
    pub async fn process_webhook(&self, source: &str, data: Value) -> Vec<ExecutionOutcome> {
        let matching = self
            .enabled_of(TriggerType::Webhook, |t| {
                matches!(t.config.get("source").and_then(Value::as_str), Some(s) if s == source || s == "*")
            })
            .await;
        tracing::debug!(source, matched = matching.len(), "webhook processed by triggers");

        let mut context = Map::new();
        context.insert("source".into(), Value::String(source.to_string()));
        context.insert("data".into(), data);
        self.run_all(matching, context).await
    }

    /// Evaluate every enabled `intelligent` trigger against `context`.
    pub async fn check_intelligent(&self, context: &Value) -> Vec<ExecutionOutcome> {
        let now = Local::now();
        let matching = self
            .enabled_of(TriggerType::Intelligent, |t| {
                intelligent_condition_holds(&t.config, context, &now)
            })
            .await;
        self.run_all(matching, payload_context(context)).await
    }

    // -- Administration -----------------------------------------------------

    pub async fn stats(&self) -> TriggerStats {
        let triggers = self.inner.triggers.read().await;
        let mut stats = TriggerStats {
            total: triggers.len(),
            by_type: TriggerType::ALL.iter().map(|t| (t.as_str().to_string(), 0)).collect(),
            ..TriggerStats::default()
        };
        for trigger in triggers.values() {
            if trigger.enabled {
                stats.enabled += 1;
            } else {
                stats.disabled += 1;
            }
            *stats.by_type.entry(trigger.trigger_type.as_str().to_string()).or_default() += 1;
            *stats.by_status.entry(trigger.status.as_str().to_string()).or_default() += 1;
            stats.total_runs += trigger.run_count;
            stats.total_errors += trigger.error_count;
        }
        stats
    }

    /// Describe what running `id` would do.
    pub async fn dry_run(&self, id: &str) -> Result<DryRun> {
        let trigger = self.read(id).await?;
        let action = ActionKind::of(&trigger.action)?;

        let (schedule, next_run) = if trigger.trigger_type == TriggerType::Scheduled {
            let schedule = Schedule::from_config(&trigger.config)?;
            let next_run = match self.inner.scheduler.job(id).await {
                Some(job) => job.next_run,
                None => schedule.next_after(&Local::now()),
            };
            (Some(schedule.to_string()), next_run)
        } else {
            (None, None)
        };

        Ok(DryRun {
            trigger_id: trigger.id,
            name: trigger.name,
            trigger_type: trigger.trigger_type,
            action,
            parameters: trigger.action,
            would_run: trigger.enabled,
            reason: (!trigger.enabled).then(|| "trigger is disabled".to_string()),
            schedule,
            next_run,
        })
    }

    /// Enable or disable several triggers, persisting once.
    pub async fn bulk_set_enabled(&self, ids: &[String], enabled: bool) -> Vec<BulkResult> {
        let mut results = Vec::with_capacity(ids.len());
        let mut changed = Vec::new();
        {
            let mut triggers = self.inner.triggers.write().await;
            for id in ids {
                match triggers.get_mut(id) {
                    Some(trigger) => {
                        if trigger.enabled != enabled {
                            trigger.set_enabled(enabled);
                            trigger.updated_at = Utc::now();
                            changed.push(trigger.clone());
                        }
                        results.push(BulkResult::ok(id));
                    }
                    None => results.push(BulkResult::failed(id, not_found(id))),
                }
            }
        }

        for trigger in &changed {
            self.sync_schedule(trigger).await;
        }
        if !changed.is_empty() {
            tracing::info!(count = changed.len(), enabled, "triggers bulk toggled");
            self.persist().await;
        }
        results
    }

    /// Delete several triggers, persisting once.
    pub async fn bulk_delete(&self, ids: &[String]) -> Vec<BulkResult> {
        let mut results = Vec::with_capacity(ids.len());
        let mut removed = Vec::new();
        {
            let mut triggers = self.inner.triggers.write().await;
            for id in ids {
                match triggers.remove(id) {
                    Some(_) => {
                        removed.push(id.clone());
                        results.push(BulkResult::ok(id));
                    }
                    None => results.push(BulkResult::failed(id, not_found(id))),
                }
            }
        }

        for id in &removed {
            self.inner.scheduler.uninstall(id).await;
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "triggers bulk deleted");
            self.persist().await;
        }
        results
    }

    /// Every trigger record, oldest first, ready for [`Self::import`].
    pub async fn export(&self) -> Vec<Trigger> {
        self.list().await
    }

    /// Import exported records.  Each record is validated on its own; invalid
    /// records are reported and skipped.
    pub async fn import(&self, records: Vec<Trigger>, mode: ImportMode) -> Vec<BulkResult> {
        let mut results = Vec::with_capacity(records.len());
        let mut accepted = Vec::new();
        let existing: HashSet<String> = self.inner.triggers.read().await.keys().cloned().collect();
        let mut batch: HashSet<String> = records
            .iter()
            .filter(|r| !r.id.is_empty())
            .map(|r| r.id.clone())
            .collect();
        for mut record in records {
            if record.id.is_empty() {
                record.id = unused_id(|id| existing.contains(id) || batch.contains(id), new_trigger_id);
                batch.insert(record.id.clone());
            }
            match validate(record.trigger_type, &record.config, &record.action) {
                Ok(()) => {
                    results.push(BulkResult::ok(&record.id));
                    accepted.push(record);
                }
                Err(e) => results.push(BulkResult::failed(&record.id, e)),
            }
        }

        let dropped: Vec<String> = {
            let mut triggers = self.inner.triggers.write().await;
            let dropped = match mode {
                ImportMode::Merge => Vec::new(),
                ImportMode::Replace => triggers.drain().map(|(id, _)| id).collect(),
            };
            for record in &accepted {
                triggers.insert(record.id.clone(), record.clone());
            }
            dropped
        };

        for id in &dropped {
            self.inner.scheduler.uninstall(id).await;
        }
        for record in &accepted {
            self.sync_schedule(record).await;
        }
        tracing::info!(imported = accepted.len(), ?mode, "triggers imported");
        self.persist().await;
        results
    }

    // -- Templates ----------------------------------------------------------

    pub fn list_templates(&self) -> Vec<TriggerTemplate> {
        templates::catalog()
    }

    /// Create a trigger from a catalog template.  `overrides.config` and
    /// `overrides.action` merge into the template; the other fields replace.
    pub async fn create_from_template(&self, name: &str, overrides: TriggerUpdate) -> Result<Trigger> {
        let template = templates::find(name)
            .ok_or_else(|| TriggerError::NotFound(format!("template `{name}`")))?;
        let mut new = template.trigger;

        if let Some(name) = overrides.name {
            new.name = name;
        }
        if let Some(description) = overrides.description {
            new.description = description;
        }
        if let Some(enabled) = overrides.enabled {
            new.enabled = enabled;
        }
        if let (Some(patch), Value::Object(config)) = (overrides.config, &mut new.config) {
            merge_object(config, patch);
        }
        if let (Some(patch), Value::Object(action)) = (overrides.action, &mut new.action) {
            merge_object(action, patch);
        }

        tracing::info!(template = %template.slug, "creating trigger from template");
        self.create(new).await
    }

    // -- Scheduler ----------------------------------------------------------

    /// Install every enabled `scheduled` trigger and start the tick loop.
    pub async fn start_scheduler(&self) {
        let scheduled = self.enabled_of(TriggerType::Scheduled, |_| true).await;
        for trigger in &scheduled {
            if let Err(e) = self.inner.scheduler.install(trigger).await {
                tracing::warn!(trigger_id = %trigger.id, error = %e, "cannot schedule trigger");
            }
        }

        let registry = self.downgrade();
        let fire: FireFn = Arc::new(move |id| {
            let registry = registry.clone();
            async move {
                if let Some(registry) = registry.upgrade() {
                    registry.execute_scheduled(&id).await;
                }
            }
            .boxed()
        });
        self.inner.scheduler.start(fire).await;
        tracing::info!(jobs = scheduled.len(), "trigger scheduler running");
    }

    pub async fn stop_scheduler(&self) {
        self.inner.scheduler.stop().await;
    }

    pub fn scheduler_running(&self) -> bool {
        self.inner.scheduler.is_running()
    }

    pub async fn scheduled_jobs(&self) -> Vec<ScheduledJob> {
        self.inner.scheduler.jobs().await
    }

    /// Write the current set to the store.
    pub async fn save(&self) -> Result<()> {
        let _guard = self.inner.persist_lock.lock().await;
        let snapshot = self.list().await;
        self.inner.store.save(&snapshot).await
    }

    // -- Private helpers ----------------------------------------------------

    /// Persist, logging failures.  In-memory state stays authoritative.
    async fn persist(&self) {
        if let Err(e) = self.save().await {
            tracing::error!(error = %e, "failed to persist triggers");
        }
    }

    /// Keep the scheduler in line with a trigger's current state.
    async fn sync_schedule(&self, trigger: &Trigger) {
        if trigger.trigger_type == TriggerType::Scheduled && trigger.enabled {
            if let Err(e) = self.inner.scheduler.install(trigger).await {
                tracing::warn!(trigger_id = %trigger.id, error = %e, "cannot schedule trigger");
            }
        } else {
            self.inner.scheduler.uninstall(&trigger.id).await;
        }
    }

    /// Snapshot of enabled triggers of one type matching `filter`, oldest
    /// first.
    async fn enabled_of(&self, trigger_type: TriggerType, filter: impl Fn(&Trigger) -> bool) -> Vec<Trigger> {
        let mut matching: Vec<Trigger> = self
            .inner
            .triggers
            .read()
            .await
            .values()
            .filter(|t| t.enabled && t.trigger_type == trigger_type && filter(t))
            .cloned()
            .collect();
        sort_by_age(&mut matching);
        matching
    }

    async fn run_all(&self, triggers: Vec<Trigger>, context: Map<String, Value>) -> Vec<ExecutionOutcome> {
        let mut outcomes = Vec::with_capacity(triggers.len());
        for trigger in triggers {
            outcomes.push(self.run(trigger, context.clone()).await);
        }
        outcomes
    }

    /// Run `trigger`'s action and record the outcome on the live record.
    async fn run(&self, trigger: Trigger, context: Map<String, Value>) -> ExecutionOutcome {
        let start = Instant::now();
        let outcome = self.run_action(&trigger, context).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => tracing::info!(
                trigger_id = %trigger.id,
                trigger_name = %trigger.name,
                elapsed_ms,
                "trigger executed"
            ),
            Err(error) => tracing::error!(
                trigger_id = %trigger.id,
                trigger_name = %trigger.name,
                error = %error,
                "trigger execution failed"
            ),
        }

        self.record(&trigger.id, outcome.as_ref().err()).await;
        self.persist().await;

        let action = trigger.action_type().unwrap_or(DEFAULT_ACTION.as_str()).to_string();
        let (success, result, error) = match outcome {
            Ok(value) => (true, Some(value), None),
            Err(error) => (false, None, Some(error)),
        };
        ExecutionOutcome {
            trigger_id: trigger.id,
            trigger_name: trigger.name,
            action,
            success,
            result,
            error,
            elapsed_ms,
        }
    }

    async fn run_action(&self, trigger: &Trigger, context: Map<String, Value>) -> std::result::Result<Value, String> {
        let kind = ActionKind::of(&trigger.action).map_err(|e| e.to_string())?;
        let handler = self
            .inner
            .actions
            .get(kind)
            .ok_or_else(|| format!("no handler registered for `{kind}`"))?;

        let mut merged = Map::new();
        merged.insert(
            "trigger".into(),
            serde_json::to_value(trigger).map_err(|e| e.to_string())?,
        );
        merged.insert("timestamp".into(), Value::String(Utc::now().to_rfc3339()));
        merged.extend(context);

        let outcome = AssertUnwindSafe(handler.run(&trigger.action, &merged, &self.inner.deps))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(panic) => Err(format!("action panicked: {}", panic_message(panic.as_ref()))),
        }
    }

    /// Update counters on the live record, if it still exists.
    async fn record(&self, id: &str, error: Option<&String>) {
        let mut triggers = self.inner.triggers.write().await;
        let Some(live) = triggers.get_mut(id) else {
            tracing::debug!(trigger_id = %id, "trigger removed while executing");
            return;
        };
        match error {
            None => {
                live.last_run = Some(Utc::now());
                live.run_count += 1;
            }
            Some(error) => {
                live.error_count += 1;
                live.last_error = Some(error.clone());
                live.status = TriggerStatus::Error;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(id: &str) -> TriggerError {
    TriggerError::NotFound(id.to_string())
}

fn into_object(value: Value, field: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(TriggerError::Configuration(format!(
            "`{field}` must be an object, got {other}"
        ))),
    }
}

/// Reject trigger definitions that could never run.
fn validate(
    trigger_type: TriggerType,
    config: &Map<String, Value>,
    action: &Map<String, Value>,
) -> Result<()> {
    let kind = ActionKind::of(action)?;
    crate::actions::validate_params(kind, action)?;
    match trigger_type {
        TriggerType::Scheduled => Schedule::from_config(config).map(|_| ()),
        TriggerType::Event => validate_event_config(config),
        TriggerType::Webhook => validate_webhook_config(config),
        TriggerType::Intelligent => validate_intelligent_config(config),
    }
}

/// The first generated id for which `taken` is false.
fn unused_id(taken: impl Fn(&str) -> bool, mut generate: impl FnMut() -> String) -> String {
    loop {
        let id = generate();
        if !taken(&id) {
            return id;
        }
        tracing::debug!(trigger_id = %id, "generated trigger id already in use, retrying");
    }
}

fn apply_update(trigger: &mut Trigger, update: TriggerUpdate) {
    if let Some(name) = update.name {
        trigger.name = name;
    }
    if let Some(description) = update.description {
        trigger.description = description;
    }
    if let Some(config) = update.config {
        merge_object(&mut trigger.config, config);
    }
    if let Some(action) = update.action {
        merge_object(&mut trigger.action, action);
    }
    if let Some(enabled) = update.enabled {
        trigger.set_enabled(enabled);
    }
}

/// Execution context built from an event payload.
fn payload_context(payload: &Value) -> Map<String, Value> {
    match payload {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("payload".into(), other.clone());
            map
        }
    }
}

fn sort_by_age(triggers: &mut [Trigger]) {
    triggers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
