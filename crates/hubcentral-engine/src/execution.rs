//! Execution engine: turns prompts into tasks and drives provider attempts
//! with fallback.
//!
//! Each candidate provider is tried in order under the task's per-attempt
//! timeout.  The first success wins; every failure marks that provider
//! offline in the [`DecisionEngine`] and moves on.  A task with N candidates
//! can therefore take up to N times its timeout.
//!
//! Every outcome lands in a bounded history and, when an [`EventBus`] is
//! attached, is published as an `ai_response` event at low priority so
//! triggers can react to it.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use hubcentral_adapters::{ProviderAdapter, ProviderError};
use hubcentral_kernel::{EventBus, EventType, Priority};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinSet;

use crate::category::Category;
use crate::config::{EngineConfig, ProviderConfig};
use crate::decision::DecisionEngine;
use crate::error::{EngineError, Result};
use crate::provider::Provider;
use crate::task::{Attempt, Task};

/// Maximum prompt characters carried in an `ai_response` event.
const EVENT_PROMPT_CHARS: usize = 100;

/// Maximum response characters carried in an `ai_response` event.
const EVENT_RESPONSE_CHARS: usize = 200;

/// Message recorded on a task that had no candidate provider.
pub const NO_PROVIDERS: &str = "no providers available";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Aggregate execution statistics.
///
/// Counters are cumulative over the engine's lifetime and do not shrink
/// when old tasks fall out of the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub total_tasks: u64,
    pub successful: u64,
    pub failed: u64,
    /// Percentage in `0.0..=100.0`.
    pub success_rate: f64,
    pub average_execution_time_ms: f64,
    pub provider_usage: BTreeMap<Provider, u64>,
    pub provider_status: BTreeMap<Provider, bool>,
}

#[derive(Default)]
struct Counters {
    total: u64,
    successful: u64,
    total_elapsed_ms: u64,
    usage: BTreeMap<Provider, u64>,
}

// ---------------------------------------------------------------------------
// ExecutionEngine
// ---------------------------------------------------------------------------

/// Routes and executes tasks.
///
/// Cheaply cloneable (`Arc`-backed); clones share adapters, provider state,
/// history and statistics.
#[derive(Clone)]
pub struct ExecutionEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    decision: DecisionEngine,
    adapters: DashMap<Provider, Arc<dyn ProviderAdapter>>,
    bus: RwLock<Option<EventBus>>,
    workers: Arc<Semaphore>,
    history: Mutex<VecDeque<Task>>,
    counters: Mutex<Counters>,
}

impl ExecutionEngine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let workers = Arc::new(Semaphore::new(config.max_workers.max(1)));
        let decision = DecisionEngine::new(config.offline_cooldown());
        Self {
            inner: Arc::new(EngineInner {
                config,
                decision,
                adapters: DashMap::new(),
                bus: RwLock::new(None),
                workers,
                history: Mutex::new(VecDeque::new()),
                counters: Mutex::new(Counters::default()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// The shared decision engine.
    pub fn decision(&self) -> &DecisionEngine {
        &self.inner.decision
    }

    /// Publish task outcomes on `bus` from now on.
    pub async fn attach_bus(&self, bus: EventBus) {
        *self.inner.bus.write().await = Some(bus);
    }

    // -- Providers ----------------------------------------------------------

    /// Register (or replace) the adapter serving `provider`.
    pub fn register_provider(&self, provider: Provider, adapter: Arc<dyn ProviderAdapter>) {
        tracing::info!(provider = %provider, adapter = adapter.name(), "provider registered");
        self.inner.adapters.insert(provider, adapter);
    }

    /// Build and register every `[[providers]]` entry.  Disabled entries are
    /// registered but marked disabled in the decision engine.
    ///
    /// Returns the number of registered providers.
    pub fn register_configured(&self, configs: &[ProviderConfig]) -> Result<usize> {
        for cfg in configs {
            let adapter = cfg.build()?;
            self.register_provider(cfg.provider, adapter);
            self.inner.decision.set_provider_enabled(cfg.provider, cfg.enabled);
        }
        Ok(configs.len())
    }

    /// Providers with a registered adapter.
    pub fn registered_providers(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self.inner.adapters.iter().map(|e| *e.key()).collect();
        providers.sort();
        providers
    }

    // -- Tasks --------------------------------------------------------------

    /// Create a task, categorizing the prompt when no category is given and
    /// resolving its provider order.
    pub fn create_task(
        &self,
        prompt: impl Into<String>,
        category: Option<Category>,
        context: Option<Value>,
        preferred: Option<Provider>,
    ) -> Task {
        let prompt = prompt.into();
        let category = category.unwrap_or_else(|| self.inner.decision.categorize(&prompt));
        let candidates = self.inner.decision.select_providers(category, preferred);

        let mut task = Task::new(prompt, category, candidates, self.inner.config.default_timeout_secs);
        if let Some(context) = context {
            task = task.with_context(context);
        }

        tracing::info!(
            task_id = %task.id,
            category = %task.category,
            providers = ?task.candidate_providers,
            "task created"
        );
        task
    }

    /// Run `task` against its candidates until one succeeds.
    pub async fn execute(&self, mut task: Task) -> Task {
        let start = Instant::now();
        let system_context = self.system_context(&task);

        if task.candidate_providers.is_empty() {
            tracing::warn!(task_id = %task.id, category = %task.category, "no providers available");
            task.error = Some(NO_PROVIDERS.to_string());
        }

        for (attempt_no, provider) in task.candidate_providers.clone().into_iter().enumerate() {
            tracing::info!(task_id = %task.id, provider = %provider, attempt = attempt_no + 1, "attempting provider");

            let attempt_start = Instant::now();
            let outcome = self.call_provider(provider, &task, system_context.as_deref()).await;
            let latency_ms = attempt_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(text) => {
                    self.inner
                        .decision
                        .update_provider_status(provider, true, Some(latency_ms));
                    task.attempts.push(Attempt {
                        provider,
                        success: true,
                        latency_ms,
                        error: None,
                    });
                    task.result = Some(text);
                    task.provider_used = Some(provider);
                    task.success = true;
                    task.error = None;
                    tracing::info!(task_id = %task.id, provider = %provider, latency_ms, "provider succeeded");
                    break;
                }
                Err(err) => {
                    tracing::warn!(task_id = %task.id, provider = %provider, error = %err, "provider failed");
                    self.inner.decision.update_provider_status(provider, false, None);
                    let message = err.to_string();
                    task.attempts.push(Attempt {
                        provider,
                        success: false,
                        latency_ms,
                        error: Some(message.clone()),
                    });
                    task.error = Some(message);
                }
            }
        }

        task.elapsed_ms = start.elapsed().as_millis() as u64;
        self.record(&task).await;
        self.publish(&task).await;
        task
    }

    /// Execute tasks concurrently, at most `max_workers` at a time.
    ///
    /// Every input task is returned, in completion order.
    pub async fn execute_parallel(&self, tasks: Vec<Task>) -> Vec<Task> {
        let mut set = JoinSet::new();
        let mut pending = HashMap::with_capacity(tasks.len());

        for task in tasks {
            let engine = self.clone();
            let workers = Arc::clone(&self.inner.workers);
            let backup = task.clone();
            let handle = set.spawn(async move {
                // The semaphore is never closed.
                let _permit = workers.acquire_owned().await.ok();
                engine.execute(task).await
            });
            pending.insert(handle.id(), backup);
        }

        let mut results = Vec::with_capacity(pending.len());
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, task)) => {
                    pending.remove(&id);
                    results.push(task);
                }
                Err(err) => {
                    let Some(mut task) = pending.remove(&err.id()) else {
                        continue;
                    };
                    tracing::error!(task_id = %task.id, error = %err, "task execution aborted");
                    task.success = false;
                    task.provider_used = None;
                    task.error = Some(format!("task execution aborted: {err}"));
                    results.push(task);
                }
            }
        }
        results
    }

    /// Create and execute a task, returning the answer text.
    pub async fn ask(
        &self,
        prompt: impl Into<String>,
        category: Option<Category>,
        preferred: Option<Provider>,
    ) -> Result<String> {
        let task = self.create_task(prompt, category, None, preferred);
        if task.candidate_providers.is_empty() {
            let category = task.category;
            self.execute(task).await;
            return Err(EngineError::NoProviders { category });
        }
        let task = self.execute(task).await;
        match task.result {
            Some(text) if task.success => Ok(text),
            _ => Err(EngineError::AllProvidersFailed {
                last_error: task.error.unwrap_or_else(|| "unknown error".into()),
            }),
        }
    }

    // -- Introspection ------------------------------------------------------

    pub async fn get_stats(&self) -> ExecutionStats {
        let counters = self.inner.counters.lock().await;
        let failed = counters.total - counters.successful;
        let (success_rate, average_execution_time_ms) = if counters.total > 0 {
            (
                counters.successful as f64 / counters.total as f64 * 100.0,
                counters.total_elapsed_ms as f64 / counters.total as f64,
            )
        } else {
            (0.0, 0.0)
        };

        ExecutionStats {
            total_tasks: counters.total,
            successful: counters.successful,
            failed,
            success_rate,
            average_execution_time_ms,
            provider_usage: counters.usage.clone(),
            provider_status: self
                .inner
                .decision
                .provider_states()
                .into_iter()
                .map(|(p, s)| (p, s.online))
                .collect(),
        }
    }

    /// The `limit` most recently executed tasks, oldest first.
    pub async fn history(&self, limit: usize) -> Vec<Task> {
        let history = self.inner.history.lock().await;
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    // -- Private helpers ----------------------------------------------------

    async fn call_provider(
        &self,
        provider: Provider,
        task: &Task,
        system_context: Option<&str>,
    ) -> std::result::Result<String, ProviderError> {
        let adapter = self
            .inner
            .adapters
            .get(&provider)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("no adapter registered for `{provider}`"))
            })?;

        let timeout = task.timeout();
        match tokio::time::timeout(timeout, adapter.call(&task.prompt, system_context, timeout)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    fn system_context(&self, task: &Task) -> Option<String> {
        let base = self.inner.config.system_prompt.clone();
        if !task.has_context() {
            return base;
        }
        let context = serde_json::to_string_pretty(&task.context).unwrap_or_default();
        Some(match base {
            Some(prompt) => format!("{prompt}\n\nContext:\n{context}"),
            None => format!("Context:\n{context}"),
        })
    }

    async fn record(&self, task: &Task) {
        {
            let mut counters = self.inner.counters.lock().await;
            counters.total += 1;
            counters.total_elapsed_ms += task.elapsed_ms;
            if task.success {
                counters.successful += 1;
            }
            if let Some(provider) = task.provider_used {
                *counters.usage.entry(provider).or_default() += 1;
            }
        }

        let capacity = self.inner.config.history_capacity;
        if capacity == 0 {
            return;
        }
        let mut history = self.inner.history.lock().await;
        while history.len() >= capacity {
            history.pop_front();
        }
        history.push_back(task.clone());
    }

    async fn publish(&self, task: &Task) {
        let Some(bus) = self.inner.bus.read().await.clone() else {
            return;
        };
        let payload = json!({
            "task_id": task.id,
            "provider": task.provider_used,
            "category": task.category,
            "success": task.success,
            "execution_time_ms": task.elapsed_ms,
            "prompt": truncate(&task.prompt, EVENT_PROMPT_CHARS),
            "response": task.result.as_deref().map(|r| truncate(r, EVENT_RESPONSE_CHARS)),
            "error": task.error,
        });
        bus.create_event(EventType::AiResponse, "execution_engine", payload, Priority::Low)
            .await;
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
