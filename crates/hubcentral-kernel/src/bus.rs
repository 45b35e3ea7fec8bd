//! Priority event bus.
//!
//! The bus accepts [`Event`]s from any number of producers, enqueues them into
//! five priority-partitioned [`SegQueue`]s and dispatches them to registered
//! handlers from a single background tokio task.
//!
//! # Delivery model
//!
//! The worker drains **Critical** before **High**, **High** before **Normal**,
//! and so on.  Within a lane events are dispatched in enqueue order, so the
//! effective ordering key is `(priority, sequence)`.  Handlers for one event
//! run sequentially in registration order, and because there is exactly one
//! worker, handler execution for bus-dispatched events never overlaps.
//!
//! # Condition triggers
//!
//! [`EventBus::create_event`] evaluates every enabled condition trigger on the
//! caller's task *before* returning.  A slow trigger action therefore adds
//! latency to the producer.  Matching actions that fail or panic are logged
//! and counted in [`BusStatus::errors`]; they never reach the producer.

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use chrono::{DateTime, Utc};
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::BusConfig;
use crate::error::{KernelError, Result};
use crate::event::{Event, EventType, Priority};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Outcome of a handler or trigger action.
pub type HandlerResult = std::result::Result<Value, String>;

/// An async handler invoked by the worker for every event of one type.
pub type HandlerFn = Arc<dyn Fn(Event) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Predicate deciding whether a condition trigger fires for an event.
pub type ConditionFn = Arc<dyn Fn(&Event) -> bool + Send + Sync>;

/// Action run inline by `create_event` when a condition trigger matches.
pub type TriggerActionFn = Arc<dyn Fn(Event) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Snapshot of a condition trigger registered on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusTriggerInfo {
    pub id: Uuid,
    pub name: String,
    pub enabled: bool,
    pub trigger_count: u64,
    pub last_triggered: Option<DateTime<Utc>>,
}

/// Point-in-time view of the bus counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusStatus {
    pub running: bool,
    pub queue_depth: usize,
    pub events_processed: u64,
    pub triggers: usize,
    pub triggers_fired: u64,
    pub errors: u64,
    pub uptime_secs: u64,
}

struct BusTrigger {
    id: Uuid,
    name: String,
    condition: ConditionFn,
    action: TriggerActionFn,
    enabled: bool,
    trigger_count: u64,
    last_triggered: Option<DateTime<Utc>>,
}

impl BusTrigger {
    fn info(&self) -> BusTriggerInfo {
        BusTriggerInfo {
            id: self.id,
            name: self.name.clone(),
            enabled: self.enabled,
            trigger_count: self.trigger_count,
            last_triggered: self.last_triggered,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Priority-ordered, single-consumer event bus.
///
/// The bus is cheaply cloneable (`Arc`-backed) and safe to share across
/// threads and async tasks.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

/// Non-owning handle to an [`EventBus`], for actions that need to reach back
/// into the bus that stores them.
#[derive(Clone)]
pub struct WeakEventBus {
    inner: Weak<BusInner>,
}

impl WeakEventBus {
    /// Upgrade to a strong handle if the bus is still alive.
    pub fn upgrade(&self) -> Option<EventBus> {
        self.inner.upgrade().map(|inner| EventBus { inner })
    }
}

struct BusInner {
    config: BusConfig,

    /// One lock-free queue per priority tier, most urgent first.
    lanes: [SegQueue<Event>; 5],

    /// Number of events currently sitting in the lanes.
    depth: AtomicUsize,

    /// Source of the FIFO tie-breaker stamped on each event.
    sequence: AtomicU64,

    /// Per-type handlers in registration order.
    handlers: DashMap<EventType, Vec<HandlerFn>>,

    /// Condition triggers in registration order.
    triggers: RwLock<Vec<BusTrigger>>,

    /// Processed events, oldest first.
    history: Mutex<VecDeque<Event>>,

    /// Wakes the worker when new work arrives.
    notify: Notify,

    running: AtomicBool,
    started_at: Mutex<Option<Instant>>,
    worker: Mutex<Option<JoinHandle<()>>>,

    processed: AtomicU64,
    fired: AtomicU64,
    errors: AtomicU64,
}

impl EventBus {
    /// Create a bus with default configuration **without** starting the
    /// worker.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a bus with the given configuration.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                config,
                lanes: [
                    SegQueue::new(),
                    SegQueue::new(),
                    SegQueue::new(),
                    SegQueue::new(),
                    SegQueue::new(),
                ],
                depth: AtomicUsize::new(0),
                sequence: AtomicU64::new(0),
                handlers: DashMap::new(),
                triggers: RwLock::new(Vec::new()),
                history: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                running: AtomicBool::new(false),
                started_at: Mutex::new(None),
                worker: Mutex::new(None),
                processed: AtomicU64::new(0),
                fired: AtomicU64::new(0),
                errors: AtomicU64::new(0),
            }),
        }
    }

    /// A weak handle that does not keep the bus alive.
    pub fn downgrade(&self) -> WeakEventBus {
        WeakEventBus {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether the worker is running.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    // -- Producers ----------------------------------------------------------

    /// Enqueue a new event and evaluate condition triggers against it.
    ///
    /// Returns the event as enqueued (unprocessed).  Trigger actions that
    /// match have already run when this returns.
    pub async fn create_event(
        &self,
        event_type: EventType,
        source: impl Into<String>,
        payload: Value,
        priority: Priority,
    ) -> Event {
        let sequence = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
        let event = Event::new(event_type, source, payload, priority, sequence);

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            source = %event.source,
            ?priority,
            "event created"
        );

        self.inner.depth.fetch_add(1, Ordering::AcqRel);
        self.inner.lanes[priority.lane()].push(event.clone());
        self.inner.notify.notify_one();

        self.evaluate_triggers(&event).await;
        event
    }

    /// Register a handler for every event of `event_type`.
    ///
    /// Multiple handlers per type run in registration order.
    pub fn register_handler<F, Fut>(&self, event_type: EventType, handler: F)
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |event| handler(event).boxed());
        self.inner
            .handlers
            .entry(event_type)
            .or_default()
            .push(handler);
        tracing::debug!(event_type = %event_type, "handler registered");
    }

    // -- Condition triggers -------------------------------------------------

    /// Register a condition trigger, enabled by default.
    pub async fn register_trigger<C, A, Fut>(
        &self,
        name: impl Into<String>,
        condition: C,
        action: A,
    ) -> Uuid
    where
        C: Fn(&Event) -> bool + Send + Sync + 'static,
        A: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let id = Uuid::now_v7();
        let name = name.into();
        let action: TriggerActionFn = Arc::new(move |event| action(event).boxed());

        tracing::info!(trigger_id = %id, trigger_name = %name, "bus trigger registered");

        self.inner.triggers.write().await.push(BusTrigger {
            id,
            name,
            condition: Arc::new(condition),
            action,
            enabled: true,
            trigger_count: 0,
            last_triggered: None,
        });
        id
    }

    /// Enable a condition trigger.
    pub async fn enable_trigger(&self, trigger_id: Uuid) -> Result<()> {
        self.set_trigger_enabled(trigger_id, true).await
    }

    /// Disable a condition trigger.  Disabled triggers are never evaluated.
    pub async fn disable_trigger(&self, trigger_id: Uuid) -> Result<()> {
        self.set_trigger_enabled(trigger_id, false).await
    }

    /// Snapshot of every registered condition trigger.
    pub async fn triggers(&self) -> Vec<BusTriggerInfo> {
        self.inner
            .triggers
            .read()
            .await
            .iter()
            .map(BusTrigger::info)
            .collect()
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Spawn the worker and emit a `system` startup event at high priority.
    ///
    /// Calling `start` on a running bus is a no-op.
    pub async fn start(&self) {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            tracing::debug!("event bus already running");
            return;
        }

        *self.inner.started_at.lock().await = Some(Instant::now());

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tracing::info!("event bus worker started");
            Self::worker_loop(&inner).await;
            tracing::info!("event bus worker stopped");
        });
        *self.inner.worker.lock().await = Some(handle);

        self.create_event(
            EventType::System,
            "hub_central",
            json!({ "action": "startup" }),
            Priority::High,
        )
        .await;
    }

    /// Emit a `system` shutdown event at critical priority, stop the worker
    /// and wait (bounded) for it to drain the queue.
    ///
    /// Calling `stop` on a stopped bus is a no-op.
    pub async fn stop(&self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        self.create_event(
            EventType::System,
            "hub_central",
            json!({ "action": "shutdown" }),
            Priority::Critical,
        )
        .await;

        self.inner.running.store(false, Ordering::Release);
        self.inner.notify.notify_one();

        let Some(handle) = self.inner.worker.lock().await.take() else {
            return Ok(());
        };

        let timeout = self.inner.config.shutdown_timeout();
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(KernelError::WorkerFailed {
                reason: err.to_string(),
            }),
            Err(_) => {
                tracing::warn!(seconds = timeout.as_secs(), "event bus worker did not stop in time");
                Err(KernelError::ShutdownTimeout {
                    seconds: timeout.as_secs(),
                })
            }
        }
    }

    // -- Introspection ------------------------------------------------------

    /// Current counters.
    pub async fn get_status(&self) -> BusStatus {
        let uptime_secs = if self.is_running() {
            self.inner
                .started_at
                .lock()
                .await
                .map(|at| at.elapsed().as_secs())
                .unwrap_or(0)
        } else {
            0
        };

        BusStatus {
            running: self.is_running(),
            queue_depth: self.inner.depth.load(Ordering::Acquire),
            events_processed: self.inner.processed.load(Ordering::Acquire),
            triggers: self.inner.triggers.read().await.len(),
            triggers_fired: self.inner.fired.load(Ordering::Acquire),
            errors: self.inner.errors.load(Ordering::Acquire),
            uptime_secs,
        }
    }

    /// The `limit` most recently processed events, oldest first.
    pub async fn history(&self, limit: usize) -> Vec<Event> {
        let history = self.inner.history.lock().await;
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    // -- Private helpers ----------------------------------------------------

    async fn set_trigger_enabled(&self, trigger_id: Uuid, enabled: bool) -> Result<()> {
        let mut triggers = self.inner.triggers.write().await;
        let trigger = triggers
            .iter_mut()
            .find(|t| t.id == trigger_id)
            .ok_or(KernelError::TriggerNotFound { trigger_id })?;
        trigger.enabled = enabled;
        tracing::info!(trigger_id = %trigger_id, enabled, "bus trigger toggled");
        Ok(())
    }

    /// Run every enabled condition trigger against `event`.
    ///
    /// The trigger list is snapshotted so no lock is held while an action
    /// runs; actions are free to create further events.
    async fn evaluate_triggers(&self, event: &Event) {
        let candidates: Vec<(Uuid, String, ConditionFn, TriggerActionFn)> = self
            .inner
            .triggers
            .read()
            .await
            .iter()
            .filter(|t| t.enabled)
            .map(|t| {
                (
                    t.id,
                    t.name.clone(),
                    Arc::clone(&t.condition),
                    Arc::clone(&t.action),
                )
            })
            .collect();

        for (id, name, condition, action) in candidates {
            let matched = match std::panic::catch_unwind(AssertUnwindSafe(|| condition(event))) {
                Ok(matched) => matched,
                Err(panic) => {
                    self.inner.errors.fetch_add(1, Ordering::AcqRel);
                    tracing::error!(
                        trigger_id = %id,
                        trigger_name = %name,
                        error = %panic_message(panic.as_ref()),
                        "bus trigger condition panicked"
                    );
                    continue;
                }
            };
            if !matched {
                continue;
            }

            if let Some(trigger) = self
                .inner
                .triggers
                .write()
                .await
                .iter_mut()
                .find(|t| t.id == id)
            {
                trigger.trigger_count += 1;
                trigger.last_triggered = Some(Utc::now());
            }
            self.inner.fired.fetch_add(1, Ordering::AcqRel);

            tracing::debug!(trigger_id = %id, trigger_name = %name, event_id = %event.id, "bus trigger fired");

            let outcome = AssertUnwindSafe(async { action(event.clone()).await })
                .catch_unwind()
                .await;
            let error = match outcome {
                Ok(Ok(_)) => continue,
                Ok(Err(err)) => err,
                Err(panic) => panic_message(panic.as_ref()),
            };
            self.inner.errors.fetch_add(1, Ordering::AcqRel);
            tracing::error!(
                trigger_id = %id,
                trigger_name = %name,
                event_id = %event.id,
                error = %error,
                "bus trigger action failed"
            );
        }
    }

    fn pop(inner: &BusInner) -> Option<Event> {
        let event = inner.lanes.iter().find_map(SegQueue::pop)?;
        inner.depth.fetch_sub(1, Ordering::AcqRel);
        Some(event)
    }

    /// Background worker loop.  Exits once the bus is stopped and every
    /// queued event has been dispatched.
    async fn worker_loop(inner: &BusInner) {
        let backoff = inner.config.idle_backoff();
        loop {
            match Self::pop(inner) {
                Some(event) => Self::dispatch(inner, event).await,
                None => {
                    if !inner.running.load(Ordering::Acquire) {
                        break;
                    }
                    // Park until notified or the backoff elapses.
                    let _ = tokio::time::timeout(backoff, inner.notify.notified()).await;
                }
            }
        }
    }

    async fn dispatch(inner: &BusInner, mut event: Event) {
        let handlers: Vec<HandlerFn> = inner
            .handlers
            .get(&event.event_type)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        let mut results = Vec::with_capacity(handlers.len());
        for (index, handler) in handlers.iter().enumerate() {
            let snapshot = event.clone();
            let outcome = AssertUnwindSafe(async { handler(snapshot).await })
                .catch_unwind()
                .await;
            let error = match outcome {
                Ok(Ok(value)) => {
                    results.push(json!({ "handler": index, "success": true, "result": value }));
                    continue;
                }
                Ok(Err(err)) => err,
                Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
            };
            inner.errors.fetch_add(1, Ordering::AcqRel);
            tracing::error!(
                event_id = %event.id,
                event_type = %event.event_type,
                handler = index,
                error = %error,
                "event handler failed"
            );
            results.push(json!({ "handler": index, "success": false, "error": error }));
        }

        event.processed = true;
        event.result = Some(json!({
            "handlers_executed": handlers.len(),
            "results": results,
        }));
        inner.processed.fetch_add(1, Ordering::AcqRel);

        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            handlers = handlers.len(),
            "event processed"
        );

        let capacity = inner.config.history_capacity;
        if capacity == 0 {
            return;
        }
        let mut history = inner.history.lock().await;
        while history.len() >= capacity {
            history.pop_front();
        }
        history.push_back(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
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
