//! Background scheduler for `scheduled` triggers.
//!
//! The [`Scheduler`] keeps one [`ScheduledJob`] per installed trigger and a
//! tick loop that wakes every `tick` to fire due jobs.  Firing goes straight
//! to a callback (the registry's scheduled execution path), never through
//! the event bus queue.  Each fire runs on its own tokio task, so a slow or
//! panicking action cannot stall or kill the loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local};
use futures::future::BoxFuture;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::error::{Result, TriggerError};
use crate::model::{Trigger, TriggerType};
use crate::schedule::Schedule;

/// Invoked with a trigger id whenever its job is due.
pub type FireFn = Arc<dyn Fn(String) -> BoxFuture<'static, ()> + Send + Sync>;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One installed trigger schedule.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub trigger_id: String,
    pub name: String,
    pub schedule: Schedule,
    /// Next planned firing; `None` when the schedule has no further
    /// occurrence.
    pub next_run: Option<DateTime<Local>>,
    pub last_run: Option<DateTime<Local>>,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Jobs keyed by trigger id plus the tick loop driving them.
pub struct Scheduler {
    jobs: Arc<RwLock<HashMap<String, ScheduledJob>>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
    tick: Duration,
}

impl Scheduler {
    /// Create a stopped scheduler with no jobs.
    pub fn new(tick: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
            tick: tick.max(Duration::from_millis(10)),
        }
    }

    /// Install (or replace) the job for a `scheduled` trigger.
    ///
    /// The first firing is the schedule's next occurrence after now.
    pub async fn install(&self, trigger: &Trigger) -> Result<()> {
        if trigger.trigger_type != TriggerType::Scheduled {
            return Err(TriggerError::Configuration(format!(
                "trigger {} is a {} trigger, not scheduled",
                trigger.id, trigger.trigger_type
            )));
        }
        let schedule = Schedule::from_config(&trigger.config)?;
        self.install_job(trigger.id.clone(), trigger.name.clone(), schedule)
            .await;
        Ok(())
    }

    /// Install (or replace) a job under `job_id`.  The fire callback
    /// receives `job_id` when it is due.
    pub async fn install_job(&self, job_id: String, name: String, schedule: Schedule) {
        let next_run = schedule.next_after(&Local::now());

        tracing::info!(
            job_id = %job_id,
            job_name = %name,
            schedule = %schedule,
            next_run = ?next_run,
            "scheduled job installed"
        );

        let job = ScheduledJob {
            trigger_id: job_id.clone(),
            name,
            schedule,
            next_run,
            last_run: None,
        };
        self.jobs.write().await.insert(job_id, job);
    }

    /// Remove the job for `trigger_id`.  Returns whether one was installed.
    pub async fn uninstall(&self, trigger_id: &str) -> bool {
        let removed = self.jobs.write().await.remove(trigger_id).is_some();
        if removed {
            tracing::info!(trigger_id, "scheduled job removed");
        }
        removed
    }

    /// Snapshot of every installed job, soonest first.
    pub async fn jobs(&self) -> Vec<ScheduledJob> {
        let mut jobs: Vec<ScheduledJob> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| match (a.next_run, b.next_run) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.trigger_id.cmp(&b.trigger_id),
        });
        jobs
    }

    pub async fn job(&self, trigger_id: &str) -> Option<ScheduledJob> {
        self.jobs.read().await.get(trigger_id).cloned()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the tick loop.  Starting a running scheduler is a no-op.
    pub async fn start(&self, fire: FireFn) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("scheduler already running");
            return;
        }

        let running = Arc::clone(&self.running);
        let jobs = Arc::clone(&self.jobs);
        let tick = self.tick;

        let handle = tokio::spawn(async move {
            tracing::info!(tick_ms = tick.as_millis() as u64, "trigger scheduler started");
            while running.load(Ordering::SeqCst) {
                for trigger_id in take_due(&jobs, Local::now()).await {
                    tracing::debug!(trigger_id = %trigger_id, "scheduled job due");
                    tokio::spawn(fire(trigger_id));
                }
                tokio::time::sleep(tick).await;
            }
            tracing::info!("trigger scheduler stopped");
        });
        *self.handle.lock().await = Some(handle);
    }

    /// Stop the tick loop and wait for it to exit.  In-flight fires keep
    /// running to completion.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.handle.lock().await.take()
            && let Err(e) = handle.await
        {
            tracing::error!(error = %e, "scheduler task failed during shutdown");
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Mark every job due at `now` as run and advance its `next_run`.
async fn take_due(jobs: &RwLock<HashMap<String, ScheduledJob>>, now: DateTime<Local>) -> Vec<String> {
    let mut due = Vec::new();
    for job in jobs.write().await.values_mut() {
        if let Some(planned) = job.next_run
            && planned <= now
        {
            job.last_run = Some(now);
            job.next_run = advance(&job.schedule, planned, now);
            due.push(job.trigger_id.clone());
        }
    }
    due
}

/// The next firing after a job planned for `planned` ran at `now`.
///
/// Intervals stay on their original grid, skipping missed slots, so the
/// tick period does not accumulate as drift.  Wall-clock and cron
/// schedules are recomputed from `now`.
fn advance(schedule: &Schedule, planned: DateTime<Local>, now: DateTime<Local>) -> Option<DateTime<Local>> {
    match schedule {
        Schedule::Interval(_) => {
            let mut next = schedule.next_after(&planned)?;
            while next <= now {
                next = schedule.next_after(&next)?;
            }
            Some(next)
        }
        _ => schedule.next_after(&now),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
