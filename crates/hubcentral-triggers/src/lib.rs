//! Hub Central triggers.
//!
//! Persistent automation on top of the kernel bus and the execution engine:
//!
//! - **[`model`]** -- The [`Trigger`] record and its create/update payloads.
//! - **[`registry`]** -- [`TriggerRegistry`]: CRUD, the four activation
//!   paths, statistics, bulk operations, import/export and templates.
//! - **[`store`]** -- [`TriggerStore`] persistence; [`JsonFileStore`] on disk.
//! - **[`schedule`]** / **[`scheduler`]** -- Interval, daily, weekly and cron
//!   schedules and the tick loop that fires them.
//! - **[`conditions`]** -- Event and intelligent condition evaluation.
//! - **[`actions`]** -- The fixed [`ActionKind`] set and its handlers.
//! - **[`render`]** -- `{placeholder}` rendering for action parameters.
//! - **[`templates`]** -- The built-in trigger template catalog.
//! - **[`builtin`]** -- Condition triggers bridging bus events into the
//!   registry and storage.
//! - **[`maintenance`]** -- The scheduled health check, backup and daily
//!   summary jobs.
//! - **[`config`]** -- The `[triggers]` configuration section.

pub mod actions;
pub mod builtin;
pub mod conditions;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod model;
pub mod registry;
pub mod render;
pub mod schedule;
pub mod scheduler;
pub mod store;
pub mod templates;

pub use actions::{ActionContext, ActionHandler, ActionKind, ActionRegistry};
pub use builtin::{AI_LOG_PATH, BuiltinTriggers, install_builtin};
pub use config::TriggerConfig;
pub use error::{Result, TriggerError};
pub use model::{NewTrigger, Trigger, TriggerStatus, TriggerType, TriggerUpdate};
pub use registry::{
    BulkResult, DryRun, ExecutionOutcome, ImportMode, TriggerRegistry, TriggerStats,
    WeakTriggerRegistry,
};
pub use schedule::Schedule;
pub use scheduler::{ScheduledJob, Scheduler};
pub use store::{JsonFileStore, MemoryStore, TriggerStore};
pub use templates::TriggerTemplate;
