//! Hub Central kernel.
//!
//! This crate provides the event plumbing every other Hub Central component
//! builds on:
//!
//! - **[`event`]** -- The [`Event`] record, its [`EventType`] and five-tier
//!   [`Priority`].
//! - **[`bus`]** -- Priority-ordered, single-consumer [`EventBus`] backed by
//!   [`crossbeam::queue::SegQueue`] lanes, with per-type handlers and
//!   condition triggers evaluated on ingestion.
//! - **[`config`]** -- The `[bus]` configuration section.
//! - **[`error`]** -- Unified kernel error types via [`thiserror`].
//!
//! All public types are `Send + Sync` and designed for use within a
//! multi-threaded tokio runtime.

pub mod bus;
pub mod config;
pub mod error;
pub mod event;

// Re-export the most commonly used types at the crate root for convenience.
pub use bus::{
    BusStatus, BusTriggerInfo, ConditionFn, EventBus, HandlerFn, HandlerResult, TriggerActionFn,
    WeakEventBus,
};
pub use config::BusConfig;
pub use error::{KernelError, Result};
pub use event::{Event, EventType, Priority};
