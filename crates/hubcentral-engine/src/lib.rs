//! Hub Central decision and execution engine.
//!
//! - **[`category`]** -- The eight task [`Category`] values, their keyword
//!   tables and the Aho-Corasick [`Categorizer`].
//! - **[`provider`]** -- Known AI back-ends ([`Provider`]) and their default
//!   endpoints.
//! - **[`decision`]** -- [`DecisionEngine`]: provider health and ranking.
//! - **[`execution`]** -- [`ExecutionEngine`]: task creation, fallback
//!   execution, parallel execution, statistics.
//! - **[`config`]** -- The `[engine]` and `[[providers]]` config sections.

pub mod category;
pub mod config;
pub mod decision;
pub mod error;
pub mod execution;
pub mod provider;
pub mod task;

pub use category::{Categorizer, Category};
pub use config::{EngineConfig, ProviderConfig, ProviderKind};
pub use decision::{DecisionEngine, ProviderState};
pub use error::{EngineError, Result};
pub use execution::{ExecutionEngine, ExecutionStats, NO_PROVIDERS};
pub use provider::Provider;
pub use task::{Attempt, Task};
