//! Hub Central adapters.
//!
//! The collaborators the orchestration core depends on but does not
//! implement itself:
//!
//! - **[`ProviderAdapter`]** -- answer a prompt; concrete
//!   [`OpenAiCompatProvider`] (chat completions over HTTP) and
//!   [`ScriptProvider`] (local command).
//! - **[`StorageAdapter`]** -- save/load/list/delete documents; concrete
//!   [`MemoryStorage`] and [`VaultStorage`], plus the [`StorageManager`]
//!   that fans out across named backends.

pub mod error;
pub mod providers;
pub mod storage;
pub mod traits;

pub use error::{AdapterError, ProviderError, ProviderResult, Result};
pub use providers::{OpenAiCompatProvider, ScriptProvider};
pub use storage::{MemoryStorage, SaveOutcome, StorageManager, VaultStorage};
pub use traits::{HealthStatus, ProviderAdapter, StorageAdapter, StorageHealth};
