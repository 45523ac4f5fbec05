//! Offline-first synchronization.
//!
//! - `engine`: one-shot pull (with built-in fallback) and push
//! - `scheduler`: periodic background sync gated by cache validity
//! - `bootstrap`: start-up sync and lifecycle of the scheduler

mod bootstrap;
mod engine;
mod mock_data;
mod scheduler;

pub use bootstrap::{Bootstrapper, SyncSession};
pub use engine::{PullOutcome, PushOutcome, SyncEngine, SyncReport};
pub use scheduler::{SchedulerConfig, SyncRun, SyncScheduler, TickOutcome};
