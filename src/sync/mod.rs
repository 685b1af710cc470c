//! Keeping the Source Buffer and the Rendered Tree consistent
//!
//! [`SyncCoordinator`] is the entry point. [`SyncState`] records which
//! propagation is in flight and [`Scheduler`] holds the debounced and
//! deferred work the coordinator hands back to the host's clock.

pub mod coordinator;
pub mod scheduler;
pub mod state;

pub use coordinator::{SyncCoordinator, TableKeyResult};
pub use scheduler::{ScheduledTask, Scheduler, TaskKind, TaskToken};
pub use state::{EditMode, SyncState};
