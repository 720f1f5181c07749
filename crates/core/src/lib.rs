//! Lull Core - trailing-edge debounce coordination for deferred tasks
//!
//! This crate provides:
//! - Debounce keys, execution ids and the invocation metadata record
//! - Ticket store trait with in-memory and sled backends
//! - Task scheduler trait with a recording implementation
//! - The per-task-type coordinator (`schedule` / `admit`)
//! - Coordinator registry and TOML settings

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod key;
pub mod registry;
pub mod scheduler;
pub mod settings;
pub mod store;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{Admission, Coordinator, DebounceConfig, ScheduleReceipt};
pub use error::{BoxError, Error, Result};
pub use key::{DebounceKey, DebounceMeta, ExecutionId, KeySpec};
pub use registry::CoordinatorRegistry;
pub use scheduler::{RecordingScheduler, ScheduledInvocation, TaskScheduler};
pub use settings::{Settings, StoreSettings, TaskSettings};
pub use store::{MemoryTicketStore, SledTicketStore, StoreOp, TicketStore};
