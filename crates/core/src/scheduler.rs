//! Task scheduler abstraction
//!
//! The coordinator never runs work itself. It hands a [`ScheduledInvocation`]
//! to a [`TaskScheduler`], which must invoke the named task with the given
//! arguments no earlier than `fire_at`.

use crate::error::Result;
use crate::key::DebounceMeta;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A task invocation requested for a future time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInvocation {
    /// Task type to invoke
    pub task: String,
    /// Earliest fire time, Unix seconds
    pub fire_at: i64,
    /// Positional arguments; debounced invocations end with a metadata record
    pub args: Vec<Value>,
}

impl ScheduledInvocation {
    pub fn new(task: impl Into<String>, fire_at: i64, args: Vec<Value>) -> Self {
        Self {
            task: task.into(),
            fire_at,
            args,
        }
    }

    /// Debounce metadata carried in the trailing argument, if any
    pub fn meta(&self) -> Option<DebounceMeta> {
        self.args.last().and_then(DebounceMeta::from_value)
    }
}

/// Accepts invocations to run at a later time
#[async_trait]
pub trait TaskScheduler: Send + Sync {
    async fn schedule_at(&self, invocation: ScheduledInvocation) -> Result<()>;
}

/// Scheduler that only records what it was asked to do
///
/// Used for tests and dry runs; [`RecordingScheduler::due`] hands back the
/// invocations whose time has come so a caller can fire them by hand.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    pending: Mutex<Vec<ScheduledInvocation>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything scheduled and not yet taken, in scheduling order
    pub fn scheduled(&self) -> Vec<ScheduledInvocation> {
        self.pending.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Remove and return invocations with `fire_at <= now`, ordered by fire time
    ///
    /// Invocations sharing a fire time keep their scheduling order.
    pub fn due(&self, now_secs: i64) -> Vec<ScheduledInvocation> {
        let mut pending = self.pending.lock();
        let (mut ready, waiting): (Vec<_>, Vec<_>) =
            pending.drain(..).partition(|inv| inv.fire_at <= now_secs);
        *pending = waiting;
        ready.sort_by_key(|inv| inv.fire_at);
        ready
    }

    /// Remove and return everything, ordered by fire time
    pub fn drain(&self) -> Vec<ScheduledInvocation> {
        self.due(i64::MAX)
    }
}

#[async_trait]
impl TaskScheduler for RecordingScheduler {
    async fn schedule_at(&self, invocation: ScheduledInvocation) -> Result<()> {
        self.pending.lock().push(invocation);
        Ok(())
    }
}
