//! Trailing-edge debounce coordinator
//!
//! The store holds a single ticket per key. [`Coordinator::schedule`] always
//! re-issues the ticket to the newest caller; only the invocation whose id
//! still matches the ticket at execution time may cash it in via
//! [`Coordinator::admit`]. Of N rapid `schedule` calls for one key, earlier
//! invocations fire first and find the ticket already overwritten, so only
//! the last one runs.
//!
//! Race window: `admit` reads the ticket and deletes it in two separate store
//! commands, not an atomic compare-and-delete. Two invocations presenting the
//! *same* id concurrently could both run. Ids are minted per `schedule` call,
//! so correctness rests on id uniqueness rather than store atomicity.

use crate::clock::{Clock, SystemClock};
use crate::error::{BoxError, Error, Result};
use crate::key::{validate_task_type, DebounceKey, DebounceMeta, ExecutionId, KeySpec};
use crate::scheduler::{ScheduledInvocation, TaskScheduler};
use crate::store::TicketStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Slack added to the fire time when none is configured
pub const DEFAULT_DELAY_BUFFER: Duration = Duration::from_secs(1);

/// Per-task-type debounce timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Quiet period before the last trigger's invocation fires
    pub delay: Duration,
    /// Extra slack so an early-firing scheduler does not read a stale ticket
    pub delay_buffer: Duration,
}

impl DebounceConfig {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            delay_buffer: DEFAULT_DELAY_BUFFER,
        }
    }

    pub fn with_delay_buffer(mut self, delay_buffer: Duration) -> Self {
        self.delay_buffer = delay_buffer;
        self
    }

    /// Offset from now at which invocations are scheduled, in whole seconds
    ///
    /// The sum is rounded up so an invocation never fires before
    /// `now + delay + delay_buffer`.
    pub fn fire_offset_secs(&self) -> i64 {
        let total = self.delay.saturating_add(self.delay_buffer);
        let secs = total
            .as_secs()
            .saturating_add(u64::from(total.subsec_nanos() > 0));
        i64::try_from(secs).unwrap_or(i64::MAX)
    }
}

/// What `schedule` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleReceipt {
    pub key: DebounceKey,
    pub id: ExecutionId,
    /// Unix seconds handed to the scheduler
    pub fire_at: i64,
}

/// Outcome of an admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission<T> {
    /// A later `schedule` call (or an earlier admission) owns the ticket; the
    /// body was not run
    Superseded,
    /// This invocation held the ticket and the body returned a value
    Executed(T),
}

impl<T> Admission<T> {
    pub fn is_executed(&self) -> bool {
        matches!(self, Admission::Executed(_))
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Admission::Superseded)
    }
}

/// Debounce coordinator for one task type
///
/// One instance per task type for the lifetime of the process. All
/// coordination goes through the shared ticket store; there is no in-process
/// locking.
pub struct Coordinator {
    task_type: String,
    config: DebounceConfig,
    store: Arc<dyn TicketStore>,
    scheduler: Arc<dyn TaskScheduler>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("task_type", &self.task_type)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Create a coordinator for `task_type`
    ///
    /// The name becomes the key namespace, so it must be non-empty, free of
    /// `:` and distinct from every other task type sharing the store.
    pub fn new(
        task_type: impl Into<String>,
        config: DebounceConfig,
        store: Arc<dyn TicketStore>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Result<Self> {
        let task_type = task_type.into();
        validate_task_type(&task_type)?;

        Ok(Self {
            task_type,
            config,
            store,
            scheduler,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used to compute fire times
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    pub fn config(&self) -> DebounceConfig {
        self.config
    }

    /// Resolve and namespace the debounce key for these arguments
    pub fn debounce_key(&self, args: &[Value], spec: &KeySpec) -> Result<DebounceKey> {
        let derived = spec.resolve(args)?;
        DebounceKey::namespaced(&self.task_type, &derived)
    }

    /// Schedule a debounced invocation under a freshly minted id
    pub async fn schedule(&self, args: Vec<Value>, spec: &KeySpec) -> Result<ScheduleReceipt> {
        self.schedule_with_id(args, spec, ExecutionId::generate()).await
    }

    /// Schedule a debounced invocation under a caller-supplied id
    ///
    /// Writes the ticket (last writer wins), then enqueues the task for
    /// `now + delay + delay_buffer` with `{key, id}` appended to the arguments.
    /// Key errors are raised before either side effect. Reusing an id across
    /// calls defeats the race protection described in the module docs.
    pub async fn schedule_with_id(
        &self,
        mut args: Vec<Value>,
        spec: &KeySpec,
        id: ExecutionId,
    ) -> Result<ScheduleReceipt> {
        let key = self.debounce_key(&args, spec)?;

        self.store.set(key.as_str(), id.as_str()).await?;

        let fire_at = self
            .clock
            .now_secs()
            .saturating_add(self.config.fire_offset_secs());
        args.push(DebounceMeta::new(&key, &id).to_value());

        self.scheduler
            .schedule_at(ScheduledInvocation::new(self.task_type.clone(), fire_at, args))
            .await?;

        debug!("Scheduled {} as {} to fire at {}", key, id, fire_at);

        Ok(ScheduleReceipt { key, id, fire_at })
    }

    /// Run `body` only if `id` still holds the ticket for `key`
    ///
    /// 1. Read the ticket.
    /// 2. Absent or different: return [`Admission::Superseded`] with no store
    ///    mutation and without running the body.
    /// 3. Match: delete the ticket, then run the body.
    /// 4. Body failure: restore the ticket to `id` (best effort, not retried)
    ///    and return [`Error::TaskFailed`]. A retry presenting the same id is
    ///    then admitted again.
    pub async fn admit<F, Fut, T, E>(&self, key: &str, id: &str, body: F) -> Result<Admission<T>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = std::result::Result<T, E>> + Send,
        T: Send,
        E: Into<BoxError>,
    {
        let current = self.store.get(key).await?;
        if current.as_deref() != Some(id) {
            debug!("Skipping {} for {}: superseded", id, key);
            return Ok(Admission::Superseded);
        }

        self.store.del(key).await?;
        info!("Admitted {} for {}", id, key);

        let outcome = body().await.map_err(Into::into);
        match outcome {
            Ok(value) => Ok(Admission::Executed(value)),
            Err(source) => {
                if let Err(restore_err) = self.store.set(key, id).await {
                    warn!(
                        "Failed to re-arm ticket {} for {} after task failure: {}",
                        id, key, restore_err
                    );
                } else {
                    warn!("Task failed for {}; ticket {} re-armed", key, id);
                }
                Err(Error::TaskFailed { source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::scheduler::RecordingScheduler;
    use crate::store::{MemoryTicketStore, StoreOp};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const T0: i64 = 1_700_000_000;

    struct Harness {
        store: Arc<MemoryTicketStore>,
        scheduler: Arc<RecordingScheduler>,
        clock: Arc<ManualClock>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: Arc::new(MemoryTicketStore::new()),
                scheduler: Arc::new(RecordingScheduler::new()),
                clock: Arc::new(ManualClock::at_secs(T0)),
            }
        }

        fn coordinator(&self, task_type: &str, delay: u64, buffer: u64) -> Coordinator {
            let config = DebounceConfig::new(Duration::from_secs(delay))
                .with_delay_buffer(Duration::from_secs(buffer));
            Coordinator::new(task_type, config, self.store.clone(), self.scheduler.clone())
                .unwrap()
                .with_clock(self.clock.clone())
        }
    }

    fn ok_body(counter: &AtomicUsize) -> impl Future<Output = anyhow::Result<&'static str>> + Send + '_ {
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("done")
        }
    }

    #[tokio::test]
    async fn test_notify_scenario() {
        let h = Harness::new();
        let notify = h.coordinator("Notify", 60, 1);

        let receipt = notify
            .schedule_with_id(
                vec![json!("u1"), json!("u2")],
                &KeySpec::indices([0, 1]),
                ExecutionId::from("abc"),
            )
            .await
            .unwrap();

        assert_eq!(receipt.key.as_str(), "Notify:u1,u2");
        assert_eq!(receipt.fire_at, T0 + 61);
        assert_eq!(
            h.store.mutations(),
            vec![StoreOp::Set {
                key: "Notify:u1,u2".to_string(),
                value: "abc".to_string(),
            }]
        );
        assert_eq!(
            h.scheduler.scheduled(),
            vec![ScheduledInvocation::new(
                "Notify",
                T0 + 61,
                vec![json!("u1"), json!("u2"), json!({"key": "Notify:u1,u2", "id": "abc"})],
            )]
        );

        // A stranger id is rejected without touching the ticket
        let calls = AtomicUsize::new(0);
        let outcome = notify
            .admit("Notify:u1,u2", "xyz", || ok_body(&calls))
            .await
            .unwrap();
        assert!(outcome.is_superseded());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.peek("Notify:u1,u2"), Some("abc".to_string()));

        // The ticket holder runs and clears the ticket
        let outcome = notify
            .admit("Notify:u1,u2", "abc", || ok_body(&calls))
            .await
            .unwrap();
        assert_eq!(outcome, Admission::Executed("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.peek("Notify:u1,u2"), None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let h = Harness::new();
        let notify = h.coordinator("Notify", 60, 1);
        let spec = KeySpec::literal("u1");

        let mut ids = Vec::new();
        for _ in 0..5 {
            let receipt = notify.schedule(vec![json!("u1")], &spec).await.unwrap();
            ids.push(receipt.id);
            h.clock.advance(Duration::from_secs(2));
        }

        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());

        let calls = AtomicUsize::new(0);
        let mut executed = Vec::new();
        for inv in h.scheduler.drain() {
            let meta = inv.meta().unwrap();
            let outcome = notify.admit(&meta.key, &meta.id, || ok_body(&calls)).await.unwrap();
            if outcome.is_executed() {
                executed.push(meta.id);
            }
        }

        assert_eq!(executed, vec![ids[4].to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejection_after_consumption_is_idempotent() {
        let h = Harness::new();
        let notify = h.coordinator("Notify", 10, 0);
        let receipt = notify
            .schedule(vec![json!("u1")], &KeySpec::literal("u1"))
            .await
            .unwrap();
        let key = receipt.key.as_str();
        let id = receipt.id.as_str();

        let calls = AtomicUsize::new(0);
        assert!(notify.admit(key, id, || ok_body(&calls)).await.unwrap().is_executed());

        h.store.clear_ops();
        for _ in 0..3 {
            let outcome = notify.admit(key, id, || ok_body(&calls)).await.unwrap();
            assert!(outcome.is_superseded());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(h.store.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_failure_rearms_ticket() {
        let h = Harness::new();
        let notify = h.coordinator("Notify", 60, 1);
        h.store.set("Notify:u1", "abc").await.unwrap();

        let err = notify
            .admit("Notify:u1", "abc", || async {
                Err::<(), _>(anyhow::anyhow!("smtp timeout"))
            })
            .await
            .unwrap_err();

        assert!(err.is_task_failure());
        assert!(err.to_string().contains("smtp timeout"));
        assert_eq!(h.store.peek("Notify:u1"), Some("abc".to_string()));

        // A retry with the same id is admitted again
        let calls = AtomicUsize::new(0);
        let outcome = notify.admit("Notify:u1", "abc", || ok_body(&calls)).await.unwrap();
        assert!(outcome.is_executed());
        assert_eq!(h.store.peek("Notify:u1"), None);
    }

    #[tokio::test]
    async fn test_rearm_overwrites_schedule_made_during_body() {
        // Re-arming writes the pre-admission id unconditionally; a schedule
        // that landed during the body is overwritten. Best effort only.
        let h = Harness::new();
        let notify = h.coordinator("Notify", 60, 1);
        h.store.set("Notify:u1", "old").await.unwrap();

        let store = h.store.clone();
        let result = notify
            .admit("Notify:u1", "old", || async move {
                store.set("Notify:u1", "new").await?;
                Err::<(), BoxError>("boom".into())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(h.store.peek("Notify:u1"), Some("old".to_string()));
    }

    #[tokio::test]
    async fn test_namespacing_prevents_collision() {
        let h = Harness::new();
        let notify = h.coordinator("Notify", 60, 1);
        let digest = h.coordinator("Digest", 60, 1);
        let spec = KeySpec::literal("u1");

        let a = notify.schedule(vec![], &spec).await.unwrap();
        let b = digest.schedule(vec![], &spec).await.unwrap();

        assert_eq!(a.key.as_str(), "Notify:u1");
        assert_eq!(b.key.as_str(), "Digest:u1");
        assert_eq!(h.store.entries().len(), 2);

        let calls = AtomicUsize::new(0);
        assert!(notify
            .admit(a.key.as_str(), a.id.as_str(), || ok_body(&calls))
            .await
            .unwrap()
            .is_executed());

        assert_eq!(h.store.peek("Digest:u1"), Some(b.id.to_string()));
    }

    #[tokio::test]
    async fn test_invalid_key_has_no_side_effects() {
        let h = Harness::new();
        let notify = h.coordinator("Notify", 60, 1);

        let err = notify
            .schedule(vec![json!(null)], &KeySpec::indices([0]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KeyNotString { .. }));

        let err = notify
            .schedule(vec![json!("u1")], &KeySpec::derive(|_| json!(["not", "a", "string"])))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KeyNotString { .. }));

        assert!(h.store.ops().is_empty());
        assert!(h.scheduler.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let h = Harness::new();
        let notify = h.coordinator("Notify", 60, 1);
        h.store.set_offline(true);

        let err = notify
            .schedule(vec![], &KeySpec::literal("u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
        assert!(h.scheduler.is_empty());

        let calls = AtomicUsize::new(0);
        let err = notify
            .admit("Notify:u1", "abc", || ok_body(&calls))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_delete_blocks_body() {
        let h = Harness::new();
        let notify = h.coordinator("Notify", 60, 1);
        let receipt = notify
            .schedule(vec![json!("u1")], &KeySpec::indices([0]))
            .await
            .unwrap();

        h.store.set_fail_deletes(true);
        h.store.clear_ops();

        let calls = AtomicUsize::new(0);
        let err = notify
            .admit(receipt.key.as_str(), receipt.id.as_str(), || ok_body(&calls))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Store { .. }));
        assert!(!err.is_task_failure());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(h.store.mutations().is_empty());
        assert_eq!(h.store.peek(receipt.key.as_str()), Some(receipt.id.to_string()));

        // Once deletes work again the same invocation is admitted
        h.store.set_fail_deletes(false);
        let outcome = notify
            .admit(receipt.key.as_str(), receipt.id.as_str(), || ok_body(&calls))
            .await
            .unwrap();
        assert!(outcome.is_executed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_task_type_must_be_namespace_safe() {
        let h = Harness::new();
        let config = DebounceConfig::new(Duration::from_secs(1));
        let err = Coordinator::new("A:B", config, h.store.clone(), h.scheduler.clone()).unwrap_err();
        assert!(matches!(err, Error::InvalidTaskType { .. }));
    }

    #[test]
    fn test_fire_offset_rounds_up_to_seconds() {
        let config = DebounceConfig::new(Duration::from_millis(2500))
            .with_delay_buffer(Duration::from_millis(900));
        assert_eq!(config.fire_offset_secs(), 4);

        // Sub-second buffer still pushes the fire time past the delay
        let config = DebounceConfig::new(Duration::from_secs(60))
            .with_delay_buffer(Duration::from_millis(500));
        assert_eq!(config.fire_offset_secs(), 61);

        // Fractions that sum to a whole second are not rounded further
        let config = DebounceConfig::new(Duration::from_millis(1500))
            .with_delay_buffer(Duration::from_millis(500));
        assert_eq!(config.fire_offset_secs(), 2);

        assert_eq!(DebounceConfig::new(Duration::from_secs(60)).fire_offset_secs(), 61);
        assert_eq!(
            DebounceConfig::new(Duration::ZERO)
                .with_delay_buffer(Duration::ZERO)
                .fire_offset_secs(),
            0
        );
    }
}
