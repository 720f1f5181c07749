//! In-process scheduler and worker loop on tokio
//!
//! [`LocalScheduler`] holds each invocation on its own timer and, once due,
//! sends it to a [`Worker`]. The worker dispatches every invocation on a
//! separate tokio task, so invocations for the same key may run concurrently
//! and the ticket store stays the only coordination point.

use crate::handler::{Invocation, Outcome};
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use lull_core::{Clock, ScheduledInvocation, SystemClock, TaskScheduler};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Default capacity of the channel between scheduler and worker
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Timer-based scheduler feeding a local [`Worker`]
#[derive(Clone)]
pub struct LocalScheduler {
    tx: mpsc::Sender<ScheduledInvocation>,
    clock: Arc<dyn Clock>,
    pending: Arc<AtomicUsize>,
}

impl LocalScheduler {
    /// Create a scheduler and the receiving end for its worker
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ScheduledInvocation>) {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    /// Like [`LocalScheduler::new`], measuring delays against `clock`
    pub fn with_clock(
        capacity: usize,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::Receiver<ScheduledInvocation>) {
        let (tx, rx) = mpsc::channel(capacity);
        let scheduler = Self {
            tx,
            clock,
            pending: Arc::new(AtomicUsize::new(0)),
        };
        (scheduler, rx)
    }

    /// Invocations whose timer has not yet handed them to the worker
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until every timer has fired and been handed over
    pub async fn wait_idle(&self, poll: Duration) {
        while self.pending() > 0 {
            tokio::time::sleep(poll).await;
        }
    }
}

#[async_trait]
impl TaskScheduler for LocalScheduler {
    async fn schedule_at(&self, invocation: ScheduledInvocation) -> lull_core::Result<()> {
        if self.tx.is_closed() {
            return Err(lull_core::Error::scheduler("local worker has shut down"));
        }

        let wait_secs = invocation.fire_at.saturating_sub(self.clock.now_secs()).max(0);
        let wait = Duration::from_secs(u64::try_from(wait_secs).unwrap_or(0));
        let tx = self.tx.clone();
        let pending = self.pending.clone();

        pending.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let task = invocation.task.clone();
            if tx.send(invocation).await.is_err() {
                warn!("Dropping {} invocation: worker has shut down", task);
            }
            pending.fetch_sub(1, Ordering::SeqCst);
        });

        debug!("Timer set for {:?}", wait);
        Ok(())
    }
}

/// Counts of what the worker did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub executed: u64,
    pub skipped: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct WorkerStats {
    executed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

impl WorkerStats {
    fn report(&self) -> WorkerReport {
        WorkerReport {
            executed: self.executed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Receives due invocations and dispatches them through a pipeline
pub struct Worker {
    pipeline: Arc<Pipeline>,
    rx: mpsc::Receiver<ScheduledInvocation>,
    stats: Arc<WorkerStats>,
}

impl Worker {
    pub fn new(pipeline: Arc<Pipeline>, rx: mpsc::Receiver<ScheduledInvocation>) -> Self {
        Self {
            pipeline,
            rx,
            stats: Arc::new(WorkerStats::default()),
        }
    }

    /// Run on a background task; stop it through the returned handle
    pub fn spawn(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(self.run(shutdown_rx));
        WorkerHandle {
            shutdown: Some(shutdown_tx),
            join,
        }
    }

    /// Process invocations until shutdown is signalled or every sender is gone
    ///
    /// On shutdown the channel is closed, invocations already queued are still
    /// dispatched, and in-flight dispatches are awaited. Dropping the shutdown
    /// sender counts as a shutdown signal.
    pub async fn run(mut self, shutdown: oneshot::Receiver<()>) -> WorkerReport {
        let mut in_flight = JoinSet::new();
        let mut shutdown = shutdown;

        info!("Worker started");

        loop {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(invocation) => self.dispatch(&mut in_flight, invocation),
                    None => break,
                },
                _ = &mut shutdown => {
                    debug!("Worker shutdown requested");
                    self.rx.close();
                    while let Some(invocation) = self.rx.recv().await {
                        self.dispatch(&mut in_flight, invocation);
                    }
                    break;
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }

        while in_flight.join_next().await.is_some() {}

        let report = self.stats.report();
        info!(
            "Worker stopped: {} executed, {} skipped, {} failed",
            report.executed, report.skipped, report.failed
        );
        report
    }

    fn dispatch(&self, in_flight: &mut JoinSet<()>, scheduled: ScheduledInvocation) {
        let pipeline = self.pipeline.clone();
        let stats = self.stats.clone();

        in_flight.spawn(async move {
            let invocation = Invocation::from(scheduled);
            let task = invocation.task.clone();

            match pipeline.dispatch(invocation).await {
                Ok(Outcome::Completed(_)) => {
                    stats.executed.fetch_add(1, Ordering::SeqCst);
                    info!("{} completed", task);
                }
                Ok(Outcome::Skipped) => {
                    stats.skipped.fetch_add(1, Ordering::SeqCst);
                    debug!("{} skipped (superseded)", task);
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::SeqCst);
                    error!("{} failed: {}", task, e);
                }
            }
        });
    }
}

/// Handle to a spawned [`Worker`]
pub struct WorkerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<WorkerReport>,
}

impl WorkerHandle {
    /// Stop accepting new invocations, drain the queue and wait for the worker
    pub async fn shutdown(mut self) -> WorkerReport {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.join.await {
            Ok(report) => report,
            Err(e) => {
                error!("Worker task panicked: {}", e);
                WorkerReport::default()
            }
        }
    }
}
