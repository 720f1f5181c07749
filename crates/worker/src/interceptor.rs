//! Middleware wrapped around task execution
//!
//! Interceptors are registered on a [`Pipeline`](crate::Pipeline) and run in
//! registration order. Each one decides whether to pass the invocation on via
//! [`Next::run`] or to short-circuit it.

use crate::error::{Error, Result};
use crate::handler::{Invocation, Outcome, TaskHandler};
use async_trait::async_trait;
use lull_core::{Admission, CoordinatorRegistry, DebounceMeta};
use std::sync::Arc;
use tracing::{debug, warn};

/// Pre-check run before a task body
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, invocation: Invocation, next: Next<'_>) -> Result<Outcome>;
}

/// The rest of the pipeline after the current interceptor
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    handler: &'a dyn TaskHandler,
}

impl<'a> Next<'a> {
    pub(crate) fn new(interceptors: &'a [Arc<dyn Interceptor>], handler: &'a dyn TaskHandler) -> Self {
        Self {
            interceptors,
            handler,
        }
    }

    /// Continue with the remaining interceptors, then the handler
    pub async fn run(self, invocation: Invocation) -> Result<Outcome> {
        match self.interceptors.split_first() {
            Some((first, rest)) => {
                first
                    .intercept(invocation, Next::new(rest, self.handler))
                    .await
            }
            None => {
                let Invocation { task, args } = invocation;
                self.handler
                    .perform(args)
                    .await
                    .map(Outcome::Completed)
                    .map_err(|e| Error::task(task, e))
            }
        }
    }
}

/// Gates debounced invocations through their task type's coordinator
///
/// An invocation whose trailing argument is a `{key, id}` record has the
/// record stripped and the body run only if `admit` lets it through.
/// Invocations without the record (never debounced, or enqueued before
/// debouncing was enabled) run unconditionally.
pub struct DebounceInterceptor {
    registry: Arc<CoordinatorRegistry>,
}

impl DebounceInterceptor {
    pub fn new(registry: Arc<CoordinatorRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Interceptor for DebounceInterceptor {
    async fn intercept(&self, invocation: Invocation, next: Next<'_>) -> Result<Outcome> {
        let Invocation { task, args } = invocation;
        let (args, meta) = DebounceMeta::split_trailing(args);

        let meta = match meta {
            Some(meta) => meta,
            None => return next.run(Invocation { task, args }).await,
        };

        let coordinator = match self.registry.get(&task) {
            Some(coordinator) => coordinator,
            None => {
                warn!(
                    "No debounce coordinator for {}; running {} ungated",
                    task, meta.key
                );
                return next.run(Invocation { task, args }).await;
            }
        };

        let invocation = Invocation { task, args };
        let admitted = coordinator
            .admit(&meta.key, &meta.id, || next.run(invocation))
            .await;

        match admitted {
            Ok(Admission::Executed(outcome)) => Ok(outcome),
            Ok(Admission::Superseded) => {
                debug!("Debounced invocation {} for {} skipped", meta.id, meta.key);
                Ok(Outcome::Skipped)
            }
            // Hand back the body's own error rather than the wrapped one
            Err(lull_core::Error::TaskFailed { source }) => match source.downcast::<Error>() {
                Ok(original) => Err(*original),
                Err(source) => Err(Error::Debounce(lull_core::Error::TaskFailed { source })),
            },
            Err(e) => Err(e.into()),
        }
    }
}
