//! Task handlers: the bodies the pipeline ultimately runs

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

/// A task invocation as seen by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Task type, used to pick the handler and the coordinator
    pub task: String,
    /// Positional arguments
    pub args: Vec<Value>,
}

impl Invocation {
    pub fn new(task: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            task: task.into(),
            args,
        }
    }
}

impl From<lull_core::ScheduledInvocation> for Invocation {
    fn from(scheduled: lull_core::ScheduledInvocation) -> Self {
        Self {
            task: scheduled.task,
            args: scheduled.args,
        }
    }
}

/// What happened to an invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The body ran and returned this value
    Completed(Value),
    /// A later trigger owns the debounce ticket; the body was not run
    Skipped,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

/// Body of one task type
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Task type this handler serves
    fn task_type(&self) -> &str;

    async fn perform(&self, args: Vec<Value>) -> anyhow::Result<Value>;
}

/// Handler built from an async closure
pub struct FnHandler<F> {
    task_type: String,
    f: F,
}

/// Wrap an async closure as a [`TaskHandler`]
pub fn handler_fn<F, Fut>(task_type: impl Into<String>, f: F) -> FnHandler<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    FnHandler {
        task_type: task_type.into(),
        f,
    }
}

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    fn task_type(&self) -> &str {
        &self.task_type
    }

    async fn perform(&self, args: Vec<Value>) -> anyhow::Result<Value> {
        (self.f)(args).await
    }
}
