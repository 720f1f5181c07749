//! Task execution pipeline: handlers plus the interceptors wrapped around them

use crate::error::{Error, Result};
use crate::handler::{Invocation, Outcome, TaskHandler};
use crate::interceptor::{Interceptor, Next};
use std::collections::HashMap;
use std::sync::Arc;

/// Routes invocations to handlers through a fixed interceptor chain
#[derive(Default)]
pub struct Pipeline {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Run one invocation through the interceptors and its handler
    pub async fn dispatch(&self, invocation: Invocation) -> Result<Outcome> {
        let handler = self
            .handlers
            .get(&invocation.task)
            .ok_or_else(|| Error::UnknownTask {
                task: invocation.task.clone(),
            })?;

        Next::new(&self.interceptors, handler.as_ref())
            .run(invocation)
            .await
    }

    /// Registered task types, sorted
    pub fn task_types(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Default)]
pub struct PipelineBuilder {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl PipelineBuilder {
    /// Register a handler under its task type; a later registration replaces an earlier one
    pub fn handler(mut self, handler: impl TaskHandler + 'static) -> Self {
        let handler: Arc<dyn TaskHandler> = Arc::new(handler);
        self.handlers.insert(handler.task_type().to_string(), handler);
        self
    }

    /// Append an interceptor; interceptors run in the order they are added
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            handlers: self.handlers,
            interceptors: self.interceptors,
        }
    }
}
