//! Task execution for Lull
//!
//! This crate provides:
//! - Task handlers and the invocation/outcome types
//! - Interceptor middleware, including the debounce gate
//! - A pipeline routing invocations through interceptors to handlers
//! - A tokio-based local scheduler and worker loop

pub mod error;
pub mod handler;
pub mod interceptor;
pub mod local;
pub mod pipeline;

pub use error::{Error, Result};
pub use handler::{handler_fn, FnHandler, Invocation, Outcome, TaskHandler};
pub use interceptor::{DebounceInterceptor, Interceptor, Next};
pub use local::{LocalScheduler, Worker, WorkerHandle, WorkerReport, DEFAULT_QUEUE_CAPACITY};
pub use pipeline::{Pipeline, PipelineBuilder};
