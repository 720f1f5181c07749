//! Error types for task execution

use lull_core::BoxError;

/// The result type used throughout lull-worker.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No handler is registered for the invoked task type.
    #[error("no handler registered for task {task:?}")]
    UnknownTask {
        /// The task type that was invoked.
        task: String,
    },

    /// The task body returned an error.
    #[error("task {task} failed: {source}")]
    Task {
        /// The task type that failed.
        task: String,
        /// The error returned by the handler.
        #[source]
        source: BoxError,
    },

    /// Debounce coordination failed (store, scheduler or key errors).
    #[error(transparent)]
    Debounce(#[from] lull_core::Error),
}

impl Error {
    pub(crate) fn task(task: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Task {
            task: task.into(),
            source: source.into(),
        }
    }
}
