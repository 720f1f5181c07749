//! Error types for debounce coordination

/// Boxed error used for store causes and failed task bodies
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The result type used throughout lull-core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while scheduling or admitting debounced work
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The debounce key resolved to something other than a string.
    #[error("debounce key must resolve to a string, got {found}")]
    KeyNotString {
        /// Description of the value that was found instead.
        found: String,
    },

    /// The debounce key could not be derived from the arguments.
    #[error("invalid debounce key: {message}")]
    InvalidKey {
        /// What was wrong with the key.
        message: String,
    },

    /// A task type name cannot be used as a key namespace.
    #[error("invalid task type {name:?}: {reason}")]
    InvalidTaskType {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A ticket store operation failed.
    #[error("store error: {message}")]
    Store {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The scheduler refused or failed to enqueue an invocation.
    #[error("scheduler error: {message}")]
    Scheduler {
        /// Description of the scheduling failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// An admitted task body failed. The ticket has been re-armed (best effort).
    #[error("task failed: {source}")]
    TaskFailed {
        /// The error returned by the task body.
        #[source]
        source: BoxError,
    },

    /// Settings could not be read or are out of range.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<BoxError>,
    },
}

impl Error {
    /// Creates a store error without an underlying cause.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a store error wrapping a cause.
    pub fn store_with(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a scheduler error without an underlying cause.
    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error without an underlying cause.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error wrapping a cause.
    pub fn config_with(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns true for errors raised by a failed task body
    pub fn is_task_failure(&self) -> bool {
        matches!(self, Self::TaskFailed { .. })
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        Self::store_with("sled operation failed", err)
    }
}
