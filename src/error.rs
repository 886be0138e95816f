use thiserror::Error;

use crate::task::resolved::Lifecycle;

#[derive(Debug, Error)]
pub enum CurateError {
    /// Recording was declared by the task but no recorder is configured.
    #[error("Missing Recorder")]
    MissingRecorder,

    /// Failure raised by the wrapped task itself, passed through untouched.
    #[error(transparent)]
    Invocation(anyhow::Error),

    #[error("recorder failed: {0}")]
    Recording(anyhow::Error),

    #[error("task '{task}' cannot {operation} while {state:?}")]
    Precondition {
        task: String,
        operation: &'static str,
        state: Lifecycle,
    },

    #[error("no task registered under name '{0}'")]
    UnknownTask(String),

    #[error("task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("plugin category '{0}' already has an implementation")]
    DuplicatePlugin(String),

    #[error("object not found: {0}")]
    ObjectNotFound(String),
}

pub type Result<T> = std::result::Result<T, CurateError>;
