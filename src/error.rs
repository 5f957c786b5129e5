//! Error types used by the supervisor runtime and services.
//!
//! This module defines two main error enums:
//!
//! - [`SpawnError`] - the scheduler could not create an execution context.
//! - [`TaskError`] - a service's unit of work ended badly.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! Losing the self-exit race is **not** an error; it is a control-flow branch
//! handled inside the task lifecycle.

use thiserror::Error;

/// # Errors produced when spawning a task.
///
/// Fatal to the spawn attempt only: nothing is registered with the supervisor
/// and no execution context is left behind.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// The scheduler already runs its maximum number of execution contexts.
    #[error("execution context limit {limit} reached")]
    Exhausted {
        /// Configured live-context limit.
        limit: usize,
    },

    /// The stack pool cannot cover the requested budget.
    #[error("stack budget of {requested} bytes exceeds what is left of the {pool}-byte pool")]
    StackExhausted {
        /// Requested stack budget in bytes.
        requested: usize,
        /// Configured pool size in bytes.
        pool: usize,
    },

    /// Affinity names a core the scheduler does not have.
    #[error("no core {core} (scheduler has {available})")]
    InvalidAffinity {
        /// Requested core index.
        core: usize,
        /// Number of pinned cores known to the scheduler.
        available: usize,
    },

    /// Spawn requested outside of a tokio runtime and no runtime was configured.
    #[error("no runtime available to host the execution context")]
    NoRuntime,
}

impl SpawnError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskparent::SpawnError;
    ///
    /// let err = SpawnError::Exhausted { limit: 8 };
    /// assert_eq!(err.as_label(), "spawn_exhausted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SpawnError::Exhausted { .. } => "spawn_exhausted",
            SpawnError::StackExhausted { .. } => "spawn_stack_exhausted",
            SpawnError::InvalidAffinity { .. } => "spawn_invalid_affinity",
            SpawnError::NoRuntime => "spawn_no_runtime",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SpawnError::Exhausted { limit } => format!("context limit reached: {limit}"),
            SpawnError::StackExhausted { requested, pool } => {
                format!("stack pool exhausted: requested={requested} pool={pool}")
            }
            SpawnError::InvalidAffinity { core, available } => {
                format!("invalid affinity: core={core} available={available}")
            }
            SpawnError::NoRuntime => "no runtime".to_string(),
        }
    }
}

/// # Errors produced by a service's unit of work.
///
/// A failing service still self-exits; the error is only reported.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Service finished with an error.
    #[error("service failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Service panicked; the panic was caught at the task boundary.
    #[error("service panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskparent::TaskError;
    ///
    /// let err = TaskError::Fail { error: "boom".into() };
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
        }
    }
}

/// Renders a caught panic payload.
pub(crate) fn panic_info(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
