//! Scheduler errors.
//!
//! Gate outcomes (`AgentBusy`, avoidance conflicts) are not errors; they are
//! [`specdeck_core::ExecutionResult`] variants returned to the caller.

use specdeck_core::TaskId;
use thiserror::Error;

/// Errors surfaced by the coordinator API.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Unknown task id passed to an API call.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Task exists but is disabled.
    #[error("Task is disabled: {0}")]
    TaskDisabled(TaskId),

    /// Task store failure (load or persist).
    #[error("Task store error: {0}")]
    Store(String),
}
