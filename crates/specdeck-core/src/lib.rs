//! Specdeck Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/IPC
//! - Filesystem
//! - Runtime specifics
//!
//! All types here represent the core business domain of the Specdeck
//! scheduler: schedule conditions, task definitions, queue/running state,
//! and execution outcomes.

pub mod exec;
pub mod ids;
pub mod schedule;
pub mod task;

// Re-export commonly used types
pub use exec::{
    ExecutionResult, QueueReason, QueuedTask, RunningAgentInfo, RunningTaskInfo, TaskState,
    TaskStatusEvent,
};
pub use ids::{AgentId, TaskId};
pub use schedule::ScheduleCondition;
pub use task::{
    AvoidanceConfig, AvoidanceTarget, ConflictBehavior, ScheduleTask, SuffixMode, WorkflowConfig,
};
