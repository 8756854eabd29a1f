//! Queue, running-slot, and execution-outcome types.

use crate::task::AvoidanceTarget;
use crate::{AgentId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a task entered the execution queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueReason {
    /// The schedule condition evaluated due.
    ConditionDue,
    /// Manual "run now" request.
    Manual,
}

/// A task that is due but not yet dispatched.
///
/// Invariant: no two entries share a task id (enforced by the queue).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTask {
    /// Task waiting for dispatch.
    pub task_id: TaskId,
    /// When the task entered the queue.
    pub enqueued_at: DateTime<Utc>,
    /// Why the task was enqueued.
    pub reason: QueueReason,
}

/// The single in-flight execution.
///
/// Invariant: at most one exists system-wide (single-flight).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningTaskInfo {
    /// Task being executed.
    pub task_id: TaskId,
    /// Agent session executing it.
    pub agent_id: AgentId,
    /// When dispatch happened.
    pub started_at: DateTime<Utc>,
}

/// An agent session as seen by the activity registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningAgentInfo {
    /// Session identifier.
    pub agent_id: AgentId,
    /// Whether the scheduler started this session. `false` marks a
    /// manually-started session, which gates scheduled dispatch.
    pub scheduled: bool,
}

/// Outcome of an execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// Dispatched to the agent runner.
    Started,
    /// Placed (or already present) in the execution queue.
    Queued,
    /// Occurrence dropped by a skip-behavior gate.
    Skipped {
        /// Why the occurrence was dropped.
        reason: String,
    },
    /// A configured avoidance target is active; caller may confirm and
    /// retry with force.
    Conflict {
        /// The first active target, in configured order.
        target: AvoidanceTarget,
    },
    /// The agent runner reported a failure.
    Error {
        /// Failure detail from the runner.
        detail: String,
    },
    /// The single execution slot is occupied.
    AgentBusy,
}

/// Scheduling state of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Not queued and not running.
    #[default]
    Idle,
    /// Due, waiting for gates and the execution slot.
    Queued,
    /// Dispatched and in flight.
    Running,
}

/// Notification emitted on every task state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusEvent {
    /// Task that transitioned.
    pub task_id: TaskId,
    /// New state.
    pub state: TaskState,
    /// Outcome attached to the transition, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
}

impl TaskStatusEvent {
    /// Create a transition event.
    pub fn new(task_id: TaskId, state: TaskState, result: Option<ExecutionResult>) -> Self {
        Self {
            task_id,
            state,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_result_serde_is_tagged() {
        let r = ExecutionResult::Conflict {
            target: AvoidanceTarget::Commit,
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"kind\":\"conflict\""));
        assert!(json.contains("commit"));
    }

    #[test]
    fn status_event_round_trip() {
        let ev = TaskStatusEvent::new(
            TaskId::new("t1"),
            TaskState::Running,
            Some(ExecutionResult::Started),
        );
        let json = serde_json::to_string(&ev).unwrap();
        let restored: TaskStatusEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, ev);
    }

    #[test]
    fn idle_is_default_state() {
        assert_eq!(TaskState::default(), TaskState::Idle);
    }
}
