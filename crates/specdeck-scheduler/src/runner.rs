//! Agent runner seam.

use async_trait::async_trait;
use specdeck_core::{AgentId, TaskId, WorkflowConfig};

/// Everything the runner needs to start an agent session for a task.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    /// Task being executed.
    pub task_id: TaskId,
    /// Session id assigned by the coordinator; the runner registers it with
    /// the activity registry as a scheduler-started session.
    pub agent_id: AgentId,
    /// Ordered prompts to feed the agent.
    pub prompts: Vec<String>,
    /// Workflow settings (branch suffix mode etc.).
    pub workflow: WorkflowConfig,
}

/// Drives an agent CLI session to completion.
///
/// `dispatch` resolves when the session finishes; the coordinator spawns it
/// fire-and-track so ticks never block on a run. `Err` carries the failure
/// detail surfaced as an execution error on the status stream.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Run the agent session for this request to completion.
    async fn dispatch(&self, request: DispatchRequest) -> Result<(), String>;
}
