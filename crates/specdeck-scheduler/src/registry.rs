//! Activity registry seam.
//!
//! The host application tracks live repository operations (merges, commits,
//! other scheduled runs) and agent sessions; the scheduler only queries.

use async_trait::async_trait;
use specdeck_core::{AvoidanceTarget, RunningAgentInfo};

/// Live view of conflicting operations and agent sessions.
#[async_trait]
pub trait ActivityRegistry: Send + Sync {
    /// Whether an operation of the given category is currently active.
    async fn is_target_active(&self, target: AvoidanceTarget) -> bool;

    /// All agent sessions currently running, scheduler-started or not.
    async fn list_running_agents(&self) -> Vec<RunningAgentInfo>;
}
