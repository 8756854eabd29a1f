//! Conflict arbitration against live repository operations.
//!
//! A due task passes two independent gates before dispatch: the avoidance
//! gate (configured targets vs. active repository operations) and the
//! agent-busy gate (a manually-started agent session). Each gate applies its
//! own wait/skip behavior. `wait` has no upper bound: a continuously active
//! conflict can hold a waiting task indefinitely.

use crate::registry::ActivityRegistry;
use specdeck_core::{AvoidanceTarget, ScheduleTask};
use std::sync::Arc;
use tracing::debug;

/// Decides whether a due task may proceed past active conflicts.
pub struct AvoidanceResolver {
    registry: Arc<dyn ActivityRegistry>,
}

impl AvoidanceResolver {
    /// Create a resolver over the given registry.
    pub fn new(registry: Arc<dyn ActivityRegistry>) -> Self {
        Self { registry }
    }

    /// First active avoidance target for the task, in configured order.
    pub async fn check_conflict(&self, task: &ScheduleTask) -> Option<AvoidanceTarget> {
        for target in &task.avoidance.targets {
            if self.registry.is_target_active(*target).await {
                debug!(task = %task.id, %target, "avoidance target active");
                return Some(*target);
            }
        }
        None
    }

    /// Whether a non-scheduler-initiated agent session is running.
    pub async fn agent_busy(&self) -> bool {
        self.registry
            .list_running_agents()
            .await
            .iter()
            .any(|agent| !agent.scheduled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use specdeck_core::{AgentId, AvoidanceConfig, RunningAgentInfo, ScheduleCondition};
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRegistry {
        active: Mutex<HashSet<AvoidanceTarget>>,
        agents: Mutex<Vec<RunningAgentInfo>>,
    }

    #[async_trait]
    impl ActivityRegistry for FakeRegistry {
        async fn is_target_active(&self, target: AvoidanceTarget) -> bool {
            self.active.lock().unwrap().contains(&target)
        }

        async fn list_running_agents(&self) -> Vec<RunningAgentInfo> {
            self.agents.lock().unwrap().clone()
        }
    }

    fn task_avoiding(targets: Vec<AvoidanceTarget>) -> ScheduleTask {
        ScheduleTask::new(
            "t",
            ScheduleCondition::Interval {
                hours_interval: 1,
                wait_for_idle: false,
            },
            vec!["p".to_owned()],
        )
        .with_avoidance(AvoidanceConfig {
            targets,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn first_active_target_in_configured_order_wins() {
        let registry = Arc::new(FakeRegistry::default());
        registry
            .active
            .lock()
            .unwrap()
            .extend([AvoidanceTarget::Commit, AvoidanceTarget::BugMerge]);

        let resolver = AvoidanceResolver::new(registry);
        let task = task_avoiding(vec![
            AvoidanceTarget::SpecMerge,
            AvoidanceTarget::BugMerge,
            AvoidanceTarget::Commit,
        ]);

        assert_eq!(
            resolver.check_conflict(&task).await,
            Some(AvoidanceTarget::BugMerge)
        );
    }

    #[tokio::test]
    async fn no_conflict_when_targets_inactive() {
        let registry = Arc::new(FakeRegistry::default());
        let resolver = AvoidanceResolver::new(registry);
        let task = task_avoiding(vec![AvoidanceTarget::Commit]);
        assert_eq!(resolver.check_conflict(&task).await, None);
    }

    #[tokio::test]
    async fn unconfigured_targets_are_ignored() {
        let registry = Arc::new(FakeRegistry::default());
        registry
            .active
            .lock()
            .unwrap()
            .insert(AvoidanceTarget::Commit);

        let resolver = AvoidanceResolver::new(registry);
        let task = task_avoiding(vec![AvoidanceTarget::SpecMerge]);
        assert_eq!(resolver.check_conflict(&task).await, None);
    }

    #[tokio::test]
    async fn agent_busy_only_for_manual_sessions() {
        let registry = Arc::new(FakeRegistry::default());
        let resolver = AvoidanceResolver::new(registry.clone());

        registry.agents.lock().unwrap().push(RunningAgentInfo {
            agent_id: AgentId::generate(),
            scheduled: true,
        });
        assert!(!resolver.agent_busy().await);

        registry.agents.lock().unwrap().push(RunningAgentInfo {
            agent_id: AgentId::generate(),
            scheduled: false,
        });
        assert!(resolver.agent_busy().await);
    }
}
