//! Scheduled task definitions and their conflict-avoidance configuration.

use crate::{ScheduleCondition, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A category of repository operation a task can be configured to avoid
/// overlapping with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AvoidanceTarget {
    /// A spec branch merge in progress.
    SpecMerge,
    /// A commit operation in progress.
    Commit,
    /// A bug branch merge in progress.
    BugMerge,
    /// Another scheduled task currently executing.
    ScheduleTask,
}

impl std::fmt::Display for AvoidanceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SpecMerge => "spec-merge",
            Self::Commit => "commit",
            Self::BugMerge => "bug-merge",
            Self::ScheduleTask => "schedule-task",
        };
        write!(f, "{s}")
    }
}

/// What to do when a due task collides with a conflicting operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictBehavior {
    /// Stay queued and re-check every tick until the conflict clears.
    /// There is no upper bound: a continuously active conflict can hold a
    /// waiting task indefinitely.
    #[default]
    Wait,
    /// Drop this occurrence and resume from the next natural due time.
    Skip,
}

/// Conflict-avoidance configuration for a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvoidanceConfig {
    /// Targets to check, in order; the first active one wins.
    pub targets: Vec<AvoidanceTarget>,
    /// Behavior when a target is active.
    #[serde(default)]
    pub behavior: ConflictBehavior,
}

/// How the branch suffix for a workflow run is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuffixMode {
    /// Derive the suffix from the task name and timestamp.
    #[default]
    Auto,
    /// Use a caller-provided suffix.
    Custom,
}

/// Workflow settings handed to the agent runner at dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Whether the structured spec/bug workflow is enabled for this task.
    pub enabled: bool,
    /// Suffix selection mode.
    #[serde(default)]
    pub suffix_mode: SuffixMode,
    /// Suffix used when `suffix_mode` is [`SuffixMode::Custom`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_suffix: Option<String>,
}

/// A task that runs on a schedule.
///
/// Definitions are owned by the external task store; the scheduler holds a
/// read cache refreshed each tick and writes back only `last_executed_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTask {
    /// Unique task identifier.
    pub id: TaskId,

    /// Human-readable task name (unique across tasks).
    pub name: String,

    /// Whether the task participates in scheduling.
    pub enabled: bool,

    /// When the task becomes due.
    pub schedule: ScheduleCondition,

    /// Ordered prompts handed to the agent runner (non-empty, validated
    /// upstream by the task store).
    pub prompts: Vec<String>,

    /// Conflict-avoidance configuration against repository operations.
    #[serde(default)]
    pub avoidance: AvoidanceConfig,

    /// Workflow settings for dispatched runs.
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Behavior when a manually-started (non-scheduler) agent session is
    /// already running.
    #[serde(default)]
    pub behavior: ConflictBehavior,

    /// When the task last started executing, if ever.
    pub last_executed_at: Option<DateTime<Utc>>,

    /// When the task was created.
    pub created_at: DateTime<Utc>,

    /// When the task definition was last modified.
    pub updated_at: DateTime<Utc>,
}

impl ScheduleTask {
    /// Create a new enabled task with the given schedule and prompts.
    pub fn new(
        name: impl Into<String>,
        schedule: ScheduleCondition,
        prompts: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::generate(),
            name: name.into(),
            enabled: true,
            schedule,
            prompts,
            avoidance: AvoidanceConfig::default(),
            workflow: WorkflowConfig::default(),
            behavior: ConflictBehavior::default(),
            last_executed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    /// Builder method to set the avoidance configuration.
    pub fn with_avoidance(mut self, avoidance: AvoidanceConfig) -> Self {
        self.avoidance = avoidance;
        self
    }

    /// Builder method to set the agent-busy behavior.
    pub fn with_behavior(mut self, behavior: ConflictBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Builder method to set the workflow configuration.
    pub fn with_workflow(mut self, workflow: WorkflowConfig) -> Self {
        self.workflow = workflow;
        self
    }

    /// Record that the task started executing at `at`.
    ///
    /// Cadence is measured from dispatch, not completion: interval and
    /// weekly conditions resume counting from when the run started.
    pub fn mark_executed(&mut self, at: DateTime<Utc>) {
        self.last_executed_at = Some(at);
    }
}
