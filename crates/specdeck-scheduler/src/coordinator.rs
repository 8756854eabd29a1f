//! Schedule coordinator: the tick loop and its API surface.
//!
//! One tick runs at a fixed period, re-armed only after the previous tick
//! completes. Each tick refreshes the idle duration and the task cache,
//! evaluates schedule conditions, enqueues due tasks, and drains the queue
//! through the avoidance and agent-busy gates into a single execution slot.
//! Dispatch is fire-and-track: the tick never blocks on agent completion;
//! completion clears the slot and immediately tries the next queued task.
//!
//! All mutable state lives behind one async mutex; API calls and the tick
//! loop serialize on it. A tick-internal fault is logged at the tick
//! boundary and never stops the loop.

use crate::avoidance::AvoidanceResolver;
use crate::clock::Clock;
use crate::condition::{is_due, EvalContext};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::idle::IdleSource;
use crate::queue::ExecutionQueue;
use crate::registry::ActivityRegistry;
use crate::runner::{AgentRunner, DispatchRequest};
use crate::store::TaskStore;
use chrono::{DateTime, Utc};
use specdeck_core::{
    AgentId, AvoidanceTarget, ConflictBehavior, ExecutionResult, QueueReason, QueuedTask,
    RunningTaskInfo, ScheduleCondition, ScheduleTask, TaskId, TaskState, TaskStatusEvent,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

/// Mutable coordinator state, serialized behind one lock.
struct State {
    /// Read cache of task definitions, refreshed each tick.
    tasks: Vec<ScheduleTask>,
    /// Due tasks awaiting dispatch.
    queue: ExecutionQueue,
    /// The single execution slot.
    running: Option<RunningTaskInfo>,
    /// Tasks that fired (or consumed a skip) during the current unbroken
    /// idle session.
    idle_fired: HashSet<TaskId>,
    /// Idle duration observed on the previous tick; a drop means the user
    /// was active, which re-arms idle-session tasks.
    last_idle: Duration,
    /// Handle of the spawned tick loop while started.
    tick_handle: Option<JoinHandle<()>>,
}

struct Inner {
    store: Arc<dyn TaskStore>,
    runner: Arc<dyn AgentRunner>,
    idle: Arc<dyn IdleSource>,
    clock: Arc<dyn Clock>,
    resolver: AvoidanceResolver,
    config: SchedulerConfig,
    state: Mutex<State>,
    events: broadcast::Sender<TaskStatusEvent>,
}

/// The autonomous scheduler.
///
/// Constructed with explicit collaborators; there is no global instance.
/// Cloning shares the same underlying scheduler.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    /// Create a coordinator over the given collaborators.
    pub fn new(
        store: Arc<dyn TaskStore>,
        registry: Arc<dyn ActivityRegistry>,
        runner: Arc<dyn AgentRunner>,
        idle: Arc<dyn IdleSource>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            inner: Arc::new(Inner {
                store,
                runner,
                idle,
                clock,
                resolver: AvoidanceResolver::new(registry),
                config,
                state: Mutex::new(State {
                    tasks: Vec::new(),
                    queue: ExecutionQueue::new(),
                    running: None,
                    idle_fired: HashSet::new(),
                    last_idle: Duration::ZERO,
                    tick_handle: None,
                }),
                events,
            }),
        }
    }

    /// Start the periodic tick loop. Idempotent.
    pub async fn start(&self) {
        let mut state = self.inner.state.lock().await;
        if state.tick_handle.is_some() {
            return;
        }

        // The loop holds only a weak reference so a dropped coordinator
        // tears the loop down instead of leaking it.
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.tick_interval;
        let handle = tokio::spawn(async move {
            info!(period_secs = period.as_secs(), "scheduler started");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                // A single bad tick must not kill the loop.
                if let Err(e) = Inner::run_tick(&inner).await {
                    warn!(error = %e, "scheduler tick failed");
                }
            }
        });
        state.tick_handle = Some(handle);
    }

    /// Halt the tick loop. Does not cancel an in-flight execution;
    /// cancelling a running agent session is the runner's responsibility.
    pub async fn stop(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(handle) = state.tick_handle.take() {
            handle.abort();
            info!("scheduler stopped");
        }
    }

    /// Read-only snapshot of the queue, oldest first.
    pub async fn queued_tasks(&self) -> Vec<QueuedTask> {
        self.inner.state.lock().await.queue.snapshot()
    }

    /// Read-only snapshot of the execution slot (zero or one entry).
    pub async fn running_tasks(&self) -> Vec<RunningTaskInfo> {
        self.inner
            .state
            .lock()
            .await
            .running
            .clone()
            .into_iter()
            .collect()
    }

    /// Remove all queued (not running) entries.
    pub async fn clear_queue(&self) {
        let mut state = self.inner.state.lock().await;
        for entry in state.queue.snapshot() {
            self.inner
                .emit(entry.task_id, TaskState::Idle, None);
        }
        state.queue.clear();
    }

    /// Force an out-of-cycle evaluation pass.
    pub async fn process_queue(&self) -> Result<(), SchedulerError> {
        Inner::run_tick(&self.inner).await
    }

    /// First active avoidance target configured on the task, if any.
    pub async fn check_avoidance_conflict(
        &self,
        task_id: &TaskId,
    ) -> Result<Option<AvoidanceTarget>, SchedulerError> {
        let task = self.inner.load_task(task_id).await?;
        Ok(self.inner.resolver.check_conflict(&task).await)
    }

    /// Manual "run now": bypasses the due check but still runs both gates.
    ///
    /// With `force = false`, an active avoidance target or a
    /// manually-started agent session returns [`ExecutionResult::Conflict`]
    /// / [`ExecutionResult::AgentBusy`] without mutating state, so the
    /// caller can present a confirmation step. `force = true` overrides the
    /// avoidance and agent-busy gates but never preempts the single
    /// execution slot.
    pub async fn execute_immediately(
        &self,
        task_id: &TaskId,
        force: bool,
    ) -> Result<ExecutionResult, SchedulerError> {
        let task = self.inner.load_task(task_id).await?;
        if !task.enabled {
            return Err(SchedulerError::TaskDisabled(task_id.clone()));
        }

        if !force {
            if let Some(target) = self.inner.resolver.check_conflict(&task).await {
                return Ok(ExecutionResult::Conflict { target });
            }
            if self.inner.resolver.agent_busy().await {
                return Ok(ExecutionResult::AgentBusy);
            }
        }

        let mut state = self.inner.state.lock().await;
        if state.running.is_some() {
            return Ok(ExecutionResult::AgentBusy);
        }

        // A queued entry for this task is superseded by the manual run.
        state.queue.remove(task_id);

        let now = self.inner.clock.now();
        Inner::dispatch(&self.inner, &mut state, &task, now).await;
        Ok(ExecutionResult::Started)
    }

    /// Subscribe to task state transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskStatusEvent> {
        self.inner.events.subscribe()
    }

    /// Transition stream wrapper over [`Coordinator::subscribe`].
    pub fn event_stream(&self) -> BroadcastStream<TaskStatusEvent> {
        BroadcastStream::new(self.subscribe())
    }
}

impl Inner {
    /// Refresh the cache and return the task, preferring the store's view.
    async fn load_task(&self, task_id: &TaskId) -> Result<ScheduleTask, SchedulerError> {
        let tasks = self
            .store
            .load_tasks()
            .await
            .map_err(SchedulerError::Store)?;
        let mut state = self.state.lock().await;
        state.tasks = tasks;
        state
            .tasks
            .iter()
            .find(|t| &t.id == task_id)
            .cloned()
            .ok_or_else(|| SchedulerError::TaskNotFound(task_id.clone()))
    }

    fn emit(&self, task_id: TaskId, state: TaskState, result: Option<ExecutionResult>) {
        // Send fails only when nobody is subscribed.
        let _ = self.events.send(TaskStatusEvent::new(task_id, state, result));
    }

    /// One full scheduler pass: refresh, evaluate, enqueue, drain.
    async fn run_tick(inner: &Arc<Self>) -> Result<(), SchedulerError> {
        let idle = inner.idle.idle_time().await;
        let tasks = inner
            .store
            .load_tasks()
            .await
            .map_err(SchedulerError::Store)?;
        let now = inner.clock.now();

        let mut state = inner.state.lock().await;

        // An idle-duration drop means the user was active since the last
        // tick; that ends the idle session and re-arms idle tasks.
        if idle < state.last_idle {
            state.idle_fired.clear();
        }
        state.last_idle = idle;
        state.tasks = tasks;

        // Queued entries whose task was disabled or deleted go back to Idle
        // without dispatch.
        for entry in state.queue.snapshot() {
            let alive = state
                .tasks
                .iter()
                .any(|t| t.id == entry.task_id && t.enabled);
            if !alive {
                state.queue.remove(&entry.task_id);
                debug!(task = %entry.task_id, "dropping queued entry for disabled task");
                inner.emit(entry.task_id, TaskState::Idle, None);
            }
        }

        // Condition evaluation for every enabled task with no queued or
        // running entry. Enqueueing is idempotent per task id.
        let candidates: Vec<ScheduleTask> = state
            .tasks
            .iter()
            .filter(|t| t.enabled)
            .filter(|t| !state.queue.contains(&t.id))
            .filter(|t| {
                state
                    .running
                    .as_ref()
                    .map(|r| r.task_id != t.id)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        for task in candidates {
            let ctx = EvalContext {
                now,
                created_at: task.created_at,
                last_executed_at: task.last_executed_at,
                idle,
                idle_threshold: inner.config.idle_threshold,
                fired_this_idle_session: state.idle_fired.contains(&task.id),
            };
            if is_due(&task.schedule, &ctx) {
                debug!(task = %task.id, schedule = %task.schedule, "task due");
                state
                    .queue
                    .enqueue(task.id.clone(), now, QueueReason::ConditionDue);
                inner.emit(task.id, TaskState::Queued, Some(ExecutionResult::Queued));
            }
        }

        Self::drain_queue(inner, &mut state, now).await;
        Ok(())
    }

    /// Walk the queue oldest-first through both gates into the slot.
    async fn drain_queue(inner: &Arc<Self>, state: &mut State, now: DateTime<Utc>) {
        for entry in state.queue.snapshot() {
            // Single-flight: nothing dispatches while the slot is occupied;
            // queued tasks simply wait for completion or the next tick.
            if state.running.is_some() {
                break;
            }

            let Some(task) = state
                .tasks
                .iter()
                .find(|t| t.id == entry.task_id)
                .cloned()
            else {
                state.queue.remove(&entry.task_id);
                continue;
            };

            // Gate 1: configured avoidance targets vs. active operations.
            if let Some(target) = inner.resolver.check_conflict(&task).await {
                match task.avoidance.behavior {
                    ConflictBehavior::Wait => {
                        debug!(task = %task.id, %target, "waiting on avoidance conflict");
                    }
                    ConflictBehavior::Skip => {
                        Self::consume_occurrence(
                            inner,
                            state,
                            &task,
                            now,
                            format!("avoidance conflict: {target}"),
                        )
                        .await;
                    }
                }
                continue;
            }

            // Gate 2: a manually-started agent session.
            if inner.resolver.agent_busy().await {
                match task.behavior {
                    ConflictBehavior::Wait => {
                        debug!(task = %task.id, "waiting on manual agent session");
                    }
                    ConflictBehavior::Skip => {
                        Self::consume_occurrence(
                            inner,
                            state,
                            &task,
                            now,
                            "manual agent session running".to_owned(),
                        )
                        .await;
                    }
                }
                continue;
            }

            state.queue.remove(&task.id);
            Self::dispatch(inner, state, &task, now).await;
        }
    }

    /// Drop a skipped occurrence so it is not retried every tick.
    ///
    /// Interval/weekly cadence resumes from the tick time; idle schedules
    /// consume the current idle session instead, so the task re-arms only
    /// after fresh activity and a new idle stretch.
    async fn consume_occurrence(
        inner: &Arc<Self>,
        state: &mut State,
        task: &ScheduleTask,
        now: DateTime<Utc>,
        reason: String,
    ) {
        debug!(task = %task.id, %reason, "skipping due occurrence");
        state.queue.remove(&task.id);

        match &task.schedule {
            ScheduleCondition::Idle { .. } => {
                state.idle_fired.insert(task.id.clone());
            }
            ScheduleCondition::Interval { .. } | ScheduleCondition::Weekly { .. } => {
                Self::advance_last_executed(inner, state, &task.id, now).await;
            }
        }

        inner.emit(
            task.id.clone(),
            TaskState::Idle,
            Some(ExecutionResult::Skipped { reason }),
        );
    }

    /// Hand the task to the agent runner and occupy the slot.
    async fn dispatch(inner: &Arc<Self>, state: &mut State, task: &ScheduleTask, now: DateTime<Utc>) {
        let agent_id = AgentId::generate();
        info!(task = %task.id, agent = %agent_id, "dispatching scheduled task");

        state.running = Some(RunningTaskInfo {
            task_id: task.id.clone(),
            agent_id: agent_id.clone(),
            started_at: now,
        });

        // Cadence counts from dispatch, not completion, and the attempt
        // counts even if the run later fails.
        Self::advance_last_executed(inner, state, &task.id, now).await;
        if matches!(task.schedule, ScheduleCondition::Idle { .. }) {
            state.idle_fired.insert(task.id.clone());
        }

        inner.emit(
            task.id.clone(),
            TaskState::Running,
            Some(ExecutionResult::Started),
        );

        let request = DispatchRequest {
            task_id: task.id.clone(),
            agent_id,
            prompts: task.prompts.clone(),
            workflow: task.workflow.clone(),
        };
        let spawned = inner.clone();
        tokio::spawn(async move {
            let outcome = spawned.runner.dispatch(request.clone()).await;
            Self::on_run_complete(&spawned, request.task_id, outcome).await;
        });
    }

    async fn advance_last_executed(
        inner: &Arc<Self>,
        state: &mut State,
        task_id: &TaskId,
        now: DateTime<Utc>,
    ) {
        if let Err(e) = inner.store.update_last_executed(task_id, now).await {
            warn!(task = %task_id, error = %e, "cannot persist last_executed_at");
        }
        if let Some(cached) = state.tasks.iter_mut().find(|t| &t.id == task_id) {
            cached.mark_executed(now);
        }
    }

    /// Completion callback from the fire-and-track dispatch.
    ///
    /// Frees the slot and immediately tries the next eligible queued task
    /// rather than waiting for the next tick. No automatic retry: a failed
    /// run's next opportunity is the task's next natural due time.
    // Boxed return type breaks the `Send` inference cycle in the
    // dispatch -> on_run_complete -> drain_queue -> dispatch recursion.
    fn on_run_complete<'a>(
        inner: &'a Arc<Self>,
        task_id: TaskId,
        outcome: Result<(), String>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
        let mut state = inner.state.lock().await;
        if state
            .running
            .as_ref()
            .map(|r| r.task_id == task_id)
            .unwrap_or(false)
        {
            state.running = None;
        }

        let result = match outcome {
            Ok(()) => {
                info!(task = %task_id, "scheduled run completed");
                None
            }
            Err(detail) => {
                warn!(task = %task_id, %detail, "scheduled run failed");
                Some(ExecutionResult::Error { detail })
            }
        };
        inner.emit(task_id, TaskState::Idle, result);

        let now = inner.clock.now();
        Self::drain_queue(inner, &mut state, now).await;
        })
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().tick_handle.take() {
            handle.abort();
        }
    }
}
