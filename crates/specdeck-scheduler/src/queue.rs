//! Execution queue: due tasks awaiting dispatch.

use chrono::{DateTime, Utc};
use specdeck_core::{QueueReason, QueuedTask, TaskId};
use std::collections::VecDeque;

/// FIFO queue with at-most-one entry per task id.
#[derive(Debug, Default)]
pub struct ExecutionQueue {
    entries: VecDeque<QueuedTask>,
}

impl ExecutionQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Returns `false` (and changes nothing) when an entry for
    /// the id already exists, making repeated due signals a no-op.
    pub fn enqueue(&mut self, task_id: TaskId, at: DateTime<Utc>, reason: QueueReason) -> bool {
        if self.contains(&task_id) {
            return false;
        }
        self.entries.push_back(QueuedTask {
            task_id,
            enqueued_at: at,
            reason,
        });
        true
    }

    /// Whether an entry exists for the id.
    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.entries.iter().any(|e| &e.task_id == task_id)
    }

    /// Remove the entry for the id. Returns `true` when one was removed.
    pub fn remove(&mut self, task_id: &TaskId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.task_id != task_id);
        self.entries.len() != before
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read-only snapshot, oldest first.
    pub fn snapshot(&self) -> Vec<QueuedTask> {
        self.entries.iter().cloned().collect()
    }
}
