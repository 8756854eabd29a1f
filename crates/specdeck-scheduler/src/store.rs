//! Task store seam and the file-backed default implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use specdeck_core::{ScheduleTask, TaskId};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// Current on-disk document schema version.
const DOCUMENT_VERSION: u8 = 1;

/// Owner of task definitions.
///
/// Create/update/delete and validation happen upstream; the scheduler reads
/// the current set each tick and writes back only `last_executed_at`.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Current task definitions.
    async fn load_tasks(&self) -> Result<Vec<ScheduleTask>, String>;

    /// Advance a task's `last_executed_at`. Unknown ids are a no-op.
    async fn update_last_executed(
        &self,
        task_id: &TaskId,
        at: DateTime<Utc>,
    ) -> Result<(), String>;
}

/// Versioned on-disk document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TaskDocument {
    /// Schema version.
    #[serde(default = "default_version")]
    version: u8,
    /// Persisted task definitions.
    #[serde(default)]
    tasks: Vec<ScheduleTask>,
}

fn default_version() -> u8 {
    DOCUMENT_VERSION
}

/// JSON file-backed task store.
///
/// Every mutation rewrites the whole document atomically: serialize to a
/// temp file in the same directory, then rename over the target.
pub struct JsonTaskStore {
    path: PathBuf,
    // Serializes read-modify-write cycles across concurrent callers.
    write_lock: Mutex<()>,
}

impl JsonTaskStore {
    /// Create a store over the given file path. A missing file reads as an
    /// empty task set.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the whole task set.
    pub async fn save_tasks(&self, tasks: &[ScheduleTask]) -> Result<(), String> {
        let _guard = self.write_lock.lock().await;
        self.write_document(&TaskDocument {
            version: DOCUMENT_VERSION,
            tasks: tasks.to_vec(),
        })
    }

    fn read_document(&self) -> Result<TaskDocument, String> {
        let bytes = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TaskDocument::default());
            }
            Err(e) => return Err(format!("cannot read task store: {e}")),
        };

        serde_json::from_slice(&bytes).map_err(|e| format!("cannot parse task store: {e}"))
    }

    fn write_document(&self, document: &TaskDocument) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("cannot create task store dir: {e}"))?;
        }

        let json = serde_json::to_string_pretty(document)
            .map_err(|e| format!("cannot serialize task store: {e}"))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| format!("cannot write task store: {e}"))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| format!("cannot replace task store: {e}"))?;

        debug!(path = %self.path.display(), "task store written");
        Ok(())
    }
}

#[async_trait]
impl TaskStore for JsonTaskStore {
    async fn load_tasks(&self) -> Result<Vec<ScheduleTask>, String> {
        Ok(self.read_document()?.tasks)
    }

    async fn update_last_executed(
        &self,
        task_id: &TaskId,
        at: DateTime<Utc>,
    ) -> Result<(), String> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document()?;
        let mut changed = false;
        for task in &mut document.tasks {
            if &task.id == task_id {
                task.mark_executed(at);
                task.updated_at = at;
                changed = true;
                break;
            }
        }

        if changed {
            self.write_document(&document)?;
        }
        Ok(())
    }
}
