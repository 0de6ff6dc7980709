//! Task system trait and lifecycle events

use crate::task::{Task, TaskId, TaskResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_foundation::{Emitter, Result};

/// Kind of task lifecycle change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskEventKind {
    /// Task accepted by the task system
    Start,
    /// Process attached to its terminal and running
    Active,
    /// Process no longer running
    Inactive,
    /// Task finished; carries the exit code when one is known
    End,
}

/// Task lifecycle notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub kind: TaskEventKind,
    pub task_id: TaskId,
    pub label: String,
    pub exit_code: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

impl TaskEvent {
    pub fn new(kind: TaskEventKind, task: &Task) -> Self {
        Self {
            kind,
            task_id: task.id,
            label: task.label.clone(),
            exit_code: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }
}

/// Fired when detached terminals are recovered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectEvent {
    /// Tasks whose terminals were reattached
    pub task_ids: Vec<TaskId>,
    pub timestamp: DateTime<Utc>,
}

impl ReconnectEvent {
    pub fn new(task_ids: Vec<TaskId>) -> Self {
        Self {
            task_ids,
            timestamp: Utc::now(),
        }
    }
}

/// Task system trait - implement to add new execution engines
#[async_trait]
pub trait TaskSystem: Send + Sync {
    /// Run a task to completion
    async fn run(&self, task: Task) -> Result<TaskResult>;

    /// Start a task in the background and return its id
    async fn start(&self, task: Task) -> Result<TaskId>;

    /// Kill a running task; `false` when no such task is running
    async fn terminate(&self, task_id: TaskId) -> Result<bool>;

    /// Whether any task is currently running; never blocks on I/O
    fn is_active_sync(&self) -> bool;

    /// Ids of running tasks
    fn active_tasks(&self) -> Vec<TaskId>;

    fn on_did_state_change(&self) -> &Emitter<TaskEvent>;

    fn on_did_reconnect(&self) -> &Emitter<ReconnectEvent>;

    fn name(&self) -> &'static str;
}
