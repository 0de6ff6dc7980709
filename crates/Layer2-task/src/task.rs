//! Task definition and types

use crate::state::TaskState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// A shell task to be run by a task system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id: TaskId,

    /// Human-readable label shown in lifecycle events
    pub label: String,

    /// Shell command line
    pub command: String,

    /// Working directory; the first workspace folder when unset
    pub cwd: Option<PathBuf>,

    /// Extra environment for the command
    pub env: HashMap<String, String>,

    /// Overrides the task system's default timeout
    pub timeout: Option<Duration>,

    /// Current state
    pub state: TaskState,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task started executing
    pub started_at: Option<DateTime<Utc>>,

    /// When the task completed
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new task; the label defaults to the command line
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            id: TaskId::new(),
            label: command.clone(),
            command,
            cwd: None,
            env: HashMap::new(),
            timeout: None,
            state: TaskState::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Mark task as running
    pub fn start(&mut self) {
        self.state = TaskState::Running;
        self.started_at = Some(Utc::now());
    }

    /// Move to a final state
    pub fn finish(&mut self, state: TaskState) {
        self.state = state;
        self.completed_at = Some(Utc::now());
    }

    /// Execution duration if the task has started
    pub fn duration(&self) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.completed_at.unwrap_or_else(Utc::now);
        Some((end - start).to_std().unwrap_or_default())
    }
}

/// Result of a completed task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Terminal output with escape sequences removed
    pub output: String,

    /// Process exit code
    pub exit_code: i32,
}

impl TaskResult {
    pub fn new(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            exit_code,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new("echo hi")
            .with_label("greet")
            .with_cwd("/tmp")
            .with_env("A", "1")
            .with_timeout(Duration::from_secs(3));

        assert_eq!(task.command, "echo hi");
        assert_eq!(task.label, "greet");
        assert_eq!(task.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(task.env.get("A").map(String::as_str), Some("1"));
        assert_eq!(task.timeout, Some(Duration::from_secs(3)));
        assert!(task.state.is_pending());
    }

    #[test]
    fn test_task_lifecycle() {
        let mut task = Task::new("true");
        assert!(task.duration().is_none());

        task.start();
        assert!(task.state.is_running());

        task.finish(TaskState::Completed(TaskResult::new("", 0)));
        assert!(task.state.is_terminal());
        assert!(task.duration().is_some());
    }

    #[test]
    fn test_task_id_display_is_short() {
        assert_eq!(TaskId::new().to_string().len(), 8);
    }
}
