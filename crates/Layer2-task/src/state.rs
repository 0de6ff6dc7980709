//! Task state machine

use crate::task::TaskResult;
use serde::{Deserialize, Serialize};

/// Possible states of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Created, not yet handed to a task system
    Pending,

    /// Process is attached to a terminal and running
    Running,

    /// Process exited; carries the exit code and output
    Completed(TaskResult),

    /// Process could not be started or supervised
    Failed(String),

    /// Killed after its timeout elapsed
    TimedOut,

    /// Killed on request
    Terminated,
}

impl TaskState {
    /// Check if this is a terminal state (cannot transition further)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Pending | TaskState::Running)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TaskState::Running)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TaskState::Pending)
    }

    /// Completed with exit code zero
    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Completed(result) if result.is_success())
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TaskState::Pending => "Pending",
            TaskState::Running => "Running",
            TaskState::Completed(_) => "Completed",
            TaskState::Failed(_) => "Failed",
            TaskState::TimedOut => "TimedOut",
            TaskState::Terminated => "Terminated",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
