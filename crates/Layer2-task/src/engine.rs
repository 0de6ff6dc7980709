//! Execution engine selection

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tether_foundation::Error;

/// Explanation carried by every `UnsupportedEngine` failure
pub const PROCESS_ENGINE_UNSUPPORTED: &str =
    "Process task system is not supported in this environment.";

/// Declared strategy for running tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionEngine {
    /// Tasks run attached to a pseudo-terminal
    #[default]
    Terminal,

    /// Tasks run as standalone processes; no implementation exists here
    Process,
}

impl ExecutionEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionEngine::Terminal => "terminal",
            ExecutionEngine::Process => "process",
        }
    }

    /// The error returned whenever this engine cannot be provided
    pub(crate) fn unsupported() -> Error {
        Error::UnsupportedEngine(PROCESS_ENGINE_UNSUPPORTED.to_string())
    }
}

impl std::fmt::Display for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionEngine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terminal" => Ok(ExecutionEngine::Terminal),
            "process" => Ok(ExecutionEngine::Process),
            other => Err(Error::Config(format!(
                "Unknown execution engine {:?} (expected \"terminal\" or \"process\")",
                other
            ))),
        }
    }
}
