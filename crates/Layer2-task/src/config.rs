//! Task configuration (`tasks.json`)

use crate::engine::ExecutionEngine;
use crate::workspace::WorkspaceFolder;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tether_foundation::{JsonStore, Result};
use tracing::debug;

/// Config file name
pub const TASKS_CONFIG_FILE: &str = "tasks.json";

/// Terminal task system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TerminalConfig {
    /// Shell used to run command lines
    pub shell: String,

    pub rows: u16,
    pub cols: u16,

    /// Applied when a task sets no timeout; 0 disables it
    pub default_timeout_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        let shell = if cfg!(windows) {
            "powershell".to_string()
        } else {
            std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
        };

        Self {
            shell,
            rows: 24,
            cols: 120,
            default_timeout_ms: 300_000,
        }
    }
}

/// `terminal` section as written in one config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TerminalConfigLayer {
    pub shell: Option<String>,
    pub rows: Option<u16>,
    pub cols: Option<u16>,
    pub default_timeout_ms: Option<u64>,
}

impl TerminalConfig {
    pub fn merge(&mut self, layer: TerminalConfigLayer) {
        if let Some(shell) = layer.shell {
            self.shell = shell;
        }
        if let Some(rows) = layer.rows {
            self.rows = rows;
        }
        if let Some(cols) = layer.cols {
            self.cols = cols;
        }
        if let Some(timeout) = layer.default_timeout_ms {
            self.default_timeout_ms = timeout;
        }
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        (self.default_timeout_ms > 0).then(|| Duration::from_millis(self.default_timeout_ms))
    }
}

/// Task service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskServiceConfig {
    pub execution_engine: ExecutionEngine,
    pub terminal: TerminalConfig,

    /// Folders tasks may run in; the current directory when empty
    pub workspace_folders: Vec<WorkspaceFolder>,
}

/// One `tasks.json` as written on disk; absent keys are `None`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskServiceConfigLayer {
    pub execution_engine: Option<ExecutionEngine>,
    pub terminal: Option<TerminalConfigLayer>,
    pub workspace_folders: Option<Vec<WorkspaceFolder>>,
}

impl TaskServiceConfig {
    /// Load global, then project configuration; project keys win
    pub fn load() -> Result<Self> {
        let mut stores = Vec::new();
        if let Ok(global) = JsonStore::global() {
            stores.push(global);
        }
        stores.push(JsonStore::current_project()?);
        Self::load_from(&stores)
    }

    /// Merge the files of `stores` in order over the defaults
    pub fn load_from(stores: &[JsonStore]) -> Result<Self> {
        let mut config = Self::default();
        for store in stores {
            if let Some(layer) = store.load_optional::<TaskServiceConfigLayer>(TASKS_CONFIG_FILE)? {
                debug!(dir = %store.base_dir().display(), "Merging task config");
                config.merge(layer);
            }
        }
        Ok(config)
    }

    /// Overlay the keys `layer` sets; a folder list replaces the previous one
    pub fn merge(&mut self, layer: TaskServiceConfigLayer) {
        if let Some(engine) = layer.execution_engine {
            self.execution_engine = engine;
        }
        if let Some(terminal) = layer.terminal {
            self.terminal.merge(terminal);
        }
        if let Some(folders) = layer.workspace_folders {
            self.workspace_folders = folders;
        }
    }
}
