//! Workspace folder resolution

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tether_foundation::{Error, Result};

/// A folder tasks may run in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFolder {
    pub name: String,
    pub path: PathBuf,
}

impl WorkspaceFolder {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Resolves the workspace folder setup needed to build a task system
///
/// Only consulted while the task system is being constructed.
pub trait WorkspaceFolderSetup: Send + Sync {
    fn resolve(&self) -> Result<Vec<WorkspaceFolder>>;
}

/// Fixed folder list, checked to exist on resolve
#[derive(Debug, Clone, Default)]
pub struct StaticWorkspaceFolders {
    folders: Vec<WorkspaceFolder>,
}

impl StaticWorkspaceFolders {
    pub fn new(folders: Vec<WorkspaceFolder>) -> Self {
        Self { folders }
    }
}

impl WorkspaceFolderSetup for StaticWorkspaceFolders {
    fn resolve(&self) -> Result<Vec<WorkspaceFolder>> {
        if self.folders.is_empty() {
            let cwd = std::env::current_dir()?;
            let name = cwd
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "workspace".to_string());
            return Ok(vec![WorkspaceFolder::new(name, cwd)]);
        }

        for folder in &self.folders {
            if !folder.path.is_dir() {
                return Err(Error::Config(format!(
                    "Workspace folder {:?} does not exist: {}",
                    folder.name,
                    folder.path.display()
                )));
            }
        }

        Ok(self.folders.clone())
    }
}
