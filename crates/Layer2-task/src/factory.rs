//! Task system construction

use crate::config::TerminalConfig;
use crate::system::TaskSystem;
use crate::terminal::TerminalTaskSystem;
use crate::workspace::WorkspaceFolderSetup;
use std::sync::Arc;
use tether_foundation::Result;
use tracing::debug;

/// Builds concrete task systems
///
/// Construction may have side effects; callers are expected to cache the
/// result rather than call this repeatedly.
pub trait TaskSystemFactory: Send + Sync {
    fn create_terminal_task_system(&self) -> Result<Arc<dyn TaskSystem>>;
}

/// Resolves workspace folders, then builds a [`TerminalTaskSystem`]
pub struct TerminalTaskSystemFactory {
    config: TerminalConfig,
    workspace: Arc<dyn WorkspaceFolderSetup>,
}

impl TerminalTaskSystemFactory {
    pub fn new(config: TerminalConfig, workspace: Arc<dyn WorkspaceFolderSetup>) -> Self {
        Self { config, workspace }
    }
}

impl TaskSystemFactory for TerminalTaskSystemFactory {
    fn create_terminal_task_system(&self) -> Result<Arc<dyn TaskSystem>> {
        let folders = self.workspace.resolve()?;
        debug!(
            folders = folders.len(),
            shell = %self.config.shell,
            "Creating terminal task system"
        );
        Ok(Arc::new(TerminalTaskSystem::new(self.config.clone(), folders)))
    }
}
