//! Task service - selects, builds and caches the execution engine
//!
//! The service owns no engine until one is first asked for. The terminal
//! engine is then built exactly once, even under concurrent first calls,
//! and its lifecycle events are relayed onto the service's own emitters.
//! Any other execution engine fails with `UnsupportedEngine` and nothing
//! is cached, so the failure repeats identically.

use crate::config::TaskServiceConfig;
use crate::engine::ExecutionEngine;
use crate::factory::{TaskSystemFactory, TerminalTaskSystemFactory};
use crate::system::{ReconnectEvent, TaskEvent, TaskSystem};
use crate::task::{Task, TaskId, TaskResult};
use crate::workspace::{StaticWorkspaceFolders, WorkspaceFolder};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tether_foundation::{Emitter, Error, Result, Subscription};
use tracing::{debug, info};

/// Narrows which tasks a caller is interested in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    /// Required configuration schema version
    pub version: Option<String>,
    pub task_type: Option<String>,
}

/// The cached engine together with the relays feeding the service emitters
struct Ready {
    system: Arc<dyn TaskSystem>,
    _relays: [Subscription; 2],
}

/// Execution engine selector
pub struct TaskService {
    engine: ExecutionEngine,
    factory: Arc<dyn TaskSystemFactory>,
    ready: OnceCell<Ready>,
    running: Arc<AtomicBool>,
    state_change: Arc<Emitter<TaskEvent>>,
    reconnect: Arc<Emitter<ReconnectEvent>>,
}

impl TaskService {
    pub fn new(engine: ExecutionEngine, factory: Arc<dyn TaskSystemFactory>) -> Self {
        Self {
            engine,
            factory,
            ready: OnceCell::new(),
            running: Arc::new(AtomicBool::new(false)),
            state_change: Arc::new(Emitter::named("tasks.stateChange")),
            reconnect: Arc::new(Emitter::named("tasks.reconnect")),
        }
    }

    /// Service over the terminal factory described by `config`
    pub fn from_config(config: &TaskServiceConfig) -> Self {
        let workspace = StaticWorkspaceFolders::new(config.workspace_folders.clone());
        let factory = TerminalTaskSystemFactory::new(config.terminal.clone(), Arc::new(workspace));
        Self::new(config.execution_engine, Arc::new(factory))
    }

    pub fn execution_engine(&self) -> ExecutionEngine {
        self.engine
    }

    /// The engine, built on first use
    ///
    /// Concurrent first callers block until the single construction
    /// finishes and all receive the same instance. A failed construction
    /// is not cached.
    pub fn task_system(&self) -> Result<Arc<dyn TaskSystem>> {
        if self.engine != ExecutionEngine::Terminal {
            return Err(ExecutionEngine::unsupported());
        }

        let ready = self.ready.get_or_try_init(|| {
            let system = self.factory.create_terminal_task_system()?;
            info!(engine = %self.engine, system = system.name(), "Task system ready");
            let relays = self.relay(&system);
            Ok::<_, Error>(Ready {
                system,
                _relays: relays,
            })
        })?;

        Ok(Arc::clone(&ready.system))
    }

    /// Forward both engine event sources, refreshing the running flag first
    fn relay(&self, system: &Arc<dyn TaskSystem>) -> [Subscription; 2] {
        let state_change = {
            let weak: Weak<dyn TaskSystem> = Arc::downgrade(system);
            let running = Arc::clone(&self.running);
            system
                .on_did_state_change()
                .forward_to(&self.state_change, move |_| refresh(&weak, &running))
        };

        let reconnect = {
            let weak: Weak<dyn TaskSystem> = Arc::downgrade(system);
            let running = Arc::clone(&self.running);
            system
                .on_did_reconnect()
                .forward_to(&self.reconnect, move |_| refresh(&weak, &running))
        };

        [state_change, reconnect]
    }

    /// Run a task on the engine
    pub async fn run(&self, task: Task) -> Result<TaskResult> {
        let system = self.task_system()?;
        debug!(task = %task.id, label = %task.label, "Running task");
        system.run(task).await
    }

    /// Start a task in the background on the engine
    pub async fn start(&self, task: Task) -> Result<TaskId> {
        self.task_system()?.start(task).await
    }

    pub async fn terminate(&self, task_id: TaskId) -> Result<bool> {
        self.task_system()?.terminate(task_id).await
    }

    /// Whether a task was running as of the last relayed event
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Task state changes of the engine, relayed
    pub fn on_did_state_change(&self) -> &Emitter<TaskEvent> {
        &self.state_change
    }

    /// Terminal reconnects of the engine, relayed
    pub fn on_did_reconnect(&self) -> &Emitter<ReconnectEvent> {
        &self.reconnect
    }

    /// Legacy per-folder configuration needs the process engine
    pub fn compute_legacy_configuration(&self, folder: &WorkspaceFolder) -> Result<Vec<Task>> {
        debug!(folder = %folder.name, "Legacy task configuration requested");
        Err(ExecutionEngine::unsupported())
    }

    /// Only the terminal engine runs current task configurations
    pub fn version_and_engine_compatible(&self, _filter: Option<&TaskFilter>) -> bool {
        self.engine == ExecutionEngine::Terminal
    }
}

fn refresh(system: &Weak<dyn TaskSystem>, running: &AtomicBool) {
    if let Some(system) = system.upgrade() {
        running.store(system.is_active_sync(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingFactory {
        calls: AtomicUsize,
    }

    impl TaskSystemFactory for CountingFactory {
        fn create_terminal_task_system(&self) -> Result<Arc<dyn TaskSystem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Config("no workspace".into()))
        }
    }

    fn counting() -> Arc<CountingFactory> {
        Arc::new(CountingFactory {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_process_engine_never_reaches_factory() {
        let factory = counting();
        let service = TaskService::new(ExecutionEngine::Process, factory.clone());

        for _ in 0..3 {
            let err = service.task_system().err().unwrap();
            assert!(matches!(err, Error::UnsupportedEngine(ref m) if m == crate::PROCESS_ENGINE_UNSUPPORTED));
        }
        assert_eq!(factory.calls.load(Ordering::SeqCst), 0);
        assert!(!service.is_running());
    }

    #[test]
    fn test_construction_failure_is_not_cached() {
        let factory = counting();
        let service = TaskService::new(ExecutionEngine::Terminal, factory.clone());

        assert!(matches!(service.task_system(), Err(Error::Config(_))));
        assert!(matches!(service.task_system(), Err(Error::Config(_))));
        assert_eq!(factory.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_legacy_configuration_unsupported() {
        let service = TaskService::new(ExecutionEngine::Terminal, counting());
        let folder = WorkspaceFolder::new("app", "/srv/app");

        assert!(matches!(
            service.compute_legacy_configuration(&folder),
            Err(Error::UnsupportedEngine(_))
        ));
    }

    #[test]
    fn test_engine_compatibility() {
        let filter = TaskFilter {
            version: Some("2.0.0".into()),
            ..Default::default()
        };

        let terminal = TaskService::new(ExecutionEngine::Terminal, counting());
        assert!(terminal.version_and_engine_compatible(None));
        assert!(terminal.version_and_engine_compatible(Some(&filter)));

        let process = TaskService::new(ExecutionEngine::Process, counting());
        assert!(!process.version_and_engine_compatible(Some(&filter)));
        assert_eq!(process.execution_engine(), ExecutionEngine::Process);
    }
}
