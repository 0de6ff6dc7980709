//! # tether-task
//!
//! Execution engine selection for Tether.
//!
//! ## Features
//!
//! - [`TaskService`]: builds the terminal engine once, on first use, and caches it
//! - Single-flight construction; failures are never cached
//! - Engine lifecycle events relayed onto the service's own emitters
//! - `UnsupportedEngine` for the process engine
//! - [`TerminalTaskSystem`]: PTY-backed engine with detach / reconnect

pub mod config;
pub mod engine;
pub mod factory;
pub mod service;
pub mod state;
pub mod system;
pub mod task;
pub mod terminal;
pub mod workspace;

pub use config::{
    TaskServiceConfig, TaskServiceConfigLayer, TerminalConfig, TerminalConfigLayer, TASKS_CONFIG_FILE,
};
pub use engine::{ExecutionEngine, PROCESS_ENGINE_UNSUPPORTED};
pub use factory::{TaskSystemFactory, TerminalTaskSystemFactory};
pub use service::{TaskFilter, TaskService};
pub use state::TaskState;
pub use system::{ReconnectEvent, TaskEvent, TaskEventKind, TaskSystem};
pub use task::{Task, TaskId, TaskResult};
pub use terminal::TerminalTaskSystem;
pub use workspace::{StaticWorkspaceFolders, WorkspaceFolder, WorkspaceFolderSetup};
