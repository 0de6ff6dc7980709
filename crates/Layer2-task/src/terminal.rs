//! Terminal task system - runs tasks attached to a pseudo-terminal
//!
//! Uses portable-pty so commands see a real terminal (colors, line
//! discipline, job control). Output is collected on a blocking thread and
//! returned with ANSI escape sequences removed.
//!
//! ## Lifecycle events
//!
//! Every task fires `Start` and `Active` once its process is spawned, then
//! `Inactive` and `End` (with the exit code) once it is gone. Events are
//! fired after the session table is updated and never while it is locked,
//! so listeners may call [`TaskSystem::is_active_sync`] and see the new state.
//!
//! ## Detach / reconnect
//!
//! [`TerminalTaskSystem::detach_all`] releases the terminals of running
//! tasks without killing them; [`TerminalTaskSystem::reconnect`] reattaches
//! whatever is still running and fires a [`ReconnectEvent`].

use crate::config::TerminalConfig;
use crate::state::TaskState;
use crate::system::{ReconnectEvent, TaskEvent, TaskEventKind, TaskSystem};
use crate::task::{Task, TaskId, TaskResult};
use crate::workspace::WorkspaceFolder;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use portable_pty::{native_pty_system, ChildKiller, CommandBuilder, PtyPair, PtySize};
use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tether_foundation::{Emitter, Error, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A running task and the handle to kill it
struct Session {
    label: String,
    killer: Mutex<Box<dyn ChildKiller + Send + Sync>>,
    kill_requested: AtomicBool,
    attached: AtomicBool,
}

impl Session {
    fn kill(&self) {
        if let Err(e) = self.killer.lock().kill() {
            // Usually the process already exited
            debug!(task = %self.label, "Kill failed: {}", e);
        }
    }
}

/// Output and exit code collected by the reader thread
type Collected = std::io::Result<(String, i32)>;

/// A spawned task waiting to be supervised
struct Launched {
    task: Task,
    session: Arc<Session>,
    output: JoinHandle<Collected>,
    timeout: Option<Duration>,
}

struct Inner {
    config: TerminalConfig,
    folders: Vec<WorkspaceFolder>,
    sessions: RwLock<HashMap<TaskId, Arc<Session>>>,
    state_change: Emitter<TaskEvent>,
    reconnect: Emitter<ReconnectEvent>,
}

/// Task system that runs every task in its own pseudo-terminal
pub struct TerminalTaskSystem {
    inner: Arc<Inner>,
}

impl TerminalTaskSystem {
    pub fn new(config: TerminalConfig, folders: Vec<WorkspaceFolder>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                folders,
                sessions: RwLock::new(HashMap::new()),
                state_change: Emitter::named("terminal.stateChange"),
                reconnect: Emitter::named("terminal.reconnect"),
            }),
        }
    }

    /// Workspace folders this system was built with
    pub fn folders(&self) -> &[WorkspaceFolder] {
        &self.inner.folders
    }

    /// Release the terminals of all running tasks; returns how many were detached
    pub fn detach_all(&self) -> usize {
        let sessions = self.inner.sessions.read();
        let mut detached = 0;
        for session in sessions.values() {
            if session.attached.swap(false, Ordering::SeqCst) {
                detached += 1;
            }
        }
        info!(detached, "Detached task terminals");
        detached
    }

    /// Reattach detached tasks that are still running
    pub fn reconnect(&self) -> Vec<TaskId> {
        let recovered: Vec<TaskId> = {
            let sessions = self.inner.sessions.read();
            sessions
                .iter()
                .filter(|(_, session)| !session.attached.swap(true, Ordering::SeqCst))
                .map(|(id, _)| *id)
                .collect()
        };

        info!(recovered = recovered.len(), "Reconnected to task terminals");
        self.inner.reconnect.fire(ReconnectEvent::new(recovered.clone()));
        recovered
    }
}

impl Inner {
    /// Spawn the task's process and register its session
    fn launch(&self, mut task: Task) -> Result<Launched> {
        let pty_system = native_pty_system();
        let size = PtySize {
            rows: self.config.rows,
            cols: self.config.cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let PtyPair { master, slave } = pty_system
            .openpty(size)
            .map_err(|e| Error::Task(format!("Failed to open PTY: {}", e)))?;

        let mut cmd = CommandBuilder::new(&self.config.shell);
        if cfg!(windows) {
            cmd.arg("-Command");
        } else {
            cmd.arg("-c");
        }
        cmd.arg(&task.command);

        if let Some(cwd) = task.cwd.as_ref().or_else(|| self.folders.first().map(|f| &f.path)) {
            cmd.cwd(cwd);
        }
        cmd.env("TERM", "xterm-256color");
        for (key, value) in &task.env {
            cmd.env(key, value);
        }

        let mut child = slave
            .spawn_command(cmd)
            .map_err(|e| Error::Task(format!("Failed to spawn PTY command: {}", e)))?;
        // Reader sees EOF only once every slave handle is closed
        drop(slave);

        let mut reader = master
            .try_clone_reader()
            .map_err(|e| Error::Task(format!("Failed to clone PTY reader: {}", e)))?;

        let session = Arc::new(Session {
            label: task.label.clone(),
            killer: Mutex::new(child.clone_killer()),
            kill_requested: AtomicBool::new(false),
            attached: AtomicBool::new(true),
        });

        let output = tokio::task::spawn_blocking(move || -> Collected {
            let _master = master;
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => raw.extend_from_slice(&buf[..n]),
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    // EIO once the slave side is gone
                    Err(_) => break,
                }
            }

            let status = child.wait()?;
            let text = strip_ansi_escapes::strip_str(String::from_utf8_lossy(&raw));
            Ok((text, status.exit_code() as i32))
        });

        task.start();
        self.sessions.write().insert(task.id, Arc::clone(&session));
        info!(task = %task.id, label = %task.label, "Started terminal task");

        self.state_change.fire(TaskEvent::new(TaskEventKind::Start, &task));
        self.state_change.fire(TaskEvent::new(TaskEventKind::Active, &task));

        let timeout = task.timeout.or_else(|| self.config.default_timeout());
        Ok(Launched {
            task,
            session,
            output,
            timeout,
        })
    }

    /// Wait for a launched task, enforcing its timeout
    async fn supervise(&self, launched: Launched) -> Result<TaskResult> {
        let Launched {
            mut task,
            session,
            mut output,
            timeout,
        } = launched;

        let mut timed_out = false;
        let collected = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut output).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(task = %task.id, "Terminal task timed out after {:?}", limit);
                    timed_out = true;
                    session.kill();
                    output.await
                }
            },
            None => output.await,
        };

        self.sessions.write().remove(&task.id);

        let (state, outcome) = match collected {
            Ok(Ok((text, exit_code))) => {
                let result = TaskResult::new(text, exit_code);
                if timed_out {
                    (
                        TaskState::TimedOut,
                        Err(Error::Timeout(format!(
                            "Task '{}' timed out after {:?}",
                            task.label,
                            timeout.unwrap_or_default()
                        ))),
                    )
                } else if session.kill_requested.load(Ordering::SeqCst) {
                    (
                        TaskState::Terminated,
                        Err(Error::Task(format!("Task '{}' was terminated", task.label))),
                    )
                } else {
                    (TaskState::Completed(result.clone()), Ok(result))
                }
            }
            Ok(Err(e)) => (
                TaskState::Failed(e.to_string()),
                Err(Error::Task(format!("Failed to wait for task '{}': {}", task.label, e))),
            ),
            Err(e) => (
                TaskState::Failed(e.to_string()),
                Err(Error::Task(format!("Output collection failed: {}", e))),
            ),
        };

        let exit_code = match &state {
            TaskState::Completed(result) => Some(result.exit_code),
            _ => None,
        };
        task.finish(state);
        info!(
            task = %task.id,
            state = %task.state,
            exit_code,
            duration_ms = task.duration().map(|d| d.as_millis() as u64),
            "Terminal task ended"
        );

        self.state_change.fire(TaskEvent::new(TaskEventKind::Inactive, &task));
        self.state_change
            .fire(TaskEvent::new(TaskEventKind::End, &task).with_exit_code(exit_code));

        outcome
    }
}

#[async_trait]
impl TaskSystem for TerminalTaskSystem {
    async fn run(&self, task: Task) -> Result<TaskResult> {
        let launched = self.inner.launch(task)?;
        self.inner.supervise(launched).await
    }

    async fn start(&self, task: Task) -> Result<TaskId> {
        let launched = self.inner.launch(task)?;
        let task_id = launched.task.id;
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            if let Err(e) = inner.supervise(launched).await {
                debug!(task = %task_id, "Background task ended with error: {}", e);
            }
        });

        Ok(task_id)
    }

    async fn terminate(&self, task_id: TaskId) -> Result<bool> {
        let session = self.inner.sessions.read().get(&task_id).cloned();

        match session {
            Some(session) => {
                session.kill_requested.store(true, Ordering::SeqCst);
                session.kill();
                info!(task = %task_id, "Terminated terminal task");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn is_active_sync(&self) -> bool {
        !self.inner.sessions.read().is_empty()
    }

    fn active_tasks(&self) -> Vec<TaskId> {
        self.inner.sessions.read().keys().copied().collect()
    }

    fn on_did_state_change(&self) -> &Emitter<TaskEvent> {
        &self.inner.state_change
    }

    fn on_did_reconnect(&self) -> &Emitter<ReconnectEvent> {
        &self.inner.reconnect
    }

    fn name(&self) -> &'static str {
        "terminal"
    }
}
