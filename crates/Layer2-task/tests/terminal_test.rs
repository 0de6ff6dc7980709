//! Terminal task system against a real pseudo-terminal
//!
//! `cargo test -p tether-task --test terminal_test -- --ignored --nocapture`

#![cfg(unix)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tether_foundation::Error;
use tether_task::{
    ExecutionEngine, Task, TaskEvent, TaskEventKind, TaskService,
    TaskServiceConfig, TaskSystem, TerminalConfig, TerminalTaskSystem, WorkspaceFolder,
};

fn terminal_config() -> TerminalConfig {
    TerminalConfig {
        shell: "/bin/sh".to_string(),
        ..Default::default()
    }
}

fn record(system: &dyn TaskSystem) -> (Arc<Mutex<Vec<TaskEvent>>>, tether_foundation::Subscription) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let sub = system
        .on_did_state_change()
        .subscribe(move |event: &TaskEvent| sink.lock().push(event.clone()));
    (events, sub)
}

#[tokio::test]
#[ignore = "needs a pseudo-terminal"]
async fn test_run_echo_collects_clean_output() {
    let system = TerminalTaskSystem::new(terminal_config(), Vec::new());
    let (events, _sub) = record(&system);

    let result = system
        .run(Task::new("printf '\\033[32mgreen\\033[0m done'").with_label("color"))
        .await
        .expect("run failed");

    assert!(result.is_success());
    assert!(result.output.contains("green done"), "output: {:?}", result.output);
    assert!(!system.is_active_sync());

    let kinds: Vec<_> = events.lock().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TaskEventKind::Start,
            TaskEventKind::Active,
            TaskEventKind::Inactive,
            TaskEventKind::End
        ]
    );
    assert_eq!(events.lock().last().and_then(|e| e.exit_code), Some(0));
}

#[tokio::test]
#[ignore = "needs a pseudo-terminal"]
async fn test_exit_code_and_env() {
    let system = TerminalTaskSystem::new(terminal_config(), Vec::new());

    let result = system
        .run(Task::new("echo $TETHER_GREETING; exit 3").with_env("TETHER_GREETING", "hello"))
        .await
        .unwrap();

    assert_eq!(result.exit_code, 3);
    assert!(result.output.contains("hello"));
}

#[tokio::test]
#[ignore = "needs a pseudo-terminal"]
async fn test_workspace_folder_is_default_cwd() {
    let dir = tempfile::tempdir().unwrap();
    let canonical = dir.path().canonicalize().unwrap();
    let system = TerminalTaskSystem::new(
        terminal_config(),
        vec![WorkspaceFolder::new("tmp", &canonical)],
    );

    let result = system.run(Task::new("pwd")).await.unwrap();
    assert!(result.output.contains(&*canonical.to_string_lossy()));
}

#[tokio::test]
#[ignore = "needs a pseudo-terminal"]
async fn test_timeout_kills_task() {
    let system = TerminalTaskSystem::new(terminal_config(), Vec::new());

    let err = system
        .run(Task::new("sleep 30").with_timeout(Duration::from_millis(300)))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout(_)));
    assert!(!system.is_active_sync());
}

#[tokio::test]
#[ignore = "needs a pseudo-terminal"]
async fn test_background_task_terminate_and_reconnect() {
    let system = TerminalTaskSystem::new(terminal_config(), Vec::new());
    let (events, _sub) = record(&system);

    let task_id = system.start(Task::new("sleep 30")).await.unwrap();
    assert!(system.is_active_sync());
    assert_eq!(system.active_tasks(), vec![task_id]);

    assert_eq!(system.detach_all(), 1);
    assert_eq!(system.reconnect(), vec![task_id]);

    assert!(system.terminate(task_id).await.unwrap());
    for _ in 0..50 {
        if !system.is_active_sync() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(!system.is_active_sync());
    assert_eq!(events.lock().last().map(|e| e.kind), Some(TaskEventKind::End));
}

#[tokio::test]
#[ignore = "needs a pseudo-terminal"]
async fn test_service_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = TaskServiceConfig {
        execution_engine: ExecutionEngine::Terminal,
        terminal: terminal_config(),
        workspace_folders: vec![WorkspaceFolder::new("tmp", dir.path())],
    };
    let service = TaskService::from_config(&config);

    let result = service.run(Task::new("echo relayed")).await.unwrap();
    assert!(result.output.contains("relayed"));
    assert!(!service.is_running());
    assert_eq!(service.on_did_state_change().event_count(), 4);
}
