//! Subcommand implementations

use anyhow::{bail, Context};
use clap::Args;
use std::io::Write;
use std::time::Duration;
use tether_request::{CancellationToken, HttpConfig, HttpRequester, RequestError, RequestOptions};
use tether_task::{ExecutionEngine, Task, TaskEvent, TaskService, TaskServiceConfig};
use tracing::{debug, warn};

/// Exit status after Ctrl-C
const EXIT_CANCELLED: i32 = 130;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Absolute URL to request
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long = "request", default_value = "GET")]
    pub method: String,

    /// Request header as 'Name: value' (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Request body
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// Basic-auth user
    #[arg(long)]
    pub user: Option<String>,

    /// Basic-auth password
    #[arg(long, requires = "user")]
    pub password: Option<String>,

    /// Proxy-Authorization header value
    #[arg(long)]
    pub proxy_auth: Option<String>,

    /// Timeout in milliseconds; 0 disables it
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Retries for transport errors and timeouts
    #[arg(long)]
    pub retries: Option<u32>,

    /// Print status line and response headers before the body
    #[arg(short = 'i', long)]
    pub include: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Shell command line
    pub command: String,

    /// Execution engine (terminal or process)
    #[arg(long)]
    pub engine: Option<ExecutionEngine>,

    /// Working directory
    #[arg(long)]
    pub cwd: Option<std::path::PathBuf>,

    /// Timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Split a 'Name: value' header argument
fn parse_header(raw: &str) -> anyhow::Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("Invalid header {:?}: expected 'Name: value'", raw);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid header {:?}: empty name", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn build_options(args: &FetchArgs) -> anyhow::Result<RequestOptions> {
    let mut options = RequestOptions::new(&args.url).method(&args.method);

    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        options = options.header(name, value);
    }
    if let Some(data) = &args.data {
        options = options.body(data.clone());
    }
    if let Some(user) = &args.user {
        options = options.basic_auth(user, args.password.clone());
    }
    if let Some(token) = &args.proxy_auth {
        options = options.proxy_authorization(token);
    }
    if let Some(timeout) = args.timeout {
        options = options.timeout_ms(timeout);
    }

    Ok(options)
}

/// Cancel `token` on Ctrl-C
fn cancel_on_ctrl_c(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}

/// `tether fetch`
pub async fn fetch(args: FetchArgs) -> anyhow::Result<i32> {
    let config = HttpConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load HTTP config: {}", e);
        HttpConfig::default()
    });

    let options = build_options(&args)?;
    let requester = HttpRequester::from_config(&config)?;
    let retry = config
        .retry
        .clone()
        .with_max_retries(args.retries.unwrap_or(config.retry.max_retries));

    let token = CancellationToken::new();
    cancel_on_ctrl_c(&token);

    let sink = |message: &str| debug!("{}", message);
    let result = match requester
        .execute_with_retry(options, &token, Some(&sink), &retry)
        .await
    {
        Ok(result) => result,
        Err(RequestError::Cancelled) => {
            eprintln!("Request cancelled");
            return Ok(EXIT_CANCELLED);
        }
        Err(e) => return Err(e.into()),
    };

    let mut stdout = std::io::stdout().lock();
    if args.include {
        writeln!(stdout, "HTTP {}", result.status_code)?;
        let mut headers: Vec<_> = result.headers.iter().collect();
        headers.sort();
        for (name, value) in headers {
            writeln!(stdout, "{}: {}", name, value)?;
        }
        writeln!(stdout)?;
    }
    stdout
        .write_all(&result.stream.into_bytes())
        .context("Failed to write response body")?;
    stdout.flush()?;

    Ok(0)
}

/// `tether run`
pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let mut config = TaskServiceConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load task config: {}", e);
        TaskServiceConfig::default()
    });
    if let Some(engine) = args.engine {
        config.execution_engine = engine;
    }

    let service = TaskService::from_config(&config);
    let _events = service.on_did_state_change().subscribe(|event: &TaskEvent| {
        match event.exit_code {
            Some(code) => eprintln!("[{}] {:?} {} (exit {})", event.task_id, event.kind, event.label, code),
            None => eprintln!("[{}] {:?} {}", event.task_id, event.kind, event.label),
        }
    });

    let mut task = Task::new(&args.command);
    if let Some(cwd) = args.cwd {
        task = task.with_cwd(cwd);
    }
    if let Some(timeout) = args.timeout {
        task = task.with_timeout(Duration::from_millis(timeout));
    }
    let task_id = task.id;

    let running = service.run(task);
    tokio::pin!(running);

    let outcome = tokio::select! {
        outcome = &mut running => outcome,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Terminating task");
            service.terminate(task_id).await?;
            running.await
        }
    };

    let result = outcome?;
    print!("{}", result.output);
    std::io::stdout().flush()?;
    Ok(result.exit_code)
}
