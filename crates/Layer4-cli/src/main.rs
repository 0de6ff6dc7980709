//! Tether CLI - Main entry point

mod cli;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tether - cancellable HTTP requests and terminal tasks
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Issue one HTTP request and write the body to stdout
    Fetch(cli::FetchArgs),

    /// Run a shell command through the task service
    Run(cli::RunArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let code = match args.command {
        Command::Fetch(fetch) => cli::fetch(fetch).await?,
        Command::Run(run) => cli::run(run).await?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
