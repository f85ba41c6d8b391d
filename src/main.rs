mod api;
mod cli;
mod config;
mod format;
mod model;
#[cfg(feature = "tui")]
mod orchestrator;
mod session;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging(args: &cli::Cli) {
    #[cfg(feature = "tui")]
    let interactive = matches!(args.command, cli::Command::Browse);
    #[cfg(not(feature = "tui"))]
    let interactive = false;

    // Log lines would tear the alternate screen, so the browser stays quiet.
    let filter = if interactive {
        tracing_subscriber::EnvFilter::new("off")
    } else {
        let default_level = match args.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| default_level.into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging(&args);

    // The local offset can only be read soundly while the process is single-threaded.
    let local = format::TimestampFormat::local();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(cli::run(args, local))
}
