//! Runbook CLI - run team commands from layered YAML definitions
//!
//! Binary name: `runbook`

use std::process;

use clap::Parser;
use tokio_util::sync::CancellationToken;

mod cli;
mod commands;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    // Ctrl-C cancels the running command instead of killing the runner
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received SIGINT, cancelling...");
            on_interrupt.cancel();
        }
    });

    if let Err(err) = commands::dispatch(&cli, &cancel).await {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {err:#}");
        }

        let code = err
            .downcast_ref::<runbook_core::Error>()
            .map_or(1, runbook_core::Error::exit_code);

        #[allow(clippy::exit)]
        process::exit(code);
    }
}
