//! Flowline CLI - Command-line interface
//!
//! Runs the bundled queueing scenarios and prints their reports.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use flowline_core::tracing_setup::{CliLogLevel, init_tracing};
use tracing::info;

#[derive(Parser)]
#[command(name = "flowline")]
#[command(about = "Discrete-event simulation of queueing networks")]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,

    /// Console log level; the trace file always records everything
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Directory for the trace file
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_path = init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))?;
    info!("Trace log: {}", log_path.display());

    commands::handle_command(cli.command)
}
