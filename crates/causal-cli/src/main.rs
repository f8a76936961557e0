//! Command-line runner for vector-clock scenarios with Chandy-Lamport
//! snapshots.
//!
//! `causal run` executes every process of a scenario in one address space;
//! `causal node` executes one rank and talks to the others over TCP.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod console;
mod scenario_file;

use commands::{
    node::{handle_node_command, NodeCommand},
    run::{handle_run_command, RunCommand},
};

#[derive(Parser)]
#[command(name = "causal")]
#[command(about = "Vector clocks and consistent snapshots over scripted processes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all processes of a scenario in-process
    Run(RunCommand),

    /// Run one rank of a scenario over TCP
    Node(NodeCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose when set
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(cmd) => handle_run_command(cmd).await?,
        Commands::Node(cmd) => handle_node_command(cmd).await?,
    }
    Ok(())
}
