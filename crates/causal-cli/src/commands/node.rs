//! Run one rank of a scenario as its own OS process.
//!
//! Every rank is started with the same scenario and the same `--peers`
//! list; rank i listens on `peers[i]` and the ranks form a TCP mesh.

use super::ScenarioArgs;
use crate::console::ConsoleObserver;
use anyhow::{bail, Context, Result};
use causal_core::ProcessId;
use causal_runtime::ProcessBuilder;
use causal_transport::{TcpConfig, TcpTransport, Transport};
use clap::Args;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// `causal node`
#[derive(Args, Debug, Clone)]
pub struct NodeCommand {
    #[command(flatten)]
    pub scenario: ScenarioArgs,

    /// Rank of this process
    #[arg(long)]
    pub rank: u32,

    /// Listen address of every rank, in rank order
    #[arg(long, value_delimiter = ',', required = true)]
    pub peers: Vec<SocketAddr>,

    /// Keep connections open this long after the script ends so slower
    /// ranks can still deliver
    #[arg(long, default_value = "2000")]
    pub linger_ms: u64,

    /// Dial attempts per lower-ranked peer
    #[arg(long, default_value = "50")]
    pub connect_attempts: u32,
}

/// Execute `causal node`.
pub async fn handle_node_command(cmd: NodeCommand) -> Result<()> {
    let prepared = cmd.scenario.prepare()?;
    let rank = ProcessId::new(cmd.rank);
    if cmd.peers.len() != prepared.scenario.processes {
        bail!(
            "Scenario has {} processes but {} peer addresses were given",
            prepared.scenario.processes,
            cmd.peers.len()
        );
    }
    let Some(script) = prepared.scenario.script_for(rank).cloned() else {
        bail!("{rank} is not part of the scenario");
    };

    let addr = cmd.peers[rank.index()];
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to listen on {addr}"))?;
    info!(process = %rank, %addr, "Waiting for the mesh");

    let tcp_config = TcpConfig {
        connect_attempts: cmd.connect_attempts,
        ..TcpConfig::default()
    };
    let transport: Arc<dyn Transport> = Arc::new(
        TcpTransport::establish(rank, listener, &cmd.peers, &tcp_config)
            .await
            .context("Failed to connect to peers")?,
    );

    let handle = ProcessBuilder::new(script, transport.clone())
        .config(prepared.config)
        .policy(prepared.policy)
        .observer(Arc::new(ConsoleObserver))
        .spawn()?;
    let report = handle.join().await?;
    println!("{} final clock {}", report.process, report.final_clock);

    // Peers may still write to this rank; closing now would fail their sends.
    info!(process = %rank, linger_ms = cmd.linger_ms, "Script finished, lingering");
    tokio::time::sleep(Duration::from_millis(cmd.linger_ms)).await;
    drop(transport);
    Ok(())
}
