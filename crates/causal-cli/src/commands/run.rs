//! Run every process of a scenario in this address space.

use super::{verify_rounds, ScenarioArgs};
use crate::console::ConsoleObserver;
use anyhow::{bail, Result};
use causal_runtime::{run_scenario, NullObserver, Observer};
use clap::Args;
use serde_json::json;
use std::sync::Arc;

/// `causal run`
#[derive(Args, Debug, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub scenario: ScenarioArgs,

    /// Print reports and checks as JSON instead of the live trace
    #[arg(long)]
    pub json: bool,
}

/// Execute `causal run`.
pub async fn handle_run_command(cmd: RunCommand) -> Result<()> {
    let prepared = cmd.scenario.prepare()?;
    let observer: Arc<dyn Observer> = if cmd.json {
        Arc::new(NullObserver)
    } else {
        Arc::new(ConsoleObserver)
    };

    let reports = run_scenario(
        &prepared.scenario,
        prepared.config,
        prepared.policy,
        observer,
    )
    .await?;
    let checks = verify_rounds(prepared.scenario.processes, &reports)?;

    if cmd.json {
        let output = json!({ "reports": reports, "snapshots": checks });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for report in &reports {
            println!("{} final clock {}", report.process, report.final_clock);
        }
        for check in &checks {
            for mismatch in &check.mismatches {
                println!("round {}: {mismatch}", check.round);
            }
        }
    }

    if let Some(failed) = checks.iter().find(|c| !c.passed()) {
        bail!("Snapshot round {} is not consistent", failed.round);
    }
    Ok(())
}
