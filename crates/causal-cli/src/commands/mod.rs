//! Subcommands and the options they share.

pub mod node;
pub mod run;

use crate::scenario_file::ScenarioFile;
use anyhow::Result;
use causal_core::Scenario;
use causal_runtime::{
    policy_for, ChannelMismatch, GlobalSnapshot, NoSnapshots, ProcessReport, RuntimeConfig,
    SnapshotPolicy,
};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Pause between scripted instructions unless overridden.
const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(100);

/// Which scenario to run and how.
#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    /// Scenario TOML file; the built-in three-process trace when omitted
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Pause after every instruction, in milliseconds
    #[arg(long)]
    pub step_delay_ms: Option<u64>,

    /// Ignore the scenario's snapshot trigger
    #[arg(long)]
    pub no_snapshot: bool,
}

/// Everything needed to start processes.
pub struct Prepared {
    pub scenario: Scenario,
    pub config: RuntimeConfig,
    pub policy: Arc<dyn SnapshotPolicy>,
}

impl ScenarioArgs {
    /// Load the scenario and resolve the runtime configuration.
    ///
    /// Precedence: command line, then the file's `[runtime]` table, then the
    /// CLI defaults.
    pub fn prepare(&self) -> Result<Prepared> {
        let base = RuntimeConfig::default().with_step_delay(DEFAULT_STEP_DELAY);
        let (scenario, mut config) = match &self.scenario {
            Some(path) => {
                let file = ScenarioFile::load(path)?;
                (file.scenario()?, file.runtime_config(base)?)
            }
            None => (Scenario::reference(), base),
        };
        if let Some(ms) = self.step_delay_ms {
            config.step_delay_ms = ms;
        }
        config.validate()?;

        let policy: Arc<dyn SnapshotPolicy> = if self.no_snapshot {
            Arc::new(NoSnapshots)
        } else {
            policy_for(&scenario)
        };
        info!(
            processes = scenario.processes,
            step_delay_ms = config.step_delay_ms,
            snapshot = scenario.snapshot.is_some() && !self.no_snapshot,
            "Scenario loaded"
        );
        Ok(Prepared {
            scenario,
            config,
            policy,
        })
    }
}

/// Verification result of one snapshot round.
#[derive(Debug, Serialize)]
pub struct RoundCheck {
    pub round: u64,
    pub consistent: bool,
    pub mismatches: Vec<ChannelMismatch>,
}

impl RoundCheck {
    pub fn passed(&self) -> bool {
        self.consistent && self.mismatches.is_empty()
    }
}

/// Check every round that completed at all processes.
pub fn verify_rounds(processes: usize, reports: &[ProcessReport]) -> Result<Vec<RoundCheck>> {
    let rounds = reports
        .iter()
        .map(|r| r.snapshots.len() as u64)
        .min()
        .unwrap_or(0);
    if reports.iter().any(|r| r.snapshots.len() as u64 != rounds) {
        warn!("Some snapshot rounds did not complete at every process");
    }

    let mut checks = Vec::new();
    for round in 1..=rounds {
        let global = GlobalSnapshot::assemble(processes, round, reports)?;
        let check = RoundCheck {
            round,
            consistent: global.is_consistent(),
            mismatches: global.verify_channels(reports),
        };
        if check.passed() {
            info!(round, "Global snapshot is consistent");
        } else {
            warn!(
                round,
                consistent = check.consistent,
                mismatches = check.mismatches.len(),
                "Global snapshot check failed"
            );
        }
        checks.push(check);
    }
    Ok(checks)
}
