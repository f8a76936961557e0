//! Run a whole scenario inside one address space.

use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::observer::Observer;
use crate::policy::SnapshotPolicy;
use crate::process::{ProcessBuilder, ProcessReport};
use causal_core::{CoreError, Scenario};
use causal_transport::{MemoryNetwork, Transport};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Bootstrap one process per rank over a [`MemoryNetwork`], run them
/// concurrently and return their reports in rank order.
///
/// The first fatal error stops every other process and is returned.
pub async fn run_scenario(
    scenario: &Scenario,
    config: RuntimeConfig,
    policy: Arc<dyn SnapshotPolicy>,
    observer: Arc<dyn Observer>,
) -> RuntimeResult<Vec<ProcessReport>> {
    scenario.validate()?;
    config.validate()?;

    // Endpoints stay alive until every process has stopped, so a peer can
    // still deliver to a process whose script already ended.
    let transports = MemoryNetwork::build(scenario.processes);
    let mut handles = Vec::with_capacity(transports.len());
    for transport in &transports {
        let script = scenario
            .script_for(transport.local_id())
            .cloned()
            .ok_or_else(|| {
                CoreError::invalid_scenario(format!("{} has no script", transport.local_id()))
            })?;
        let transport: Arc<dyn Transport> = transport.clone();
        let spawned = ProcessBuilder::new(script, transport)
            .config(config.clone())
            .policy(policy.clone())
            .observer(observer.clone())
            .spawn();
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                handles.iter().for_each(|h| h.shutdown());
                return Err(e);
            }
        }
    }
    info!(processes = scenario.processes, "Scenario started");

    let signals: Vec<_> = handles.iter().map(|h| h.shutdown_signal()).collect();
    let mut running = JoinSet::new();
    let mut owners = HashMap::new();
    for handle in handles {
        let process = handle.id();
        let task = running.spawn(handle.join());
        owners.insert(task.id(), process);
    }

    let mut reports = Vec::with_capacity(scenario.processes);
    let mut failure = None;
    while let Some(joined) = running.join_next_with_id().await {
        let result = match joined {
            Ok((_, result)) => result,
            Err(e) => {
                let process = owners.get(&e.id()).copied().unwrap_or_default();
                Err(RuntimeError::task_failed(process, "process", e))
            }
        };
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!(error = %e, "Process failed, stopping the group");
                signals.iter().for_each(|signal| signal.trigger());
                failure.get_or_insert(e);
            }
        }
    }
    drop(transports);

    if let Some(e) = failure {
        return Err(e);
    }
    reports.sort_by_key(|report| report.process);
    info!(processes = reports.len(), "Scenario finished");
    Ok(reports)
}
