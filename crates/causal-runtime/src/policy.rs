//! When a process starts a snapshot round on its own.

use causal_core::{ProcessId, Scenario, SnapshotTrigger};
use std::sync::Arc;

/// Decides, after each internal event, whether the process initiates a
/// snapshot round.
pub trait SnapshotPolicy: Send + Sync {
    /// Called by the application driver after `process` executed the
    /// internal event `label`.
    fn initiate_after(&self, process: ProcessId, label: &str) -> bool;
}

/// Never initiates; rounds can still be started through the process handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSnapshots;

impl SnapshotPolicy for NoSnapshots {
    fn initiate_after(&self, _process: ProcessId, _label: &str) -> bool {
        false
    }
}

impl SnapshotPolicy for SnapshotTrigger {
    fn initiate_after(&self, process: ProcessId, label: &str) -> bool {
        self.initiator == process && self.after == label
    }
}

/// Policy described by a scenario's `[snapshot]` table.
pub fn policy_for(scenario: &Scenario) -> Arc<dyn SnapshotPolicy> {
    match &scenario.snapshot {
        Some(trigger) => Arc::new(trigger.clone()),
        None => Arc::new(NoSnapshots),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_matches_initiator_and_label() {
        let trigger = SnapshotTrigger {
            initiator: ProcessId::new(0),
            after: "a".into(),
        };
        assert!(trigger.initiate_after(ProcessId::new(0), "a"));
        assert!(!trigger.initiate_after(ProcessId::new(0), "b"));
        assert!(!trigger.initiate_after(ProcessId::new(1), "a"));
    }

    #[test]
    fn scenario_without_trigger_never_initiates() {
        let mut scenario = Scenario::reference();
        scenario.snapshot = None;
        let policy = policy_for(&scenario);
        assert!(!policy.initiate_after(ProcessId::new(0), "a"));

        let policy = policy_for(&Scenario::reference());
        assert!(policy.initiate_after(ProcessId::new(0), "a"));
    }
}
