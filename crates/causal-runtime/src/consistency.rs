//! Global snapshot assembly and verification.
//!
//! A global snapshot is the set of local snapshots of one round, one per
//! process. It is checked against the event histories in the process
//! reports:
//! - the recorded clocks form a consistent cut
//! - every channel log holds exactly the messages sent before the sender's
//!   cut and received after the receiver's cut, in send order

use crate::error::{RuntimeError, RuntimeResult};
use crate::observer::EventKind;
use crate::process::ProcessReport;
use crate::snapshot::LocalSnapshot;
use causal_core::{ProcessId, VectorClock};
use serde::Serialize;
use std::fmt;

/// Local snapshots of one round, indexed by process.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalSnapshot {
    round: u64,
    locals: Vec<LocalSnapshot>,
}

/// A channel whose recorded log differs from what the histories imply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelMismatch {
    /// Sending side
    pub from: ProcessId,
    /// Receiving side
    pub to: ProcessId,
    /// Labels sent before the sender's cut and received after the receiver's
    pub expected: Vec<String>,
    /// Labels in the receiver's local snapshot
    pub recorded: Vec<String>,
}

impl fmt::Display for ChannelMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel {}->{}: expected [{}], recorded [{}]",
            self.from,
            self.to,
            self.expected.join(" "),
            self.recorded.join(" ")
        )
    }
}

impl GlobalSnapshot {
    /// Collect round `round` from the reports of a group of `processes`.
    pub fn assemble(
        processes: usize,
        round: u64,
        reports: &[ProcessReport],
    ) -> RuntimeResult<Self> {
        let mut locals = Vec::with_capacity(processes);
        for process in ProcessId::all(processes) {
            let local = reports
                .iter()
                .find(|report| report.process == process)
                .and_then(|report| report.snapshot(round))
                .ok_or(RuntimeError::IncompleteSnapshot {
                    round,
                    missing: process,
                })?;
            locals.push(local.clone());
        }
        Ok(Self { round, locals })
    }

    /// Round number.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Local snapshot of `process`.
    pub fn local(&self, process: ProcessId) -> Option<&LocalSnapshot> {
        self.locals.get(process.index())
    }

    /// Recorded clocks, by process.
    pub fn cut(&self) -> Vec<&VectorClock> {
        self.locals.iter().map(|l| &l.recorded_clock).collect()
    }

    /// No process reflects more of process i than i itself recorded.
    pub fn is_consistent(&self) -> bool {
        self.locals.iter().enumerate().all(|(i, owner)| {
            let own = owner.recorded_clock.as_slice().get(i).copied().unwrap_or(0);
            self.locals
                .iter()
                .all(|other| other.recorded_clock.as_slice().get(i).copied().unwrap_or(0) <= own)
        })
    }

    /// Compare every channel log with the send and receive histories.
    /// An empty result means every channel matches.
    pub fn verify_channels(&self, reports: &[ProcessReport]) -> Vec<ChannelMismatch> {
        let processes = self.locals.len();
        let mut mismatches = Vec::new();
        for receiver in &self.locals {
            for sender in receiver.process.peers(processes) {
                let expected = self.expected_in_transit(sender, receiver.process, reports);
                let recorded = receiver.channel(sender).to_vec();
                if expected != recorded {
                    mismatches.push(ChannelMismatch {
                        from: sender,
                        to: receiver.process,
                        expected,
                        recorded,
                    });
                }
            }
        }
        mismatches
    }

    fn recorded_own(&self, process: ProcessId) -> u64 {
        self.local(process)
            .map(|l| l.recorded_clock.get(process))
            .unwrap_or(0)
    }

    /// Messages on `from -> to` sent before `from`'s cut, minus the ones
    /// `to` applied before its own cut. Links are FIFO, so those are a
    /// prefix of the pre-cut sends.
    fn expected_in_transit(
        &self,
        from: ProcessId,
        to: ProcessId,
        reports: &[ProcessReport],
    ) -> Vec<String> {
        let sender_cut = self.recorded_own(from);
        let receiver_cut = self.recorded_own(to);

        let sent: Vec<String> = report_of(reports, from)
            .map(|report| {
                report
                    .events
                    .iter()
                    .filter(|e| matches!(&e.kind, EventKind::Sent { to: dest, .. } if *dest == to))
                    .filter(|e| e.sequence() <= sender_cut)
                    .map(|e| e.label.clone())
                    .collect()
            })
            .unwrap_or_default();

        let received = report_of(reports, to)
            .map(|report| {
                report
                    .events
                    .iter()
                    .filter(|e| {
                        matches!(&e.kind, EventKind::Received { from: src, .. } if *src == from)
                    })
                    .filter(|e| e.sequence() <= receiver_cut)
                    .count()
            })
            .unwrap_or(0);

        sent.into_iter().skip(received).collect()
    }
}

fn report_of(reports: &[ProcessReport], process: ProcessId) -> Option<&ProcessReport> {
    reports.iter().find(|report| report.process == process)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::EventRecord;
    use std::collections::BTreeMap;

    fn p(rank: u32) -> ProcessId {
        ProcessId::new(rank)
    }

    fn event(process: u32, label: &str, clock: [u64; 2], kind: EventKind) -> EventRecord {
        EventRecord {
            process: p(process),
            index: 0,
            label: label.into(),
            clock: VectorClock::from_counters(clock),
            kind,
        }
    }

    fn report(
        process: u32,
        events: Vec<EventRecord>,
        recorded: [u64; 2],
        channel: &[&str],
    ) -> ProcessReport {
        let peer = p(1 - process);
        let mut channels = BTreeMap::new();
        channels.insert(peer, channel.iter().map(|s| s.to_string()).collect());
        ProcessReport {
            process: p(process),
            completed: true,
            executed: events.len(),
            final_clock: events
                .last()
                .map(|e| e.clock.clone())
                .unwrap_or_else(|| VectorClock::zeroed(2)),
            events,
            snapshots: vec![LocalSnapshot {
                process: p(process),
                round: 1,
                recorded_clock: VectorClock::from_counters(recorded),
                channels,
            }],
        }
    }

    fn two_process_run(p1_recorded: [u64; 2], p1_channel: &[&str]) -> Vec<ProcessReport> {
        // P0 sends x before its cut; P1 applies it after recording.
        let p0 = report(
            0,
            vec![event(0, "x", [1, 0], EventKind::Sent { to: p(1), peer_label: "y".into() })],
            [1, 0],
            &[],
        );
        let p1 = report(
            1,
            vec![event(
                1,
                "y",
                [1, 1],
                EventKind::Received {
                    from: p(0),
                    message_label: "x".into(),
                    peer_label: "x".into(),
                },
            )],
            p1_recorded,
            p1_channel,
        );
        vec![p0, p1]
    }

    #[test]
    fn message_crossing_the_cut_is_expected_in_transit() {
        let reports = two_process_run([0, 0], &["x"]);
        let global = GlobalSnapshot::assemble(2, 1, &reports).unwrap();
        assert!(global.is_consistent());
        assert!(global.verify_channels(&reports).is_empty());
    }

    #[test]
    fn missing_log_entry_is_reported() {
        let reports = two_process_run([0, 0], &[]);
        let global = GlobalSnapshot::assemble(2, 1, &reports).unwrap();
        let mismatches = global.verify_channels(&reports);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].from, p(0));
        assert_eq!(mismatches[0].expected, ["x".to_string()]);
        assert!(mismatches[0].to_string().contains("P0->P1"));
    }

    #[test]
    fn receive_without_send_is_inconsistent() {
        let mut reports = two_process_run([1, 1], &[]);
        reports[0].snapshots[0].recorded_clock = VectorClock::from_counters([0, 0]);
        let global = GlobalSnapshot::assemble(2, 1, &reports).unwrap();
        assert!(!global.is_consistent());
    }

    #[test]
    fn absent_round_is_an_error() {
        let reports = two_process_run([0, 0], &[]);
        assert!(matches!(
            GlobalSnapshot::assemble(2, 2, &reports),
            Err(RuntimeError::IncompleteSnapshot { round: 2, .. })
        ));
    }
}
