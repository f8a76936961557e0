//! Chandy-Lamport bookkeeping for one process.
//!
//! [`SnapshotState`] is the synchronous half of the protocol: it decides
//! what a marker or a normal message means for the current round. The
//! process coordinator wraps it with the exclusion lock, the drain wait and
//! the marker broadcast.
//!
//! Per round:
//! - the local clock is recorded exactly once, by the first of local
//!   initiation or first marker arrival
//! - each incoming channel logs normal messages until its own marker
//!   arrives, then stays frozen
//! - the round completes when every peer's marker has arrived, and the
//!   state resets so a later round can start

use causal_core::{ProcessId, VectorClock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Result of trying to record local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new round started; markers must be sent to every peer
    Recorded,
    /// A round was already active; nothing changed
    AlreadyActive,
}

#[derive(Debug, Clone)]
struct Round {
    recorded_clock: VectorClock,
    marker_received: Vec<bool>,
    in_transit: BTreeMap<ProcessId, Vec<String>>,
}

/// Snapshot state machine of one process.
#[derive(Debug, Clone)]
pub struct SnapshotState {
    owner: ProcessId,
    processes: usize,
    completed_rounds: u64,
    round: Option<Round>,
}

impl SnapshotState {
    /// Inactive state for `owner` in a group of `processes`.
    pub fn new(owner: ProcessId, processes: usize) -> Self {
        Self {
            owner,
            processes,
            completed_rounds: 0,
            round: None,
        }
    }

    /// True while a round is in flight.
    pub fn is_active(&self) -> bool {
        self.round.is_some()
    }

    /// Number of rounds completed so far.
    pub fn completed_rounds(&self) -> u64 {
        self.completed_rounds
    }

    /// Clock recorded for the active round.
    pub fn recorded_clock(&self) -> Option<&VectorClock> {
        self.round.as_ref().map(|round| &round.recorded_clock)
    }

    /// True if `peer`'s marker arrived in the active round.
    pub fn has_marker_from(&self, peer: ProcessId) -> bool {
        self.round
            .as_ref()
            .and_then(|round| round.marker_received.get(peer.index()).copied())
            .unwrap_or(false)
    }

    /// Labels logged so far on the channel from `peer`.
    pub fn in_transit(&self, peer: ProcessId) -> &[String] {
        self.round
            .as_ref()
            .and_then(|round| round.in_transit.get(&peer))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn is_peer(&self, process: ProcessId) -> bool {
        process != self.owner && process.index() < self.processes
    }

    /// Record local state and open a round.
    ///
    /// `first_marker_from` is the peer whose marker triggered the recording;
    /// its channel starts closed and empty. `undelivered` lists messages
    /// that reached this process before the recording but were not yet
    /// applied by the application; they open the logs of their channels.
    pub fn record(
        &mut self,
        clock: VectorClock,
        first_marker_from: Option<ProcessId>,
        undelivered: impl IntoIterator<Item = (ProcessId, String)>,
    ) -> RecordOutcome {
        if self.round.is_some() {
            return RecordOutcome::AlreadyActive;
        }

        let mut marker_received = vec![false; self.processes];
        if let Some(flag) = marker_received.get_mut(self.owner.index()) {
            *flag = true;
        }
        if let Some(peer) = first_marker_from.filter(|p| self.is_peer(*p)) {
            marker_received[peer.index()] = true;
        }

        let mut in_transit: BTreeMap<ProcessId, Vec<String>> = self
            .owner
            .peers(self.processes)
            .map(|peer| (peer, Vec::new()))
            .collect();
        for (peer, label) in undelivered {
            if self.is_peer(peer) && !marker_received[peer.index()] {
                in_transit.entry(peer).or_default().push(label);
            }
        }

        self.round = Some(Round {
            recorded_clock: clock,
            marker_received,
            in_transit,
        });
        RecordOutcome::Recorded
    }

    /// A marker from `peer` arrived while a round is active.
    ///
    /// Closes the channel; repeated or foreign markers are ignored. Returns
    /// false when no round is active.
    pub fn close_channel(&mut self, peer: ProcessId) -> bool {
        let is_peer = self.is_peer(peer);
        match self.round.as_mut() {
            Some(round) => {
                if is_peer {
                    round.marker_received[peer.index()] = true;
                }
                true
            }
            None => false,
        }
    }

    /// A normal message from `peer` arrived. Returns true if it was logged
    /// as in transit.
    pub fn log_in_transit(&mut self, peer: ProcessId, label: &str) -> bool {
        if !self.is_peer(peer) {
            return false;
        }
        match self.round.as_mut() {
            Some(round) if !round.marker_received[peer.index()] => {
                round
                    .in_transit
                    .entry(peer)
                    .or_default()
                    .push(label.to_string());
                true
            }
            _ => false,
        }
    }

    /// If every peer's marker has arrived, close the round and return its
    /// local snapshot. The state is inactive afterwards.
    pub fn take_completed(&mut self) -> Option<LocalSnapshot> {
        let complete = self
            .round
            .as_ref()
            .map(|round| round.marker_received.iter().all(|received| *received))
            .unwrap_or(false);
        if !complete {
            return None;
        }

        let round = self.round.take()?;
        self.completed_rounds += 1;
        Some(LocalSnapshot {
            process: self.owner,
            round: self.completed_rounds,
            recorded_clock: round.recorded_clock,
            channels: round.in_transit,
        })
    }
}

/// Completed local part of a global snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalSnapshot {
    /// Owning process
    pub process: ProcessId,
    /// Round number at this process, starting at 1
    pub round: u64,
    /// Clock recorded when the round started here
    pub recorded_clock: VectorClock,
    /// In-transit labels per incoming channel, keyed by sender
    pub channels: BTreeMap<ProcessId, Vec<String>>,
}

impl LocalSnapshot {
    /// In-transit labels on the channel from `peer`.
    pub fn channel(&self, peer: ProcessId) -> &[String] {
        self.channels.get(&peer).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Display for LocalSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== SNAPSHOT at {} (round {}) ===", self.process, self.round)?;
        writeln!(f, "Local: {}", self.recorded_clock)?;
        for (peer, labels) in &self.channels {
            if labels.is_empty() {
                writeln!(f, "Channel {peer}->{}: <empty>", self.process)?;
            } else {
                writeln!(f, "Channel {peer}->{}: {}", self.process, labels.join(" "))?;
            }
        }
        write!(f, "======================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(rank: u32) -> ProcessId {
        ProcessId::new(rank)
    }

    fn clock(counters: [u64; 3]) -> VectorClock {
        VectorClock::from_counters(counters)
    }

    #[test]
    fn local_initiation_waits_for_every_marker() {
        let mut state = SnapshotState::new(p(0), 3);
        assert_eq!(
            state.record(clock([1, 0, 0]), None, []),
            RecordOutcome::Recorded
        );
        assert!(state.is_active());

        assert!(state.close_channel(p(1)));
        assert!(state.take_completed().is_none());
        assert!(state.close_channel(p(2)));

        let snapshot = state.take_completed().unwrap();
        assert_eq!(snapshot.recorded_clock, clock([1, 0, 0]));
        assert_eq!(snapshot.round, 1);
        assert!(!state.is_active());
        assert_eq!(state.completed_rounds(), 1);
    }

    #[test]
    fn first_marker_closes_its_own_channel() {
        let mut state = SnapshotState::new(p(1), 3);
        state.record(clock([0, 1, 0]), Some(p(0)), []);
        assert!(state.has_marker_from(p(0)));
        assert!(!state.log_in_transit(p(0), "b"));
        assert!(state.log_in_transit(p(2), "l"));
        assert_eq!(state.in_transit(p(2)), ["l".to_string()]);
    }

    #[test]
    fn second_record_is_absorbed() {
        let mut state = SnapshotState::new(p(0), 3);
        state.record(clock([1, 0, 0]), None, []);
        assert_eq!(
            state.record(clock([2, 0, 0]), None, []),
            RecordOutcome::AlreadyActive
        );
        assert_eq!(state.recorded_clock(), Some(&clock([1, 0, 0])));
    }

    #[test]
    fn channel_freezes_after_marker() {
        let mut state = SnapshotState::new(p(0), 3);
        state.record(clock([1, 0, 0]), None, []);
        assert!(state.log_in_transit(p(1), "h"));
        state.close_channel(p(1));
        assert!(!state.log_in_transit(p(1), "late"));
        assert_eq!(state.in_transit(p(1)), ["h".to_string()]);
    }

    #[test]
    fn undelivered_messages_open_channel_logs() {
        let mut state = SnapshotState::new(p(0), 3);
        state.record(
            clock([1, 0, 0]),
            None,
            [(p(1), "h".to_string()), (p(2), "l".to_string())],
        );
        assert!(state.log_in_transit(p(1), "h2"));
        assert_eq!(state.in_transit(p(1)), ["h".to_string(), "h2".to_string()]);
        assert_eq!(state.in_transit(p(2)), ["l".to_string()]);
    }

    #[test]
    fn duplicate_and_foreign_markers_are_tolerated() {
        let mut state = SnapshotState::new(p(0), 3);
        state.record(clock([1, 0, 0]), None, []);
        state.close_channel(p(1));
        state.close_channel(p(1));
        state.close_channel(p(0));
        state.close_channel(p(9));
        assert!(state.take_completed().is_none());
        state.close_channel(p(2));
        assert!(state.take_completed().is_some());
    }

    #[test]
    fn inactive_state_ignores_traffic() {
        let mut state = SnapshotState::new(p(0), 3);
        assert!(!state.close_channel(p(1)));
        assert!(!state.log_in_transit(p(1), "h"));
        assert!(state.take_completed().is_none());
    }

    #[test]
    fn single_process_round_completes_immediately() {
        let mut state = SnapshotState::new(p(0), 1);
        state.record(VectorClock::from_counters([4]), None, []);
        let snapshot = state.take_completed().unwrap();
        assert!(snapshot.channels.is_empty());
    }

    #[test]
    fn rounds_are_numbered() {
        let mut state = SnapshotState::new(p(0), 2);
        for expected in 1..=3 {
            state.record(VectorClock::from_counters([expected, 0]), None, []);
            state.close_channel(p(1));
            assert_eq!(state.take_completed().map(|s| s.round), Some(expected));
        }
    }

    #[test]
    fn display_lists_every_channel() {
        let mut state = SnapshotState::new(p(0), 3);
        state.record(clock([1, 0, 0]), None, [(p(1), "h".to_string())]);
        state.close_channel(p(1));
        state.close_channel(p(2));
        let rendered = state.take_completed().unwrap().to_string();
        assert!(rendered.contains("Local: (1, 0, 0)"));
        assert!(rendered.contains("Channel P1->P0: h"));
        assert!(rendered.contains("Channel P2->P0: <empty>"));
    }
}
