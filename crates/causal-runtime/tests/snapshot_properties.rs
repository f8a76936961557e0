//! Snapshot State Machine Property Tests
//!
//! Random interleavings of markers and application messages against one
//! process's Chandy-Lamport state:
//! 1. **Single flight**: a second recording in the same round changes nothing
//! 2. **Channel freeze**: nothing is logged for a peer after its marker
//! 3. **Completion**: a round completes exactly when every peer's marker has
//!    arrived, and the state is inactive afterwards

use causal_core::{ProcessId, VectorClock};
use causal_runtime::{RecordOutcome, SnapshotState};
use proptest::prelude::*;
use std::collections::BTreeSet;

const PROCESSES: usize = 4;
const OWNER: ProcessId = ProcessId::new(0);

#[derive(Debug, Clone)]
enum Arrival {
    Marker(u32),
    Normal(u32, String),
    Initiate,
}

fn arbitrary_arrival() -> impl Strategy<Value = Arrival> {
    prop_oneof![
        (1u32..PROCESSES as u32).prop_map(Arrival::Marker),
        (1u32..PROCESSES as u32, "[a-z]{1,3}").prop_map(|(p, l)| Arrival::Normal(p, l)),
        Just(Arrival::Initiate),
    ]
}

proptest! {
    #[test]
    fn prop_round_rules_hold(
        first in 1u32..PROCESSES as u32,
        arrivals in prop::collection::vec(arbitrary_arrival(), 0..40),
    ) {
        let mut state = SnapshotState::new(OWNER, PROCESSES);
        let recorded = VectorClock::from_counters([3, 1, 0, 2]);
        prop_assert_eq!(
            state.record(recorded.clone(), Some(ProcessId::new(first)), []),
            RecordOutcome::Recorded
        );

        let mut closed: BTreeSet<u32> = BTreeSet::from([first]);
        let mut logged: Vec<Vec<String>> = vec![Vec::new(); PROCESSES];
        let mut completed = None;

        for arrival in arrivals {
            if completed.is_some() {
                break;
            }
            match arrival {
                Arrival::Initiate => {
                    prop_assert_eq!(
                        state.record(VectorClock::zeroed(PROCESSES), None, []),
                        RecordOutcome::AlreadyActive
                    );
                    prop_assert_eq!(state.recorded_clock(), Some(&recorded));
                }
                Arrival::Marker(peer) => {
                    prop_assert!(state.close_channel(ProcessId::new(peer)));
                    closed.insert(peer);
                    completed = state.take_completed();
                    prop_assert_eq!(completed.is_some(), closed.len() == PROCESSES - 1);
                }
                Arrival::Normal(peer, label) => {
                    let was_logged = state.log_in_transit(ProcessId::new(peer), &label);
                    prop_assert_eq!(was_logged, !closed.contains(&peer));
                    if was_logged {
                        logged[peer as usize].push(label);
                    }
                }
            }
        }

        match completed {
            Some(snapshot) => {
                prop_assert!(!state.is_active());
                prop_assert_eq!(&snapshot.recorded_clock, &recorded);
                prop_assert_eq!(snapshot.round, 1);
                for peer in OWNER.peers(PROCESSES) {
                    prop_assert_eq!(snapshot.channel(peer), logged[peer.index()].as_slice());
                }
            }
            None => {
                prop_assert!(state.is_active());
                prop_assert!(closed.len() < PROCESSES - 1);
            }
        }
    }
}
