//! Vector Clock Property Tests
//!
//! Checks the two clock rules every process relies on:
//! 1. **Monotonicity**: an owner step advances its own component by exactly
//!    one and never lowers any other component
//! 2. **Merge correctness**: a receive takes the pointwise max of the local
//!    and incoming clocks before advancing the owner

use causal_core::{CausalOrder, ProcessId, VectorClock};
use proptest::prelude::*;

const PROCESSES: usize = 4;

#[derive(Debug, Clone)]
enum Step {
    Local,
    Receive(Vec<u64>),
}

fn arbitrary_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Local),
        prop::collection::vec(0u64..50, PROCESSES).prop_map(Step::Receive),
    ]
}

proptest! {
    #[test]
    fn prop_owner_steps_are_monotonic(
        owner in 0u32..PROCESSES as u32,
        steps in prop::collection::vec(arbitrary_step(), 1..40),
    ) {
        let owner = ProcessId::new(owner);
        let mut clock = VectorClock::zeroed(PROCESSES);

        for step in steps {
            let before = clock.clone();
            match &step {
                Step::Local => {
                    clock.increment(owner);
                }
                Step::Receive(counters) => {
                    clock.receive(owner, &VectorClock::from_counters(counters.clone()));
                }
            }

            prop_assert!(before.happens_before(&clock));
            for process in ProcessId::all(PROCESSES) {
                prop_assert!(clock.get(process) >= before.get(process));
            }
            if let Step::Local = step {
                prop_assert_eq!(clock.get(owner), before.get(owner) + 1);
            }
        }
    }

    #[test]
    fn prop_receive_is_max_then_increment(
        owner in 0u32..PROCESSES as u32,
        local in prop::collection::vec(0u64..50, PROCESSES),
        incoming in prop::collection::vec(0u64..50, PROCESSES),
    ) {
        let owner = ProcessId::new(owner);
        let before = VectorClock::from_counters(local);
        let incoming = VectorClock::from_counters(incoming);

        let mut after = before.clone();
        after.receive(owner, &incoming);

        for process in ProcessId::all(PROCESSES) {
            let merged = before.get(process).max(incoming.get(process));
            if process == owner {
                prop_assert_eq!(after.get(process), merged + 1);
            } else {
                prop_assert_eq!(after.get(process), merged);
            }
        }
        prop_assert!(incoming.happens_before(&after));
    }

    #[test]
    fn prop_order_is_antisymmetric(
        a in prop::collection::vec(0u64..5, PROCESSES),
        b in prop::collection::vec(0u64..5, PROCESSES),
    ) {
        let a = VectorClock::from_counters(a);
        let b = VectorClock::from_counters(b);
        let expected = match a.causal_order(&b) {
            CausalOrder::Before => CausalOrder::After,
            CausalOrder::After => CausalOrder::Before,
            other => other,
        };
        prop_assert_eq!(b.causal_order(&a), expected);
    }
}
