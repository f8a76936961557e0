//! Human-readable output on stdout.

use causal_runtime::{EventRecord, LocalSnapshot, Observer};

/// Prints one line per event and one block per completed snapshot, as they
/// happen. Log output goes to stderr through `tracing`, so the two streams
/// do not interleave.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver;

impl Observer for ConsoleObserver {
    fn on_event(&self, record: &EventRecord) {
        println!("{record}");
    }

    fn on_snapshot(&self, snapshot: &LocalSnapshot) {
        println!("{snapshot}");
    }
}
