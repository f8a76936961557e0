//! Event records and the sinks that receive them.
//!
//! Every executed instruction produces one [`EventRecord`] stamped with the
//! clock right after the event. Completed local snapshots are reported the
//! same way. Observers are called from the unit that produced the record,
//! so implementations must be cheap and must not block.

use crate::snapshot::LocalSnapshot;
use causal_core::{ProcessId, VectorClock};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;

/// What happened at a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// Local event, no communication
    Internal,
    /// A normal message was handed to the transport
    Sent {
        /// Destination process
        to: ProcessId,
        /// Label of the matching receive at the destination
        peer_label: String,
    },
    /// A normal message was applied to the local clock
    Received {
        /// Sending process
        from: ProcessId,
        /// Label carried by the message
        message_label: String,
        /// Label the script expected for the sender's event
        peer_label: String,
    },
}

/// One executed instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// Process that executed the instruction
    pub process: ProcessId,
    /// Position in the process's script
    pub index: usize,
    /// Event label
    pub label: String,
    /// Local clock right after the event
    pub clock: VectorClock,
    /// Event type and peer
    #[serde(flatten)]
    pub kind: EventKind,
}

impl EventRecord {
    /// Own clock component, i.e. the local sequence number of the event.
    pub fn sequence(&self) -> u64 {
        self.clock.get(self.process)
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{} {} ", self.process, self.label, self.clock)?;
        match &self.kind {
            EventKind::Internal => write!(f, "internal event"),
            EventKind::Sent { peer_label, .. } => write!(f, "sent to {peer_label}"),
            EventKind::Received { message_label, .. } => {
                write!(f, "received from {message_label}")
            }
        }
    }
}

/// Sink for event records and completed snapshots.
pub trait Observer: Send + Sync {
    /// An instruction finished
    fn on_event(&self, _record: &EventRecord) {}

    /// A local snapshot completed
    fn on_snapshot(&self, _snapshot: &LocalSnapshot) {}
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// Observer that forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, record: &EventRecord) {
        tracing::info!(
            process = %record.process,
            index = record.index,
            clock = %record.clock,
            "{record}"
        );
    }

    fn on_snapshot(&self, snapshot: &LocalSnapshot) {
        tracing::info!(
            process = %snapshot.process,
            round = snapshot.round,
            recorded = %snapshot.recorded_clock,
            "Local snapshot complete"
        );
    }
}

/// Observer that keeps everything in memory.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<EventRecord>>,
    snapshots: Mutex<Vec<LocalSnapshot>>,
}

impl Recorder {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records seen so far, in emission order.
    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().clone()
    }

    /// Snapshots seen so far, in completion order.
    pub fn snapshots(&self) -> Vec<LocalSnapshot> {
        self.snapshots.lock().clone()
    }

    /// Drain everything recorded.
    pub fn take(&self) -> (Vec<EventRecord>, Vec<LocalSnapshot>) {
        let events = std::mem::take(&mut *self.events.lock());
        let snapshots = std::mem::take(&mut *self.snapshots.lock());
        (events, snapshots)
    }
}

impl Observer for Recorder {
    fn on_event(&self, record: &EventRecord) {
        self.events.lock().push(record.clone());
    }

    fn on_snapshot(&self, snapshot: &LocalSnapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: EventKind, label: &str, clock: [u64; 3]) -> EventRecord {
        EventRecord {
            process: ProcessId::new(0),
            index: 0,
            label: label.to_string(),
            clock: VectorClock::from_counters(clock),
            kind,
        }
    }

    #[test]
    fn display_matches_trace_format() {
        let internal = record(EventKind::Internal, "a", [1, 0, 0]);
        assert_eq!(internal.to_string(), "P0|a (1, 0, 0) internal event");

        let sent = record(
            EventKind::Sent {
                to: ProcessId::new(1),
                peer_label: "i".into(),
            },
            "b",
            [2, 0, 0],
        );
        assert_eq!(sent.to_string(), "P0|b (2, 0, 0) sent to i");

        let received = record(
            EventKind::Received {
                from: ProcessId::new(1),
                message_label: "h".into(),
                peer_label: "h".into(),
            },
            "c",
            [3, 1, 0],
        );
        assert_eq!(received.to_string(), "P0|c (3, 1, 0) received from h");
        assert_eq!(received.sequence(), 3);
    }

    #[test]
    fn recorder_keeps_order() {
        let recorder = Recorder::new();
        recorder.on_event(&record(EventKind::Internal, "a", [1, 0, 0]));
        recorder.on_event(&record(EventKind::Internal, "b", [2, 0, 0]));
        let labels: Vec<_> = recorder.events().into_iter().map(|r| r.label).collect();
        assert_eq!(labels, ["a", "b"]);

        let (events, snapshots) = recorder.take();
        assert_eq!(events.len(), 2);
        assert!(snapshots.is_empty());
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn records_serialize_with_kind_tag() {
        let sent = record(
            EventKind::Sent {
                to: ProcessId::new(2),
                peer_label: "l".into(),
            },
            "b",
            [2, 0, 0],
        );
        let json = serde_json::to_value(&sent).unwrap();
        assert_eq!(json["kind"], "sent");
        assert_eq!(json["to"], 2);
        assert_eq!(json["clock"], serde_json::json!([2, 0, 0]));
    }
}
