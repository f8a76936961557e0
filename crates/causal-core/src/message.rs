//! Transport-level message envelopes.

use crate::clock::VectorClock;
use crate::identifiers::ProcessId;
use serde::{Deserialize, Serialize};

/// Payload of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Application message carrying a label and the sender's clock at send time
    Normal {
        /// Event label of the send
        label: String,
        /// Sender's clock after its send increment
        clock: VectorClock,
    },
    /// Snapshot marker; closes the sender's channel for the current round
    Marker,
}

/// Envelope exchanged between two processes.
///
/// Messages are immutable once built; the transport owns them in flight and
/// the receiving process owns them after delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    from: ProcessId,
    to: ProcessId,
    kind: MessageKind,
}

impl Message {
    /// Build an application message.
    pub fn normal(
        from: ProcessId,
        to: ProcessId,
        label: impl Into<String>,
        clock: VectorClock,
    ) -> Self {
        Self {
            from,
            to,
            kind: MessageKind::Normal {
                label: label.into(),
                clock,
            },
        }
    }

    /// Build a snapshot marker.
    pub fn marker(from: ProcessId, to: ProcessId) -> Self {
        Self {
            from,
            to,
            kind: MessageKind::Marker,
        }
    }

    /// Sending process.
    pub fn from(&self) -> ProcessId {
        self.from
    }

    /// Destination process.
    pub fn to(&self) -> ProcessId {
        self.to
    }

    /// Message payload.
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// True for snapshot markers.
    pub fn is_marker(&self) -> bool {
        matches!(self.kind, MessageKind::Marker)
    }

    /// Label of an application message.
    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::Normal { label, .. } => Some(label),
            MessageKind::Marker => None,
        }
    }

    /// Clock carried by an application message.
    pub fn clock(&self) -> Option<&VectorClock> {
        match &self.kind {
            MessageKind::Normal { clock, .. } => Some(clock),
            MessageKind::Marker => None,
        }
    }
}
