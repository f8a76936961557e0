//! Transport errors.
//!
//! Every variant is fatal for the process that observes it: the transport is
//! assumed reliable, so nothing here is retried by the runtime.

use causal_core::ProcessId;

/// Transport failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No link exists towards the peer
    #[error("Peer unreachable: {peer}")]
    PeerUnreachable {
        /// Destination that has no link
        peer: ProcessId,
    },

    /// The link to the peer was closed
    #[error("Link to {peer} disconnected")]
    Disconnected {
        /// Peer on the other end of the closed link
        peer: ProcessId,
    },

    /// A message was handed to the wrong endpoint
    #[error("Message from {actual} handed to the transport of {expected}")]
    Misaddressed {
        /// Owner of the transport
        expected: ProcessId,
        /// Sender named by the message
        actual: ProcessId,
    },

    /// Frame encoding or decoding failed
    #[error("Codec error: {reason}")]
    Codec {
        /// What went wrong
        reason: String,
    },

    /// Mesh setup failed
    #[error("Handshake failed: {reason}")]
    Handshake {
        /// What went wrong
        reason: String,
    },

    /// Socket I/O failed
    #[error("I/O error during {operation}: {source}")]
    Io {
        /// Operation that failed
        operation: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// Wrap an I/O error with the operation that produced it
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a codec error
    pub fn codec(reason: impl Into<String>) -> Self {
        Self::Codec {
            reason: reason.into(),
        }
    }

    /// Create a handshake error
    pub fn handshake(reason: impl Into<String>) -> Self {
        Self::Handshake {
            reason: reason.into(),
        }
    }
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
