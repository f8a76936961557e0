//! Runtime errors.
//!
//! Only fatal conditions are errors here. A full or empty queue, a snapshot
//! request while a round is active, and duplicate markers are handled by
//! waiting or ignoring and never reach the caller.

use causal_core::{CoreError, ProcessId};
use causal_transport::TransportError;

/// Fatal runtime failure.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The transport failed; the process stops
    #[error("Transport failure at {process}: {source}")]
    Transport {
        /// Process that observed the failure
        process: ProcessId,
        /// Underlying transport error
        #[source]
        source: TransportError,
    },

    /// A message that cannot belong to this group arrived
    #[error("Malformed message at {process}: {reason}")]
    MalformedMessage {
        /// Receiving process
        process: ProcessId,
        /// What was wrong with it
        reason: String,
    },

    /// Scenario or script rejected before start
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Configuration rejected before start
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Why it was rejected
        reason: String,
    },

    /// A unit task panicked or was aborted
    #[error("{unit} unit of {process} failed: {reason}")]
    TaskFailed {
        /// Owning process
        process: ProcessId,
        /// Which unit
        unit: &'static str,
        /// Join failure description
        reason: String,
    },

    /// A global snapshot is missing local state
    #[error("Snapshot round {round} has no local state from {missing}")]
    IncompleteSnapshot {
        /// Round number
        round: u64,
        /// First process without a completed local snapshot
        missing: ProcessId,
    },
}

impl RuntimeError {
    /// Wrap a transport error observed by `process`
    pub fn transport(process: ProcessId, source: TransportError) -> Self {
        Self::Transport { process, source }
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Create a malformed message error
    pub fn malformed(process: ProcessId, reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            process,
            reason: reason.into(),
        }
    }

    /// Describe a failed unit join
    pub fn task_failed(
        process: ProcessId,
        unit: &'static str,
        error: tokio::task::JoinError,
    ) -> Self {
        Self::TaskFailed {
            process,
            unit,
            reason: error.to_string(),
        }
    }
}

/// Result alias for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
