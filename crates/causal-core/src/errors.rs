//! Core error types.

use crate::identifiers::ProcessId;

/// Errors raised while building or validating core values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The scenario cannot be executed as written
    #[error("Invalid scenario: {reason}")]
    InvalidScenario {
        /// Why the scenario was rejected
        reason: String,
    },

    /// A process id outside the group was referenced
    #[error("Unknown process {process} in a group of {processes}")]
    UnknownProcess {
        /// The offending id
        process: ProcessId,
        /// Group size
        processes: usize,
    },

    /// Two clocks of different group sizes were combined
    #[error("Clock dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the local clock
        expected: usize,
        /// Dimension of the incoming clock
        actual: usize,
    },
}

impl CoreError {
    /// Create an invalid scenario error
    pub fn invalid_scenario(reason: impl Into<String>) -> Self {
        Self::InvalidScenario {
            reason: reason.into(),
        }
    }
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
