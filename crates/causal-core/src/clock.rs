//! Vector clocks for causal ordering between processes.
//!
//! A group of `N` processes shares one clock shape: `N` counters, where
//! counter `i` is advanced only by process `i`. Clocks never move backwards;
//! the only mutations are the owner's increment and the pointwise max taken
//! when a message is received.
//!
//! ```rust
//! use causal_core::{CausalOrder, ProcessId, VectorClock};
//!
//! let p0 = ProcessId::new(0);
//! let p1 = ProcessId::new(1);
//!
//! let mut sender = VectorClock::zeroed(2);
//! sender.increment(p0);
//!
//! let mut receiver = VectorClock::zeroed(2);
//! receiver.increment(p1);
//! assert_eq!(sender.causal_order(&receiver), CausalOrder::Concurrent);
//!
//! receiver.receive(p1, &sender);
//! assert!(sender.happens_before(&receiver));
//! assert_eq!(receiver.to_string(), "(1, 2)");
//! ```

use crate::errors::{CoreError, CoreResult};
use crate::identifiers::ProcessId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Causal timestamp of a group of processes.
///
/// The partial order is:
/// - `a ≤ b` iff `∀ i: a[i] ≤ b[i]`
/// - `a < b` (happens-before) iff `a ≤ b` and `a ≠ b`
/// - `a ∥ b` (concurrent) iff neither `a ≤ b` nor `b ≤ a`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock {
    counters: Vec<u64>,
}

impl VectorClock {
    /// All-zero clock for a group of `processes` members.
    pub fn zeroed(processes: usize) -> Self {
        Self {
            counters: vec![0; processes],
        }
    }

    /// Build a clock from explicit counters.
    pub fn from_counters(counters: impl Into<Vec<u64>>) -> Self {
        Self {
            counters: counters.into(),
        }
    }

    /// Number of processes this clock covers.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// True for a clock over an empty group.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Counter owned by `process` (0 when out of range).
    pub fn get(&self, process: ProcessId) -> u64 {
        self.counters.get(process.index()).copied().unwrap_or(0)
    }

    /// Raw counters in rank order.
    pub fn as_slice(&self) -> &[u64] {
        &self.counters
    }

    /// Advance the owner's component and return its new value.
    ///
    /// Owners outside the clock's group are ignored and report 0; ranks are
    /// validated when the process is bootstrapped.
    pub fn increment(&mut self, owner: ProcessId) -> u64 {
        match self.counters.get_mut(owner.index()) {
            Some(counter) => {
                *counter = counter.saturating_add(1);
                *counter
            }
            None => 0,
        }
    }

    /// Pointwise max with `other`, in place.
    pub fn merge_max(&mut self, other: &VectorClock) {
        for (mine, theirs) in self.counters.iter_mut().zip(&other.counters) {
            if *theirs > *mine {
                *mine = *theirs;
            }
        }
    }

    /// Receive rule: merge the incoming clock, then advance the owner.
    pub fn receive(&mut self, owner: ProcessId, incoming: &VectorClock) {
        self.merge_max(incoming);
        self.increment(owner);
    }

    /// Reject clocks that were built for a different group size.
    pub fn ensure_dimension(&self, expected: usize) -> CoreResult<()> {
        if self.len() == expected {
            Ok(())
        } else {
            Err(CoreError::DimensionMismatch {
                expected,
                actual: self.len(),
            })
        }
    }

    /// Compare two clocks under the causal partial order.
    pub fn causal_order(&self, other: &VectorClock) -> CausalOrder {
        let width = self.len().max(other.len());
        let mut self_leq_other = true;
        let mut other_leq_self = true;

        for i in 0..width {
            let a = self.counters.get(i).copied().unwrap_or(0);
            let b = other.counters.get(i).copied().unwrap_or(0);
            if a > b {
                self_leq_other = false;
            }
            if b > a {
                other_leq_self = false;
            }
            if !self_leq_other && !other_leq_self {
                return CausalOrder::Concurrent;
            }
        }

        match (self_leq_other, other_leq_self) {
            (true, true) => CausalOrder::Equal,
            (true, false) => CausalOrder::Before,
            (false, true) => CausalOrder::After,
            (false, false) => CausalOrder::Concurrent,
        }
    }

    /// True if `self` happened strictly before `other`.
    pub fn happens_before(&self, other: &VectorClock) -> bool {
        self.causal_order(other) == CausalOrder::Before
    }

    /// True if `self` is `other` or happened before it.
    pub fn precedes_or_equals(&self, other: &VectorClock) -> bool {
        matches!(
            self.causal_order(other),
            CausalOrder::Before | CausalOrder::Equal
        )
    }

    /// True if neither clock happened before the other.
    pub fn is_concurrent_with(&self, other: &VectorClock) -> bool {
        self.causal_order(other) == CausalOrder::Concurrent
    }
}

/// `None` when the clocks are concurrent.
impl PartialOrd for VectorClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.causal_order(other) {
            CausalOrder::Before => Some(Ordering::Less),
            CausalOrder::After => Some(Ordering::Greater),
            CausalOrder::Equal => Some(Ordering::Equal),
            CausalOrder::Concurrent => None,
        }
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.counters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

/// Result of comparing two vector clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalOrder {
    /// `self` happened strictly before `other`.
    Before,
    /// `self` happened strictly after `other`.
    After,
    /// Both clocks are identical.
    Equal,
    /// Neither clock happened before the other.
    Concurrent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(rank: u32) -> ProcessId {
        ProcessId::new(rank)
    }

    #[test]
    fn zeroed_clocks_are_equal() {
        let a = VectorClock::zeroed(3);
        let b = VectorClock::zeroed(3);
        assert_eq!(a.causal_order(&b), CausalOrder::Equal);
        assert_eq!(a.partial_cmp(&b), Some(Ordering::Equal));
    }

    #[test]
    fn increment_touches_only_owner() {
        let mut clock = VectorClock::zeroed(3);
        assert_eq!(clock.increment(p(1)), 1);
        assert_eq!(clock.increment(p(1)), 2);
        assert_eq!(clock.as_slice(), &[0, 2, 0]);
    }

    #[test]
    fn increment_out_of_range_is_ignored() {
        let mut clock = VectorClock::zeroed(2);
        assert_eq!(clock.increment(p(5)), 0);
        assert_eq!(clock, VectorClock::zeroed(2));
    }

    #[test]
    fn receive_merges_before_incrementing() {
        let mut local = VectorClock::from_counters([2, 0, 0]);
        let incoming = VectorClock::from_counters([0, 1, 0]);
        local.receive(p(0), &incoming);
        assert_eq!(local.as_slice(), &[3, 1, 0]);
    }

    #[test]
    fn concurrent_detection() {
        let a = VectorClock::from_counters([1, 0]);
        let b = VectorClock::from_counters([0, 1]);
        assert!(a.is_concurrent_with(&b));
        assert_eq!(a.partial_cmp(&b), None);
    }

    #[test]
    fn display_matches_tuple_format() {
        let clock = VectorClock::from_counters([5, 1, 2]);
        assert_eq!(clock.to_string(), "(5, 1, 2)");
    }

    #[test]
    fn dimension_check() {
        let clock = VectorClock::zeroed(3);
        assert!(clock.ensure_dimension(3).is_ok());
        assert_eq!(
            clock.ensure_dimension(4),
            Err(CoreError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        );
    }
}
