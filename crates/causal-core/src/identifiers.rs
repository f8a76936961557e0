//! Process identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rank of a process in a fixed-size group.
///
/// Ranks are dense: a group of `N` processes uses `0..N`, and rank `i` owns
/// component `i` of every vector clock.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Create a process id from a rank.
    pub const fn new(rank: u32) -> Self {
        Self(rank)
    }

    /// Clock component owned by this process.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Every rank of a group of `processes` members, in order.
    pub fn all(processes: usize) -> impl Iterator<Item = ProcessId> {
        (0..processes).map(|rank| ProcessId(rank as u32))
    }

    /// Every rank of the group except `self`.
    pub fn peers(self, processes: usize) -> impl Iterator<Item = ProcessId> {
        Self::all(processes).filter(move |p| *p != self)
    }
}

impl From<u32> for ProcessId {
    fn from(rank: u32) -> Self {
        Self(rank)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peers_skip_self() {
        let peers: Vec<_> = ProcessId(1).peers(3).collect();
        assert_eq!(peers, vec![ProcessId(0), ProcessId(2)]);
    }

    #[test]
    fn display_uses_rank() {
        assert_eq!(ProcessId(2).to_string(), "P2");
    }
}
