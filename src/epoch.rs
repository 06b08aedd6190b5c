//! Proposal epochs.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An epoch orders proposals in Classic Paxos.
///
/// The algorithm requires the epoch space to be infinite and totally
/// ordered, the epochs usable by different proposers to be disjoint, and
/// each proposer's successive epochs to be strictly increasing. Given `n`
/// proposers, proposer `p` (`0 <= p < n`) uses exactly the integers
/// congruent to `p` modulo `n`: `p`, `p + n`, `p + 2n`, ...
///
/// The integer is a `u64`; succession saturates at `u64::MAX` rather than
/// wrapping, which would break the total order. Saturation is unreachable
/// in practice (a proposer would need ~2^64/n retries), so only total order
/// and monotone per-proposer succession carry any weight.
///
/// "No epoch yet" is modeled as `Option<Epoch>`; `None` orders below every
/// real epoch, which is exactly the comparison the roles need.
#[derive(Clone, Copy, Debug)]
pub struct Epoch {
    value: u64,
    /// Proposer population size; the step between a proposer's epochs.
    stride: u64,
}

impl Epoch {
    /// The first epoch for `proposer` out of a population of `proposers`.
    #[must_use]
    pub fn initial(proposer: usize, proposers: usize) -> Self {
        Self {
            value: proposer as u64,
            stride: proposers as u64,
        }
    }

    /// The successor epoch: the next integer in this proposer's residue
    /// class. Always a fresh value; `self` is unaffected.
    #[must_use]
    pub fn next(self) -> Self {
        Self {
            value: self.value.saturating_add(self.stride),
            stride: self.stride,
        }
    }

    /// The integer value that orders this epoch.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.value
    }
}

// Epochs order and compare by integer value alone; the stride is bookkeeping
// for succession and never distinguishes two epochs in one run.

impl PartialEq for Epoch {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Epoch {}

impl Hash for Epoch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl PartialOrd for Epoch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Epoch {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
