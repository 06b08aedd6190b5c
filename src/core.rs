//! Pure role state machines, with no I/O and no clocks.
//!
//! The async role tasks in [`crate::acceptor`] and [`crate::proposer`] are
//! thin drivers around these types, so the promise/accept rules and the
//! quorum accounting can be exercised directly in unit tests.

use std::collections::BTreeSet;

use crate::epoch::Epoch;

// =============================================================================
// ACCEPTOR
// =============================================================================

/// State a Classic Paxos acceptor maintains for the single decree.
///
/// Invariants: `promised` is monotone non-decreasing, and the accepted
/// epoch never exceeds the promised epoch. The accepted epoch and value are
/// one pair, so they are present or absent together.
#[derive(Clone, Debug, Default)]
pub struct AcceptorCore {
    promised: Option<Epoch>,
    accepted: Option<(Epoch, String)>,
}

/// Outcome of a phase-1 prepare.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// Promise granted; reply with the pair accepted at promise time.
    Promised { accepted: Option<(Epoch, String)> },
    /// Below the current promise; no reply is sent.
    Ignored,
}

/// Outcome of a phase-2 propose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposeOutcome {
    /// Proposal accepted; reply with an accept at this epoch.
    Accepted,
    /// Below the current promise; no reply is sent.
    Ignored,
}

impl AcceptorCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a prepare at `epoch`.
    ///
    /// Honored when nothing has been promised yet or `epoch` is at least the
    /// current promise. The `>=` makes a re-prepare at the promised epoch
    /// idempotent: it yields the same reply again.
    pub fn prepare(&mut self, epoch: Epoch) -> PrepareOutcome {
        if self.promised.is_some_and(|promised| epoch < promised) {
            return PrepareOutcome::Ignored;
        }
        self.promised = Some(epoch);
        PrepareOutcome::Promised {
            accepted: self.accepted.clone(),
        }
    }

    /// Handle a propose of `value` at `epoch`.
    ///
    /// Accepting also raises the promise to `epoch`, keeping the accepted
    /// epoch within the promised bound.
    pub fn propose(&mut self, epoch: Epoch, value: String) -> ProposeOutcome {
        if self.promised.is_some_and(|promised| epoch < promised) {
            return ProposeOutcome::Ignored;
        }
        self.promised = Some(epoch);
        self.accepted = Some((epoch, value));
        ProposeOutcome::Accepted
    }

    /// Highest epoch promised so far.
    #[must_use]
    pub fn promised(&self) -> Option<Epoch> {
        self.promised
    }

    /// Most recently accepted (epoch, value) pair.
    #[must_use]
    pub fn accepted(&self) -> Option<&(Epoch, String)> {
        self.accepted.as_ref()
    }
}

// =============================================================================
// PROPOSER ATTEMPT
// =============================================================================

/// Whether a phase has collected its quorum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseProgress {
    Pending,
    Quorum,
}

/// Quorum accounting for one proposer attempt.
///
/// Tracks which acceptors promised and which accepted, as sets keyed by
/// acceptor id so duplicate replies from a reordering transport never
/// inflate the counts, plus the highest accepted pair reported in phase 1.
#[derive(Clone, Debug)]
pub struct AttemptCore {
    epoch: Epoch,
    quorum: usize,
    promised: BTreeSet<usize>,
    accepted: BTreeSet<usize>,
    max_seen: Option<(Epoch, String)>,
}

impl AttemptCore {
    /// A fresh attempt at `epoch` against `acceptors` acceptors.
    #[must_use]
    pub fn new(epoch: Epoch, acceptors: usize) -> Self {
        Self {
            epoch,
            quorum: acceptors / 2 + 1,
            promised: BTreeSet::new(),
            accepted: BTreeSet::new(),
            max_seen: None,
        }
    }

    /// The epoch this attempt runs at.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Majority threshold for both phases.
    #[must_use]
    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// Record a phase-1 promise.
    ///
    /// Only promises for this attempt's epoch count: anything else is a
    /// stale reply to an earlier attempt and must not inflate the quorum.
    /// The highest accepted pair across counted promises is retained for
    /// value selection.
    pub fn record_promise(
        &mut self,
        acceptor: usize,
        epoch: Epoch,
        accepted: Option<(Epoch, String)>,
    ) -> PhaseProgress {
        if epoch == self.epoch {
            self.promised.insert(acceptor);
            if let Some((accepted_epoch, value)) = accepted
                && self
                    .max_seen
                    .as_ref()
                    .is_none_or(|(max, _)| accepted_epoch > *max)
            {
                self.max_seen = Some((accepted_epoch, value));
            }
        }
        Self::progress(self.promised.len(), self.quorum)
    }

    /// Record a phase-2 accept. Accepts for other epochs are ignored.
    pub fn record_accept(&mut self, acceptor: usize, epoch: Epoch) -> PhaseProgress {
        if epoch == self.epoch {
            self.accepted.insert(acceptor);
        }
        Self::progress(self.accepted.len(), self.quorum)
    }

    /// The value to propose in phase 2: the value of the highest accepted
    /// pair reported in phase 1, or else the proposer's own candidate.
    #[must_use]
    pub fn proposal_value(&self, candidate: &str) -> String {
        match &self.max_seen {
            Some((_, value)) => value.clone(),
            None => candidate.to_owned(),
        }
    }

    fn progress(count: usize, quorum: usize) -> PhaseProgress {
        if count >= quorum {
            PhaseProgress::Quorum
        } else {
            PhaseProgress::Pending
        }
    }
}
