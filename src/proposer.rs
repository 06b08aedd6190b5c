//! Proposer role task.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, instrument, trace};

use crate::channel::{LossyReceiver, LossySender};
use crate::core::{AttemptCore, PhaseProgress};
use crate::epoch::Epoch;
use crate::message::Message;

/// One proposer role, wired to its transport.
pub struct Proposer {
    /// This proposer's identifier, `0..population`.
    pub id: usize,
    /// Total number of proposers; fixes the epoch progression.
    pub population: usize,
    /// Producer handles for every acceptor's inbound channel.
    pub acceptors: Vec<LossySender<Message>>,
    /// Consumer side of this proposer's inbound channel.
    pub input: LossyReceiver<Message>,
    /// Producer side of this proposer's inbound channel, carried in
    /// requests so acceptors can answer.
    pub reply_to: LossySender<Message>,
    /// How long each phase waits before the attempt is abandoned.
    pub timeout: Duration,
    /// Where the decided value goes.
    pub decided: mpsc::Sender<String>,
}

/// How one attempt ended.
enum Attempt {
    Decided(String),
    TimedOut,
    Disconnected,
}

impl Proposer {
    /// Run attempts until one decides, emit the value, and return.
    ///
    /// Every attempt uses a strictly greater epoch than the last, from this
    /// proposer's own residue class, so no epoch is ever reused by this
    /// proposer or any other.
    #[instrument(skip_all, name = "proposer", fields(id = self.id))]
    pub async fn run(mut self) {
        let candidate = format!("v{}", self.id);
        let mut epoch: Option<Epoch> = None;

        loop {
            let current = match epoch {
                None => Epoch::initial(self.id, self.population),
                Some(previous) => previous.next(),
            };
            epoch = Some(current);

            match self.attempt(current, &candidate).await {
                Attempt::Decided(value) => {
                    debug!(epoch = %current, value, "decided");
                    if self.decided.send(value).await.is_err() {
                        trace!("results channel closed");
                    }
                    return;
                }
                Attempt::TimedOut => {
                    debug!(epoch = %current, "attempt timed out, retrying");
                }
                Attempt::Disconnected => {
                    debug!("input closed before deciding");
                    return;
                }
            }
        }
    }

    /// One pass through both phases at `epoch`.
    async fn attempt(&mut self, epoch: Epoch, candidate: &str) -> Attempt {
        let mut attempt = AttemptCore::new(epoch, self.acceptors.len());

        // Phase 1: broadcast prepare, then collect promises.
        for acceptor in &self.acceptors {
            let request = Message::Prepare {
                epoch,
                proposer: self.id,
                reply_to: self.reply_to.clone(),
            };
            if acceptor.send(request).await.is_err() {
                trace!("acceptor channel closed");
            }
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            let message = match time::timeout_at(deadline, self.input.recv()).await {
                Err(_) => {
                    trace!(%epoch, "promise quorum timed out");
                    return Attempt::TimedOut;
                }
                Ok(None) => return Attempt::Disconnected,
                Ok(Some(message)) => message,
            };
            trace!(%message, "received");

            match message {
                Message::Promise {
                    epoch: promised,
                    accepted,
                    acceptor,
                } => {
                    if attempt.record_promise(acceptor, promised, accepted)
                        == PhaseProgress::Quorum
                    {
                        break;
                    }
                }
                other => trace!(%other, "ignored while collecting promises"),
            }
        }

        // A reported accepted value takes precedence over our candidate:
        // it may already be chosen, and proposing it again is always safe.
        let value = attempt.proposal_value(candidate);
        debug!(%epoch, value, "promise quorum reached");

        // Phase 2: broadcast propose, then collect accepts.
        for acceptor in &self.acceptors {
            let request = Message::Propose {
                epoch,
                value: value.clone(),
                proposer: self.id,
                reply_to: self.reply_to.clone(),
            };
            if acceptor.send(request).await.is_err() {
                trace!("acceptor channel closed");
            }
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            let message = match time::timeout_at(deadline, self.input.recv()).await {
                Err(_) => {
                    trace!(%epoch, "accept quorum timed out");
                    return Attempt::TimedOut;
                }
                Ok(None) => return Attempt::Disconnected,
                Ok(Some(message)) => message,
            };
            trace!(%message, "received");

            match message {
                Message::Accept {
                    epoch: accepted,
                    acceptor,
                } => {
                    if attempt.record_accept(acceptor, accepted) == PhaseProgress::Quorum {
                        debug!(%epoch, "accept quorum reached");
                        return Attempt::Decided(value);
                    }
                }
                other => trace!(%other, "ignored while collecting accepts"),
            }
        }
    }
}
