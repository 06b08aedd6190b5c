//! Acceptor role task.

use futures::StreamExt;
use tracing::{debug, instrument, trace};

use crate::channel::LossyReceiver;
use crate::core::{AcceptorCore, PrepareOutcome, ProposeOutcome};
use crate::message::Message;

/// Drive one acceptor over its inbound channel until the channel closes.
///
/// Purely reactive: replies go to the address carried in each request, and
/// requests below the current promise are ignored outright. The task never
/// initiates and has no timeout.
#[instrument(skip(input), name = "acceptor")]
pub async fn run_acceptor(id: usize, mut input: LossyReceiver<Message>) {
    let mut core = AcceptorCore::new();

    while let Some(message) = input.next().await {
        trace!(%message, "received");

        match message {
            Message::Prepare {
                epoch,
                proposer,
                reply_to,
            } => match core.prepare(epoch) {
                PrepareOutcome::Promised { accepted } => {
                    debug!(%epoch, proposer, "promised");
                    let reply = Message::Promise {
                        epoch,
                        accepted,
                        acceptor: id,
                    };
                    if reply_to.send(reply).await.is_err() {
                        trace!(proposer, "reply channel closed");
                    }
                }
                PrepareOutcome::Ignored => trace!(%epoch, proposer, "prepare below promise"),
            },
            Message::Propose {
                epoch,
                value,
                proposer,
                reply_to,
            } => match core.propose(epoch, value) {
                ProposeOutcome::Accepted => {
                    debug!(%epoch, proposer, "accepted");
                    let reply = Message::Accept {
                        epoch,
                        acceptor: id,
                    };
                    if reply_to.send(reply).await.is_err() {
                        trace!(proposer, "reply channel closed");
                    }
                }
                ProposeOutcome::Ignored => trace!(%epoch, proposer, "propose below promise"),
            },
            // replies never arrive on an acceptor's channel; the population
            // is closed, so just drop them
            other @ (Message::Promise { .. } | Message::Accept { .. }) => {
                trace!(%other, "ignoring unexpected message");
            }
        }
    }

    debug!("input closed");
}
