//! Protocol messages.

use std::fmt;

use crate::channel::LossySender;
use crate::epoch::Epoch;

/// Handle an acceptor uses to answer a request: the producer side of the
/// requesting proposer's inbound channel. Carrying it inside the request
/// keeps acceptors ignorant of the population topology.
pub type ReplyAddress = LossySender<Message>;

/// Messages exchanged between proposers and acceptors.
///
/// A closed sum, so role dispatch is exhaustive and a new phase cannot be
/// added without the compiler pointing at every match.
#[derive(Clone, Debug)]
pub enum Message {
    /// Phase 1 request: a proposer asks for a promise at `epoch`.
    Prepare {
        epoch: Epoch,
        proposer: usize,
        reply_to: ReplyAddress,
    },
    /// Phase 1 reply: the acceptor promises to honor nothing below `epoch`
    /// and reports the pair it had accepted at promise time, if any.
    Promise {
        epoch: Epoch,
        accepted: Option<(Epoch, String)>,
        acceptor: usize,
    },
    /// Phase 2 request: a proposer asks for `value` to be accepted at
    /// `epoch`.
    Propose {
        epoch: Epoch,
        value: String,
        proposer: usize,
        reply_to: ReplyAddress,
    },
    /// Phase 2 reply: the acceptor accepted the proposal at `epoch`.
    Accept { epoch: Epoch, acceptor: usize },
}

// Equality is by field value; reply handles compare by channel identity.
// Only tests care.
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Prepare {
                    epoch: a,
                    proposer: ap,
                    reply_to: ar,
                },
                Self::Prepare {
                    epoch: b,
                    proposer: bp,
                    reply_to: br,
                },
            ) => a == b && ap == bp && ar.same_channel(br),
            (
                Self::Promise {
                    epoch: a,
                    accepted: aa,
                    acceptor: ai,
                },
                Self::Promise {
                    epoch: b,
                    accepted: ba,
                    acceptor: bi,
                },
            ) => a == b && aa == ba && ai == bi,
            (
                Self::Propose {
                    epoch: a,
                    value: av,
                    proposer: ap,
                    reply_to: ar,
                },
                Self::Propose {
                    epoch: b,
                    value: bv,
                    proposer: bp,
                    reply_to: br,
                },
            ) => a == b && av == bv && ap == bp && ar.same_channel(br),
            (
                Self::Accept {
                    epoch: a,
                    acceptor: ai,
                },
                Self::Accept {
                    epoch: b,
                    acceptor: bi,
                },
            ) => a == b && ai == bi,
            _ => false,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prepare {
                epoch, proposer, ..
            } => write!(f, "prepare({epoch}) from proposer {proposer}"),
            Self::Promise {
                epoch,
                accepted: Some((accepted_epoch, accepted_value)),
                acceptor,
            } => write!(
                f,
                "promise({epoch}, {accepted_epoch}, {accepted_value}) from acceptor {acceptor}"
            ),
            Self::Promise {
                epoch,
                accepted: None,
                acceptor,
            } => write!(f, "promise({epoch}, nil, nil) from acceptor {acceptor}"),
            Self::Propose {
                epoch,
                value,
                proposer,
                ..
            } => write!(f, "propose({epoch}, {value}) from proposer {proposer}"),
            Self::Accept { epoch, acceptor } => {
                write!(f, "accept({epoch}) from acceptor {acceptor}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::channel::{LossyChannelConfig, lossy_channel};

    fn reply_address() -> (ReplyAddress, crate::channel::LossyReceiver<Message>) {
        let config = LossyChannelConfig {
            size: 1,
            timeout: Duration::from_millis(1),
            drop: 0.0,
        };
        lossy_channel(config, StdRng::seed_from_u64(0))
    }

    #[tokio::test]
    async fn displays_like_the_protocol_log() {
        let e = Epoch::initial(1, 2);
        let (reply_to, _rx) = reply_address();
        let prepare = Message::Prepare {
            epoch: e,
            proposer: 1,
            reply_to,
        };
        assert_eq!(prepare.to_string(), "prepare(1) from proposer 1");

        let bare = Message::Promise {
            epoch: e,
            accepted: None,
            acceptor: 0,
        };
        assert_eq!(bare.to_string(), "promise(1, nil, nil) from acceptor 0");

        let carrying = Message::Promise {
            epoch: e.next(),
            accepted: Some((e, "v1".to_owned())),
            acceptor: 2,
        };
        assert_eq!(carrying.to_string(), "promise(3, 1, v1) from acceptor 2");

        let accept = Message::Accept {
            epoch: e,
            acceptor: 2,
        };
        assert_eq!(accept.to_string(), "accept(1) from acceptor 2");
    }

    #[tokio::test]
    async fn equality_tracks_fields_and_reply_identity() {
        let e = Epoch::initial(0, 2);
        let (addr, _rx) = reply_address();
        let (other_addr, _other_rx) = reply_address();

        let a = Message::Prepare {
            epoch: e,
            proposer: 0,
            reply_to: addr.clone(),
        };
        let b = Message::Prepare {
            epoch: e,
            proposer: 0,
            reply_to: addr,
        };
        assert_eq!(a, b);

        let elsewhere = Message::Prepare {
            epoch: e,
            proposer: 0,
            reply_to: other_addr,
        };
        assert_ne!(a, elsewhere);

        let accept = Message::Accept {
            epoch: e,
            acceptor: 0,
        };
        assert_ne!(a, accept);
    }
}
