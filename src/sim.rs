//! Top-level driver: wires roles to their channels and checks agreement.

use std::fmt;

use error_stack::{Report, ResultExt};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::acceptor::run_acceptor;
use crate::channel::lossy_channel;
use crate::config::Config;
use crate::proposer::Proposer;

/// Why a simulation run failed.
#[derive(Debug)]
pub enum SimError {
    /// Rejected before any task started.
    Config,
    /// Proposers emitted differing decided values: a consensus bug, not a
    /// transient fault.
    Disagreement,
    /// A proposer exited without deciding.
    Interrupted,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Config => f.write_str("invalid simulation configuration"),
            SimError::Disagreement => f.write_str("proposers disagreed on the decided value"),
            SimError::Interrupted => f.write_str("a proposer exited before deciding"),
        }
    }
}

impl std::error::Error for SimError {}

/// Run one Classic Paxos simulation to completion.
///
/// Spawns every acceptor, proposer, and channel worker, then waits for all
/// proposers to report a decided value. Returns the agreed value.
///
/// Teardown cascades on its own: each proposer exits after deciding, which
/// closes the channels it fed, which in turn winds down the workers and
/// acceptors.
///
/// # Errors
///
/// Fails if the configuration is invalid or if the decided values diverge.
pub async fn run(config: &Config) -> Result<String, Report<SimError>> {
    config.validate().change_context(SimError::Config)?;

    // Acceptors own the consumer side of their inbound channels; every
    // proposer gets a producer handle for each.
    let mut acceptor_handles = Vec::with_capacity(config.acceptors);
    for id in 0..config.acceptors {
        let (sender, receiver) = lossy_channel(config.channel_config(), config.worker_rng(id));
        tokio::spawn(run_acceptor(id, receiver));
        acceptor_handles.push(sender);
    }

    let (decided_tx, decided_rx) = mpsc::channel(config.proposers);

    for id in 0..config.proposers {
        let (reply_to, input) = lossy_channel(
            config.channel_config(),
            config.worker_rng(config.acceptors + id),
        );
        let proposer = Proposer {
            id,
            population: config.proposers,
            acceptors: acceptor_handles.clone(),
            input,
            reply_to,
            timeout: config.proposer_timeout,
            decided: decided_tx.clone(),
        };
        tokio::spawn(proposer.run());
    }

    // only the proposers hold handles from here on
    drop(decided_tx);
    drop(acceptor_handles);

    debug!(
        proposers = config.proposers,
        acceptors = config.acceptors,
        "simulation started"
    );

    let values: Vec<String> = ReceiverStream::new(decided_rx)
        .take(config.proposers)
        .collect()
        .await;

    if values.len() < config.proposers {
        return Err(Report::new(SimError::Interrupted).attach_printable(format!(
            "collected {} of {} decided values",
            values.len(),
            config.proposers
        )));
    }

    let agreed = &values[0];
    if values.iter().any(|value| value != agreed) {
        return Err(Report::new(SimError::Disagreement)
            .attach_printable(format!("decided values: {values:?}")));
    }

    info!(value = %agreed, proposers = config.proposers, "all proposers agreed");
    Ok(agreed.clone())
}
