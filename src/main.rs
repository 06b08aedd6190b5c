//! CLI entry point for the Classic Paxos simulator.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use classic_paxos::{Config, sim};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "classic-paxos")]
#[command(about = "Run a Classic Paxos agreement simulation over lossy channels")]
struct Args {
    /// Number of proposers.
    #[arg(long, default_value_t = 10)]
    proposers: usize,

    /// Number of acceptors.
    #[arg(long, default_value_t = 5)]
    acceptors: usize,

    /// Milliseconds a proposer waits for promise and accept messages.
    #[arg(long = "proposer-timeout-ms", default_value_t = 100)]
    proposer_timeout_ms: u64,

    /// Milliseconds a lossy channel waits for its buffer to fill before
    /// returning a message.
    #[arg(long = "channel-timeout-ms", default_value_t = 10)]
    channel_timeout_ms: u64,

    /// Number of messages a lossy channel buffers before returning one
    /// selected randomly.
    #[arg(long = "buffer-size", default_value_t = 2)]
    buffer_size: usize,

    /// Probability of a lossy channel dropping a message, in [0, 1).
    #[arg(long = "drop-probability", default_value_t = 0.1)]
    drop_probability: f64,

    /// Base RNG seed for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config {
        proposers: args.proposers,
        acceptors: args.acceptors,
        proposer_timeout: Duration::from_millis(args.proposer_timeout_ms),
        channel_timeout: Duration::from_millis(args.channel_timeout_ms),
        buffer: args.buffer_size,
        drop: args.drop_probability,
        seed: args.seed,
    };

    match sim::run(&config).await {
        Ok(value) => {
            info!(%value, "agreement reached");
            println!("{} proposers agreed on value {value}", config.proposers);
            ExitCode::SUCCESS
        }
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::FAILURE
        }
    }
}
