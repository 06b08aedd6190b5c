//! Simulation configuration and validation.

use std::fmt;
use std::time::Duration;

use error_stack::Report;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::channel::LossyChannelConfig;

/// Configuration for one simulation run.
///
/// Defaults: ten proposers, five acceptors, 100ms proposer phases, 10ms
/// channel windows, buffer of two, 10% drops.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of proposer tasks.
    pub proposers: usize,
    /// Number of acceptor tasks.
    pub acceptors: usize,
    /// How long a proposer waits in each phase before abandoning an attempt.
    pub proposer_timeout: Duration,
    /// How long a lossy channel waits for its buffer to fill before
    /// emitting a message.
    pub channel_timeout: Duration,
    /// Lossy-channel reordering buffer target (also its queue capacity).
    pub buffer: usize,
    /// Probability of a lossy channel dropping a message, in `[0, 1)`.
    pub drop: f64,
    /// Base RNG seed for reproducible runs; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proposers: 10,
            acceptors: 5,
            proposer_timeout: Duration::from_millis(100),
            channel_timeout: Duration::from_millis(10),
            buffer: 2,
            drop: 0.1,
            seed: None,
        }
    }
}

/// A configuration field is out of range.
#[derive(Debug)]
pub struct ConfigError;

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid simulation configuration")
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Check every field before any task starts.
    ///
    /// # Errors
    ///
    /// Returns a report naming the offending field.
    pub fn validate(&self) -> Result<(), Report<ConfigError>> {
        if self.proposers == 0 {
            return Err(Report::new(ConfigError).attach_printable("proposers must be at least 1"));
        }
        if self.acceptors == 0 {
            return Err(Report::new(ConfigError).attach_printable("acceptors must be at least 1"));
        }
        if self.buffer == 0 {
            return Err(Report::new(ConfigError).attach_printable("buffer must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.drop) {
            return Err(Report::new(ConfigError).attach_printable(format!(
                "drop probability {} is outside [0, 1)",
                self.drop
            )));
        }
        Ok(())
    }

    pub(crate) fn channel_config(&self) -> LossyChannelConfig {
        LossyChannelConfig {
            size: self.buffer,
            timeout: self.channel_timeout,
            drop: self.drop,
        }
    }

    /// RNG for the `index`-th channel worker.
    ///
    /// Derived from the base seed by offset, so every worker gets an
    /// independent deterministic stream and a run replays exactly.
    pub(crate) fn worker_rng(&self, index: usize) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_os_rng(),
        }
    }
}
