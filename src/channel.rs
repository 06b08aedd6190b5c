//! Lossy, reordering point-to-point transport.
//!
//! A [`lossy_channel`] sits in front of every role: messages sent into it
//! may be dropped, and survivors may be emitted out of order within a
//! bounded window. A dedicated worker task buffers up to `size` messages
//! for at most `timeout`, then uniformly permutes the buffer and emits its
//! head; each message faces exactly one independent drop trial when it
//! first arrives. When traffic is sparse the timeout path hands the next
//! surviving message straight through, so the consumer never starves while
//! a producer is live and `drop < 1`.
//!
//! Closing is owner-driven: dropping every [`LossySender`] closes the input,
//! after which the worker drains whatever survived and the receiver yields
//! end-of-stream.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

/// Tuning for one lossy channel.
#[derive(Debug, Clone)]
pub struct LossyChannelConfig {
    /// Reordering-buffer target; also the input and output queue capacity.
    /// Must be at least 1.
    pub size: usize,
    /// How long the worker waits for the buffer to fill before emitting.
    pub timeout: Duration,
    /// Probability of dropping each message, in `[0, 1]`.
    pub drop: f64,
}

/// Sending into a channel whose worker has shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

impl fmt::Display for ChannelClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("lossy channel closed")
    }
}

impl std::error::Error for ChannelClosed {}

/// Producer handle for a lossy channel.
#[derive(Debug)]
pub struct LossySender<T> {
    inner: mpsc::Sender<T>,
}

// Manual impl: the handle clones regardless of `T`.
impl<T> Clone for LossySender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> LossySender<T> {
    /// Enqueue a message on the input side. Suspends only while the input
    /// queue is full.
    ///
    /// # Errors
    ///
    /// Fails once the channel has shut down.
    pub async fn send(&self, message: T) -> Result<(), ChannelClosed> {
        self.inner.send(message).await.map_err(|_| ChannelClosed)
    }

    /// Whether two handles feed the same channel.
    #[must_use]
    pub fn same_channel(&self, other: &Self) -> bool {
        self.inner.same_channel(&other.inner)
    }
}

/// Consumer handle for a lossy channel.
///
/// Yields messages in the order the worker emitted them. Also usable as a
/// [`futures::Stream`].
#[derive(Debug)]
pub struct LossyReceiver<T> {
    inner: mpsc::Receiver<T>,
}

impl<T> LossyReceiver<T> {
    /// The next surviving message, or `None` once the channel is closed and
    /// drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.inner.recv().await
    }
}

impl<T> Stream for LossyReceiver<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_recv(cx)
    }
}

/// Create a lossy channel and spawn its worker task.
///
/// The worker owns `rng`; pass a seeded [`StdRng`] for reproducible runs.
pub fn lossy_channel<T: Send + 'static>(
    config: LossyChannelConfig,
    rng: StdRng,
) -> (LossySender<T>, LossyReceiver<T>) {
    let (in_tx, in_rx) = mpsc::channel(config.size);
    let (out_tx, out_rx) = mpsc::channel(config.size);

    let worker = Worker {
        input: in_rx,
        output: out_tx,
        buf: Vec::with_capacity(config.size),
        size: config.size,
        timeout: config.timeout,
        drop: config.drop,
        rng,
    };
    tokio::spawn(worker.run());

    (LossySender { inner: in_tx }, LossyReceiver { inner: out_rx })
}

struct Worker<T> {
    input: mpsc::Receiver<T>,
    output: mpsc::Sender<T>,
    buf: Vec<T>,
    size: usize,
    timeout: Duration,
    drop: f64,
    rng: StdRng,
}

impl<T: Send + 'static> Worker<T> {
    async fn run(mut self) {
        while let Some(message) = self.next_emission().await {
            if self.output.send(message).await.is_err() {
                // consumer gone; nothing left to deliver to
                return;
            }
        }
    }

    /// One pass of the selection procedure: wait up to `timeout` for the
    /// buffer to reach `size` messages, then permute and emit one. If the
    /// window elapses with a non-empty buffer, emit from it anyway; if it
    /// elapses empty, fall through to forced delivery.
    ///
    /// Returns `None` once the input is closed and the buffer is drained.
    async fn next_emission(&mut self) -> Option<T> {
        let deadline = Instant::now() + self.timeout;

        loop {
            if self.buf.len() >= self.size
                || (Instant::now() >= deadline && !self.buf.is_empty())
            {
                return Some(self.emit());
            }

            tokio::select! {
                received = self.input.recv() => match received {
                    Some(message) => {
                        // one drop trial per message, at first appearance
                        if self.rng.random_bool(self.drop) {
                            continue;
                        }
                        self.buf.push(message);
                    }
                    None => {
                        // producers gone: drain survivors, then end of stream
                        if self.buf.is_empty() {
                            return None;
                        }
                        return Some(self.emit());
                    }
                },
                () = time::sleep_until(deadline) => {
                    if self.buf.is_empty() {
                        return self.forced_delivery().await;
                    }
                    // non-empty buffer: the emission check above fires next
                }
            }
        }
    }

    /// The window elapsed with nothing buffered: hand the next message that
    /// survives its drop trial straight through, bypassing the buffer.
    async fn forced_delivery(&mut self) -> Option<T> {
        loop {
            let message = self.input.recv().await?;
            if !self.rng.random_bool(self.drop) {
                return Some(message);
            }
        }
    }

    /// Uniformly permute the buffer and take its head.
    fn emit(&mut self) -> T {
        self.buf.shuffle(&mut self.rng);
        self.buf.remove(0)
    }
}
