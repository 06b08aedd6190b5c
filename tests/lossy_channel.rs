//! Transport behavior: delivery, reordering bounds, drops, close semantics.

use std::collections::BTreeSet;
use std::time::Duration;

use classic_paxos::{LossyChannelConfig, lossy_channel};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn config(size: usize, timeout: Duration, drop: f64) -> LossyChannelConfig {
    LossyChannelConfig {
        size,
        timeout,
        drop,
    }
}

#[tokio::test]
async fn delivers_a_single_message() {
    let (tx, mut rx) = lossy_channel(config(1, Duration::from_secs(1), 0.0), rng(1));
    tx.send(7u32).await.expect("channel open");
    assert_eq!(rx.recv().await, Some(7));
}

#[tokio::test]
async fn delivers_ten_messages_as_a_set() {
    let (tx, mut rx) = lossy_channel(config(10, Duration::from_millis(1), 0.0), rng(2));
    for n in 0..10u32 {
        tx.send(n).await.expect("channel open");
    }

    let mut received = BTreeSet::new();
    for _ in 0..10 {
        received.insert(rx.recv().await.expect("ten deliveries"));
    }

    // all ten arrive, though possibly out of order
    assert_eq!(received, (0..10).collect());
}

#[tokio::test(start_paused = true)]
async fn certain_drop_never_delivers() {
    let (tx, mut rx) = lossy_channel(config(1, Duration::from_millis(1), 1.0), rng(3));
    tx.send(1u32).await.expect("channel open");

    let outcome = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
    assert!(outcome.is_err(), "dropped message must not be delivered");
}

#[tokio::test]
async fn unit_buffer_without_drops_is_fifo() {
    let (tx, mut rx) = lossy_channel(config(1, Duration::from_millis(10), 0.0), rng(4));

    let producer = tokio::spawn(async move {
        for n in 0..32u32 {
            tx.send(n).await.expect("channel open");
        }
    });

    for n in 0..32 {
        assert_eq!(rx.recv().await, Some(n));
    }
    producer.await.expect("producer task");
}

#[tokio::test]
async fn close_drains_buffered_messages_then_ends() {
    // a window far longer than the test: emission happens only because the
    // producer went away
    let (tx, mut rx) = lossy_channel(config(8, Duration::from_secs(60), 0.0), rng(5));
    for n in 0..5u32 {
        tx.send(n).await.expect("channel open");
    }
    drop(tx);

    let mut received = BTreeSet::new();
    while let Some(n) = rx.recv().await {
        received.insert(n);
    }
    assert_eq!(received, (0..5).collect());
}

#[tokio::test]
async fn drop_rate_tracks_the_configured_probability() {
    // 1000 independent Bernoulli(0.3) drop trials; the seeded run lands
    // well inside six standard deviations of the 700 expected survivors
    let (tx, mut rx) = lossy_channel(config(4, Duration::from_millis(1), 0.3), rng(7));

    let producer = tokio::spawn(async move {
        for n in 0..1000u32 {
            tx.send(n).await.expect("channel open");
        }
    });

    let mut delivered = 0usize;
    while rx.recv().await.is_some() {
        delivered += 1;
    }
    producer.await.expect("producer task");

    assert!(
        (600..=800).contains(&delivered),
        "delivered {delivered} of 1000 at drop 0.3"
    );
}

#[tokio::test]
async fn send_fails_once_the_consumer_is_gone() {
    let (tx, rx) = lossy_channel(config(1, Duration::from_millis(1), 0.0), rng(6));
    drop(rx);

    // the worker shuts down after its first emission fails; sends then error
    while tx.send(0u32).await.is_ok() {}
}
