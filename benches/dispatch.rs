//! Notification delivery benchmark suite.
//!
//! Benchmarks the path from a transport callback to the subscriber:
//! - Message batch sizes: 100, 1000, 10000
//! - Concurrent subscriptions: 1, 10, 50
//!
//! Run with: cargo bench --bench dispatch
//! Results saved to: target/criterion/

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures_util::future::join_all;
use pushstream::{LoopbackAcceptor, LoopbackTransport, StreamClient};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const URL: &str = "http://localhost:8081/api/sse";
const BATCH_SIZES: &[usize] = &[100, 1_000, 10_000];
const SUBSCRIPTION_COUNTS: &[usize] = &[1, 10, 50];
const MESSAGES_PER_SUBSCRIPTION: usize = 100;

// ============================================================================
// Benchmark: Message Throughput
// ============================================================================

fn bench_message_throughput(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("message_throughput");
    group.measurement_time(Duration::from_secs(10));

    for &size in BATCH_SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("messages", size), &size, |b, &batch| {
            b.to_async(&rt).iter(|| async move { deliver_batch(batch).await });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Concurrent Subscriptions
// ============================================================================

fn bench_concurrent_subscriptions(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("concurrent_subscriptions");
    group.sample_size(20);

    for &count in SUBSCRIPTION_COUNTS {
        group.throughput(Throughput::Elements(
            (count * MESSAGES_PER_SUBSCRIPTION) as u64,
        ));
        group.bench_with_input(
            BenchmarkId::new("subscriptions", count),
            &count,
            |b, &subscriptions| {
                b.to_async(&rt)
                    .iter(|| async move { deliver_concurrent(subscriptions).await });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Helper Functions
// ============================================================================

fn client() -> (StreamClient, LoopbackAcceptor) {
    let (transport, acceptor) = LoopbackTransport::pair();
    let client = StreamClient::builder()
        .url(URL)
        .transport(transport)
        .build()
        .expect("valid client");
    (client, acceptor)
}

/// Opens one subscription and waits until `batch` messages were delivered.
async fn deliver_batch(batch: usize) {
    let (client, mut acceptor) = client();
    let (subscription, mut notifications) = client.subscribe_stream().expect("subscribe");

    let conn = acceptor.next().await.expect("connection");
    conn.accept();
    for i in 0..batch {
        conn.push(format!("event {i}"));
    }

    // Connected status plus every message.
    for _ in 0..=batch {
        notifications.recv().await.expect("notification");
    }

    subscription.cancel();
}

/// Opens `count` subscriptions on one client and feeds each of them.
async fn deliver_concurrent(count: usize) {
    let (client, mut acceptor) = client();

    let mut streams = Vec::with_capacity(count);
    for _ in 0..count {
        streams.push(client.subscribe_stream().expect("subscribe"));
    }

    for _ in 0..count {
        let conn = acceptor.next().await.expect("connection");
        conn.accept();
        for i in 0..MESSAGES_PER_SUBSCRIPTION {
            conn.push(format!("event {i}"));
        }
    }

    join_all(streams.iter_mut().map(|(_, notifications)| async move {
        for _ in 0..=MESSAGES_PER_SUBSCRIPTION {
            notifications.recv().await.expect("notification");
        }
    }))
    .await;

    for (subscription, _) in &streams {
        subscription.cancel();
    }
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(
    benches,
    bench_message_throughput,
    bench_concurrent_subscriptions
);
criterion_main!(benches);
