//! Benchmarks for datagram decoding and dispatch
//!
//! Forza sends a datagram every ~16.7ms; decoding and fan-out must stay far
//! below that so the socket buffer never fills.
//!
//! Platform: Cross-platform (synthetic datagrams, CI-safe)

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use slipstream::consumers::{DerivedMetrics, KeyValuePublisher};
use slipstream::SinkError;
use slipstream::sink::KeyValueSink;
use slipstream::test_utils::{extended_datagram, mixed_session, race_frame, sled_datagram};
use slipstream::{Dispatcher, codec};
use std::hint::black_box;
use std::sync::Arc;

fn bench_decode(c: &mut Criterion) {
    let sled = sled_datagram(1_000);
    let extended = extended_datagram(1_000, 42.0);

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("sled", |b| b.iter(|| codec::decode(black_box(&sled))));
    group.bench_function("sled_dash", |b| b.iter(|| codec::decode(black_box(&extended))));
    group.bench_function("unrecognized_length", |b| {
        let short = &extended[..100];
        b.iter(|| codec::decode(black_box(short)))
    });

    group.finish();
}

fn bench_session(c: &mut Criterion) {
    // One minute of telemetry at 60 Hz
    let session = mixed_session(3_600);

    let mut group = c.benchmark_group("session");
    group.throughput(Throughput::Elements(session.len() as u64));
    group.bench_function("decode_minute", |b| {
        b.iter(|| {
            for datagram in &session {
                black_box(codec::decode(datagram).ok());
            }
        })
    });
    group.finish();
}

fn bench_derived_metrics(c: &mut Criterion) {
    let frame = race_frame(1_000, 42.0);

    c.bench_function("derived_metrics_entries", |b| {
        b.iter(|| black_box(DerivedMetrics::from_frame(black_box(&frame), 12.5).entries()))
    });
}

/// Sink that accepts and forgets every write
struct Discard;

#[async_trait::async_trait]
impl KeyValueSink for Discard {
    async fn set(&self, key: &str, value: &str) -> Result<(), SinkError> {
        black_box((key, value));
        Ok(())
    }
}

fn bench_dispatch(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().build().expect("runtime");
    let dispatcher = Dispatcher::new();
    for _ in 0..4 {
        dispatcher.subscribe(Arc::new(KeyValuePublisher::new(Discard)));
    }
    let frame = race_frame(1_000, 42.0);

    c.bench_function("dispatch_four_publishers", |b| {
        b.iter(|| runtime.block_on(dispatcher.next(black_box(&frame))))
    });
}

criterion_group!(benches, bench_decode, bench_session, bench_derived_metrics, bench_dispatch);
criterion_main!(benches);
