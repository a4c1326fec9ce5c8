//! Criterion micro-benchmarks for channel throughput, with crossbeam as a
//! baseline.

use std::hint::black_box;
use std::thread;

use criterion::{criterion_group, criterion_main, Criterion};
use strata_channel::Channel;

const ITEMS: u64 = 10_000;

/// Benchmark: send then drain on one thread (lock + queue overhead only).
fn bench_channel_single_thread(c: &mut Criterion) {
    let channel = Channel::new(ITEMS as usize).unwrap();
    c.bench_function("channel_send_recv_10k", |b| {
        b.iter(|| {
            for i in 0..ITEMS {
                channel.send(i).unwrap();
            }
            let mut sum = 0;
            for _ in 0..ITEMS {
                sum += channel.receive().unwrap();
            }
            black_box(sum);
        });
    });
}

/// Benchmark: one producer, one consumer, unbounded.
fn bench_channel_spsc(c: &mut Criterion) {
    c.bench_function("channel_spsc_10k", |b| {
        b.iter(|| {
            let channel = Channel::new(64).unwrap();
            thread::scope(|s| {
                s.spawn(|| {
                    for i in 0..ITEMS {
                        channel.send(i).unwrap();
                    }
                    channel.close();
                });
                black_box(channel.iter().sum::<u64>());
            });
        });
    });
}

/// Benchmark: one producer, one consumer, bounded to 64 (backpressure).
fn bench_channel_spsc_bounded(c: &mut Criterion) {
    c.bench_function("channel_spsc_bounded_10k", |b| {
        b.iter(|| {
            let channel = Channel::bounded(64).unwrap();
            thread::scope(|s| {
                s.spawn(|| {
                    for i in 0..ITEMS {
                        channel.send(i).unwrap();
                    }
                    channel.close();
                });
                black_box(channel.iter().sum::<u64>());
            });
        });
    });
}

/// Baseline: the same SPSC workload on crossbeam's bounded channel.
fn bench_crossbeam_spsc_bounded(c: &mut Criterion) {
    c.bench_function("crossbeam_spsc_bounded_10k", |b| {
        b.iter(|| {
            let (tx, rx) = crossbeam_channel::bounded(64);
            thread::scope(|s| {
                s.spawn(move || {
                    for i in 0..ITEMS {
                        tx.send(i).unwrap();
                    }
                });
                black_box(rx.iter().sum::<u64>());
            });
        });
    });
}

criterion_group!(
    benches,
    bench_channel_single_thread,
    bench_channel_spsc,
    bench_channel_spsc_bounded,
    bench_crossbeam_spsc_bounded
);
criterion_main!(benches);
