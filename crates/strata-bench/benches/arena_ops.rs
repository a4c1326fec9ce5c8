//! Criterion micro-benchmarks for arena allocation and rewind.

use std::alloc::Layout;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use strata_arena::Arena;
use strata_bench::SCRATCH_RESERVE;

/// Benchmark: reserve + release an arena (one header commit).
fn bench_arena_create(c: &mut Criterion) {
    c.bench_function("arena_create", |b| {
        b.iter(|| {
            let arena = Arena::new(SCRATCH_RESERVE).unwrap();
            black_box(arena.pos());
        });
    });
}

/// Benchmark: 10K small bump allocations inside a reused scratch scope.
fn bench_arena_bump_10k(c: &mut Criterion) {
    let mut arena = Arena::new(SCRATCH_RESERVE).unwrap();
    let layout = Layout::new::<[u64; 4]>();
    c.bench_function("arena_bump_10k", |b| {
        b.iter(|| {
            let scratch = arena.temp();
            for _ in 0..10_000 {
                black_box(scratch.alloc_layout(layout).unwrap());
            }
        });
    });
}

/// Benchmark: grow past many granules then rewind (commit + decommit).
fn bench_arena_commit_cycle(c: &mut Criterion) {
    let mut arena = Arena::new(SCRATCH_RESERVE).unwrap();
    let chunk = arena.commit_granularity() * 16;
    c.bench_function("arena_commit_cycle", |b| {
        b.iter(|| {
            let start = arena.pos();
            black_box(arena.alloc_raw(chunk).unwrap());
            arena.pop_to(start);
        });
    });
}

/// Benchmark: string joins into the arena, the typical scratch-text pattern.
fn bench_arena_join_str(c: &mut Criterion) {
    let mut arena = Arena::new(SCRATCH_RESERVE).unwrap();
    let parts = ["usr", "local", "share", "strata", "bench"];
    c.bench_function("arena_join_str", |b| {
        b.iter(|| {
            let scratch = arena.temp();
            for _ in 0..1_000 {
                black_box(scratch.join_str(&parts, "/").unwrap());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_arena_create,
    bench_arena_bump_10k,
    bench_arena_commit_cycle,
    bench_arena_join_str
);
criterion_main!(benches);
