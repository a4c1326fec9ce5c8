//! Integration tests for the arena's commit / rewind lifecycle.
//!
//! Exercises long allocation runs that cross many commit granules,
//! nested scratch scopes, and the arena acting as a generic allocator.

use std::alloc::Layout;

use strata_arena::{Arena, ArenaConfig, ArenaError, ConfigError, HEADER_SIZE};
use strata_core::{alloc_array, AllocationError, Allocator, MIB};
use strata_test_utils::init_tracing;

// ---------- Helpers ----------

fn assert_consistent(arena: &Arena) {
    assert!(HEADER_SIZE <= arena.pos());
    assert!(arena.pos() <= arena.commit_pos());
    assert!(arena.pos() <= arena.size());
    assert!(arena.commit_pos() <= arena.reserved());
}

// ---------- Growth ----------

#[test]
fn many_small_allocations_commit_incrementally() {
    init_tracing();
    let arena = Arena::new(MIB).unwrap();
    let granule = arena.commit_granularity();
    let mut last_commit = arena.commit_pos();
    for i in 0..10_000u32 {
        let value = arena.alloc_value(i).unwrap();
        assert_eq!(*value, i);
        assert!(arena.commit_pos() >= last_commit);
        last_commit = arena.commit_pos();
        assert_consistent(&arena);
    }
    // 10k * 16 bytes (default alignment) spans several granules.
    assert!(arena.commit_pos() > granule);
    assert!(arena.commit_pos() < arena.reserved());
}

#[test]
fn arena_can_be_filled_to_its_size() {
    let arena = Arena::new(MIB).unwrap();
    let room = arena.size() - 64;
    let block = arena.alloc_raw(room - arena.pos()).unwrap();
    assert!(!block.as_ptr().is_null());
    assert_eq!(arena.alloc_raw(128), Err(AllocationError::OutOfMemory));
    // The reservation behind a 1 MiB arena is larger, but stays out of reach.
    assert!(arena.reserved() > arena.size());
    assert!(arena.pos() <= MIB);
    assert_consistent(&arena);
}

#[test]
fn larger_request_rounds_reservation() {
    let arena = Arena::new(64 * MIB + 1).unwrap();
    assert_eq!(arena.size(), 64 * MIB + 1);
    assert_eq!(arena.reserved(), 128 * MIB);
}

// ---------- Rewind ----------

#[test]
fn scratch_scope_reclaims_commit() {
    init_tracing();
    let mut arena = Arena::new(MIB).unwrap();
    let granule = arena.commit_granularity();
    let keep = arena.alloc_str("persistent").unwrap().as_ptr();
    let baseline = arena.commit_pos();
    {
        let scratch = arena.temp();
        scratch.alloc_raw(granule * 16).unwrap();
        assert!(scratch.commit_pos() >= baseline + granule * 16);
    }
    assert_eq!(arena.commit_pos(), baseline);
    // Earlier allocation is untouched.
    let s = unsafe { std::str::from_utf8_unchecked(std::slice::from_raw_parts(keep, 10)) };
    assert_eq!(s, "persistent");
}

#[test]
fn repeated_frames_reuse_the_same_memory() {
    let mut arena = Arena::new(MIB).unwrap();
    let mut first = None;
    for frame in 0..100u64 {
        let scratch = arena.temp();
        let data = scratch.alloc_slice_fill_with(256, |i| frame + i as u64).unwrap();
        assert_eq!(data[0], frame);
        let addr = data.as_ptr() as usize;
        assert_eq!(*first.get_or_insert(addr), addr);
    }
    assert_eq!(arena.pos(), HEADER_SIZE);
}

// ---------- As an allocator ----------

#[test]
fn arena_serves_typed_arrays() {
    let arena = Arena::new(MIB).unwrap();
    let ptr = alloc_array::<u64, _>(&arena, 1000).unwrap();
    let slice = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), 1000) };
    assert!(slice.iter().all(|&x| x == 0));
    slice[999] = 7;
    unsafe { (&arena).free(ptr.cast(), Layout::array::<u64>(1000).unwrap()) };
    assert_eq!(slice[999], 7);
}

// ---------- Configuration ----------

#[test]
fn invalid_config_is_rejected_before_reserving() {
    let err = Arena::with_config(&ArenaConfig::new(MIB).with_align(3)).unwrap_err();
    assert_eq!(err, ArenaError::Config(ConfigError::BadAlign { align: 3 }));
    assert_eq!(err.allocation(), None);
}

#[test]
fn custom_alignment_applies_to_every_allocation() {
    let arena = Arena::with_config(&ArenaConfig::new(MIB).with_align(64)).unwrap();
    for _ in 0..8 {
        let p = arena.alloc_raw(3).unwrap();
        assert_eq!(p.as_ptr() as usize % 64, 0);
    }
}

#[test]
fn arena_moves_across_threads() {
    let arena = Arena::new(MIB).unwrap();
    arena.alloc_raw(100).unwrap();
    let pos = arena.pos();
    let handle = std::thread::spawn(move || {
        arena.alloc_raw(100).unwrap();
        arena.pos()
    });
    assert!(handle.join().unwrap() > pos);
}
