//! Containers placed in an arena.
//!
//! Covers the documented end-to-end scenarios for the array and hash map,
//! plus rewind interaction: containers borrow the arena, so they must be
//! gone before it can be rewound.

use strata_arena::Arena;
use strata_collections::{DynArray, HashMap, IntMap, Pair};
use strata_core::{AllocationError, MIB};
use strata_test_utils::init_tracing;

// ---------- Scenarios ----------

#[test]
fn capacity_one_array_holds_five_pushes() {
    let arena = Arena::new(MIB).unwrap();
    let mut array = DynArray::with_capacity_in(1, &arena);
    for v in [10i64, 20, 30, 40, 50] {
        array.push(v).unwrap();
    }
    assert_eq!(array.len(), 5);
    assert!(array.capacity() >= 5);
    assert_eq!(*array.nth(0), 10);
    assert_eq!(*array.nth(4), 50);
}

#[test]
fn capacity_one_string_map_in_arena() {
    init_tracing();
    let arena = Arena::new(MIB).unwrap();
    let mut map: HashMap<&str, i64, _> = HashMap::with_capacity_in(1, &arena).unwrap();
    map.push("Hello", -2).unwrap();
    map.push("Someone", 50).unwrap();
    assert_eq!(map.find(&"Hello"), Some(&-2));
    assert_eq!(map.find(&"Someone"), Some(&50));
    assert_eq!(map.find(&"some other key"), None);
}

// ---------- Arena interaction ----------

#[test]
fn arena_strings_as_map_keys() {
    let mut arena = Arena::new(MIB).unwrap();
    let start = arena.pos();
    {
        let scratch = arena.temp();
        let words: Vec<&str> = ["alpha", "beta", "gamma"]
            .iter()
            .map(|w| &*scratch.alloc_str(w).unwrap())
            .collect();
        let mut counts: HashMap<&str, u32, _> = HashMap::with_capacity_in(4, &*scratch).unwrap();
        for w in words.iter().chain(words.iter().take(1)) {
            let next = counts.find(w).copied().unwrap_or(0) + 1;
            counts.push(*w, next).unwrap();
        }
        assert_eq!(counts.find(&"alpha"), Some(&2));
        assert_eq!(counts.len(), 3);
    }
    assert_eq!(arena.pos(), start);
}

#[test]
fn growth_in_arena_consumes_arena_space() {
    let arena = Arena::new(MIB).unwrap();
    let before = arena.pos();
    let mut array = DynArray::with_capacity_in(1, &arena);
    for i in 0..1024u32 {
        array.push(i).unwrap();
    }
    // Every superseded buffer stays in the arena until rewind.
    assert!(arena.pos() - before >= 2 * 1024 * 4 - 4);
    assert_eq!(array.iter().rev().next(), Some(&1023));
}

#[test]
fn exhausted_arena_reports_out_of_memory() {
    let arena = Arena::new(MIB).unwrap();
    let mut array: DynArray<u8, _> = DynArray::with_capacity_in(1, &arena);
    arena.alloc_raw(arena.remaining() - 64).unwrap();
    let mut result = Ok(());
    for b in 0..=255u8 {
        result = array.push(b);
        if result.is_err() {
            break;
        }
    }
    assert_eq!(result, Err(AllocationError::OutOfMemory));
    assert!(array.len() >= 1);
}

#[test]
fn key_value_pairs_into_arena() {
    let arena = Arena::new(MIB).unwrap();
    let mut map = IntMap::<u64, u64>::with_capacity(16).unwrap();
    for k in [9u64, 3, 12] {
        map.push(k, k * 10).unwrap();
    }
    let pairs = map.key_value_pairs_in(&arena).unwrap();
    assert_eq!(
        pairs.as_slice(),
        &[
            Pair { key: 3, value: 30 },
            Pair { key: 9, value: 90 },
            Pair { key: 12, value: 120 },
        ]
    );
}
