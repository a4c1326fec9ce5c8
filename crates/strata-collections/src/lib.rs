//! Allocator-parameterised containers for Strata.
//!
//! Every container takes its allocator as a type parameter and routes all
//! buffer traffic through [`Allocator`](strata_core::Allocator). Pass
//! `&Arena` to place a container in an arena (frees become no-ops and the
//! memory is reclaimed when the arena rewinds) or use the default
//! [`Heap`](strata_core::Heap).
//!
//! ```text
//! DynArray<T, A>        contiguous, growth ×2 (floor 1)
//! HashMap<K, V, A, P>   open addressing, non-wrapping linear probe
//! ├── Djb2              byte-like keys, empty key is vacant
//! └── Modulo            integer keys (IntMap), zero is vacant
//! RingBuffer<T, A>      FIFO, growth ×2 preserving order
//! ```
//!
//! Growth is always fallible and never leaves a container half-updated.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod array;
pub mod map;
pub mod ring;

pub use array::DynArray;
pub use map::{djb2, Djb2, HashMap, IntMap, IntegerKey, KeyPolicy, Modulo, Pair};
pub use ring::RingBuffer;
