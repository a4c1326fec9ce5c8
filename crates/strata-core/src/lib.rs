//! Core allocation abstractions for the Strata runtime substrate.
//!
//! This is the leaf crate of the workspace. It defines the allocator
//! capability every container is written against, the general-purpose
//! [`Heap`] allocator, and the [`AllocationError`] taxonomy surfaced by all
//! fallible allocation paths.
//!
//! # Allocator variants
//!
//! ```text
//! Allocator (capability trait)
//! ├── Heap          global allocator, free releases memory
//! ├── Arena         strata-arena, free is a no-op (bulk rewind only)
//! └── &A            any reference to an allocator is itself an allocator
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod allocator;
pub mod error;

pub use allocator::{align_up, alloc_array, dangling, free_array, Allocator, Heap, GIB, KIB, MIB};
pub use error::AllocationError;
