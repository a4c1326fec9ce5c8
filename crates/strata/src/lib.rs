//! Strata: a virtual-memory arena, allocator-generic containers and a
//! blocking channel.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Strata sub-crates. For most users, adding `strata` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! let mut arena = Arena::new(1 << 20).unwrap();
//! {
//!     let scratch = arena.temp();
//!
//!     let mut scores: HashMap<&str, i64, _> = HashMap::with_capacity_in(1, &*scratch).unwrap();
//!     scores.push("Hello", -2).unwrap();
//!     scores.push("Someone", 50).unwrap();
//!     assert_eq!(scores.find(&"Someone"), Some(&50));
//!
//!     let mut values = DynArray::with_capacity_in(1, &*scratch);
//!     for v in [10, 20, 30, 40, 50] {
//!         values.push(v).unwrap();
//!     }
//!     assert_eq!(*values.nth(4), 50);
//! }
//! // Everything above was reclaimed when the scratch scope ended.
//! assert_eq!(arena.pos(), arena.header_size());
//!
//! let channel = Channel::new(4).unwrap();
//! channel.send("job").unwrap();
//! channel.close();
//! assert_eq!(channel.receive(), Some("job"));
//! assert_eq!(channel.receive(), None);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`allocation`] | `strata-core` | `Allocator`, `Heap`, `AllocationError`, size helpers |
//! | [`arena`] | `strata-arena` | `Arena`, `Temp`, `ArenaConfig`, virtual-memory primitives |
//! | [`collections`] | `strata-collections` | `DynArray`, `HashMap`, `RingBuffer`, key policies |
//! | [`channel`] | `strata-channel` | `Channel`, `SendError`, `TryReceiveError` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Allocator capability and error taxonomy (`strata-core`).
pub use strata_core as allocation;

/// Virtual-memory bump arena (`strata-arena`).
///
/// [`arena::Arena`] is also an [`allocation::Allocator`], so any container can
/// live inside one.
pub use strata_arena as arena;

/// Allocator-generic containers (`strata-collections`).
pub use strata_collections as collections;

/// Blocking FIFO channel (`strata-channel`).
pub use strata_channel as channel;

/// Common imports for typical Strata usage.
///
/// ```rust
/// use strata::prelude::*;
/// ```
pub mod prelude {
    // Allocation
    pub use strata_core::{AllocationError, Allocator, Heap, GIB, KIB, MIB};

    // Arena
    pub use strata_arena::{Arena, ArenaConfig, ArenaError, Temp};

    // Containers
    pub use strata_collections::{DynArray, HashMap, IntMap, Pair, RingBuffer};

    // Channel
    pub use strata_channel::{Channel, SendError, TryReceiveError};
}
