//! Virtual-memory-backed bump arena for Strata.
//!
//! An [`Arena`] reserves a large span of address space once and commits
//! physical pages on demand as allocations advance. Memory is reclaimed in
//! bulk: by rewinding to a saved offset ([`Arena::pop_to`]), by a scoped
//! [`Temp`] checkpoint, or by dropping the arena.
//!
//! # Architecture
//!
//! ```text
//! Arena (single pointer to its in-region header)
//! ├── vm         reserve / commit / decommit / release (all OS unsafe)
//! ├── config     ArenaConfig: reservation size, alignment, commit granularity
//! ├── Temp       RAII checkpoint, rewinds on drop, nests
//! └── Allocator  impl: free is a no-op, so containers can live in the arena
//! ```
//!
//! Allocation takes `&self` and rewinding takes `&mut self`, so the borrow
//! checker rejects any reference into rewound memory.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod arena;
pub mod config;
pub mod error;
pub mod temp;
pub mod vm;

pub use arena::{Arena, HEADER_SIZE};
pub use config::{ArenaConfig, ConfigError, RESERVE_BLOCK};
pub use error::ArenaError;
pub use temp::Temp;
