//! Blocking multi-producer, multi-consumer FIFO channel for Strata.
//!
//! [`Channel`] pairs a [`RingBuffer`](strata_collections::RingBuffer) queue
//! with a `parking_lot` mutex and two condition variables. It is the only
//! synchronised component in the workspace; everything else is
//! single-owner.
//!
//! Two modes, chosen by constructor:
//!
//! - **Unbounded** ([`Channel::new`], [`Channel::new_in`]): the queue grows
//!   on demand and `send` never blocks.
//! - **Bounded** ([`Channel::bounded`], [`Channel::bounded_in`]): `send`
//!   blocks while the queue holds `bound` items.
//!
//! Closing wakes every waiter. Receivers drain what is left, then see
//! `None`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod channel;
pub mod error;

pub use channel::Channel;
pub use error::{SendError, TryReceiveError};
