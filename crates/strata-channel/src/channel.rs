//! The blocking FIFO channel.
//!
//! One [`parking_lot::Mutex`] guards a [`RingBuffer`] queue and the closed
//! flag. Receivers wait on `not_empty`; in bounded mode senders wait on
//! `not_full`. Closing broadcasts both so every waiter re-checks state.
//!
//! ```text
//! send ──lock──► closed? ─yes─► Err(Closed(item))
//!                  │no
//!           bounded & full? ─yes─► wait(not_full) ─┐
//!                  │no                             │
//!           push_back ─► notify_one(not_empty)     │
//!                  ▲───────────────────────────────┘
//!
//! receive ─lock─► pop_front? ─some─► notify_one(not_full) ─► Some(item)
//!                  │none
//!               closed? ─yes─► None
//!                  │no
//!           wait(not_empty), retry
//! ```

use std::fmt;

use parking_lot::{Condvar, Mutex};
use strata_collections::RingBuffer;
use strata_core::{AllocationError, Allocator, Heap};
use tracing::{debug, warn};

use crate::error::{SendError, TryReceiveError};

struct State<T, A: Allocator> {
    queue: RingBuffer<T, A>,
    closed: bool,
}

/// A multi-producer, multi-consumer FIFO queue.
///
/// Share it between threads by reference (scoped threads) or through an
/// `Arc`. The queue buffer comes from `A`; to keep it in an arena, give
/// the channel an owned `Arena` so the channel stays `Sync`.
///
/// Unbounded channels (from [`new_in`](Self::new_in)) grow the queue on
/// demand and never block senders. Bounded channels (from
/// [`bounded_in`](Self::bounded_in)) block senders while `len == bound`.
pub struct Channel<T, A: Allocator = Heap> {
    state: Mutex<State<T, A>>,
    not_empty: Condvar,
    not_full: Condvar,
    bound: Option<usize>,
}

impl<T> Channel<T, Heap> {
    /// An unbounded heap-backed channel; `capacity` pre-sizes the queue.
    pub fn new(capacity: usize) -> Result<Self, AllocationError> {
        Self::new_in(Heap, capacity)
    }

    /// A heap-backed channel holding at most `bound` items.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is zero.
    pub fn bounded(bound: usize) -> Result<Self, AllocationError> {
        Self::bounded_in(Heap, bound)
    }
}

impl<T, A: Allocator> Channel<T, A> {
    /// An unbounded channel whose queue starts with room for `capacity`
    /// items and grows as needed.
    pub fn new_in(alloc: A, capacity: usize) -> Result<Self, AllocationError> {
        Self::build(alloc, capacity, None)
    }

    /// A channel holding at most `bound` items; [`send`](Self::send)
    /// blocks while it is full.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is zero.
    pub fn bounded_in(alloc: A, bound: usize) -> Result<Self, AllocationError> {
        assert!(bound > 0, "channel bound must be > 0");
        Self::build(alloc, bound, Some(bound))
    }

    fn build(alloc: A, capacity: usize, bound: Option<usize>) -> Result<Self, AllocationError> {
        let queue = RingBuffer::with_capacity_in(capacity, alloc)?;
        Ok(Self {
            state: Mutex::new(State {
                queue,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            bound,
        })
    }

    /// The maximum number of queued items, if bounded.
    pub fn bound(&self) -> Option<usize> {
        self.bound
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Whether no items are queued.
    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn is_full(&self, state: &State<T, A>) -> bool {
        self.bound.is_some_and(|bound| state.queue.len() >= bound)
    }

    fn enqueue(&self, state: &mut State<T, A>, item: T) -> Result<(), SendError<T>> {
        state.queue.push_back(item).map_err(|(item, error)| {
            warn!(queued = state.queue.len(), %error, "channel enqueue failed");
            SendError::Alloc { item, error }
        })?;
        self.not_empty.notify_one();
        Ok(())
    }

    /// Enqueue `item`, waking one receiver.
    ///
    /// In bounded mode this blocks while the channel is full. Fails with
    /// [`SendError::Closed`] if the channel is (or becomes) closed, or
    /// [`SendError::Alloc`] if the queue cannot grow; the item comes back
    /// in both cases.
    pub fn send(&self, item: T) -> Result<(), SendError<T>> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(SendError::Closed(item));
            }
            if !self.is_full(&state) {
                break;
            }
            self.not_full.wait(&mut state);
        }
        self.enqueue(&mut state, item)
    }

    /// Enqueue `item` without blocking.
    ///
    /// Returns [`SendError::Full`] instead of waiting when a bounded
    /// channel is at capacity.
    pub fn try_send(&self, item: T) -> Result<(), SendError<T>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(SendError::Closed(item));
        }
        if self.is_full(&state) {
            return Err(SendError::Full(item));
        }
        self.enqueue(&mut state, item)
    }

    /// Enqueue an independent copy of `item`.
    ///
    /// The caller keeps ownership of the original. The copy is made by
    /// `T::clone`, so any memory it owns (a `String`'s bytes, say) comes from
    /// wherever that impl allocates, not from `A`; only queue storage is
    /// drawn from the channel's allocator. To keep payloads in an arena, send
    /// arena references such as the `&str` returned by `Arena::alloc_str`.
    pub fn send_cloned(&self, item: &T) -> Result<(), SendError<T>>
    where
        T: Clone,
    {
        self.send(item.clone())
    }

    /// Dequeue the oldest item, blocking while the channel is empty and
    /// open.
    ///
    /// Items still queued at close are delivered; `None` means the channel
    /// is closed and drained.
    pub fn receive(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.queue.pop_front() {
                if self.bound.is_some() {
                    self.not_full.notify_one();
                }
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Dequeue the oldest item without blocking.
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        let mut state = self.state.lock();
        match state.queue.pop_front() {
            Some(item) => {
                if self.bound.is_some() {
                    self.not_full.notify_one();
                }
                Ok(item)
            }
            None if state.closed => Err(TryReceiveError::Closed),
            None => Err(TryReceiveError::Empty),
        }
    }

    /// Blocking iterator over received items; ends once the channel is
    /// closed and drained.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.receive())
    }

    /// Close the channel and wake every blocked sender and receiver.
    ///
    /// Returns `true` for the call that actually closed it, `false` if it
    /// was already closed.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        let pending = state.queue.len();
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
        debug!(pending, "channel closed");
        true
    }
}

impl<T, A: Allocator> fmt::Debug for Channel<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Channel")
            .field("len", &state.queue.len())
            .field("closed", &state.closed)
            .field("bound", &self.bound)
            .finish()
    }
}
