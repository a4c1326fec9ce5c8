//! Scoped arena checkpoints.

use std::ops::Deref;

use tracing::trace;

use crate::arena::Arena;

/// A checkpoint that rewinds its arena when dropped.
///
/// Everything allocated through a `Temp` (or through nested `Temp`s opened
/// from it) is reclaimed when the guard goes out of scope. The guard holds
/// the arena mutably, so inner scopes always end before outer ones and no
/// allocation can outlive the scope that made it.
///
/// A `Temp` only lends the arena out by shared reference, so code inside the
/// scope can allocate and open nested scopes but cannot rewind below the
/// checkpoint:
///
/// ```compile_fail
/// use strata_arena::Arena;
///
/// let mut arena = Arena::new(1 << 20).unwrap();
/// let mut scratch = arena.temp();
/// scratch.reset();
/// ```
///
/// ```
/// use strata_arena::Arena;
///
/// let mut arena = Arena::new(1 << 20).unwrap();
/// let before = arena.pos();
/// {
///     let scratch = arena.temp();
///     scratch.alloc_str("short-lived").unwrap();
///     assert!(scratch.pos() > before);
/// }
/// assert_eq!(arena.pos(), before);
/// ```
pub struct Temp<'a> {
    arena: &'a mut Arena,
    saved: usize,
}

impl<'a> Temp<'a> {
    pub(crate) fn begin(arena: &'a mut Arena) -> Self {
        let saved = arena.pos();
        trace!(saved, "arena temp begin");
        Self { arena, saved }
    }

    /// End the scope now; equivalent to dropping the guard.
    pub fn end(self) {}

    /// Open a nested scope that rewinds to the current offset when it ends.
    pub fn temp(&mut self) -> Temp<'_> {
        Temp::begin(self.arena)
    }

    /// The offset this scope rewinds to.
    pub fn saved_pos(&self) -> usize {
        self.saved
    }
}

impl Deref for Temp<'_> {
    type Target = Arena;

    fn deref(&self) -> &Arena {
        self.arena
    }
}

impl Drop for Temp<'_> {
    fn drop(&mut self) {
        trace!(saved = self.saved, pos = self.arena.pos(), "arena temp end");
        self.arena.pop_to(self.saved);
    }
}
