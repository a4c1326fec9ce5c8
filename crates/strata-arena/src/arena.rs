//! The virtual-memory bump arena.
//!
//! An [`Arena`] reserves one contiguous region of address space up front and
//! commits physical pages incrementally as the bump offset advances. The
//! region never moves, so pointers handed out stay valid until the arena is
//! rewound or dropped. Resident memory tracks the high-water mark, not the
//! reservation ceiling.
//!
//! ```text
//! base                                                              base + reserved
//! ├─ header ─┬─ allocations ─┬─ committed, unused ─┬─ free ─┬─ beyond size ─┤
//! 0        HEADER_SIZE      pos               commit_pos   size
//! ```
//!
//! `size` is the ceiling the caller asked for; the reservation behind it is
//! rounded up to whole 64 MiB blocks.
//!
//! The bookkeeping header lives in the first committed granule of the region
//! itself, so an `Arena` handle is a single pointer.

use std::alloc::Layout;
use std::cell::Cell;
use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};
use std::slice;

use strata_core::{align_up, dangling, AllocationError, Allocator};
use tracing::{debug, trace, warn};

use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::temp::Temp;
use crate::vm::{self, Reservation};

/// Arena bookkeeping, stored at offset 0 of the reservation.
#[repr(C)]
struct Header {
    /// Bump offset from the region base.
    pos: Cell<usize>,
    /// Highest physically backed offset; multiple of `commit_granularity`.
    commit_pos: Cell<usize>,
    align: usize,
    /// Allocation ceiling requested at creation.
    size: usize,
    /// Reserved bytes (a multiple of 64 MiB, at least `size`).
    reserved: usize,
    commit_granularity: usize,
}

/// Bytes at the start of every arena occupied by its own header.
///
/// `pos` never drops below this value.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// A bump allocator over a single reserved, incrementally committed region.
///
/// Allocation goes through `&self`, so many values can be carved out of one
/// arena at once. Rewinding ([`pop_to`](Arena::pop_to), [`pop`](Arena::pop),
/// [`temp`](Arena::temp)) needs `&mut self`, which guarantees no allocation
/// handed out earlier is still borrowed when its memory is reclaimed.
///
/// Not internally synchronised: an `Arena` can move between threads but not
/// be shared by them. Use one arena per thread or per logical scope.
pub struct Arena {
    header: NonNull<Header>,
}

// SAFETY: the arena exclusively owns its reservation; the Cell-based header
// keeps it !Sync, so only one thread can touch it at a time.
unsafe impl Send for Arena {}

impl Arena {
    /// Reserve an arena of at least `size` bytes with default settings.
    ///
    /// The reservation is rounded up to a multiple of 64 MiB.
    pub fn new(size: usize) -> Result<Self, ArenaError> {
        Self::with_config(&ArenaConfig::new(size))
    }

    /// Reserve an arena described by `config`.
    ///
    /// Commits exactly one granule to hold the header.
    pub fn with_config(config: &ArenaConfig) -> Result<Self, ArenaError> {
        let page_size = vm::page_size();
        config.validate(page_size)?;
        let size = config.reserve_size;
        let reserved = config
            .reserved_bytes()
            .ok_or(AllocationError::InvalidArgument)?;
        let granularity = config.resolved_granularity(page_size);

        let reservation = Reservation::new(reserved)
            .inspect_err(|e| warn!(reserved, error = %e, "arena reservation failed"))?;
        // SAFETY: the first granule lies inside the fresh reservation.
        unsafe { vm::commit(reservation.base(), granularity) }
            .inspect_err(|e| warn!(granularity, error = %e, "arena header commit failed"))?;

        let header = reservation.into_raw().cast::<Header>();
        // SAFETY: the header granule is committed, page-aligned and large
        // enough (granularity >= page size > HEADER_SIZE).
        unsafe {
            header.as_ptr().write(Header {
                pos: Cell::new(HEADER_SIZE),
                commit_pos: Cell::new(granularity),
                align: config.align,
                size,
                reserved,
                commit_granularity: granularity,
            });
        }
        debug!(
            size,
            reserved,
            commit_granularity = granularity,
            align = config.align,
            "arena created"
        );
        Ok(Self { header })
    }

    fn header(&self) -> &Header {
        // SAFETY: the header granule stays committed for the arena's lifetime.
        unsafe { self.header.as_ref() }
    }

    fn base(&self) -> NonNull<u8> {
        self.header.cast()
    }

    /// Current bump offset from the region base.
    pub fn pos(&self) -> usize {
        self.header().pos.get()
    }

    /// Highest physically backed offset.
    pub fn commit_pos(&self) -> usize {
        self.header().commit_pos.get()
    }

    /// The allocation ceiling: `pos` never exceeds it.
    pub fn size(&self) -> usize {
        self.header().size
    }

    /// Bytes of address space reserved; `size` rounded up to 64 MiB blocks.
    pub fn reserved(&self) -> usize {
        self.header().reserved
    }

    /// Default allocation alignment.
    pub fn align(&self) -> usize {
        self.header().align
    }

    /// Commit/decommit rounding unit.
    pub fn commit_granularity(&self) -> usize {
        self.header().commit_granularity
    }

    /// Bytes at the start of the region taken by the arena's own header.
    pub fn header_size(&self) -> usize {
        HEADER_SIZE
    }

    /// Bytes still available before the reservation is exhausted.
    pub fn remaining(&self) -> usize {
        self.size().saturating_sub(self.pos())
    }

    /// Bump-allocate a zeroed block for `layout`.
    ///
    /// The block is aligned to the larger of the arena's default alignment
    /// and `layout.align()`. Fails with [`AllocationError::OutOfMemory`] and
    /// no state change if the reservation cannot fit it; a failed commit is
    /// reported the same way and also leaves the arena untouched.
    pub fn alloc_layout(&self, layout: Layout) -> Result<NonNull<u8>, AllocationError> {
        if layout.size() == 0 {
            return Ok(dangling(layout));
        }
        let header = self.header();
        let base = self.base();
        let base_addr = base.as_ptr() as usize;
        let align = header.align.max(layout.align());

        let pos = header.pos.get();
        let aligned_addr = base_addr
            .checked_add(pos)
            .and_then(|addr| align_up(addr, align))
            .ok_or(AllocationError::OutOfMemory)?;
        let aligned_pos = aligned_addr - base_addr;
        let new_pos = aligned_pos
            .checked_add(layout.size())
            .ok_or(AllocationError::OutOfMemory)?;
        if new_pos > header.size {
            return Err(AllocationError::OutOfMemory);
        }

        let commit_pos = header.commit_pos.get();
        if new_pos > commit_pos {
            // The reservation is a whole number of granules, so clamping
            // keeps commit_pos granule-aligned.
            let grow = align_up(new_pos - commit_pos, header.commit_granularity)
                .ok_or(AllocationError::OutOfMemory)?
                .min(header.reserved - commit_pos);
            // SAFETY: [commit_pos, commit_pos + grow) lies inside the reservation.
            unsafe { vm::commit(base.add(commit_pos), grow) }.inspect_err(|e| {
                warn!(offset = commit_pos, len = grow, error = %e, "arena commit failed")
            })?;
            trace!(offset = commit_pos, len = grow, "arena commit");
            header.commit_pos.set(commit_pos + grow);
        }
        header.pos.set(new_pos);

        // SAFETY: [aligned_pos, new_pos) is committed and owned by nobody else.
        unsafe {
            let ptr = base.add(aligned_pos);
            ptr::write_bytes(ptr.as_ptr(), 0, layout.size());
            Ok(ptr)
        }
    }

    /// Bump-allocate `size` zeroed bytes at the default alignment.
    pub fn alloc_raw(&self, size: usize) -> Result<NonNull<u8>, AllocationError> {
        let layout = Layout::from_size_align(size, 1).map_err(|_| AllocationError::InvalidArgument)?;
        self.alloc_layout(layout)
    }

    /// Move `value` into the arena.
    ///
    /// The value is never dropped; its memory is reclaimed by rewinding.
    pub fn alloc_value<T>(&self, value: T) -> Result<&mut T, AllocationError> {
        let ptr = self.alloc_layout(Layout::new::<T>())?.cast::<T>();
        // SAFETY: freshly allocated, aligned and exclusively ours.
        unsafe {
            ptr.as_ptr().write(value);
            Ok(&mut *ptr.as_ptr())
        }
    }

    /// Copy a slice into the arena.
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> Result<&mut [T], AllocationError> {
        let ptr = self.alloc_layout(Layout::for_value(src))?.cast::<T>();
        // SAFETY: destination is fresh and sized for src.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), src.len());
            Ok(slice::from_raw_parts_mut(ptr.as_ptr(), src.len()))
        }
    }

    /// Allocate a slice of `len` values produced by `f(index)`.
    ///
    /// Values are never dropped.
    pub fn alloc_slice_fill_with<T>(
        &self,
        len: usize,
        mut f: impl FnMut(usize) -> T,
    ) -> Result<&mut [T], AllocationError> {
        let layout = Layout::array::<T>(len).map_err(|_| AllocationError::OutOfMemory)?;
        let ptr = self.alloc_layout(layout)?.cast::<T>();
        for i in 0..len {
            // SAFETY: i < len, within the fresh allocation.
            unsafe { ptr.as_ptr().add(i).write(f(i)) };
        }
        // SAFETY: all len slots were initialised above.
        Ok(unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), len) })
    }

    /// Copy a string into the arena.
    pub fn alloc_str(&self, s: &str) -> Result<&mut str, AllocationError> {
        let bytes = self.alloc_slice_copy(s.as_bytes())?;
        // SAFETY: bytes were copied from a valid str.
        Ok(unsafe { std::str::from_utf8_unchecked_mut(bytes) })
    }

    /// Concatenate `parts` with `sep` between them into one arena string.
    pub fn join_str(&self, parts: &[&str], sep: &str) -> Result<&mut str, AllocationError> {
        let separators = sep.len().checked_mul(parts.len().saturating_sub(1));
        let total = parts
            .iter()
            .try_fold(0usize, |acc, p| acc.checked_add(p.len()))
            .zip(separators)
            .and_then(|(a, b)| a.checked_add(b))
            .ok_or(AllocationError::OutOfMemory)?;
        let dst = self.alloc_raw(total)?.as_ptr();
        let mut at = 0;
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                // SAFETY: at + sep.len() <= total.
                unsafe { ptr::copy_nonoverlapping(sep.as_ptr(), dst.add(at), sep.len()) };
                at += sep.len();
            }
            // SAFETY: at + part.len() <= total.
            unsafe { ptr::copy_nonoverlapping(part.as_ptr(), dst.add(at), part.len()) };
            at += part.len();
        }
        // SAFETY: total bytes initialised from valid UTF-8 pieces.
        Ok(unsafe { std::str::from_utf8_unchecked_mut(slice::from_raw_parts_mut(dst, total)) })
    }

    /// Rewind the bump offset to `pos`.
    ///
    /// `pos` is clamped to `[HEADER_SIZE, self.pos()]`. Whole granules above
    /// the new offset are decommitted, but only once at least one full
    /// granule is reclaimable; the partially used last granule stays
    /// committed so allocations hovering around a boundary do not thrash.
    pub fn pop_to(&mut self, pos: usize) {
        let header = self.header();
        let new_pos = pos.clamp(HEADER_SIZE, header.pos.get());
        header.pos.set(new_pos);

        let granularity = header.commit_granularity;
        let commit_pos = header.commit_pos.get();
        // new_pos <= commit_pos and commit_pos is granule-aligned, so keep <= commit_pos.
        let keep = align_up(new_pos, granularity).unwrap_or(commit_pos);
        if keep.saturating_add(granularity) <= commit_pos {
            let len = commit_pos - keep;
            // SAFETY: [keep, commit_pos) is committed, inside the reservation,
            // and unreachable: every borrow into it ended before &mut self.
            unsafe { vm::decommit(self.base().add(keep), len) };
            trace!(offset = keep, len, "arena decommit");
            header.commit_pos.set(keep);
        }
    }

    /// Rewind by `size` bytes (saturating at the header).
    pub fn pop(&mut self, size: usize) {
        let pos = self.pos();
        self.pop_to(pos - size.min(pos));
    }

    /// Rewind to an empty arena.
    pub fn reset(&mut self) {
        self.pop_to(0);
    }

    /// Open a scope that rewinds to the current offset when it ends.
    pub fn temp(&mut self) -> Temp<'_> {
        Temp::begin(self)
    }
}

// SAFETY: alloc_layout returns zeroed, aligned, exclusive memory that stays
// valid while the arena is shared (rewinding needs &mut).
unsafe impl Allocator for Arena {
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>, AllocationError> {
        self.alloc_layout(layout)
    }

    unsafe fn free(&self, _ptr: NonNull<u8>, _layout: Layout) {
        // Arena memory is reclaimed in bulk by pop_to / drop only.
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        let reserved = self.reserved();
        debug!(reserved, committed = self.commit_pos(), "arena released");
        // SAFETY: we own the reservation; the header is not touched again.
        unsafe { vm::release(self.base(), reserved) }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("pos", &self.pos())
            .field("commit_pos", &self.commit_pos())
            .field("size", &self.size())
            .field("reserved", &self.reserved())
            .field("align", &self.align())
            .field("commit_granularity", &self.commit_granularity())
            .finish()
    }
}
