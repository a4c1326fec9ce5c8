//! The allocator capability and the general-purpose heap allocator.
//!
//! Containers never talk to an arena or the global allocator directly.
//! They hold some `A: Allocator` by value (usually a `&Arena`, which is
//! pointer-sized, or the zero-sized [`Heap`]) and route every buffer
//! acquisition and release through it.

use std::alloc::Layout;
use std::ptr::{self, NonNull};

use crate::error::AllocationError;

/// One kibibyte.
pub const KIB: usize = 1 << 10;
/// One mebibyte.
pub const MIB: usize = 1 << 20;
/// One gibibyte.
pub const GIB: usize = 1 << 30;

/// Allocation capability consumed by every Strata container.
///
/// # Safety
///
/// Implementors must uphold the following for every successful
/// [`alloc`](Allocator::alloc):
///
/// - the returned pointer is valid for reads and writes of
///   `layout.size()` bytes and aligned to `layout.align()`;
/// - the returned bytes are zero-initialised;
/// - the region does not overlap any other live allocation from the same
///   allocator;
/// - the region stays valid until it is passed to
///   [`free`](Allocator::free) or the allocator itself is invalidated
///   (dropped, or rewound through an exclusive borrow).
///
/// Zero-sized layouts must succeed and return [`dangling`]-style pointers
/// that are never dereferenced; freeing them must be a no-op.
pub unsafe trait Allocator {
    /// Allocate a zero-initialised block described by `layout`.
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>, AllocationError>;

    /// Release a block previously returned by [`alloc`](Allocator::alloc).
    ///
    /// Arena-backed implementations treat this as a no-op: their memory is
    /// reclaimed in bulk only.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `self.alloc(layout)` with the same `layout`, and
    /// must not be used afterwards.
    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout);
}

unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>, AllocationError> {
        (**self).alloc(layout)
    }

    #[inline]
    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded contract.
        unsafe { (**self).free(ptr, layout) }
    }
}

/// The general-purpose allocator backed by the global Rust allocator.
///
/// Unlike an arena, [`free`](Allocator::free) genuinely returns memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Heap;

unsafe impl Allocator for Heap {
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>, AllocationError> {
        if layout.size() == 0 {
            return Ok(dangling(layout));
        }
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        NonNull::new(ptr).ok_or(AllocationError::OutOfMemory)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() != 0 {
            // SAFETY: caller guarantees ptr came from alloc_zeroed(layout).
            unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
        }
    }
}

/// A well-aligned, non-null pointer for zero-sized allocations.
#[inline]
pub fn dangling(layout: Layout) -> NonNull<u8> {
    // SAFETY: Layout guarantees a non-zero (power of two) alignment.
    unsafe { NonNull::new_unchecked(ptr::without_provenance_mut(layout.align())) }
}

/// Round `value` up to the next multiple of `align`.
///
/// `align` must be a power of two. Returns `None` on overflow.
#[inline]
pub const fn align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two());
    match value.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

/// Allocate a zeroed buffer of `count` values of `T`.
///
/// Size overflow is reported as [`AllocationError::OutOfMemory`].
pub fn alloc_array<T, A: Allocator + ?Sized>(
    alloc: &A,
    count: usize,
) -> Result<NonNull<T>, AllocationError> {
    let layout = Layout::array::<T>(count).map_err(|_| AllocationError::OutOfMemory)?;
    alloc.alloc(layout).map(NonNull::cast)
}

/// Release a buffer obtained from [`alloc_array`].
///
/// # Safety
///
/// `ptr` must come from `alloc_array::<T>(alloc, count)` on the same
/// allocator and must not be used afterwards. Live values in the buffer are
/// not dropped.
pub unsafe fn free_array<T, A: Allocator + ?Sized>(alloc: &A, ptr: NonNull<T>, count: usize) {
    if let Ok(layout) = Layout::array::<T>(count) {
        // SAFETY: forwarded contract; same layout as the allocation.
        unsafe { alloc.free(ptr.cast(), layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_alloc_is_zeroed() {
        let layout = Layout::array::<u64>(32).unwrap();
        let ptr = Heap.alloc(layout).unwrap();
        let words = unsafe { std::slice::from_raw_parts(ptr.cast::<u64>().as_ptr(), 32) };
        assert!(words.iter().all(|&w| w == 0));
        unsafe { Heap.free(ptr, layout) };
    }

    #[test]
    fn zero_sized_alloc_is_dangling_and_aligned() {
        let layout = Layout::from_size_align(0, 64).unwrap();
        let ptr = Heap.alloc(layout).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 64, 0);
        unsafe { Heap.free(ptr, layout) };
    }

    #[test]
    fn reference_forwards_to_allocator() {
        let heap = Heap;
        let by_ref: &dyn Allocator = &heap;
        let buf = alloc_array::<u32, _>(&by_ref, 4).unwrap();
        unsafe { free_array(&by_ref, buf, 4) };
    }

    #[test]
    fn array_size_overflow_is_out_of_memory() {
        let err = alloc_array::<u64, _>(&Heap, usize::MAX).unwrap_err();
        assert_eq!(err, AllocationError::OutOfMemory);
    }

    #[test]
    fn align_up_rounds_to_multiple() {
        assert_eq!(align_up(0, 16), Some(0));
        assert_eq!(align_up(1, 16), Some(16));
        assert_eq!(align_up(16, 16), Some(16));
        assert_eq!(align_up(17, 4096), Some(4096));
        assert_eq!(align_up(usize::MAX, 2), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn align_up_is_smallest_multiple(value in 0usize..1 << 40, shift in 0u32..27) {
                let align = 1usize << shift;
                let aligned = align_up(value, align).unwrap();
                prop_assert_eq!(aligned % align, 0);
                prop_assert!(aligned >= value);
                prop_assert!(aligned - value < align);
            }
        }
    }
}
