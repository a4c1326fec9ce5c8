//! Instrumented allocators for exercising container error paths.
//!
//! - [`CountingAllocator`] forwards to an inner allocator and tallies calls.
//! - [`FailingAllocator`] succeeds a fixed number of times, then reports
//!   [`AllocationError::OutOfMemory`].

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use strata_core::{AllocationError, Allocator, Heap};

/// Counts allocations, frees and live bytes on top of another allocator.
#[derive(Debug, Default)]
pub struct CountingAllocator<A = Heap> {
    inner: A,
    allocs: AtomicUsize,
    frees: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl CountingAllocator<Heap> {
    pub fn new() -> Self {
        Self::wrap(Heap)
    }
}

impl<A: Allocator> CountingAllocator<A> {
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            allocs: AtomicUsize::new(0),
            frees: AtomicUsize::new(0),
            live_bytes: AtomicUsize::new(0),
        }
    }

    /// Successful `alloc` calls so far.
    pub fn allocs(&self) -> usize {
        self.allocs.load(Ordering::Relaxed)
    }

    /// `free` calls so far.
    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::Relaxed)
    }

    /// Bytes allocated and not yet freed.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }
}

// SAFETY: every block comes straight from the inner allocator.
unsafe impl<A: Allocator> Allocator for CountingAllocator<A> {
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>, AllocationError> {
        let ptr = self.inner.alloc(layout)?;
        self.allocs.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_add(layout.size(), Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        self.frees.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(layout.size(), Ordering::Relaxed);
        // SAFETY: forwarded contract.
        unsafe { self.inner.free(ptr, layout) }
    }
}

/// Succeeds `budget` times, then fails every request.
///
/// Zero-sized requests still succeed once the budget is spent, matching
/// the trait contract.
#[derive(Debug)]
pub struct FailingAllocator<A = Heap> {
    inner: A,
    remaining: AtomicUsize,
}

impl FailingAllocator<Heap> {
    /// Allow `budget` successful allocations from the heap.
    pub fn after(budget: usize) -> Self {
        Self::wrap(Heap, budget)
    }

    /// Fail every non-empty allocation.
    pub fn always() -> Self {
        Self::after(0)
    }
}

impl<A: Allocator> FailingAllocator<A> {
    pub fn wrap(inner: A, budget: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(budget),
        }
    }

    /// Refill the success budget.
    pub fn set_budget(&self, budget: usize) {
        self.remaining.store(budget, Ordering::Relaxed);
    }
}

// SAFETY: successful blocks come straight from the inner allocator.
unsafe impl<A: Allocator> Allocator for FailingAllocator<A> {
    fn alloc(&self, layout: Layout) -> Result<NonNull<u8>, AllocationError> {
        if layout.size() == 0 {
            return self.inner.alloc(layout);
        }
        let granted = self
            .remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if !granted {
            tracing::trace!(size = layout.size(), "injected allocation failure");
            return Err(AllocationError::OutOfMemory);
        }
        self.inner.alloc(layout)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded contract.
        unsafe { self.inner.free(ptr, layout) }
    }
}
