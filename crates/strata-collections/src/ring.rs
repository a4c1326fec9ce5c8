//! Growable FIFO ring buffer over an explicit allocator.
//!
//! [`RingBuffer`] keeps elements in a circular buffer addressed by
//! `(head + i) % capacity`. When full it grows ×2 (floor 1) and unrolls the
//! wrapped contents into the new buffer, so FIFO order survives growth.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use strata_core::{alloc_array, free_array, AllocationError, Allocator, Heap};

/// A growable first-in, first-out queue.
pub struct RingBuffer<T, A: Allocator = Heap> {
    ptr: NonNull<T>,
    head: usize,
    len: usize,
    capacity: usize,
    alloc: A,
    _owns: PhantomData<T>,
}

// SAFETY: the ring owns its elements like VecDeque.
unsafe impl<T: Send, A: Allocator + Send> Send for RingBuffer<T, A> {}
// SAFETY: &RingBuffer only hands out &T and &A.
unsafe impl<T: Sync, A: Allocator + Sync> Sync for RingBuffer<T, A> {}

impl<T> RingBuffer<T, Heap> {
    /// An empty heap-backed ring with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocationError> {
        Self::with_capacity_in(capacity, Heap)
    }
}

impl<T, A: Allocator> RingBuffer<T, A> {
    /// An empty ring with room for `capacity` elements.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self, AllocationError> {
        let ptr = alloc_array::<T, A>(&alloc, capacity)?;
        Ok(Self {
            ptr,
            head: 0,
            len: 0,
            capacity,
            alloc,
            _owns: PhantomData,
        })
    }

    /// Number of queued elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots available without reallocating.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Physical slot of logical index `i` (`i < capacity`).
    #[inline]
    fn slot(&self, i: usize) -> usize {
        let at = self.head + i;
        if at >= self.capacity {
            at - self.capacity
        } else {
            at
        }
    }

    fn grow(&mut self) -> Result<(), AllocationError> {
        let new_capacity = self
            .capacity
            .checked_mul(2)
            .ok_or(AllocationError::OutOfMemory)?
            .max(1);
        let new_ptr = alloc_array::<T, A>(&self.alloc, new_capacity)?;
        // Unroll [head, capacity) then [0, head) into the front of the new buffer.
        let first = (self.capacity - self.head).min(self.len);
        // SAFETY: both runs are live and the new buffer has room for len.
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr().add(self.head), new_ptr.as_ptr(), first);
            ptr::copy_nonoverlapping(
                self.ptr.as_ptr(),
                new_ptr.as_ptr().add(first),
                self.len - first,
            );
            if self.capacity != 0 {
                free_array(&self.alloc, self.ptr, self.capacity);
            }
        }
        self.ptr = new_ptr;
        self.head = 0;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Enqueue `value` at the back, growing when full.
    ///
    /// On allocation failure the ring is unchanged and `value` is handed back.
    pub fn push_back(&mut self, value: T) -> Result<(), (T, AllocationError)> {
        if self.len == self.capacity {
            if let Err(error) = self.grow() {
                return Err((value, error));
            }
        }
        let slot = self.slot(self.len);
        // SAFETY: slot is free since len < capacity.
        unsafe { self.ptr.as_ptr().add(slot).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Dequeue the front element.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        // SAFETY: head is live when len > 0.
        let value = unsafe { self.ptr.as_ptr().add(self.head).read() };
        self.head = self.slot(1);
        self.len -= 1;
        if self.len == 0 {
            self.head = 0;
        }
        Some(value)
    }

    /// The front element without removing it.
    pub fn front(&self) -> Option<&T> {
        // SAFETY: head is live when len > 0.
        (self.len > 0).then(|| unsafe { &*self.ptr.as_ptr().add(self.head) })
    }

    /// Drop every queued element, keeping the capacity.
    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
    }

    /// Queued elements from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        // SAFETY: logical indices below len map to live slots.
        (0..self.len).map(move |i| unsafe { &*self.ptr.as_ptr().add(self.slot(i)) })
    }
}

impl<T, A: Allocator> Drop for RingBuffer<T, A> {
    fn drop(&mut self) {
        self.clear();
        if self.capacity != 0 {
            // SAFETY: buffer came from alloc_array with this capacity.
            unsafe { free_array(&self.alloc, self.ptr, self.capacity) }
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for RingBuffer<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
