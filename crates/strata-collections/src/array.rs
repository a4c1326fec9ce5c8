//! Growable contiguous array over an explicit allocator.
//!
//! [`DynArray`] behaves like a `Vec` whose buffer comes from any
//! [`Allocator`]. Growth is fallible: every operation that may reallocate
//! returns `Result`, and a failed reallocation leaves the array exactly as
//! it was.

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

use strata_core::{alloc_array, free_array, AllocationError, Allocator, Heap};
use tracing::warn;

/// A growable array whose buffer is owned through the allocator `A`.
///
/// Capacity doubles when full (from a floor of one slot). Elements are
/// dropped when removed, reset, or when the array itself is dropped; the
/// buffer is then returned through [`Allocator::free`].
pub struct DynArray<T, A: Allocator = Heap> {
    ptr: NonNull<T>,
    len: usize,
    capacity: usize,
    alloc: A,
    _owns: PhantomData<T>,
}

// SAFETY: DynArray owns its elements like Vec; the allocator is moved or
// shared along with it.
unsafe impl<T: Send, A: Allocator + Send> Send for DynArray<T, A> {}
// SAFETY: &DynArray only hands out &T and &A.
unsafe impl<T: Sync, A: Allocator + Sync> Sync for DynArray<T, A> {}

impl<T> DynArray<T, Heap> {
    /// An array on the heap with room for one element.
    pub fn new() -> Self {
        Self::new_in(Heap)
    }

    /// An array on the heap with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Heap)
    }
}

impl<T> Default for DynArray<T, Heap> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: Allocator> DynArray<T, A> {
    /// An array with room for one element.
    pub fn new_in(alloc: A) -> Self {
        Self::with_capacity_in(1, alloc)
    }

    /// An array with room for `capacity` elements.
    ///
    /// If the allocator cannot provide the buffer the array starts with
    /// capacity 0 instead; the first push retries the allocation. Use
    /// [`try_with_capacity_in`](Self::try_with_capacity_in) to observe the
    /// failure.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        match alloc_array::<T, A>(&alloc, capacity) {
            Ok(ptr) => Self::from_raw_parts(ptr, capacity, alloc),
            Err(error) => {
                warn!(capacity, %error, "array allocation failed, starting empty");
                Self::from_raw_parts(NonNull::dangling(), 0, alloc)
            }
        }
    }

    /// An array with room for `capacity` elements, or the allocation error.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, AllocationError> {
        let ptr = alloc_array::<T, A>(&alloc, capacity)?;
        Ok(Self::from_raw_parts(ptr, capacity, alloc))
    }

    fn from_raw_parts(ptr: NonNull<T>, capacity: usize, alloc: A) -> Self {
        Self {
            ptr,
            len: 0,
            capacity,
            alloc,
            _owns: PhantomData,
        }
    }

    /// Number of live elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slots available without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The allocator backing this array.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// The live elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first len slots are initialised.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The live elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: the first len slots are initialised and exclusively ours.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Reallocate to exactly `new_capacity` slots, moving live elements.
    ///
    /// On failure nothing changes.
    fn grow_to(&mut self, new_capacity: usize) -> Result<(), AllocationError> {
        debug_assert!(new_capacity >= self.len);
        let new_ptr = alloc_array::<T, A>(&self.alloc, new_capacity)?;
        // SAFETY: both buffers hold at least len slots and do not overlap;
        // the old buffer came from alloc_array with self.capacity.
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
            if self.capacity != 0 {
                free_array(&self.alloc, self.ptr, self.capacity);
            }
        }
        self.ptr = new_ptr;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Ensure room for `additional` more elements, growing to exactly
    /// `len + additional` if needed.
    pub fn reserve_exact(&mut self, additional: usize) -> Result<(), AllocationError> {
        let needed = self
            .len
            .checked_add(additional)
            .ok_or(AllocationError::OutOfMemory)?;
        if needed > self.capacity {
            self.grow_to(needed)?;
        }
        Ok(())
    }

    /// Append `value`, doubling capacity (minimum 1) when full.
    ///
    /// On allocation failure the array is unchanged and `value` is dropped.
    pub fn push(&mut self, value: T) -> Result<(), AllocationError> {
        if self.len == self.capacity {
            let doubled = self
                .capacity
                .checked_mul(2)
                .ok_or(AllocationError::OutOfMemory)?
                .max(1);
            self.grow_to(doubled)?;
        }
        // SAFETY: len < capacity after the growth check.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        // SAFETY: slot len was live; it is now outside the live range.
        Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
    }

    /// Remove element `index` in O(1) by moving the last element into its
    /// slot. Does not preserve order.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn unordered_remove(&mut self, index: usize) -> T {
        self.check_index(index);
        let last = self.len - 1;
        // SAFETY: index and last are live; after the read, last's value is
        // moved into index and last falls outside the live range.
        unsafe {
            let base = self.ptr.as_ptr();
            let removed = base.add(index).read();
            if index != last {
                ptr::copy_nonoverlapping(base.add(last), base.add(index), 1);
            }
            self.len = last;
            removed
        }
    }

    /// Remove element `index` in O(n), shifting later elements down.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn ordered_remove(&mut self, index: usize) -> T {
        self.check_index(index);
        // SAFETY: index is live; the shifted tail stays inside [0, len).
        unsafe {
            let base = self.ptr.as_ptr();
            let removed = base.add(index).read();
            ptr::copy(base.add(index + 1), base.add(index), self.len - index - 1);
            self.len -= 1;
            removed
        }
    }

    /// The element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn nth(&self, index: usize) -> &T {
        self.check_index(index);
        &self.as_slice()[index]
    }

    /// The element at `index`, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn nth_mut(&mut self, index: usize) -> &mut T {
        self.check_index(index);
        &mut self.as_mut_slice()[index]
    }

    /// Drop all elements and zero their storage, keeping the capacity.
    pub fn reset(&mut self) {
        let len = mem::replace(&mut self.len, 0);
        // SAFETY: [0, len) was live and is now outside the live range.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), len));
            ptr::write_bytes(self.ptr.as_ptr(), 0, len);
        }
    }

    #[inline]
    #[track_caller]
    fn check_index(&self, index: usize) {
        assert!(
            index < self.len,
            "index {index} out of bounds for array of length {}",
            self.len
        );
    }
}

impl<T: Clone, A: Allocator> DynArray<T, A> {
    /// Clone every element of `items` onto the end, reallocating at most
    /// once to exactly the required size.
    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<(), AllocationError> {
        self.reserve_exact(items.len())?;
        for item in items {
            // SAFETY: reserve_exact made room for items.len() elements.
            unsafe { self.ptr.as_ptr().add(self.len).write(item.clone()) };
            self.len += 1;
        }
        Ok(())
    }

    /// Clone every element of `other` onto the end.
    pub fn append<B: Allocator>(&mut self, other: &DynArray<T, B>) -> Result<(), AllocationError> {
        self.extend_from_slice(other.as_slice())
    }
}

impl<T, A: Allocator> Drop for DynArray<T, A> {
    fn drop(&mut self) {
        // SAFETY: [0, len) is live; the buffer came from alloc_array with
        // self.capacity and is not used again.
        unsafe {
            ptr::drop_in_place(self.as_mut_slice());
            if self.capacity != 0 {
                free_array(&self.alloc, self.ptr, self.capacity);
            }
        }
    }
}

impl<T, A: Allocator> Deref for DynArray<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for DynArray<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a DynArray<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for DynArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, A: Allocator> PartialEq<[T]> for DynArray<T, A> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}
