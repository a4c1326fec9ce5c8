//! Open-addressing hash map over an explicit allocator.
//!
//! Keys and values live in two parallel buffers of `capacity` slots. A slot
//! is free when its key is the policy's vacant key (`K::default()`), so the
//! vacant key itself can never be stored.
//!
//! # Probing
//!
//! Lookup and insertion scan linearly from the key's home slot to the end of
//! the table and never wrap around to slot 0. Free slots do not terminate a
//! lookup (removal leaves no tombstones). When insertion finds no free slot
//! in `[home, capacity)` the table doubles, as many times as needed, until
//! every live entry and the new key can be placed.
//!
//! ```text
//! capacity 4, Modulo policy
//!   push 3 → slot 3
//!   push 7 → home 3 occupied, nothing after it → rehash to 8 → 3:3, 7:7
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};
use std::slice;

use strata_core::{alloc_array, free_array, AllocationError, Allocator, Heap};
use tracing::debug;

use crate::array::DynArray;

/// How a [`HashMap`] hashes, compares and recognises free keys.
///
/// `is_vacant(&K::default())` must hold: fresh and removed slots are filled
/// with `K::default()`.
pub trait KeyPolicy<K> {
    /// Home slot of `key` in a table of `capacity` slots; must be
    /// `< capacity`.
    fn slot(key: &K, capacity: usize) -> usize;

    /// Whether two keys are the same entry.
    fn matches(a: &K, b: &K) -> bool;

    /// Whether `key` marks a free slot.
    fn is_vacant(key: &K) -> bool;
}

/// DJB2 string hashing for byte-like keys; the empty key is vacant.
#[derive(Clone, Copy, Debug, Default)]
pub struct Djb2;

/// The DJB2 hash: `h = h * 33 + byte`, starting from 5381, wrapping.
pub fn djb2(bytes: &[u8]) -> u64 {
    bytes.iter().fold(5381u64, |hash, &b| {
        (hash << 5).wrapping_add(hash).wrapping_add(u64::from(b))
    })
}

impl<K: AsRef<[u8]>> KeyPolicy<K> for Djb2 {
    fn slot(key: &K, capacity: usize) -> usize {
        (djb2(key.as_ref()) % capacity as u64) as usize
    }

    fn matches(a: &K, b: &K) -> bool {
        a.as_ref() == b.as_ref()
    }

    fn is_vacant(key: &K) -> bool {
        key.as_ref().is_empty()
    }
}

/// Integer keys hashed by value modulo capacity; zero is vacant.
#[derive(Clone, Copy, Debug, Default)]
pub struct Modulo;

/// Integer types usable with [`Modulo`].
pub trait IntegerKey: Copy + Eq + Default {
    /// The key's bits widened (sign-extended, then reinterpreted) to `u64`.
    fn to_u64(self) -> u64;
}

macro_rules! integer_key {
    ($($t:ty),*) => {
        $(impl IntegerKey for $t {
            #[inline]
            fn to_u64(self) -> u64 {
                self as u64
            }
        })*
    };
}

integer_key!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl<K: IntegerKey> KeyPolicy<K> for Modulo {
    fn slot(key: &K, capacity: usize) -> usize {
        (key.to_u64() % capacity as u64) as usize
    }

    fn matches(a: &K, b: &K) -> bool {
        a == b
    }

    fn is_vacant(key: &K) -> bool {
        *key == K::default()
    }
}

/// A key/value pair copied out of a map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pair<K, V> {
    /// The entry's key.
    pub key: K,
    /// The entry's value.
    pub value: V,
}

/// An open-addressing map with linear, non-wrapping probing.
///
/// `P` selects hashing and equality; the default suits string-like keys.
/// See [`IntMap`] for integer keys.
pub struct HashMap<K, V, A: Allocator = Heap, P = Djb2> {
    keys: NonNull<K>,
    values: NonNull<V>,
    capacity: usize,
    alloc: A,
    _marker: PhantomData<(K, V, fn() -> P)>,
}

/// A [`HashMap`] keyed by integers, with zero as the vacant key.
pub type IntMap<K, V, A = Heap> = HashMap<K, V, A, Modulo>;

// SAFETY: the map owns its keys and values; the policy is a marker.
unsafe impl<K: Send, V: Send, A: Allocator + Send, P> Send for HashMap<K, V, A, P> {}
// SAFETY: &HashMap only hands out &K, &V and &A.
unsafe impl<K: Sync, V: Sync, A: Allocator + Sync, P> Sync for HashMap<K, V, A, P> {}

impl<K: Default, V: Default, P: KeyPolicy<K>> HashMap<K, V, Heap, P> {
    /// A heap-backed map with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocationError> {
        Self::with_capacity_in(capacity, Heap)
    }
}

impl<K, V, A: Allocator, P> HashMap<K, V, A, P> {
    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The allocator backing this map.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    fn keys(&self) -> &[K] {
        // SAFETY: all capacity slots are initialised.
        unsafe { slice::from_raw_parts(self.keys.as_ptr(), self.capacity) }
    }

    fn keys_mut(&mut self) -> &mut [K] {
        // SAFETY: all capacity slots are initialised and exclusively ours.
        unsafe { slice::from_raw_parts_mut(self.keys.as_ptr(), self.capacity) }
    }

    fn values(&self) -> &[V] {
        // SAFETY: all capacity slots are initialised.
        unsafe { slice::from_raw_parts(self.values.as_ptr(), self.capacity) }
    }

    fn values_mut(&mut self) -> &mut [V] {
        // SAFETY: all capacity slots are initialised and exclusively ours.
        unsafe { slice::from_raw_parts_mut(self.values.as_ptr(), self.capacity) }
    }

    /// Drop every slot and return both buffers to `alloc`.
    ///
    /// # Safety
    ///
    /// `keys`/`values` must be fully initialised buffers of `capacity` slots
    /// obtained from `alloc` and not used afterwards.
    unsafe fn free_slots(alloc: &A, keys: NonNull<K>, values: NonNull<V>, capacity: usize) {
        // SAFETY: forwarded contract.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(keys.as_ptr(), capacity));
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(values.as_ptr(), capacity));
            free_array(alloc, keys, capacity);
            free_array(alloc, values, capacity);
        }
    }
}

impl<K: Default, V: Default, A: Allocator, P: KeyPolicy<K>> HashMap<K, V, A, P> {
    /// A map with `capacity` slots backed by `alloc`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self, AllocationError> {
        assert!(capacity > 0, "hash map capacity must be > 0");
        debug_assert!(P::is_vacant(&K::default()), "default key must be vacant");
        let (keys, values) = Self::alloc_slots(&alloc, capacity)?;
        Ok(Self {
            keys,
            values,
            capacity,
            alloc,
            _marker: PhantomData,
        })
    }

    fn alloc_slots(alloc: &A, capacity: usize) -> Result<(NonNull<K>, NonNull<V>), AllocationError> {
        let keys = alloc_array::<K, A>(alloc, capacity)?;
        let values = match alloc_array::<V, A>(alloc, capacity) {
            Ok(values) => values,
            Err(error) => {
                // SAFETY: keys came from alloc_array above and holds no values.
                unsafe { free_array(alloc, keys, capacity) };
                return Err(error);
            }
        };
        for i in 0..capacity {
            // SAFETY: i < capacity in both fresh buffers.
            unsafe {
                keys.as_ptr().add(i).write(K::default());
                values.as_ptr().add(i).write(V::default());
            }
        }
        Ok((keys, values))
    }

    fn position(&self, key: &K) -> Option<usize> {
        if P::is_vacant(key) {
            return None;
        }
        let keys = self.keys();
        (P::slot(key, self.capacity)..self.capacity).find(|&i| P::matches(&keys[i], key))
    }

    fn vacant_from(&self, start: usize) -> Option<usize> {
        let keys = self.keys();
        (start..self.capacity).find(|&i| P::is_vacant(&keys[i]))
    }

    /// The value stored under `key`.
    pub fn find(&self, key: &K) -> Option<&V> {
        self.position(key).map(|i| &self.values()[i])
    }

    /// The value stored under `key`, mutably.
    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        let i = self.position(key)?;
        Some(&mut self.values_mut()[i])
    }

    /// Whether `key` has an entry.
    pub fn contains_key(&self, key: &K) -> bool {
        self.position(key).is_some()
    }

    /// Insert or overwrite `key`, returning the stored value.
    ///
    /// Grows the table when no free slot exists at or after the key's home
    /// slot. Vacant keys are rejected with
    /// [`AllocationError::InvalidArgument`]. On allocation failure the map
    /// is unchanged.
    pub fn push(&mut self, key: K, value: V) -> Result<&mut V, AllocationError> {
        if P::is_vacant(&key) {
            return Err(AllocationError::InvalidArgument);
        }
        let index = match self.position(&key) {
            Some(i) => i,
            None => {
                let found = self.vacant_from(P::slot(&key, self.capacity));
                let i = match found {
                    Some(i) => i,
                    None => {
                        self.grow_for(&key)?;
                        self.vacant_from(P::slot(&key, self.capacity))
                            .ok_or(AllocationError::OutOfMemory)?
                    }
                };
                self.keys_mut()[i] = key;
                i
            }
        };
        let slot = &mut self.values_mut()[index];
        *slot = value;
        Ok(slot)
    }

    /// Remove `key`, returning its value.
    ///
    /// The slot is reset to the default key and value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let i = self.position(key)?;
        self.keys_mut()[i] = K::default();
        Some(mem::take(&mut self.values_mut()[i]))
    }

    /// Reset every slot to empty, keeping the capacity.
    pub fn reset(&mut self) {
        self.keys_mut().iter_mut().for_each(|k| *k = K::default());
        self.values_mut().iter_mut().for_each(|v| *v = V::default());
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.keys()
            .iter()
            .zip(self.values())
            .filter(|(k, _)| !P::is_vacant(k))
    }

    /// Number of live entries. Scans every slot.
    pub fn len(&self) -> usize {
        self.keys().iter().filter(|k| !P::is_vacant(k)).count()
    }

    /// Whether no slot holds an entry.
    pub fn is_empty(&self) -> bool {
        self.keys().iter().all(|k| P::is_vacant(k))
    }

    /// Copy every live entry, in slot order, into an array backed by
    /// `alloc` with capacity equal to this map's capacity.
    pub fn key_value_pairs_in<B: Allocator>(
        &self,
        alloc: B,
    ) -> Result<DynArray<Pair<K, V>, B>, AllocationError>
    where
        K: Clone,
        V: Clone,
    {
        let mut pairs = DynArray::try_with_capacity_in(self.capacity, alloc)?;
        for (key, value) in self.iter() {
            pairs.push(Pair {
                key: key.clone(),
                value: value.clone(),
            })?;
        }
        Ok(pairs)
    }

    /// [`key_value_pairs_in`](Self::key_value_pairs_in) on the heap.
    pub fn key_value_pairs(&self) -> Result<DynArray<Pair<K, V>>, AllocationError>
    where
        K: Clone,
        V: Clone,
    {
        self.key_value_pairs_in(Heap)
    }

    /// Check whether every live entry (in slot order) followed by `pending`
    /// can be placed in a table of `capacity` slots without wrapping.
    fn plan_fits(&self, capacity: usize, pending: &K) -> Result<bool, AllocationError> {
        let mut occupancy = Occupancy::new(&self.alloc, capacity)?;
        for key in self.keys().iter().filter(|k| !P::is_vacant(k)) {
            if !occupancy.claim_from(P::slot(key, capacity)) {
                return Ok(false);
            }
        }
        Ok(occupancy.claim_from(P::slot(pending, capacity)))
    }

    /// Double the table until `pending` fits, then move every entry over.
    fn grow_for(&mut self, pending: &K) -> Result<(), AllocationError> {
        let old_capacity = self.capacity;
        let mut new_capacity = old_capacity;
        loop {
            new_capacity = new_capacity
                .checked_mul(2)
                .ok_or(AllocationError::OutOfMemory)?;
            if self.plan_fits(new_capacity, pending)? {
                break;
            }
        }

        let (keys, values) = Self::alloc_slots(&self.alloc, new_capacity)?;
        // SAFETY: fresh, initialised buffers of new_capacity slots.
        let new_keys = unsafe { slice::from_raw_parts_mut(keys.as_ptr(), new_capacity) };
        let new_values = unsafe { slice::from_raw_parts_mut(values.as_ptr(), new_capacity) };
        let mut live = 0usize;
        for i in 0..old_capacity {
            if P::is_vacant(&self.keys()[i]) {
                continue;
            }
            let home = P::slot(&self.keys()[i], new_capacity);
            let j = (home..new_capacity)
                .find(|&j| P::is_vacant(&new_keys[j]))
                .unwrap_or_else(|| unreachable!("rehash plan guarantees a free slot"));
            mem::swap(&mut new_keys[j], &mut self.keys_mut()[i]);
            mem::swap(&mut new_values[j], &mut self.values_mut()[i]);
            live += 1;
        }

        let old_keys = mem::replace(&mut self.keys, keys);
        let old_values = mem::replace(&mut self.values, values);
        self.capacity = new_capacity;
        // SAFETY: the old buffers now hold only default slots and are no
        // longer referenced by the map.
        unsafe { Self::free_slots(&self.alloc, old_keys, old_values, old_capacity) };
        debug!(old_capacity, new_capacity, live, "hash map rehash");
        Ok(())
    }
}

impl<K, V, A: Allocator, P> Drop for HashMap<K, V, A, P> {
    fn drop(&mut self) {
        // SAFETY: both buffers are live, initialised and owned by us.
        unsafe { Self::free_slots(&self.alloc, self.keys, self.values, self.capacity) }
    }
}

impl<K: fmt::Debug + Default, V: fmt::Debug + Default, A: Allocator, P: KeyPolicy<K>> fmt::Debug
    for HashMap<K, V, A, P>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Zeroed scratch bitmap used to plan a rehash before anything moves.
///
/// Drawn from the map's own allocator; in an arena it stays allocated until
/// the arena is rewound.
struct Occupancy<'a, A: Allocator> {
    taken: NonNull<bool>,
    len: usize,
    alloc: &'a A,
}

impl<'a, A: Allocator> Occupancy<'a, A> {
    fn new(alloc: &'a A, len: usize) -> Result<Self, AllocationError> {
        // Zeroed memory is a valid all-false bool buffer.
        let taken = alloc_array::<bool, A>(alloc, len)?;
        Ok(Self { taken, len, alloc })
    }

    /// Claim the first free slot in `[start, len)`.
    fn claim_from(&mut self, start: usize) -> bool {
        // SAFETY: len zero-initialised bools.
        let taken = unsafe { slice::from_raw_parts_mut(self.taken.as_ptr(), self.len) };
        match taken[start..].iter().position(|t| !*t) {
            Some(offset) => {
                taken[start + offset] = true;
                true
            }
            None => false,
        }
    }
}

impl<A: Allocator> Drop for Occupancy<'_, A> {
    fn drop(&mut self) {
        // SAFETY: allocated in new from the same allocator with the same length.
        unsafe { free_array(self.alloc, self.taken, self.len) }
    }
}
