//! Open-Addressed Int-Keyed Slot Map
//!
//! This module provides [`IntKeyMap`], the lookup half of the substrate: an
//! open-addressed hash table keyed by `i32` an ECS layer uses to answer
//! "where is the data for entity E" in one probe.
//!
//! ## Design
//! - **Parallel arrays.** Keys and values live in separate allocations: a
//!   key array of `capacity + GUARD_SLOTS` cells (sentinel-terminated, see
//!   [`types`](crate::substrate::types)) and a value array of `capacity`
//!   cells. Separating them keeps the probe loop scanning nothing but keys.
//! - **Linear probing.** A key's chain starts at `mix(key) & mask` and runs
//!   forward with wraparound; the probe engine scans it eight slots at a
//!   time where the CPU allows.
//! - **Backward-shift deletion.** Removal refills the hole by walking the
//!   chain forward and pulling back every entry whose desired slot lies
//!   circularly at or before the hole, so no tombstones exist and the chain
//!   invariant survives arbitrary insert/remove sequences.
//! - **Load-factor growth.** Capacity doubles once the live count exceeds
//!   `floor(capacity × load_factor)`; every entry is re-probed into the new
//!   arrays and all outstanding slot tokens are invalidated.
//!
//! ## Safety model
//! Value cells are `MaybeUninit<V>`; cell `i` is initialized **iff**
//! `keys[i]` holds a live key (neither FREE nor END). Every `unsafe` block
//! in this module relies on that invariant alone, and every mutation
//! re-establishes it before returning. Accessors assert liveness before
//! dereferencing a cell, so a stale token can panic but cannot read
//! uninitialized memory.
//!
//! ## Concurrency
//! Single-threaded by design: shared reads are safe, mutation requires
//! `&mut self`, and value views borrow the whole map, so the borrow checker
//! enforces the sharing policy statically.

use std::fmt;
use std::mem::MaybeUninit;

use crate::substrate::error::{
    CapacityRangeError, InvalidSlotError, KeyNotFoundError, LoadFactorRangeError,
    ReservedKeyError, SubstrateResult,
};
use crate::substrate::hashing;
use crate::substrate::probe::{probe, ProbeOutcome};
use crate::substrate::types::{
    Key, SlotToken, DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR, GUARD_SLOTS, KEY_END, KEY_FREE,
    MAX_CAPACITY, MIN_CAPACITY,
};

#[inline]
fn is_reserved(key: Key) -> bool {
    key == KEY_FREE || key == KEY_END
}

fn alloc_keys(capacity: usize) -> Box<[Key]> {
    let mut keys = vec![KEY_FREE; capacity + GUARD_SLOTS].into_boxed_slice();
    for guard in &mut keys[capacity..] {
        *guard = KEY_END;
    }
    keys
}

fn alloc_values<V>(capacity: usize) -> Box<[MaybeUninit<V>]> {
    (0..capacity).map(|_| MaybeUninit::uninit()).collect()
}

fn max_count_for(capacity: usize, load_factor: f32) -> usize {
    (((capacity as f64) * f64::from(load_factor)) as usize).max(1)
}

/// Open-addressed hash map from `i32` keys to values of type `V`.
///
/// ## Capacity
/// Always a power of two in `[MIN_CAPACITY, MAX_CAPACITY]`. The map grows
/// by doubling once the live count exceeds `floor(capacity × load_factor)`
/// and never shrinks.
///
/// ## Tokens
/// Lookups yield [`SlotToken`]s that name slots directly, so repeated
/// access to the same entry costs one array index instead of a re-probe.
/// Any mutating operation invalidates all outstanding tokens.
///
/// ## Reserved keys
/// `−1` and `−2` are slot sentinels and are rejected on insertion.
pub struct IntKeyMap<V> {
    /// Live slot keys followed by the END guard.
    keys: Box<[Key]>,
    /// Value cells; cell `i` is initialized iff `keys[i]` is a live key.
    values: Box<[MaybeUninit<V>]>,
    capacity: usize,
    mask: u32,
    count: usize,
    max_count: usize,
    load_factor: f32,
}

impl<V> IntKeyMap<V> {
    /// Map with the default capacity (256) and load factor (0.75).
    pub fn new() -> Self {
        Self::with_pot_capacity(DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR)
    }

    /// Map with explicit construction parameters.
    ///
    /// `initial_capacity` is rounded up to the next power of two and must
    /// lie in `[MIN_CAPACITY, MAX_CAPACITY]`; `load_factor` must lie in the
    /// open interval `(0, 1)`.
    pub fn with_capacity_and_load_factor(
        initial_capacity: usize,
        load_factor: f32,
    ) -> SubstrateResult<Self> {
        if initial_capacity < MIN_CAPACITY || initial_capacity > MAX_CAPACITY {
            return Err(CapacityRangeError { requested: initial_capacity }.into());
        }
        if !(load_factor > 0.0 && load_factor < 1.0) {
            return Err(LoadFactorRangeError { requested: load_factor }.into());
        }
        Ok(Self::with_pot_capacity(
            hashing::round_up_to_power_of_two(initial_capacity),
            load_factor,
        ))
    }

    fn with_pot_capacity(capacity: usize, load_factor: f32) -> Self {
        debug_assert!(hashing::is_power_of_two(capacity));
        IntKeyMap {
            keys: alloc_keys(capacity),
            values: alloc_values(capacity),
            capacity,
            mask: (capacity - 1) as u32,
            count: 0,
            max_count: max_count_for(capacity, load_factor),
            load_factor,
        }
    }

    /// Number of live entries.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Current slot capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Configured load factor.
    #[inline]
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Locates `key`.
    ///
    /// Returns `(true, token)` when the key is present. When it is absent
    /// the token names the first FREE slot of the key's probe chain — the
    /// slot an insertion would claim — and callers that only wanted
    /// presence should discard it. Like every token, it is invalidated by
    /// the next mutating operation.
    ///
    /// Reserved keys are never stored, so they report absent with a token
    /// that no access method accepts.
    pub fn find(&self, key: Key) -> (bool, SlotToken) {
        if is_reserved(key) {
            return (false, SlotToken::invalid());
        }
        match probe(&self.keys, self.capacity, self.mask, key) {
            ProbeOutcome::Present(slot) => (true, SlotToken::new(slot)),
            ProbeOutcome::Absent(slot) => (false, SlotToken::new(slot)),
        }
    }

    /// Returns `true` if `key` is present.
    #[inline]
    pub fn contains_key(&self, key: Key) -> bool {
        self.find(key).0
    }

    /// Shared reference to the value stored for `key`, if present.
    pub fn get(&self, key: Key) -> Option<&V> {
        let (found, token) = self.find(key);
        if !found {
            return None;
        }
        Some(self.value_ref(token))
    }

    /// Mutable reference to the value stored for `key`, if present.
    pub fn get_mut(&mut self, key: Key) -> Option<&mut V> {
        let (found, token) = self.find(key);
        if !found {
            return None;
        }
        Some(self.value_of(token))
    }

    /// Mutable reference to the value stored for `key`, failing with
    /// [`KeyNotFoundError`] when the key is absent.
    pub fn value_for(&mut self, key: Key) -> SubstrateResult<&mut V> {
        let (found, token) = self.find(key);
        if !found {
            return Err(KeyNotFoundError { key }.into());
        }
        Ok(self.value_of(token))
    }

    /// Inserts `value` under `key`, overwriting any previous value.
    ///
    /// Returns the token of the slot now holding the entry. An insertion
    /// that pushes the live count past the growth threshold doubles the
    /// capacity and re-resolves the token against the new layout.
    pub fn insert(&mut self, key: Key, value: V) -> SubstrateResult<SlotToken> {
        if is_reserved(key) {
            return Err(ReservedKeyError { key }.into());
        }
        match probe(&self.keys, self.capacity, self.mask, key) {
            ProbeOutcome::Present(slot) => {
                // SAFETY: the slot is live, so the cell is initialized.
                unsafe { self.values[slot].assume_init_drop() };
                self.values[slot].write(value);
                Ok(SlotToken::new(slot))
            }
            ProbeOutcome::Absent(slot) => self.claim(slot, key, value),
        }
    }

    /// Token for `key`, inserting `V::default()` first when absent.
    pub fn find_or_insert(&mut self, key: Key) -> SubstrateResult<SlotToken>
    where
        V: Default,
    {
        if is_reserved(key) {
            return Err(ReservedKeyError { key }.into());
        }
        match probe(&self.keys, self.capacity, self.mask, key) {
            ProbeOutcome::Present(slot) => Ok(SlotToken::new(slot)),
            ProbeOutcome::Absent(slot) => self.claim(slot, key, V::default()),
        }
    }

    /// Writes a new entry into a FREE slot located by the probe, growing
    /// afterwards when the threshold is crossed.
    fn claim(&mut self, slot: usize, key: Key, value: V) -> SubstrateResult<SlotToken> {
        debug_assert_eq!(self.keys[slot], KEY_FREE);
        self.keys[slot] = key;
        self.values[slot].write(value);
        self.count += 1;
        if self.count > self.max_count {
            self.grow();
            // Slot indices changed wholesale; re-resolve against the new
            // layout.
            let (found, token) = self.find(key);
            debug_assert!(found);
            return Ok(token);
        }
        Ok(SlotToken::new(slot))
    }

    /// Doubles the capacity and re-probes every live entry into the new
    /// arrays. Values move bitwise; the old storage is released without
    /// dropping the moved-out cells.
    fn grow(&mut self) {
        let old_capacity = self.capacity;
        let new_capacity = hashing::next_power_of_two(old_capacity);
        debug_assert!(new_capacity <= MAX_CAPACITY);

        let old_keys = std::mem::replace(&mut self.keys, alloc_keys(new_capacity));
        let old_values = std::mem::replace(&mut self.values, alloc_values(new_capacity));
        self.capacity = new_capacity;
        self.mask = (new_capacity - 1) as u32;
        self.max_count = max_count_for(new_capacity, self.load_factor);

        for (old_slot, &key) in old_keys.iter().take(old_capacity).enumerate() {
            if key == KEY_FREE {
                continue;
            }
            match probe(&self.keys, self.capacity, self.mask, key) {
                ProbeOutcome::Absent(new_slot) => {
                    self.keys[new_slot] = key;
                    // SAFETY: the old slot was live, so its cell is
                    // initialized; reading it moves the value out exactly
                    // once because the old array is released untouched.
                    let value = unsafe { old_values[old_slot].assume_init_read() };
                    self.values[new_slot].write(value);
                }
                ProbeOutcome::Present(_) => {
                    debug_assert!(false, "duplicate key while rebuilding");
                }
            }
        }
    }

    /// Removes the entry named by `token` and returns its value.
    ///
    /// The hole is refilled by the backward shift, so the chain invariant
    /// holds afterwards and all other outstanding tokens are invalidated.
    /// A token naming a FREE or out-of-range slot fails with
    /// [`InvalidSlotError`].
    pub fn remove(&mut self, token: SlotToken) -> SubstrateResult<V> {
        let slot = token.slot();
        if slot >= self.capacity || self.keys[slot] == KEY_FREE {
            return Err(InvalidSlotError { slot: slot as u32 }.into());
        }
        // SAFETY: the slot is live, so the cell is initialized; the
        // backward shift below treats it as vacant from here on.
        let value = unsafe { self.values[slot].assume_init_read() };
        self.backward_shift(slot);
        self.count -= 1;
        Ok(value)
    }

    /// Removes every present key yielded by `keys`; absent keys are
    /// ignored.
    pub fn remove_all<I: IntoIterator<Item = Key>>(&mut self, keys: I) {
        for key in keys {
            let (found, token) = self.find(key);
            if found {
                // Present keys always remove cleanly; the value drops here.
                let _ = self.remove(token);
            }
        }
    }

    /// Walks the chain after a freshly vacated slot, pulling back every
    /// entry that is better off closer to the hole.
    ///
    /// An entry at `index` with desired slot `desired` shifts exactly when
    /// the hole lies on the circular segment `[desired, index)` — its
    /// displacement shrinks without breaking reachability. The walk ends at
    /// the first FREE slot, and the final hole is marked FREE.
    fn backward_shift(&mut self, vacated: usize) {
        let mask = self.mask as usize;
        let mut hole = vacated;
        let mut index = vacated;
        loop {
            index = (index + 1) & mask;
            let key = self.keys[index];
            if key == KEY_FREE {
                break;
            }
            let desired = hashing::slot_of(hashing::mix(key), self.mask);
            let shifts = if hole == desired {
                true
            } else if index == desired {
                false
            } else if index > desired {
                hole > desired && hole < index
            } else {
                hole < index || hole > desired
            };
            if shifts {
                self.keys[hole] = key;
                // SAFETY: `index` is live, so its cell is initialized; the
                // move leaves `index` the new logical hole and `hole`
                // initialized, matching the keys written above.
                let value = unsafe { self.values[index].assume_init_read() };
                self.values[hole].write(value);
                hole = index;
            }
        }
        self.keys[hole] = KEY_FREE;
    }

    /// Drops every live value and marks all slots FREE. Capacity and load
    /// factor are retained, so the map is immediately reusable.
    pub fn clear(&mut self) {
        if std::mem::needs_drop::<V>() {
            for slot in 0..self.capacity {
                if self.keys[slot] != KEY_FREE {
                    // SAFETY: the slot is live, so the cell is initialized;
                    // the fill below marks it FREE before anyone can
                    // observe it again.
                    unsafe { self.values[slot].assume_init_drop() };
                }
            }
        }
        self.keys[..self.capacity].fill(KEY_FREE);
        self.count = 0;
    }

    /// Key stored at the slot named by `token`.
    ///
    /// A stale token may name a slot that has since been freed; the
    /// returned key is then the FREE sentinel.
    #[inline]
    pub fn key_of(&self, token: SlotToken) -> Key {
        debug_assert!(token.slot() < self.capacity, "stale or foreign slot token");
        self.keys[token.slot()]
    }

    /// Shared reference to the value at the slot named by `token`.
    ///
    /// ## Panics
    /// Panics if the token does not name a live slot.
    #[inline]
    pub fn value_ref(&self, token: SlotToken) -> &V {
        let slot = token.slot();
        assert!(
            slot < self.capacity && self.keys[slot] != KEY_FREE,
            "slot token does not name a live entry"
        );
        // SAFETY: the slot is live, so the cell is initialized.
        unsafe { self.values[slot].assume_init_ref() }
    }

    /// Mutable reference to the value at the slot named by `token`.
    ///
    /// The borrow is exclusive against the whole map, so the reference
    /// cannot outlive the next mutating operation.
    ///
    /// ## Panics
    /// Panics if the token does not name a live slot.
    #[inline]
    pub fn value_of(&mut self, token: SlotToken) -> &mut V {
        let slot = token.slot();
        assert!(
            slot < self.capacity && self.keys[slot] != KEY_FREE,
            "slot token does not name a live entry"
        );
        // SAFETY: the slot is live, so the cell is initialized.
        unsafe { self.values[slot].assume_init_mut() }
    }

    /// Iterates over the tokens of all live slots in storage order.
    ///
    /// The iterator skips FREE slots and stops at the END guard; mutating
    /// the map invalidates it (the borrow checker enforces this).
    pub fn tokens(&self) -> Tokens<'_> {
        Tokens { keys: &self.keys, slot: 0 }
    }

    /// Iterates over `(key, value)` pairs of all live slots in storage
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &V)> + '_ {
        self.tokens().map(move |token| {
            let slot = token.slot();
            // SAFETY: `tokens` yields only live slots.
            (self.keys[slot], unsafe { self.values[slot].assume_init_ref() })
        })
    }
}

impl<V> Default for IntKeyMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for IntKeyMap<V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<V> fmt::Debug for IntKeyMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntKeyMap")
            .field("count", &self.count)
            .field("capacity", &self.capacity)
            .field("load_factor", &self.load_factor)
            .finish_non_exhaustive()
    }
}

/// Storage-order iterator over the tokens of live slots.
pub struct Tokens<'a> {
    keys: &'a [Key],
    slot: usize,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = SlotToken;

    fn next(&mut self) -> Option<SlotToken> {
        loop {
            let key = self.keys[self.slot];
            if key == KEY_END {
                return None;
            }
            let slot = self.slot;
            self.slot += 1;
            if key != KEY_FREE {
                return Some(SlotToken::new(slot));
            }
        }
    }
}
