//! Core Substrate Types, Sentinels, and Layout Constants
//!
//! This module defines the **fundamental types, sentinel values, and layout
//! constants** shared by the substrate primitives. These definitions form the
//! semantic backbone of the crate and are consumed by the hashing utilities,
//! the probe engine, the bitset, and the map container.
//!
//! ## Design Philosophy
//!
//! The substrate is designed around:
//!
//! - **Dense parallel-array storage**
//! - **Sentinel-terminated probing**
//! - **Stable numeric handles**
//! - **No heap allocation in hot paths**
//!
//! To support these goals efficiently, this module:
//!
//! - Fixes the key domain to 32-bit signed integers,
//! - Reserves two key values as slot sentinels,
//! - Sizes the guard region to the vector probe width,
//! - Validates the layout constants with compile-time assertions.
//!
//! ## Slot Layout
//!
//! A map's key array has `capacity + GUARD_SLOTS` cells:
//!
//! ```text
//! | live slots: FREE or a stored key | guard: END × 7 |
//! ```
//!
//! - **FREE** marks an empty live slot and bounds every probe chain.
//! - **END** fills the guard so that an 8-wide vector load starting at any
//!   live slot stays inside the allocation, and so that storage-order
//!   iteration terminates without a length check.
//!
//! Because both sentinels are reserved, neither can be stored as a real key;
//! insertion rejects them explicitly.

/// Key type stored by the map. The two negative sentinel values
/// [`KEY_FREE`] and [`KEY_END`] are reserved and cannot be inserted.
pub type Key = i32;

/// Sentinel key marking an empty live slot.
pub const KEY_FREE: Key = -1;
/// Sentinel key filling the guard region after the live slots.
pub const KEY_END: Key = -2;

/// Number of keys compared per vectorized probe step.
pub const PROBE_WIDTH: usize = 8;
/// Guard cells appended after the live slots so a [`PROBE_WIDTH`]-wide load
/// starting at the last live slot never reads past the allocation.
pub const GUARD_SLOTS: usize = PROBE_WIDTH - 1;

/// Smallest accepted initial capacity.
pub const MIN_CAPACITY: usize = 2;
/// Largest accepted capacity.
pub const MAX_CAPACITY: usize = 1 << 30;
/// Capacity used by [`IntKeyMap::new`](crate::substrate::map::IntKeyMap::new).
pub const DEFAULT_CAPACITY: usize = 256;
/// Load factor used by [`IntKeyMap::new`](crate::substrate::map::IntKeyMap::new).
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Number of flags in a [`FixedBitSet256`](crate::substrate::bitset::FixedBitSet256).
pub const BITSET_BITS: usize = 256;
/// Number of 64-bit words backing the bitset payload.
pub const BITSET_WORDS: usize = BITSET_BITS / 64;

const _: [(); 1] = [(); MIN_CAPACITY.is_power_of_two() as usize];
const _: [(); 1] = [(); MAX_CAPACITY.is_power_of_two() as usize];
const _: [(); 1] = [(); (GUARD_SLOTS == PROBE_WIDTH - 1) as usize];
const _: [(); 1] = [(); (BITSET_WORDS * 64 == BITSET_BITS) as usize];
const _: [(); 1] = [(); (KEY_FREE != KEY_END) as usize];

/// Opaque handle naming one slot of an [`IntKeyMap`](crate::substrate::map::IntKeyMap).
///
/// ## Purpose
/// Separates *locating* a slot from *reading or writing* its contents, so a
/// lookup can be hoisted out of a hot loop and its result reused.
///
/// ## Validity
/// A token is valid from the operation that produced it until the next
/// mutating operation (`insert`, `find_or_insert` that inserts, `remove`,
/// `remove_all`, `clear`) on the same map. Growth and backward-shift deletion
/// both relocate slots, so a token must never be carried across them.
///
/// Tokens are plain 32-bit integers: `Copy`, and equal exactly when they name
/// the same slot of the same map generation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SlotToken(u32);

impl SlotToken {
    #[inline]
    pub(crate) fn new(slot: usize) -> Self {
        debug_assert!(slot <= u32::MAX as usize);
        SlotToken(slot as u32)
    }

    /// Token that no access method accepts. Returned when a lookup cannot
    /// name a meaningful slot (reserved keys).
    #[inline]
    pub(crate) fn invalid() -> Self {
        SlotToken(u32::MAX)
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}
