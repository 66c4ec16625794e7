//! # ECS Substrate
//!
//! Memory substrate primitives for archetype-based Entity-Component-System
//! engines: the two data structures an ECS layer leans on to answer
//! "which entities have which components" and "where is the component data
//! for entity E".
//!
//! ## Primitives
//! - [`FixedBitSet256`] — a 256-flag set with a constant 32-byte footprint,
//!   used as a component signature. Bulk operations dispatch at runtime to
//!   256-bit, 128-bit, or scalar kernels with identical observable behavior.
//! - [`IntKeyMap`] — an open-addressed hash table keyed by `i32` with linear
//!   probing, an 8-wide vectorized probe, backward-shift deletion, and a
//!   slot-token API that separates locating an entry from accessing it.
//!
//! ## Design Goals
//! - Dense, cache-friendly storage with no tombstones
//! - Bit-exact agreement between SIMD and scalar paths
//! - Safe, explicit data access; token staleness panics instead of
//!   corrupting memory
//! - Single-threaded core with sharing enforced by the borrow checker
//!
//! A downstream ECS layer (archetypes, queries, scheduling) aggregates these
//! primitives; that layer is out of scope here.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod substrate;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Core primitives

pub use substrate::bitset::{kernels, kernels_for, BitsetKernels, BitsetView, FixedBitSet256};

pub use substrate::map::{IntKeyMap, Tokens};

pub use substrate::simd::Tier;

pub use substrate::types::{
    Key, SlotToken, DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR, KEY_END, KEY_FREE, MAX_CAPACITY,
    MIN_CAPACITY,
};

pub use substrate::error::{
    CapacityRangeError, InvalidSlotError, KeyNotFoundError, LoadFactorRangeError,
    ReservedKeyError, SubstrateError, SubstrateResult, UnsupportedTierError,
};

pub use substrate::hashing::{
    is_power_of_two, mix, next_power_of_two, round_up_to_power_of_two, slot_of,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used substrate types.
///
/// Import with:
/// ```rust
/// use ecs_substrate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        FixedBitSet256,
        IntKeyMap,
        Key,
        SlotToken,
        SubstrateError,
        SubstrateResult,
        Tier,
    };
}
