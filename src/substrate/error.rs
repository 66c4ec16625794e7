//! Error types for the substrate primitives.
//!
//! This module declares focused, composable error types for the map container
//! and the tier-dispatched kernels. Each error models a single failure mode
//! and carries enough context to make failures actionable while remaining
//! small and cheap to pass around or convert into the aggregate
//! [`SubstrateError`].
//!
//! ## Goals
//! * **Specificity:** Each error type models one caller-contract violation
//!   (e.g. an out-of-range construction parameter, a token naming an empty
//!   slot, an unavailable SIMD tier).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into
//!   [`SubstrateError`] so call sites can use `?`.
//! * **Actionability:** Structured fields (the offending value, the accepted
//!   range) make logs useful without reproducing the issue.
//!
//! Every error here is a caller-contract violation, not a recoverable runtime
//! condition; nothing is retried internally. Violations that would indicate
//! implementation bugs (a malformed probe mask, a full map during probing)
//! are debug-asserted at the point of detection instead of being reported.

use std::fmt;

use crate::substrate::simd::Tier;
use crate::substrate::types::{Key, MAX_CAPACITY, MIN_CAPACITY};

/// Returned when a requested initial capacity lies outside the accepted
/// range `[MIN_CAPACITY, MAX_CAPACITY]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityRangeError {
    /// Capacity the caller requested.
    pub requested: usize,
}

impl fmt::Display for CapacityRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "initial capacity {} out of range [{}, {}]",
            self.requested, MIN_CAPACITY, MAX_CAPACITY
        )
    }
}

impl std::error::Error for CapacityRangeError {}

/// Returned when a requested load factor lies outside the open interval
/// `(0, 1)`.
///
/// A load factor of exactly `1.0` is rejected because the probe engine
/// relies on a reachable FREE slot for termination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadFactorRangeError {
    /// Load factor the caller requested.
    pub requested: f32,
}

impl fmt::Display for LoadFactorRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "load factor {} out of range (0, 1)",
            self.requested
        )
    }
}

impl std::error::Error for LoadFactorRangeError {}

/// Returned when `remove` is handed a token that does not name a live slot,
/// either because the slot is FREE or because the token points outside the
/// live range entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSlotError {
    /// Slot index the token carried.
    pub slot: u32,
}

impl fmt::Display for InvalidSlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot token {} does not name a live entry", self.slot)
    }
}

impl std::error::Error for InvalidSlotError {}

/// Returned by the convenience accessor `value_for` when the key is absent.
///
/// The low-level `find` reports absence through its return value instead of
/// an error; use it when absence is an expected outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyNotFoundError {
    /// Key that was looked up.
    pub key: Key,
}

impl fmt::Display for KeyNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key {} not present in map", self.key)
    }
}

impl std::error::Error for KeyNotFoundError {}

/// Returned when a caller attempts to insert one of the reserved sentinel
/// keys (`KEY_FREE` = −1, `KEY_END` = −2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedKeyError {
    /// Sentinel key the caller attempted to insert.
    pub key: Key,
}

impl fmt::Display for ReservedKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key {} is a reserved sentinel and cannot be stored", self.key)
    }
}

impl std::error::Error for ReservedKeyError {}

/// Returned when an explicitly requested SIMD tier is not available on the
/// running CPU.
///
/// Callers that select tiers by hand should query [`Tier::is_available`]
/// first; the scalar tier is always available, so dispatch through
/// [`Tier::detect`] never produces this error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedTierError {
    /// Tier that was requested.
    pub tier: Tier,
}

impl fmt::Display for UnsupportedTierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tier is not supported on this CPU", self.tier)
    }
}

impl std::error::Error for UnsupportedTierError {}

/// Aggregate error for substrate operations.
///
/// Wraps the precise, low-level failures so callers can write `?` against a
/// single expressive type and still match on the exact failure mode.
///
/// ### Display
/// `Display` messages are concise, single-line, and suitable for logs. For
/// deep inspection, prefer `Debug`, which retains full structure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubstrateError {
    /// A construction capacity was outside its documented range.
    CapacityRange(CapacityRangeError),

    /// A construction load factor was outside its documented range.
    LoadFactorRange(LoadFactorRangeError),

    /// A removal token named an empty or out-of-range slot.
    InvalidSlot(InvalidSlotError),

    /// A convenience accessor was invoked on an absent key.
    KeyNotFound(KeyNotFoundError),

    /// A reserved sentinel key was supplied for insertion.
    ReservedKey(ReservedKeyError),

    /// An explicitly requested SIMD tier is absent on this CPU.
    UnsupportedTier(UnsupportedTierError),
}

impl fmt::Display for SubstrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubstrateError::CapacityRange(e) => write!(f, "{e}"),
            SubstrateError::LoadFactorRange(e) => write!(f, "{e}"),
            SubstrateError::InvalidSlot(e) => write!(f, "{e}"),
            SubstrateError::KeyNotFound(e) => write!(f, "{e}"),
            SubstrateError::ReservedKey(e) => write!(f, "{e}"),
            SubstrateError::UnsupportedTier(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SubstrateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubstrateError::CapacityRange(e) => Some(e),
            SubstrateError::LoadFactorRange(e) => Some(e),
            SubstrateError::InvalidSlot(e) => Some(e),
            SubstrateError::KeyNotFound(e) => Some(e),
            SubstrateError::ReservedKey(e) => Some(e),
            SubstrateError::UnsupportedTier(e) => Some(e),
        }
    }
}

impl From<CapacityRangeError> for SubstrateError {
    fn from(e: CapacityRangeError) -> Self { SubstrateError::CapacityRange(e) }
}
impl From<LoadFactorRangeError> for SubstrateError {
    fn from(e: LoadFactorRangeError) -> Self { SubstrateError::LoadFactorRange(e) }
}
impl From<InvalidSlotError> for SubstrateError {
    fn from(e: InvalidSlotError) -> Self { SubstrateError::InvalidSlot(e) }
}
impl From<KeyNotFoundError> for SubstrateError {
    fn from(e: KeyNotFoundError) -> Self { SubstrateError::KeyNotFound(e) }
}
impl From<ReservedKeyError> for SubstrateError {
    fn from(e: ReservedKeyError) -> Self { SubstrateError::ReservedKey(e) }
}
impl From<UnsupportedTierError> for SubstrateError {
    fn from(e: UnsupportedTierError) -> Self { SubstrateError::UnsupportedTier(e) }
}

/// Convenience alias for substrate results.
pub type SubstrateResult<T> = Result<T, SubstrateError>;
