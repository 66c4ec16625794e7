//! 256-Flag Fixed Bitset with Tier-Dispatched Kernels
//!
//! This module provides [`FixedBitSet256`], the flag-set half of the
//! substrate: a constant-size 256-bit set an ECS layer uses as a component
//! signature, answering "which flags does this entity carry" with bulk
//! bitwise operations.
//!
//! ## Design
//! - The payload is exactly 32 bytes: four 64-bit words, 32-byte aligned so
//!   the 256-bit kernels can use aligned vector loads. The payload is the
//!   complete state; equality is bitwise equality.
//! - Every bulk operation exists in three observationally-equivalent
//!   implementations: a 256-bit AVX2 tier, a 128-bit SSE2 tier working in
//!   two independent halves, and a scalar tier of four word iterations.
//! - Dispatch is resolved once: [`kernels`] detects the best available tier
//!   on first use and returns a table of plain function pointers, so the
//!   per-call cost is one indirect call. [`kernels_for`] exposes explicit
//!   tiers for equivalence testing and ahead-of-time selection.
//!
//! ## Bit-to-word mapping
//! Bit `b` lives in word `b / 64` at position `b % 64`. The `Display`
//! rendering and the payload hash both follow this storage order, so all
//! tiers agree on them by construction.
//!
//! ## Invariants
//! - All three tiers agree bit-for-bit on every input.
//! - The read-only [`BitsetView`] projection is a 32-byte value copy, not a
//!   borrow; it cannot observe later mutations of its source.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use crate::substrate::error::UnsupportedTierError;
use crate::substrate::simd::Tier;
use crate::substrate::types::{BITSET_BITS, BITSET_WORDS};

/// 256-flag set with a constant 32-byte footprint.
///
/// Flags are addressed by `u8` bit indices, which makes the `bit < 256`
/// precondition total by construction. Values are plain data: `Copy`,
/// comparable bytewise, and freely duplicated.
#[derive(Clone, Copy, Debug)]
#[repr(C, align(32))]
pub struct FixedBitSet256 {
    words: [u64; BITSET_WORDS],
}

impl FixedBitSet256 {
    /// Set with every flag cleared.
    #[inline]
    pub const fn empty() -> Self {
        FixedBitSet256 { words: [0; BITSET_WORDS] }
    }

    /// Set containing exactly `bit`.
    #[inline]
    pub fn single(bit: u8) -> Self {
        let mut set = Self::empty();
        set.set(bit);
        set
    }

    /// Set containing every bit in `bits`. Duplicates are idempotent.
    pub fn many(bits: &[u8]) -> Self {
        let mut set = Self::empty();
        for &bit in bits {
            set.set(bit);
        }
        set
    }

    /// Sets a single flag.
    #[inline]
    pub fn set(&mut self, bit: u8) {
        self.words[(bit >> 6) as usize] |= 1u64 << (bit & 63);
    }

    /// Clears a single flag.
    #[inline]
    pub fn unset(&mut self, bit: u8) {
        self.words[(bit >> 6) as usize] &= !(1u64 << (bit & 63));
    }

    /// Returns `true` if `bit` is present.
    #[inline]
    pub fn has(&self, bit: u8) -> bool {
        (self.words[(bit >> 6) as usize] >> (bit & 63)) & 1 == 1
    }

    /// Returns `true` if every flag in `other` is present in `self`.
    #[inline]
    pub fn has_all(&self, other: &Self) -> bool {
        (kernels().has_all)(self, other)
    }

    /// Returns `true` if `self` and `other` share at least one flag.
    #[inline]
    pub fn has_any(&self, other: &Self) -> bool {
        (kernels().has_any)(self, other)
    }

    /// Returns `true` if `self` and `other` are disjoint.
    #[inline]
    pub fn not_has_any(&self, other: &Self) -> bool {
        (kernels().not_has_any)(self, other)
    }

    /// Unions `other` into `self`.
    #[inline]
    pub fn add(&mut self, other: &Self) {
        (kernels().add)(self, other)
    }

    /// Removes every flag of `other` from `self`.
    #[inline]
    pub fn remove(&mut self, other: &Self) {
        (kernels().remove)(self, other)
    }

    /// Complements all 256 flags in place.
    #[inline]
    pub fn invert(&mut self) {
        (kernels().invert)(self)
    }

    /// Clears all flags.
    #[inline]
    pub fn clear(&mut self) {
        (kernels().clear)(self)
    }

    /// Bytewise equality with `other`.
    #[inline]
    pub fn equals(&self, other: &Self) -> bool {
        (kernels().equals)(self, other)
    }

    /// Iterates over all set bits in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = u8> + '_ {
        self.words
            .iter()
            .enumerate()
            .flat_map(|(word_index, &word)| {
                let base = word_index * 64;
                let mut bits = word;
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let tz = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    Some((base + tz) as u8)
                })
            })
    }

    /// Number of set flags.
    #[inline]
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Returns `true` if no flag is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Deterministic 32-bit hash of the 32-byte payload.
    ///
    /// FNV-1a over the payload bytes in storage order, so the result is
    /// stable across tiers and across runs.
    pub fn hash32(&self) -> u32 {
        let mut hash: u32 = 0x811C_9DC5;
        for word in &self.words {
            for byte in word.to_le_bytes() {
                hash ^= byte as u32;
                hash = hash.wrapping_mul(16_777_619);
            }
        }
        hash
    }
}

impl Default for FixedBitSet256 {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for FixedBitSet256 {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for FixedBitSet256 {}

impl Hash for FixedBitSet256 {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash32());
    }
}

impl fmt::Display for FixedBitSet256 {
    /// Renders 256 characters where character `i` is `'1'` iff bit `i` is
    /// set, in storage order (word-major, bit 0..63 within each word).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rendered = [b'0'; BITSET_BITS];
        for (word_index, &word) in self.words.iter().enumerate() {
            let mut bits = word;
            while bits != 0 {
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                rendered[word_index * 64 + tz] = b'1';
            }
        }
        // Payload is '0'/'1' only, so the bytes are valid UTF-8.
        f.write_str(std::str::from_utf8(&rendered).map_err(|_| fmt::Error)?)
    }
}

/// Read-only projection of a [`FixedBitSet256`].
///
/// Conversion in either direction is a 32-byte value copy; the view exposes
/// only the query subset of the bitset API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitsetView {
    bits: FixedBitSet256,
}

impl BitsetView {
    /// Returns `true` if `bit` is present.
    #[inline]
    pub fn has(&self, bit: u8) -> bool {
        self.bits.has(bit)
    }

    /// Returns `true` if every flag in `other` is present.
    #[inline]
    pub fn has_all(&self, other: &FixedBitSet256) -> bool {
        self.bits.has_all(other)
    }

    /// Returns `true` if at least one flag of `other` is present.
    #[inline]
    pub fn has_any(&self, other: &FixedBitSet256) -> bool {
        self.bits.has_any(other)
    }

    /// Returns `true` if no flag of `other` is present.
    #[inline]
    pub fn not_has_any(&self, other: &FixedBitSet256) -> bool {
        self.bits.not_has_any(other)
    }

    /// Bytewise equality with `other`.
    #[inline]
    pub fn equals(&self, other: &FixedBitSet256) -> bool {
        self.bits.equals(other)
    }

    /// Number of set flags.
    #[inline]
    pub fn count_ones(&self) -> u32 {
        self.bits.count_ones()
    }

    /// Deterministic 32-bit hash of the payload.
    #[inline]
    pub fn hash32(&self) -> u32 {
        self.bits.hash32()
    }
}

impl From<FixedBitSet256> for BitsetView {
    #[inline]
    fn from(bits: FixedBitSet256) -> Self {
        BitsetView { bits }
    }
}

impl From<BitsetView> for FixedBitSet256 {
    #[inline]
    fn from(view: BitsetView) -> Self {
        view.bits
    }
}

impl fmt::Display for BitsetView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.bits.fmt(f)
    }
}

/// Function table for one bitset implementation tier.
///
/// Every entry is a plain `fn` pointer, so a resolved table can be stored
/// and called without further dispatch: resolve once, call forever.
#[derive(Debug)]
pub struct BitsetKernels {
    /// Tier these kernels implement.
    pub tier: Tier,
    /// `a |= b`
    pub add: fn(&mut FixedBitSet256, &FixedBitSet256),
    /// `a &= !b`
    pub remove: fn(&mut FixedBitSet256, &FixedBitSet256),
    /// `a = !a`
    pub invert: fn(&mut FixedBitSet256),
    /// `a = 0`
    pub clear: fn(&mut FixedBitSet256),
    /// `a == b` bytewise
    pub equals: fn(&FixedBitSet256, &FixedBitSet256) -> bool,
    /// `(a & b) == b`
    pub has_all: fn(&FixedBitSet256, &FixedBitSet256) -> bool,
    /// `(a & b) != 0`
    pub has_any: fn(&FixedBitSet256, &FixedBitSet256) -> bool,
    /// `(a & b) == 0`
    pub not_has_any: fn(&FixedBitSet256, &FixedBitSet256) -> bool,
}

static SCALAR_KERNELS: BitsetKernels = BitsetKernels {
    tier: Tier::Scalar,
    add: scalar::add,
    remove: scalar::remove,
    invert: scalar::invert,
    clear: scalar::clear,
    equals: scalar::equals,
    has_all: scalar::has_all,
    has_any: scalar::has_any,
    not_has_any: scalar::not_has_any,
};

#[cfg(target_arch = "x86_64")]
static HALF_KERNELS: BitsetKernels = BitsetKernels {
    tier: Tier::Half,
    add: half::add,
    remove: half::remove,
    invert: half::invert,
    clear: half::clear,
    equals: half::equals,
    has_all: half::has_all,
    has_any: half::has_any,
    not_has_any: half::not_has_any,
};

#[cfg(target_arch = "x86_64")]
static WIDE_KERNELS: BitsetKernels = BitsetKernels {
    tier: Tier::Wide,
    add: wide::add,
    remove: wide::remove,
    invert: wide::invert,
    clear: wide::clear,
    equals: wide::equals,
    has_all: wide::has_all,
    has_any: wide::has_any,
    not_has_any: wide::not_has_any,
};

/// Kernel table for an explicitly chosen tier.
///
/// Fails with [`UnsupportedTierError`] when the running CPU cannot execute
/// the tier. The scalar tier always succeeds.
pub fn kernels_for(tier: Tier) -> Result<&'static BitsetKernels, UnsupportedTierError> {
    match tier {
        Tier::Scalar => Ok(&SCALAR_KERNELS),
        #[cfg(target_arch = "x86_64")]
        Tier::Half => Ok(&HALF_KERNELS),
        #[cfg(target_arch = "x86_64")]
        Tier::Wide => {
            if std::is_x86_feature_detected!("avx2") {
                Ok(&WIDE_KERNELS)
            } else {
                Err(UnsupportedTierError { tier })
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        Tier::Half | Tier::Wide => Err(UnsupportedTierError { tier }),
    }
}

/// Kernel table for the best tier available on this CPU, resolved once.
#[inline]
pub fn kernels() -> &'static BitsetKernels {
    static RESOLVED: OnceLock<&'static BitsetKernels> = OnceLock::new();
    RESOLVED.get_or_init(|| kernels_for(Tier::detect()).unwrap_or(&SCALAR_KERNELS))
}

mod scalar {
    use super::{FixedBitSet256, BITSET_WORDS};

    pub(super) fn add(a: &mut FixedBitSet256, b: &FixedBitSet256) {
        for i in 0..BITSET_WORDS {
            a.words[i] |= b.words[i];
        }
    }

    pub(super) fn remove(a: &mut FixedBitSet256, b: &FixedBitSet256) {
        for i in 0..BITSET_WORDS {
            a.words[i] &= !b.words[i];
        }
    }

    pub(super) fn invert(a: &mut FixedBitSet256) {
        for word in &mut a.words {
            *word = !*word;
        }
    }

    pub(super) fn clear(a: &mut FixedBitSet256) {
        a.words = [0; BITSET_WORDS];
    }

    pub(super) fn equals(a: &FixedBitSet256, b: &FixedBitSet256) -> bool {
        a.words == b.words
    }

    pub(super) fn has_all(a: &FixedBitSet256, b: &FixedBitSet256) -> bool {
        for i in 0..BITSET_WORDS {
            if a.words[i] & b.words[i] != b.words[i] {
                return false;
            }
        }
        true
    }

    pub(super) fn has_any(a: &FixedBitSet256, b: &FixedBitSet256) -> bool {
        for i in 0..BITSET_WORDS {
            if a.words[i] & b.words[i] != 0 {
                return true;
            }
        }
        false
    }

    pub(super) fn not_has_any(a: &FixedBitSet256, b: &FixedBitSet256) -> bool {
        !has_any(a, b)
    }
}

/// 128-bit tier: the scalar algorithms over two independent SSE2 halves.
///
/// SSE2 is part of the x86-64 baseline, so these kernels need no runtime
/// gate. The payload is 32-byte aligned, which makes both 16-byte halves
/// aligned for `_mm_load_si128`.
#[cfg(target_arch = "x86_64")]
mod half {
    use core::arch::x86_64::*;

    use super::FixedBitSet256;

    #[inline]
    fn half_ptr(set: &FixedBitSet256, half: usize) -> *const __m128i {
        set.words[half * 2..].as_ptr() as *const __m128i
    }

    #[inline]
    fn half_ptr_mut(set: &mut FixedBitSet256, half: usize) -> *mut __m128i {
        set.words[half * 2..].as_mut_ptr() as *mut __m128i
    }

    pub(super) fn add(a: &mut FixedBitSet256, b: &FixedBitSet256) {
        for half in 0..2 {
            // SAFETY: both halves are in-bounds and 16-byte aligned.
            unsafe {
                let va = _mm_load_si128(half_ptr(a, half));
                let vb = _mm_load_si128(half_ptr(b, half));
                _mm_store_si128(half_ptr_mut(a, half), _mm_or_si128(va, vb));
            }
        }
    }

    pub(super) fn remove(a: &mut FixedBitSet256, b: &FixedBitSet256) {
        for half in 0..2 {
            // SAFETY: both halves are in-bounds and 16-byte aligned.
            unsafe {
                let va = _mm_load_si128(half_ptr(a, half));
                let vb = _mm_load_si128(half_ptr(b, half));
                // andnot computes `!b & a`.
                _mm_store_si128(half_ptr_mut(a, half), _mm_andnot_si128(vb, va));
            }
        }
    }

    pub(super) fn invert(a: &mut FixedBitSet256) {
        for half in 0..2 {
            // SAFETY: both halves are in-bounds and 16-byte aligned.
            unsafe {
                let va = _mm_load_si128(half_ptr(a, half));
                let ones = _mm_set1_epi8(-1);
                _mm_store_si128(half_ptr_mut(a, half), _mm_xor_si128(va, ones));
            }
        }
    }

    pub(super) fn clear(a: &mut FixedBitSet256) {
        for half in 0..2 {
            // SAFETY: both halves are in-bounds and 16-byte aligned.
            unsafe {
                _mm_store_si128(half_ptr_mut(a, half), _mm_setzero_si128());
            }
        }
    }

    pub(super) fn equals(a: &FixedBitSet256, b: &FixedBitSet256) -> bool {
        for half in 0..2 {
            // SAFETY: both halves are in-bounds and 16-byte aligned.
            unsafe {
                let va = _mm_load_si128(half_ptr(a, half));
                let vb = _mm_load_si128(half_ptr(b, half));
                if _mm_movemask_epi8(_mm_cmpeq_epi8(va, vb)) != 0xFFFF {
                    return false;
                }
            }
        }
        true
    }

    pub(super) fn has_all(a: &FixedBitSet256, b: &FixedBitSet256) -> bool {
        for half in 0..2 {
            // SAFETY: both halves are in-bounds and 16-byte aligned.
            unsafe {
                let va = _mm_load_si128(half_ptr(a, half));
                let vb = _mm_load_si128(half_ptr(b, half));
                let masked = _mm_and_si128(va, vb);
                if _mm_movemask_epi8(_mm_cmpeq_epi8(masked, vb)) != 0xFFFF {
                    return false;
                }
            }
        }
        true
    }

    pub(super) fn has_any(a: &FixedBitSet256, b: &FixedBitSet256) -> bool {
        for half in 0..2 {
            // SAFETY: both halves are in-bounds and 16-byte aligned.
            unsafe {
                let va = _mm_load_si128(half_ptr(a, half));
                let vb = _mm_load_si128(half_ptr(b, half));
                let masked = _mm_and_si128(va, vb);
                if _mm_movemask_epi8(_mm_cmpeq_epi8(masked, _mm_setzero_si128())) != 0xFFFF {
                    return true;
                }
            }
        }
        false
    }

    pub(super) fn not_has_any(a: &FixedBitSet256, b: &FixedBitSet256) -> bool {
        !has_any(a, b)
    }
}

/// 256-bit tier: one AVX2 vector per operation.
///
/// Equality reduces through a byte compare plus move-mask against the
/// all-ones sentinel; containment and intersection tests use the VPTEST
/// family, which answers from the carry and zero flags in one instruction.
#[cfg(target_arch = "x86_64")]
mod wide {
    use core::arch::x86_64::*;

    use super::FixedBitSet256;

    #[inline]
    fn vec_ptr(set: &FixedBitSet256) -> *const __m256i {
        set.words.as_ptr() as *const __m256i
    }

    #[inline]
    fn vec_ptr_mut(set: &mut FixedBitSet256) -> *mut __m256i {
        set.words.as_mut_ptr() as *mut __m256i
    }

    #[target_feature(enable = "avx2")]
    unsafe fn add_impl(a: &mut FixedBitSet256, b: &FixedBitSet256) {
        // SAFETY: the payload is exactly 32 bytes with 32-byte alignment.
        unsafe {
            let va = _mm256_load_si256(vec_ptr(a));
            let vb = _mm256_load_si256(vec_ptr(b));
            _mm256_store_si256(vec_ptr_mut(a), _mm256_or_si256(va, vb));
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn remove_impl(a: &mut FixedBitSet256, b: &FixedBitSet256) {
        // SAFETY: the payload is exactly 32 bytes with 32-byte alignment.
        unsafe {
            let va = _mm256_load_si256(vec_ptr(a));
            let vb = _mm256_load_si256(vec_ptr(b));
            // andnot computes `!b & a`.
            _mm256_store_si256(vec_ptr_mut(a), _mm256_andnot_si256(vb, va));
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn invert_impl(a: &mut FixedBitSet256) {
        // SAFETY: the payload is exactly 32 bytes with 32-byte alignment.
        unsafe {
            let va = _mm256_load_si256(vec_ptr(a));
            let ones = _mm256_set1_epi8(-1);
            _mm256_store_si256(vec_ptr_mut(a), _mm256_xor_si256(va, ones));
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn clear_impl(a: &mut FixedBitSet256) {
        // SAFETY: the payload is exactly 32 bytes with 32-byte alignment.
        unsafe {
            _mm256_store_si256(vec_ptr_mut(a), _mm256_setzero_si256());
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn equals_impl(a: &FixedBitSet256, b: &FixedBitSet256) -> bool {
        // SAFETY: the payload is exactly 32 bytes with 32-byte alignment.
        unsafe {
            let va = _mm256_load_si256(vec_ptr(a));
            let vb = _mm256_load_si256(vec_ptr(b));
            _mm256_movemask_epi8(_mm256_cmpeq_epi8(va, vb)) == -1
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn has_all_impl(a: &FixedBitSet256, b: &FixedBitSet256) -> bool {
        // SAFETY: the payload is exactly 32 bytes with 32-byte alignment.
        unsafe {
            let va = _mm256_load_si256(vec_ptr(a));
            let vb = _mm256_load_si256(vec_ptr(b));
            // CF is set iff `!a & b == 0`, i.e. `b` adds nothing to `a`.
            _mm256_testc_si256(va, vb) != 0
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn has_any_impl(a: &FixedBitSet256, b: &FixedBitSet256) -> bool {
        // SAFETY: the payload is exactly 32 bytes with 32-byte alignment.
        unsafe {
            let va = _mm256_load_si256(vec_ptr(a));
            let vb = _mm256_load_si256(vec_ptr(b));
            // ZF is set iff `a & b == 0`.
            _mm256_testz_si256(va, vb) == 0
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn not_has_any_impl(a: &FixedBitSet256, b: &FixedBitSet256) -> bool {
        // SAFETY: the payload is exactly 32 bytes with 32-byte alignment.
        unsafe {
            let va = _mm256_load_si256(vec_ptr(a));
            let vb = _mm256_load_si256(vec_ptr(b));
            _mm256_testz_si256(va, vb) != 0
        }
    }

    macro_rules! gated {
        ($name:ident, $target:ident, ($($arg:ident: $ty:ty),*) $(-> $ret:ty)?) => {
            pub(super) fn $name($($arg: $ty),*) $(-> $ret)? {
                debug_assert!(std::is_x86_feature_detected!("avx2"));
                // SAFETY: these kernels are only reachable through a table
                // handed out after AVX2 detection succeeded.
                unsafe { $target($($arg),*) }
            }
        };
    }

    gated!(add, add_impl, (a: &mut FixedBitSet256, b: &FixedBitSet256));
    gated!(remove, remove_impl, (a: &mut FixedBitSet256, b: &FixedBitSet256));
    gated!(invert, invert_impl, (a: &mut FixedBitSet256));
    gated!(clear, clear_impl, (a: &mut FixedBitSet256));
    gated!(equals, equals_impl, (a: &FixedBitSet256, b: &FixedBitSet256) -> bool);
    gated!(has_all, has_all_impl, (a: &FixedBitSet256, b: &FixedBitSet256) -> bool);
    gated!(has_any, has_any_impl, (a: &FixedBitSet256, b: &FixedBitSet256) -> bool);
    gated!(not_has_any, not_has_any_impl, (a: &FixedBitSet256, b: &FixedBitSet256) -> bool);
}
