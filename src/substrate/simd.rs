//! Runtime SIMD capability detection.
//!
//! ## Purpose
//! The bitset kernels and the probe engine each exist in more than one
//! observationally-equivalent implementation; this module names those
//! implementation tiers and answers, at runtime, which of them the current
//! CPU can execute.
//!
//! ## Design
//! Detection goes through `is_x86_feature_detected!`, which caches its
//! answer after the first query, so call-site dispatch stays cheap. On
//! x86-64 the 128-bit tier is architecturally guaranteed (SSE2 is part of
//! the base ISA); the 256-bit tier requires AVX2. On every other
//! architecture only the scalar tier exists.
//!
//! The scalar tier is always available, so dispatch through
//! [`Tier::detect`] cannot fail; only explicit tier selection can observe an
//! unsupported tier.

use std::fmt;

/// Implementation tier for the vectorized substrate kernels.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Tier {
    /// 256-bit vector operations (AVX2).
    Wide,
    /// 128-bit vector operations in two halves (SSE2).
    Half,
    /// Plain 64-bit word loops.
    Scalar,
}

impl Tier {
    /// Best tier the running CPU supports.
    #[inline]
    pub fn detect() -> Tier {
        #[cfg(target_arch = "x86_64")]
        fn best() -> Tier {
            if std::is_x86_feature_detected!("avx2") {
                Tier::Wide
            } else {
                // SSE2 is part of the x86-64 baseline.
                Tier::Half
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        fn best() -> Tier {
            Tier::Scalar
        }
        best()
    }

    /// Whether this tier can execute on the running CPU.
    #[inline]
    pub fn is_available(self) -> bool {
        match self {
            #[cfg(target_arch = "x86_64")]
            Tier::Wide => std::is_x86_feature_detected!("avx2"),
            #[cfg(target_arch = "x86_64")]
            Tier::Half => true,
            #[cfg(not(target_arch = "x86_64"))]
            Tier::Wide | Tier::Half => false,
            Tier::Scalar => true,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Wide => f.write_str("wide (256-bit)"),
            Tier::Half => f.write_str("half (128-bit)"),
            Tier::Scalar => f.write_str("scalar"),
        }
    }
}
