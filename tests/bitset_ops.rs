use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ecs_substrate::{kernels_for, BitsetView, FixedBitSet256, Tier};

const SEED: u64 = 0x5EED_CA5E;

/// Input pool: the empty set, every singleton, and a seeded family of
/// 3-bit combinations anchored at each of the 256 offsets.
fn input_pool() -> Vec<FixedBitSet256> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut pool = Vec::with_capacity(513);
    pool.push(FixedBitSet256::empty());
    for bit in 0u8..=255 {
        pool.push(FixedBitSet256::single(bit));
    }
    for offset in 0u8..=255 {
        pool.push(FixedBitSet256::many(&[offset, rng.gen::<u8>(), rng.gen::<u8>()]));
    }
    pool
}

fn available_tiers() -> Vec<Tier> {
    [Tier::Wide, Tier::Half, Tier::Scalar]
        .into_iter()
        .filter(|tier| tier.is_available())
        .collect()
}

#[test]
fn every_available_tier_resolves() {
    for tier in available_tiers() {
        assert_eq!(kernels_for(tier).unwrap().tier, tier);
    }
    assert!(Tier::Scalar.is_available());
    assert!(Tier::detect().is_available());
}

#[test]
fn unavailable_tiers_report_unsupported() {
    for tier in [Tier::Wide, Tier::Half] {
        if !tier.is_available() {
            let err = kernels_for(tier).unwrap_err();
            assert_eq!(err.tier, tier);
        }
    }
}

#[test]
fn tiers_agree_on_queries() {
    let pool = input_pool();
    let scalar = kernels_for(Tier::Scalar).unwrap();
    for tier in available_tiers() {
        let kernels = kernels_for(tier).unwrap();
        for a in &pool {
            for b in &pool {
                assert_eq!(
                    (kernels.equals)(a, b),
                    (scalar.equals)(a, b),
                    "equals diverged on tier {tier}"
                );
                assert_eq!(
                    (kernels.has_all)(a, b),
                    (scalar.has_all)(a, b),
                    "has_all diverged on tier {tier}"
                );
                assert_eq!(
                    (kernels.has_any)(a, b),
                    (scalar.has_any)(a, b),
                    "has_any diverged on tier {tier}"
                );
                assert_eq!(
                    (kernels.not_has_any)(a, b),
                    (scalar.not_has_any)(a, b),
                    "not_has_any diverged on tier {tier}"
                );
            }
        }
    }
}

#[test]
fn tiers_agree_on_mutators() {
    let pool = input_pool();
    let scalar = kernels_for(Tier::Scalar).unwrap();
    for tier in available_tiers() {
        let kernels = kernels_for(tier).unwrap();
        for a in &pool {
            for b in &pool {
                let mut tier_union = *a;
                let mut scalar_union = *a;
                (kernels.add)(&mut tier_union, b);
                (scalar.add)(&mut scalar_union, b);
                assert!(
                    (scalar.equals)(&tier_union, &scalar_union),
                    "add diverged on tier {tier}"
                );

                let mut tier_diff = *a;
                let mut scalar_diff = *a;
                (kernels.remove)(&mut tier_diff, b);
                (scalar.remove)(&mut scalar_diff, b);
                assert!(
                    (scalar.equals)(&tier_diff, &scalar_diff),
                    "remove diverged on tier {tier}"
                );
            }

            let mut tier_inverted = *a;
            let mut scalar_inverted = *a;
            (kernels.invert)(&mut tier_inverted);
            (scalar.invert)(&mut scalar_inverted);
            assert!(
                (scalar.equals)(&tier_inverted, &scalar_inverted),
                "invert diverged on tier {tier}"
            );

            let mut tier_cleared = *a;
            (kernels.clear)(&mut tier_cleared);
            assert!(
                (scalar.equals)(&tier_cleared, &FixedBitSet256::empty()),
                "clear diverged on tier {tier}"
            );
        }
    }
}

#[test]
fn rendering_marks_every_thirty_second_bit() {
    let set = FixedBitSet256::many(&[31, 63, 95, 127, 159, 191, 223, 255]);
    let rendered = set.to_string();
    assert_eq!(rendered.len(), 256);
    for (position, flag) in rendered.chars().enumerate() {
        let expected = if position % 32 == 31 { '1' } else { '0' };
        assert_eq!(flag, expected, "position {position}");
    }
}

#[test]
fn rendering_follows_storage_order() {
    assert!(FixedBitSet256::single(0).to_string().starts_with("1000"));
    let rendered = FixedBitSet256::single(64).to_string();
    assert_eq!(rendered.find('1'), Some(64));
    assert_eq!(FixedBitSet256::empty().to_string(), "0".repeat(256));
}

#[test]
fn containment_scenarios() {
    let single = FixedBitSet256::single(100);
    let spread = FixedBitSet256::many(&[50, 75, 100, 125]);
    assert!(single.has_any(&spread));
    assert!(spread.has_all(&FixedBitSet256::many(&[50, 75, 100])));
    assert!(!FixedBitSet256::many(&[75, 100, 125])
        .has_all(&FixedBitSet256::many(&[50, 75, 100])));
}

#[test]
fn single_bit_accessors_round_trip() {
    let mut set = FixedBitSet256::empty();
    set.set(7);
    set.set(200);
    assert!(set.has(7) && set.has(200) && !set.has(8));
    assert_eq!(set.ones().collect::<Vec<_>>(), vec![7, 200]);
    assert_eq!(set.count_ones(), 2);
    set.unset(7);
    assert!(!set.has(7));
    assert_eq!(set.count_ones(), 1);
}

#[test]
fn payload_hash_is_deterministic_and_discriminating() {
    let a = FixedBitSet256::many(&[1, 2, 3]);
    let b = FixedBitSet256::many(&[3, 2, 1, 1]);
    assert_eq!(a.hash32(), b.hash32());
    assert_ne!(a.hash32(), FixedBitSet256::many(&[1, 2, 4]).hash32());
    assert_ne!(FixedBitSet256::single(0).hash32(), FixedBitSet256::single(64).hash32());
}

#[test]
fn view_projects_queries_only() {
    let source = FixedBitSet256::many(&[10, 20, 30]);
    let view = BitsetView::from(source);
    assert!(view.has(20));
    assert!(view.has_all(&FixedBitSet256::many(&[10, 30])));
    assert!(view.not_has_any(&FixedBitSet256::single(11)));
    assert_eq!(view.count_ones(), 3);
    assert_eq!(view.hash32(), source.hash32());
    assert_eq!(view.to_string(), source.to_string());

    // Round-tripping is a value copy: mutating the copy leaves the view
    // untouched.
    let mut copy = FixedBitSet256::from(view);
    copy.clear();
    assert!(view.has(10));
    assert!(copy.is_empty());
}
