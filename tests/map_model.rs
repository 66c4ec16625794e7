use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ecs_substrate::{IntKeyMap, Key};

const SEED: u64 = 0xD1CE_0123_4567_89AB;

/// Asserts the map and the reference dictionary hold the same entries, that
/// iteration visits each exactly once, and that every present key is
/// reachable by lookup.
fn assert_matches_reference(map: &IntKeyMap<u64>, reference: &HashMap<Key, u64>) {
    assert_eq!(map.count(), reference.len());

    let mut visited = 0;
    for (key, value) in map.iter() {
        assert_eq!(reference.get(&key), Some(value), "key {key} diverged");
        visited += 1;
    }
    assert_eq!(visited, reference.len());

    for (&key, &value) in reference {
        let (found, token) = map.find(key);
        assert!(found, "key {key} unreachable");
        assert_eq!(*map.value_ref(token), value);
    }
}

#[test]
fn random_workload_matches_reference_dictionary() {
    const OPS: usize = 1_000_000;
    const BATCH: usize = 100_000;
    // Keys from a narrow range so chains collide and churn constantly.
    const KEY_RANGE: i32 = 10_000;

    let mut rng = StdRng::seed_from_u64(SEED);
    let mut map: IntKeyMap<u64> = IntKeyMap::with_capacity_and_load_factor(4, 0.75).unwrap();
    let mut reference: HashMap<Key, u64> = HashMap::new();

    for op in 0..OPS {
        let key = rng.gen_range(0..KEY_RANGE);
        if rng.gen_bool(0.6) {
            let value = rng.gen::<u64>();
            map.insert(key, value).unwrap();
            reference.insert(key, value);
        } else {
            let (found, token) = map.find(key);
            let expected = reference.remove(&key);
            assert_eq!(found, expected.is_some(), "presence of {key} diverged");
            if found {
                assert_eq!(map.remove(token).unwrap(), expected.unwrap());
            }
        }
        if (op + 1) % BATCH == 0 {
            assert_matches_reference(&map, &reference);
        }
    }

    assert_matches_reference(&map, &reference);
    assert_eq!(map.tokens().count(), map.count());
}

#[test]
fn bulk_removal_leaves_exactly_the_upper_keys() {
    let mut rng = StdRng::seed_from_u64(SEED ^ 1);
    let mut map: IntKeyMap<u32> = IntKeyMap::new();
    let mut present: HashSet<Key> = HashSet::new();

    // Uniform keys in [0, 1000) inserted 10^4 times, so most keys collect
    // many overwrites.
    for _ in 0..10_000 {
        let key = rng.gen_range(0..1_000);
        map.insert(key, key as u32 * 3).unwrap();
        present.insert(key);
    }
    assert_eq!(map.count(), present.len());

    let expected: HashSet<Key> = present.iter().copied().filter(|&key| key > 500).collect();
    map.remove_all(0..=500);

    assert_eq!(map.count(), expected.len());
    let remaining: HashSet<Key> = map.tokens().map(|token| map.key_of(token)).collect();
    assert_eq!(remaining, expected);
}

#[test]
fn interleaved_growth_and_removal_preserves_chains() {
    let mut rng = StdRng::seed_from_u64(SEED ^ 2);
    let mut map: IntKeyMap<u64> = IntKeyMap::with_capacity_and_load_factor(2, 0.6).unwrap();
    let mut reference: HashMap<Key, u64> = HashMap::new();

    for round in 0..50i32 {
        for _ in 0..200 {
            // Multiples of three straddle zero without ever producing the
            // reserved sentinel keys.
            let key = rng.gen_range(-500..500) * 3;
            let value = rng.gen::<u64>();
            map.insert(key, value).unwrap();
            reference.insert(key, value);
        }
        let victims: Vec<Key> = reference
            .keys()
            .copied()
            .filter(|key| key.rem_euclid(7) == round % 7)
            .collect();
        for key in &victims {
            reference.remove(key);
        }
        map.remove_all(victims);
        assert_matches_reference(&map, &reference);
    }
}
