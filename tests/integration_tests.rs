//! Integration tests for construction, queries and export/import

use chd_phf::{BucketStats, Chd, ChdBuilder, ChdParams, ChdState, PhfError, Xxh32};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;

fn int_keys(n: u32) -> Vec<[u8; 4]> {
    (0..n).map(|i| i.to_le_bytes()).collect()
}

fn random_keys(n: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut seen = HashSet::with_capacity(n);
    while seen.len() < n {
        let len = rng.random_range(1..=50);
        let key: Vec<u8> = (0..len).map(|_| rng.random()).collect();
        seen.insert(key);
    }
    let mut keys: Vec<_> = seen.into_iter().collect();
    keys.sort();
    keys
}

fn bins<K: AsRef<[u8]>>(chd: &Chd, keys: &[K]) -> Vec<u32> {
    keys.iter().map(|k| chd.hash(k.as_ref())).collect()
}

// ============================================================================
// CORRECTNESS TESTS
// ============================================================================

#[test]
fn test_4096_int_keys_minimal() {
    let keys = int_keys(4096);
    let chd = <Chd>::new(&keys, ChdParams::default()).unwrap();

    assert_eq!(chd.displacements().len(), 1024);
    assert_eq!(chd.num_bins(), 4096);

    let ids: HashSet<u32> = bins(&chd, &keys).into_iter().collect();
    assert_eq!(ids, (0..4096).collect());
}

#[test]
fn test_4096_int_keys_half_load() {
    let keys = int_keys(4096);
    let params = ChdParams {
        load_factor: 0.5,
        ..Default::default()
    };
    let chd = <Chd>::new(&keys, params).unwrap();

    assert_eq!(chd.displacements().len(), 1024);
    assert_eq!(chd.num_bins(), 8192);

    let ids: HashSet<u32> = bins(&chd, &keys).into_iter().collect();
    assert_eq!(ids.len(), 4096);
    assert!(ids.iter().all(|&id| id < 8192));
}

#[test]
fn test_random_keys_injective() {
    for (n, seed) in [(1, 1), (2, 2), (10, 3), (100, 4), (1000, 5), (20_000, 6)] {
        let keys = random_keys(n, seed);
        let chd = <Chd>::new(&keys, ChdParams::default()).unwrap();

        let ids: HashSet<u32> = bins(&chd, &keys).into_iter().collect();
        assert_eq!(ids.len(), n, "collision for n = {n}");
        assert!(ids.iter().all(|&id| (id as usize) < n));
    }
}

#[test]
fn test_parameter_grid() {
    let keys = random_keys(3000, 7);
    for keys_per_bucket in [1, 2, 4] {
        for load_factor in [0.5, 0.75, 1.0] {
            let params = ChdParams {
                keys_per_bucket,
                load_factor,
                ..Default::default()
            };
            let chd = <Chd>::new(&keys, params).unwrap();
            let expected_bins = (3000.0 / load_factor) as usize;
            assert_eq!(chd.num_bins(), expected_bins);
            assert_eq!(chd.num_buckets(), 3000 / keys_per_bucket);

            let ids: HashSet<u32> = bins(&chd, &keys).into_iter().collect();
            assert_eq!(ids.len(), 3000);
            assert!(ids.iter().all(|&id| (id as usize) < expected_bins));
        }
    }
}

#[test]
fn test_unknown_keys_stay_in_range() {
    let keys = random_keys(500, 8);
    let chd = <Chd>::new(&keys, ChdParams::default()).unwrap();
    for other in random_keys(2000, 9) {
        assert!(chd.index(&other) < 500);
    }
}

// ============================================================================
// DETERMINISM & EXPORT/IMPORT
// ============================================================================

#[test]
fn test_construction_is_deterministic() {
    let keys = random_keys(5000, 10);
    let a = <Chd>::new(&keys, ChdParams::default()).unwrap();
    let b = <Chd>::new(&keys, ChdParams::default()).unwrap();
    assert_eq!(a.displacements(), b.displacements());
}

#[test]
fn test_export_import_roundtrip() {
    for load_factor in [0.5, 1.0] {
        let keys = int_keys(4096);
        let params = ChdParams {
            load_factor,
            ..Default::default()
        };
        let chd = <Chd>::new(&keys, params).unwrap();
        let original = bins(&chd, &keys);

        let dump = chd.clone().into_displacements();
        let imported = <Chd>::from_parts(keys.len(), dump, load_factor).unwrap();

        assert_eq!(bins(&imported, &keys), original);
        assert_eq!(imported.num_buckets(), 1024);
    }
}

#[test]
fn test_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.chd");

    let keys = random_keys(2500, 11);
    let params = ChdParams {
        load_factor: 0.8,
        keys_per_bucket: 3,
        ..Default::default()
    };
    let chd = <Chd>::new(&keys, params).unwrap();
    chd.save_to_file(&path).unwrap();

    let loaded: Chd = Chd::load_from_file(&path).unwrap();
    assert_eq!(loaded.state(), chd.state());
    assert_eq!(bins(&loaded, &keys), bins(&chd, &keys));
}

#[test]
fn test_state_serde() {
    let keys = int_keys(100);
    let chd = <Chd>::new(&keys, ChdParams::default()).unwrap();

    let bytes = bincode::serialize(&chd.state()).unwrap();
    let state: ChdState = bincode::deserialize(&bytes).unwrap();
    let restored = <Chd>::from_state(state).unwrap();
    assert_eq!(bins(&restored, &keys), bins(&chd, &keys));
}

#[test]
fn test_import_hand_written_table() {
    // Any table is a valid function; it just need not be perfect.
    let chd = <Chd>::from_parts(10, vec![1, 2, 3], 0.5).unwrap();
    assert_eq!(chd.num_bins(), 20);
    assert_eq!(chd.num_buckets(), 3);
    for key in int_keys(100) {
        assert!(chd.hash(&key) < 20);
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

#[test]
fn test_every_bin_claimed_once() {
    let keys = random_keys(4000, 12);
    let params = ChdParams {
        load_factor: 0.7,
        ..Default::default()
    };
    let (chd, stats): (Chd, BucketStats) = Chd::new_with_stats(&keys, params).unwrap();

    assert_eq!(stats.bins_claimed(), keys.len());
    assert_eq!(stats.num_bins(), chd.num_bins());
    assert_eq!(stats.buckets(), chd.num_buckets());
    assert_eq!(stats.keys(), keys.len());
}

// ============================================================================
// ERRORS
// ============================================================================

#[test]
fn test_max_seed_one_fails() {
    let params = ChdParams {
        max_seed: 1,
        ..Default::default()
    };
    let result = <Chd>::new(&int_keys(4096), params);
    assert!(matches!(
        result,
        Err(PhfError::ConstructionExhausted { max_seed: 1, .. })
    ));
}

#[test]
fn test_tiny_seed_budget_fails_on_large_bucket() {
    // 64 keys in one bucket over 64 bins: a collision-free seed is
    // astronomically unlikely among the first few.
    let params = ChdParams {
        keys_per_bucket: 64,
        max_seed: 8,
        ..Default::default()
    };
    let result = <Chd>::new(&int_keys(64), params);
    assert!(matches!(
        result,
        Err(PhfError::ConstructionExhausted {
            bucket: 0,
            bucket_len: 64,
            max_seed: 8
        })
    ));
}

#[test]
fn test_invalid_load_factor() {
    for load_factor in [1.0001, 2.0, 0.0, -1.0, f64::NAN] {
        let params = ChdParams {
            load_factor,
            ..Default::default()
        };
        let result = <Chd>::new(&int_keys(10), params);
        assert!(matches!(result, Err(PhfError::InvalidConfiguration(_))));
    }
}

#[test]
fn test_zero_keys_per_bucket() {
    let params = ChdParams {
        keys_per_bucket: 0,
        ..Default::default()
    };
    let result = <Chd>::new(&int_keys(10), params);
    assert!(matches!(result, Err(PhfError::InvalidConfiguration(_))));
}

#[test]
fn test_duplicate_keys() {
    let mut keys = random_keys(1000, 13);
    keys.push(keys[417].clone());
    let result = <Chd>::new(&keys, ChdParams::default());
    assert!(matches!(
        result,
        Err(PhfError::DuplicateKey {
            first: 417,
            second: 1000
        })
    ));
}

#[test]
fn test_empty_inputs() {
    let keys: Vec<&str> = vec![];
    assert!(matches!(
        <Chd>::new(&keys, ChdParams::default()),
        Err(PhfError::EmptyKeySet)
    ));
    assert!(matches!(
        <Chd>::from_parts(0, vec![], 1.0),
        Err(PhfError::EmptyKeySet)
    ));
}

// ============================================================================
// HASHERS & CONCURRENCY
// ============================================================================

#[test]
fn test_xxh32_builder() {
    let keys = random_keys(3000, 14);
    let chd: Chd<Xxh32> = ChdBuilder::with_keys(keys.clone())
        .load_factor(0.9)
        .build()
        .unwrap();

    let ids: HashSet<u32> = keys.iter().map(|k| chd.hash(k)).collect();
    assert_eq!(ids.len(), 3000);
}

#[test]
fn test_concurrent_queries() {
    let keys = random_keys(10_000, 15);
    let chd = <Chd>::new(&keys, ChdParams::default()).unwrap();
    let expected = bins(&chd, &keys);

    std::thread::scope(|s| {
        for chunk in 0..4 {
            let (chd, keys, expected) = (&chd, &keys, &expected);
            s.spawn(move || {
                for i in (chunk..keys.len()).step_by(4) {
                    assert_eq!(chd.hash(&keys[i]), expected[i]);
                }
            });
        }
    });
}
