//! Property-Based Tests for the Cache
//!
//! Uses proptest to verify correctness properties of the facade and its
//! supporting structures under generated operation sequences.

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::cache::Cache;
use crate::config::CacheConfig;
use crate::recency::RecencyTracker;

// == Strategies ==
/// Generates valid cache keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}"
}

/// Generates structured cache values with some nesting
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,64}".prop_map(|s| json!(s)),
        (any::<i64>(), "[a-z]{1,16}").prop_map(|(n, s)| json!({"num": n, "tag": s, "list": [n, n]})),
    ]
}

/// A cache operation for sequence testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn scratch_cache(id: &str) -> (tempfile::TempDir, Cache) {
    let dir = tempfile::tempdir().unwrap();
    let config = CacheConfig::default()
        .with_cache_dir(dir.path())
        .with_cache_id(id);
    (dir, Cache::new(config))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any valid key-value pair, storing then retrieving it returns the
    // stored value.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let (_dir, mut cache) = scratch_cache("prop_rt");

        cache.set(&key, value.clone()).unwrap();
        prop_assert_eq!(cache.get(&key), Some(value));
    }

    // After delete, the key is absent from the store, the key list and
    // the recency tracker.
    #[test]
    fn prop_delete_removes_entry(key in key_strategy(), value in value_strategy()) {
        let (_dir, mut cache) = scratch_cache("prop_del");

        cache.set(&key, value).unwrap();
        prop_assert!(cache.get(&key).is_some());

        cache.delete(&key).unwrap();
        prop_assert!(cache.get(&key).is_none());
        prop_assert!(!cache.keys().contains(&key));
        prop_assert!(!cache.recently_used(&key));
    }

    // Storing V1 then V2 under the same key yields V2 and one entry.
    #[test]
    fn prop_overwrite_semantics(
        key in key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        let (_dir, mut cache) = scratch_cache("prop_ow");

        cache.set(&key, value1).unwrap();
        cache.set(&key, value2.clone()).unwrap();

        prop_assert_eq!(cache.get(&key), Some(value2));
        prop_assert_eq!(cache.len(), 1);
    }

    // The recency tracker never exceeds its capacity, and dropping a key
    // from it never loses the stored value.
    #[test]
    fn prop_recency_capacity_bound(
        keys in prop::collection::vec(key_strategy(), 1..100)
    ) {
        let capacity = 10;
        let mut tracker = RecencyTracker::new(capacity);

        for key in &keys {
            tracker.touch(key);
            prop_assert!(tracker.len() <= capacity, "tracker exceeded capacity");
        }
    }

    #[test]
    fn prop_recency_eviction_is_advisory(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..50)
    ) {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            recency_capacity: 5,
            max_entries: 1000,
            cache_dir: dir.path().to_path_buf(),
            ..CacheConfig::default()
        };
        let mut cache = Cache::new(config);

        let mut expected = std::collections::HashMap::new();
        for (key, value) in entries {
            cache.set(&key, value.clone()).unwrap();
            expected.insert(key, value);
        }

        // Every stored value survives, even for keys the tracker dropped
        for (key, value) in expected {
            prop_assert_eq!(cache.get(&key), Some(value));
        }
    }

    // A save followed by a load into a fresh instance reproduces the same
    // key/value pairs.
    #[test]
    fn prop_save_load_round_trip(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..30)
    ) {
        let dir = tempfile::tempdir().unwrap();

        let mut expected = std::collections::HashMap::new();
        {
            let config = CacheConfig::default()
                .with_cache_dir(dir.path())
                .with_cache_id("prop_persist");
            let mut cache = Cache::new(config);
            for (key, value) in entries {
                cache.set(&key, value.clone()).unwrap();
                expected.insert(key, value);
            }
            cache.save(false);
        }

        let mut restored = Cache::new(CacheConfig::default());
        restored.load_from("prop_persist", dir.path()).unwrap();

        prop_assert_eq!(restored.len(), expected.len());
        for (key, value) in expected {
            prop_assert_eq!(restored.get(&key), Some(value));
        }
    }

    // For any operation sequence, the facade never leaves a key in the
    // recency tracker without a backing entry after a delete, and the
    // store never exceeds its capacity.
    #[test]
    fn prop_operation_sequences_stay_consistent(
        ops in prop::collection::vec(cache_op_strategy(), 1..60)
    ) {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            max_entries: 20,
            cache_dir: dir.path().to_path_buf(),
            ..CacheConfig::default()
        };
        let mut cache = Cache::new(config);

        let mut model = std::collections::HashMap::new();
        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(&key, value.clone()).unwrap();
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    if let Some(found) = cache.get(&key) {
                        // A hit must match the model unless the model entry
                        // was evicted at capacity (then the key is absent)
                        if let Some(expected) = model.get(&key) {
                            prop_assert_eq!(&found, expected);
                        }
                    }
                }
                CacheOp::Delete { key } => {
                    cache.delete(&key).unwrap();
                    model.remove(&key);
                    prop_assert!(cache.get(&key).is_none());
                    prop_assert!(!cache.recently_used(&key));
                }
            }
            prop_assert!(cache.len() <= 20, "store exceeded capacity");
        }
    }
}
