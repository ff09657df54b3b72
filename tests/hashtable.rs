use std::collections::HashMap;

use kvcore::hash::str_hash;
use kvcore::hashtable::{HMap, HashEntry, HashLinks};
use kvcore::{Arena, HMapConfig};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// The number of operations to perform in each proptest case.
const TEST_SIZE: usize = 5_000;

#[derive(Debug)]
struct Entry {
    links: HashLinks,
    key: String,
    value: u64,
}

impl HashEntry for Entry {
    fn hash_links(&self) -> &HashLinks {
        &self.links
    }

    fn hash_links_mut(&mut self) -> &mut HashLinks {
        &mut self.links
    }
}

fn insert(map: &mut HMap, nodes: &mut Arena<Entry>, key: &str, value: u64) {
    let node = nodes.alloc(Entry {
        links: HashLinks::new(str_hash(key.as_bytes())),
        key: key.to_owned(),
        value,
    });
    map.insert(nodes, node);
}

fn lookup(map: &mut HMap, nodes: &mut Arena<Entry>, key: &str) -> Option<u64> {
    let node = map.lookup(nodes, str_hash(key.as_bytes()), |e| e.key == key)?;
    Some(nodes.get(node).value)
}

fn remove(map: &mut HMap, nodes: &mut Arena<Entry>, key: &str) -> Option<u64> {
    let node = map.remove(nodes, str_hash(key.as_bytes()), |e| e.key == key)?;
    Some(nodes.take(node).value)
}

// ─── Incremental resize ──────────────────────────────────────────────────────

#[test]
fn thousand_keys_survive_repeated_resizes() {
    let mut map = HMap::new();
    let mut nodes: Arena<Entry> = Arena::new();
    let mut resizes = 0;
    let mut buckets = 0;

    for i in 0..1000u64 {
        insert(&mut map, &mut nodes, &i.to_string(), i);
        if map.bucket_count() != buckets {
            if buckets != 0 {
                resizes += 1;
            }
            buckets = map.bucket_count();
        }
        assert_eq!(map.len(), i as usize + 1);
        // Everything inserted so far stays reachable mid-migration.
        if i % 97 == 0 {
            for j in 0..=i {
                assert_eq!(lookup(&mut map, &mut nodes, &j.to_string()), Some(j), "key {j} after {i} inserts");
            }
        }
    }
    assert!(resizes >= 3, "only {resizes} resizes");

    while map.is_resizing() {
        map.help_resize(&mut nodes);
    }
    assert_eq!(map.len(), 1000);
    for i in 0..1000u64 {
        assert_eq!(lookup(&mut map, &mut nodes, &i.to_string()), Some(i));
    }
}

#[test]
fn no_call_moves_more_than_the_budget() {
    let config = HMapConfig {
        initial_buckets: 4,
        max_load_factor: 1,
        max_resize_work: 2,
    };
    let mut map = HMap::with_config(config).unwrap();
    let mut nodes: Arena<Entry> = Arena::new();
    for i in 0..4u64 {
        insert(&mut map, &mut nodes, &i.to_string(), i);
    }
    // 4 entries in 4 buckets reached the load factor: resize began and moved 2.
    assert!(map.is_resizing());
    map.help_resize(&mut nodes);
    // The remaining 2 moved; the resize is complete.
    assert!(!map.is_resizing());
    assert_eq!(map.bucket_count(), 8);
}

#[test]
fn removing_everything_leaves_empty_index() {
    let mut map = HMap::new();
    let mut nodes: Arena<Entry> = Arena::new();
    for i in 0..200u64 {
        insert(&mut map, &mut nodes, &format!("k{i}"), i);
    }
    for i in 0..200u64 {
        assert_eq!(remove(&mut map, &mut nodes, &format!("k{i}")), Some(i));
    }
    assert!(map.is_empty());
    assert!(nodes.is_empty());
    assert!(remove(&mut map, &mut nodes, "k0").is_none());
}

#[test]
fn invalid_config_is_rejected() {
    let config = HMapConfig {
        initial_buckets: 6,
        ..HMapConfig::default()
    };
    assert!(HMap::with_config(config).is_err());
}

// ─── Randomized operations against HashMap ───────────────────────────────────

#[derive(Debug, Clone)]
enum MapOp {
    Insert(u16, u64),
    Remove(u16),
    Lookup(u16),
}

fn map_op_strategy() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        6 => (0u16..2_000, any::<u64>()).prop_map(|(k, v)| MapOp::Insert(k, v)),
        2 => (0u16..2_000).prop_map(MapOp::Remove),
        2 => (0u16..2_000).prop_map(MapOp::Lookup),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Every live key stays reachable with its latest value and `len()` tracks
    /// the number of live keys, through any number of resizes.
    #[test]
    fn index_matches_hashmap(ops in proptest::collection::vec(map_op_strategy(), TEST_SIZE), budget in 1usize..16) {
        let config = HMapConfig { max_resize_work: budget, ..HMapConfig::default() };
        let mut map = HMap::with_config(config).unwrap();
        let mut nodes: Arena<Entry> = Arena::new();
        let mut model: HashMap<String, u64> = HashMap::new();

        for op in &ops {
            match *op {
                MapOp::Insert(k, v) => {
                    let key = k.to_string();
                    if let Some(node) = map.lookup(&mut nodes, str_hash(key.as_bytes()), |e| e.key == key) {
                        nodes.get_mut(node).value = v;
                    } else {
                        insert(&mut map, &mut nodes, &key, v);
                    }
                    model.insert(key, v);
                }
                MapOp::Remove(k) => {
                    let key = k.to_string();
                    prop_assert_eq!(remove(&mut map, &mut nodes, &key), model.remove(&key), "remove({})", key);
                }
                MapOp::Lookup(k) => {
                    let key = k.to_string();
                    prop_assert_eq!(lookup(&mut map, &mut nodes, &key), model.get(&key).copied(), "lookup({})", key);
                }
            }
            prop_assert_eq!(map.len(), model.len(), "len mismatch after {:?}", op);
        }

        for (key, value) in &model {
            prop_assert_eq!(lookup(&mut map, &mut nodes, key), Some(*value));
        }
    }
}
