// TreeBinHashMap integration suite.
//
// Hashing is made deterministic with an identity hasher so tests can place
// keys into chosen bins. The core behaviors exercised:
// - Bin conversion: a crowded chain becomes a tree bin once the table has
//   64 slots, and a shrinking tree bin becomes a chain again at 6 entries.
// - Resizing: entries survive every doubling, tree bins included.
// - Fail-fast cursors: a structural change not made through the cursor is
//   reported; value replacement is not structural.
// - Construction parameters are validated.
use std::hash::{BuildHasher, Hash, Hasher};
use treebin_maps::{
    BinShape, HashMapConfig, MapError, Natural, TreeBinHashMap, Unordered,
};

#[derive(Default, Clone)]
struct Identity;

#[derive(Default)]
struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }
    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
}

impl BuildHasher for Identity {
    type Hasher = IdentityHasher;
    fn build_hasher(&self) -> IdentityHasher {
        IdentityHasher::default()
    }
}

/// `Plain(n)` hashes to `n`; every `Colliding` key hashes to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TestKey {
    Plain(u64),
    Colliding(u64),
}

impl Hash for TestKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match *self {
            TestKey::Plain(n) => state.write_u64(n),
            TestKey::Colliding(_) => state.write_u64(0),
        }
    }
}

type TestMap<O = Unordered> = TreeBinHashMap<TestKey, u64, Identity, O>;

fn test_map() -> TestMap {
    TreeBinHashMap::with_hasher(Identity)
}

// Test: many plain keys plus ten keys sharing one hash.
// Verifies: the shared bin is a tree once the table is large enough, and
// every key stays retrievable.
#[test]
fn colliding_keys_form_a_tree_bin() {
    let mut m = test_map();
    for n in 1..100 {
        m.insert(TestKey::Plain(n), n);
    }
    for n in 0..10 {
        m.insert(TestKey::Colliding(n), 1000 + n);
    }
    assert_eq!(m.len(), 109);
    assert!(m.capacity() >= 64);
    assert_eq!(m.capacity(), 256);
    assert_eq!(m.bin_shape(&TestKey::Colliding(0)), Some(BinShape::Tree { len: 10 }));
    assert_eq!(m.tree_bin_count(), 1);
    for n in 0..10 {
        assert_eq!(m.get(&TestKey::Colliding(n)), Some(&(1000 + n)));
    }
    for n in 1..100 {
        assert_eq!(m.get(&TestKey::Plain(n)), Some(&n));
    }
    assert_eq!(m.get(&TestKey::Colliding(10)), None);
    m.check_invariants().unwrap();
}

// Test: collisions in a fresh 16-slot table.
// Verifies: the table doubles twice instead of treeifying, then the bin
// becomes a tree at 64 slots.
#[test]
fn small_table_grows_before_treeifying() {
    let mut m = test_map();
    for n in 0..8 {
        m.insert(TestKey::Colliding(n), n);
    }
    assert_eq!(m.capacity(), 32);
    assert_eq!(m.tree_bin_count(), 0);
    m.insert(TestKey::Colliding(8), 8);
    assert_eq!(m.capacity(), 64);
    assert_eq!(m.tree_bin_count(), 0);
    m.insert(TestKey::Colliding(9), 9);
    assert_eq!(m.capacity(), 64);
    assert_eq!(m.bin_shape(&TestKey::Colliding(9)), Some(BinShape::Tree { len: 10 }));
    m.check_invariants().unwrap();
}

// Test: shrink a tree bin one removal at a time.
// Verifies: the bin stays a tree down to 7 entries, becomes a chain at 6,
// and the surviving key/value set is unchanged by the conversion.
#[test]
fn shrinking_tree_bin_reverts_to_chain() {
    let mut m = test_map();
    m.reserve(64);
    for n in 0..10 {
        m.insert(TestKey::Colliding(n), n);
    }
    assert!(m.bin_shape(&TestKey::Colliding(0)).unwrap().is_tree());
    for n in 0..3 {
        assert_eq!(m.remove(&TestKey::Colliding(n)), Some(n));
    }
    assert_eq!(m.bin_shape(&TestKey::Colliding(3)), Some(BinShape::Tree { len: 7 }));
    assert_eq!(m.remove(&TestKey::Colliding(3)), Some(3));
    assert_eq!(m.bin_shape(&TestKey::Colliding(4)), Some(BinShape::Chain { len: 6 }));
    let mut rest: Vec<_> = m.iter().map(|(k, v)| (*k, *v)).collect();
    rest.sort();
    let expected: Vec<_> = (4..10).map(|n| (TestKey::Colliding(n), n)).collect();
    assert_eq!(rest, expected);
    m.check_invariants().unwrap();
}

// Test: naturally ordered keys inside a tree bin.
// Verifies: lookups, removals and re-inserts work with an ordered bin.
#[test]
fn ordered_tree_bin_lookups() {
    let cfg = HashMapConfig::new().initial_capacity(64);
    let mut m: TestMap<Natural> = TreeBinHashMap::with_parts(cfg, Identity, Natural).unwrap();
    for n in (0..40).rev() {
        m.insert(TestKey::Colliding(n), n);
    }
    assert_eq!(m.bin_shape(&TestKey::Colliding(0)), Some(BinShape::Tree { len: 40 }));
    for n in 0..40 {
        assert_eq!(m.get(&TestKey::Colliding(n)), Some(&n));
    }
    for n in (0..40).step_by(3) {
        assert_eq!(m.remove(&TestKey::Colliding(n)), Some(n));
    }
    assert_eq!(m.insert(TestKey::Colliding(1), 100), Some(1));
    assert_eq!(m.insert(TestKey::Colliding(0), 0), None);
    assert_eq!(m.get(&TestKey::Colliding(1)), Some(&100));
    m.check_invariants().unwrap();
}

// Test: resizing a table that holds a tree bin.
// Verifies: tree bins split by hash bit and survive growth.
#[test]
fn tree_bins_survive_resize() {
    let mut m = test_map();
    m.reserve(40);
    // Two groups of twelve keys share bin 3 until the table reaches 128
    // slots, then split apart.
    for n in 0..12 {
        m.insert(TestKey::Plain(3 + 64 * (2 * n)), n);
        m.insert(TestKey::Plain(3 + 64 * (2 * n + 1)), n);
    }
    let before = m.capacity();
    assert_eq!(before, 64);
    assert_eq!(m.tree_bin_count(), 1);
    for n in 100_000..100_100 {
        m.insert(TestKey::Plain(n), n);
    }
    assert!(m.capacity() > before);
    for n in 0..12 {
        assert_eq!(m.get(&TestKey::Plain(3 + 64 * (2 * n))), Some(&n));
        assert_eq!(m.get(&TestKey::Plain(3 + 64 * (2 * n + 1))), Some(&n));
    }
    m.check_invariants().unwrap();
}

// Test: cursor walk with concurrent modification.
// Verifies: value replacement is tolerated, a new key is detected.
#[test]
fn cursor_fails_fast_on_structural_change() {
    let mut m = test_map();
    for n in 0..20 {
        m.insert(TestKey::Plain(n), n);
    }
    let mut cursor = m.cursor();
    let (k, _) = cursor.next(&m).unwrap().unwrap();
    let k = *k;
    m.insert(k, 99);
    assert!(cursor.next(&m).unwrap().is_some());

    m.insert(TestKey::Plain(500), 500);
    match cursor.next(&m) {
        Err(MapError::ConcurrentStructuralChange { expected, actual }) => {
            assert_ne!(expected, actual)
        }
        other => panic!("expected a structural change error, got {other:?}"),
    }

    let mut cursor = m.cursor();
    m.remove(&TestKey::Plain(0));
    assert_eq!(
        cursor.next(&m).unwrap_err().category(),
        MapError::structural_change(0, 1).category()
    );
}

// Test: a cursor stepped against a map it was not taken from.
// Verifies: the mismatch is an error, including for a clone.
#[test]
fn cursor_is_bound_to_its_map() {
    let mut a = test_map();
    let mut b = test_map();
    for n in 0..4 {
        a.insert(TestKey::Plain(n), n);
        b.insert(TestKey::Plain(n + 10), n);
    }
    let mut cursor = a.cursor();
    assert!(matches!(
        cursor.next(&b),
        Err(MapError::InvalidArgument { .. })
    ));
    assert!(cursor.remove(&mut b).is_err());
    assert_eq!(b.len(), 4);

    let c = a.clone();
    assert!(cursor.next(&c).is_err());
    assert!(cursor.next(&a).unwrap().is_some());
}

// Test: remove through the cursor, across chain and tree bins.
// Verifies: every entry is visited exactly once, and tree bins that
// collapse mid-walk do not derail the cursor.
#[test]
fn cursor_removal_visits_everything_once() {
    let mut m = test_map();
    m.reserve(64);
    for n in 0..12 {
        m.insert(TestKey::Colliding(n), n);
    }
    for n in 1..30 {
        m.insert(TestKey::Plain(n), n);
    }
    assert_eq!(m.tree_bin_count(), 1);
    let mut seen = Vec::new();
    let mut cursor = m.cursor();
    while let Some((k, _)) = cursor.next(&m).unwrap() {
        seen.push(*k);
        let (removed, _) = cursor.remove(&mut m).unwrap();
        assert_eq!(removed, *seen.last().unwrap());
    }
    assert!(m.is_empty());
    assert_eq!(seen.len(), 41);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 41);
    m.check_invariants().unwrap();
}

#[test]
fn cursor_remove_needs_a_current_entry() {
    let mut m = test_map();
    m.insert(TestKey::Plain(1), 1);
    let mut cursor = m.cursor();
    assert!(matches!(cursor.remove(&mut m), Err(MapError::NotFound { .. })));
    cursor.next(&m).unwrap();
    cursor.remove(&mut m).unwrap();
    assert!(matches!(cursor.remove(&mut m), Err(MapError::NotFound { .. })));
    assert_eq!(cursor.next(&m).unwrap(), None);
}

#[test]
fn construction_parameters_are_validated() {
    assert!(TreeBinHashMap::<u32, u32>::with_capacity_and_load_factor(16, 0.0).is_err());
    assert!(TreeBinHashMap::<u32, u32>::with_capacity_and_load_factor(16, f32::NAN).is_err());
    assert!(TreeBinHashMap::<u32, u32>::with_capacity_and_load_factor(16, -1.0).is_err());
    let err = HashMapConfig::from_signed(-1, 0.75).unwrap_err();
    assert!(matches!(err, MapError::InvalidArgument { .. }));
    let m = TreeBinHashMap::<u32, u32>::with_capacity_and_load_factor(0, 2.0).unwrap();
    assert_eq!(m.load_factor(), 2.0);
}

#[test]
fn high_load_factor_packs_bins() {
    let cfg = HashMapConfig::new().initial_capacity(16).load_factor(4.0);
    let mut m: TestMap = TreeBinHashMap::with_config_and_hasher(cfg, Identity).unwrap();
    for n in 0..64 {
        m.insert(TestKey::Plain(n), n);
    }
    assert_eq!(m.capacity(), 16);
    m.insert(TestKey::Plain(64), 64);
    assert_eq!(m.capacity(), 32);
    m.check_invariants().unwrap();
}

#[test]
fn bulk_operations() {
    let a: TreeBinHashMap<String, usize> =
        (0..50).map(|i| (format!("k{i}"), i)).collect();
    let mut b = TreeBinHashMap::new();
    b.put_all(&a);
    assert_eq!(a, b);
    b.insert("extra".to_string(), 0);
    assert_ne!(a, b);

    let mut c = a.clone();
    c.extend(b.iter().map(|(k, v)| (k.clone(), *v)));
    assert_eq!(c, b);
    assert!(c.contains_value(&49));
    assert!(!c.contains_value(&50));

    let mut total = 0;
    for v in c.values_mut() {
        *v += 1;
        total += *v;
    }
    assert_eq!(total, (1..=50).sum::<usize>() + 1);
    assert_eq!(c["k0"], 1);

    let owned: Vec<(String, usize)> = c.into_iter().collect();
    assert_eq!(owned.len(), 51);
}

#[test]
fn debug_lists_entries() {
    let mut m = TreeBinHashMap::new();
    m.insert(1, "one");
    assert_eq!(format!("{m:?}"), r#"{1: "one"}"#);
}

#[test]
#[should_panic]
fn index_of_missing_key_panics() {
    let m: TreeBinHashMap<u32, u32> = TreeBinHashMap::new();
    let _ = m[&7];
}
