// TreeMap integration suite.
//
// The core invariants exercised:
// - Ordering: iteration is strictly increasing under the map's order.
// - Navigation: floor/ceiling/lower/higher agree with a linear scan.
// - Fail-fast cursors: removal through the cursor is allowed, any other
//   structural change is reported.
// - Key validation: keys the order cannot place are refused.
use std::cmp::Ordering;
use treebin_maps::{FnOrder, MapError, PartialNatural, Reverse, TreeMap};

// Test: the three-entry navigation scenario.
// Verifies: endpoints, floor/ceiling around a gap, iteration order.
#[test]
fn small_map_navigation() {
    let mut m = TreeMap::new();
    m.insert(5, "e");
    m.insert(1, "a");
    m.insert(3, "c");
    assert_eq!(m.first_key(), Ok(&1));
    assert_eq!(m.last_key(), Ok(&5));
    assert_eq!(m.floor_key(&4), Some(&3));
    assert_eq!(m.ceiling_key(&4), Some(&5));
    assert_eq!(m.keys().copied().collect::<Vec<_>>(), [1, 3, 5]);
    assert_eq!(m.iter().rev().map(|(k, _)| *k).collect::<Vec<_>>(), [5, 3, 1]);
}

// Test: navigation against a linear scan over a sparse key set.
#[test]
fn navigation_matches_linear_scan() {
    let keys: Vec<i64> = (0..200).map(|i| i * 7 % 401).collect();
    let m: TreeMap<i64, ()> = keys.iter().map(|&k| (k, ())).collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    for probe in -2..405 {
        let floor = sorted.iter().rev().find(|&&k| k <= probe);
        let lower = sorted.iter().rev().find(|&&k| k < probe);
        let ceiling = sorted.iter().find(|&&k| k >= probe);
        let higher = sorted.iter().find(|&&k| k > probe);
        assert_eq!(m.floor_key(&probe), floor, "floor {probe}");
        assert_eq!(m.lower_key(&probe), lower, "lower {probe}");
        assert_eq!(m.ceiling_key(&probe), ceiling, "ceiling {probe}");
        assert_eq!(m.higher_key(&probe), higher, "higher {probe}");
    }
    m.check_invariants().unwrap();
}

#[test]
fn entries_and_values() {
    let mut m: TreeMap<u32, String> = (0..10).map(|i| (i, i.to_string())).collect();
    assert_eq!(m.first_entry(), Some((&0, &"0".to_string())));
    assert_eq!(m.last_entry(), Some((&9, &"9".to_string())));
    assert_eq!(m.floor_entry(&100).map(|(k, _)| *k), Some(9));
    assert_eq!(m.get_key_value(&4).map(|(k, _)| *k), Some(4));
    if let Some(v) = m.get_mut(&4) {
        v.push('!');
    }
    for (k, v) in m.iter_mut() {
        if k % 2 == 0 {
            v.push('#');
        }
    }
    assert_eq!(m[&4], "4!#");
    assert_eq!(m.values().filter(|v| v.ends_with('#')).count(), 5);
    assert_eq!(m.remove_entry(&4), Some((4, "4!#".to_string())));
    assert!(!m.contains_key(&4));
    let owned: Vec<u32> = m.into_iter().map(|(k, _)| k).collect();
    assert_eq!(owned, [0, 1, 2, 3, 5, 6, 7, 8, 9]);
}

// Test: draining from both ends until empty.
#[test]
fn pop_until_empty() {
    let mut m: TreeMap<i32, i32> = (0..9).map(|i| (i, -i)).collect();
    let mut front = Vec::new();
    let mut back = Vec::new();
    while let Some((k, _)) = m.pop_first() {
        front.push(k);
        if let Some((k, _)) = m.pop_last() {
            back.push(k);
        }
        m.check_invariants().unwrap();
    }
    assert_eq!(front, [0, 1, 2, 3, 4]);
    assert_eq!(back, [8, 7, 6, 5]);
    assert!(m.is_empty());
    assert!(matches!(m.last_key(), Err(MapError::NotFound { .. })));
}

// Test: cursor removal and fail-fast detection.
#[test]
fn cursor_removes_and_detects_changes() {
    let mut m: TreeMap<i32, i32> = (0..20).map(|i| (i, i)).collect();
    let mut cursor = m.cursor();
    while let Some((k, _)) = cursor.next(&m).unwrap() {
        if k % 3 != 0 {
            cursor.remove(&mut m).unwrap();
        }
    }
    assert_eq!(m.keys().copied().collect::<Vec<_>>(), [0, 3, 6, 9, 12, 15, 18]);
    m.check_invariants().unwrap();

    let mut cursor = m.cursor();
    cursor.next(&m).unwrap();
    m.insert(0, 100);
    assert!(cursor.next(&m).is_ok());
    m.insert(1, 1);
    assert!(matches!(
        cursor.next(&m),
        Err(MapError::ConcurrentStructuralChange { .. })
    ));
    assert!(matches!(
        cursor.remove(&mut m),
        Err(MapError::ConcurrentStructuralChange { .. })
    ));
}

// Test: a cursor stepped against a map it was not taken from.
// Verifies: the mismatch is an error, not a walk of the other map.
#[test]
fn cursor_is_bound_to_its_map() {
    let a: TreeMap<i32, i32> = (0..3).map(|i| (i, i)).collect();
    let mut b: TreeMap<i32, i32> = (10..13).map(|i| (i, i)).collect();
    let mut cursor = a.cursor();
    assert!(matches!(
        cursor.next(&b),
        Err(MapError::InvalidArgument { .. })
    ));
    assert!(cursor.remove(&mut b).is_err());
    assert_eq!(b.len(), 3);

    let c = a.clone();
    assert!(cursor.next(&c).is_err());
    assert_eq!(cursor.next(&a).unwrap(), Some((&0, &0)));
}

// Test: a caller-supplied comparator.
// Verifies: order, navigation and the validator's rejection path.
#[test]
fn comparator_orders_and_validates() {
    let order = FnOrder::new(|a: &f64, b: &f64| b.partial_cmp(a).unwrap_or(Ordering::Equal))
        .with_validator(|k: &f64| k.is_finite());
    let mut m = TreeMap::with_order(order);
    for k in [0.5, -1.0, 3.25, 2.0] {
        m.try_insert(k, ()).unwrap();
    }
    assert_eq!(m.keys().copied().collect::<Vec<_>>(), [3.25, 2.0, 0.5, -1.0]);
    assert_eq!(m.ceiling_key(&1.0), Some(&0.5));
    assert_eq!(m.floor_key(&1.0), Some(&2.0));
    for bad in [f64::NAN, f64::INFINITY] {
        let err = m.try_insert(bad, ()).unwrap_err();
        assert!(matches!(err, MapError::KeyOrdering { .. }));
    }
    assert_eq!(m.len(), 4);
    m.check_invariants().unwrap();
}

#[test]
fn reversed_partial_order() {
    let mut m = TreeMap::with_order(Reverse(PartialNatural));
    m.extend([(1.5f32, 'a'), (0.0, 'b'), (-3.0, 'c')]);
    assert_eq!(m.first_key(), Ok(&1.5));
    assert_eq!(m.last_key(), Ok(&-3.0));
    assert!(m.try_insert(f32::NAN, 'd').is_err());
}

// Test: a larger random workload keeps the red-black shape.
#[test]
fn interleaved_inserts_and_removes_stay_balanced() {
    let mut m = TreeMap::new();
    let mut x: u64 = 0x2545_f491_4f6c_dd1d;
    for round in 0..4000u32 {
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        let k = (x % 500) as u32;
        if x % 3 == 0 {
            m.remove(&k);
        } else {
            m.insert(k, round);
        }
        if round % 250 == 0 {
            m.check_invariants().unwrap();
        }
    }
    m.check_invariants().unwrap();
    let keys: Vec<_> = m.keys().copied().collect();
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn clear_and_reuse() {
    let mut m: TreeMap<i32, i32> = (0..100).map(|i| (i, i)).collect();
    let cursor = m.cursor();
    m.clear();
    assert!(m.is_empty());
    let mut cursor = cursor;
    assert!(cursor.next(&m).is_err());
    m.insert(7, 7);
    assert_eq!(m.len(), 1);
    m.check_invariants().unwrap();
}
