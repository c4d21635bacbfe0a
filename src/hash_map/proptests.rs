#![cfg(test)]

// Property tests for TreeBinHashMap kept inside the crate so they can check
// bin layout through `check_invariants` and `tree_bin_count`.

use super::TreeBinHashMap;
use crate::config::HashMapConfig;
use crate::order::{BinOrder, Natural, Unordered};
use proptest::prelude::*;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hasher};

/// Keeps only the hash bits in `mask`, so a few hundred keys pile up in a
/// handful of bins and exercise tree bins at every table size.
#[derive(Clone, Copy, Debug)]
struct Narrow {
    mask: u64,
}

struct NarrowHasher {
    state: u64,
    mask: u64,
}

impl Hasher for NarrowHasher {
    fn finish(&self) -> u64 {
        self.state & self.mask
    }
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = self.state.wrapping_mul(31).wrapping_add(u64::from(b));
        }
    }
    fn write_u32(&mut self, n: u32) {
        self.state = u64::from(n);
    }
}

impl BuildHasher for Narrow {
    type Hasher = NarrowHasher;
    fn build_hasher(&self) -> NarrowHasher {
        NarrowHasher {
            state: 0,
            mask: self.mask,
        }
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u32, i32),
    Remove(u32),
    Get(u32),
    PutIfAbsent(u32, i32),
    Merge(u32, i32),
    RemoveIf(u32, i32),
    Retain(u32),
    CursorSweep(u32),
    Clear,
}

fn arb_ops(keys: u32) -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        6 => (0..keys, -3i32..3).prop_map(|(k, v)| Op::Insert(k, v)),
        3 => (0..keys).prop_map(Op::Remove),
        2 => (0..keys).prop_map(Op::Get),
        1 => (0..keys, -3i32..3).prop_map(|(k, v)| Op::PutIfAbsent(k, v)),
        1 => (0..keys, -3i32..3).prop_map(|(k, v)| Op::Merge(k, v)),
        1 => (0..keys, -3i32..3).prop_map(|(k, v)| Op::RemoveIf(k, v)),
        1 => (0u32..5).prop_map(Op::Retain),
        1 => (0u32..5).prop_map(Op::CursorSweep),
        1 => Just(Op::Clear),
    ];
    proptest::collection::vec(op, 1..400)
}

fn combine(a: &i32, b: i32) -> Option<i32> {
    if b == 0 {
        None
    } else {
        Some(a.wrapping_add(b))
    }
}

fn run<O>(mask: u64, ops: Vec<Op>) -> std::result::Result<(), TestCaseError>
where
    O: BinOrder<u32> + Default,
{
    let mut sut: TreeBinHashMap<u32, i32, Narrow, O> =
        TreeBinHashMap::with_parts(HashMapConfig::new(), Narrow { mask }, O::default())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
    let mut model: HashMap<u32, i32> = HashMap::new();

    for op in ops {
        match op {
            Op::Insert(k, v) => {
                prop_assert_eq!(sut.insert(k, v), model.insert(k, v));
            }
            Op::Remove(k) => {
                prop_assert_eq!(sut.remove(&k), model.remove(&k));
            }
            Op::Get(k) => {
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            Op::PutIfAbsent(k, v) => {
                let expected = model.get(&k).copied();
                model.entry(k).or_insert(v);
                prop_assert_eq!(sut.put_if_absent(k, v).map(|v| *v), expected);
            }
            Op::Merge(k, v) => {
                let expected = match model.get(&k) {
                    None => Some(v),
                    Some(old) => combine(old, v),
                };
                match expected {
                    Some(n) => model.insert(k, n),
                    None => model.remove(&k),
                };
                prop_assert_eq!(sut.merge(k, v, combine).map(|v| *v), expected);
            }
            Op::RemoveIf(k, v) => {
                let hit = model.get(&k) == Some(&v);
                if hit {
                    model.remove(&k);
                }
                prop_assert_eq!(sut.remove_if(&k, &v), hit);
            }
            Op::Retain(n) => {
                let keep = |k: &u32| k % (n + 2) != 1;
                sut.retain(|k, _| keep(k));
                model.retain(|k, _| keep(k));
            }
            Op::CursorSweep(n) => {
                let doomed = |k: &u32| k % (n + 2) == 0;
                let mut cursor = sut.cursor();
                let mut visited = 0;
                while let Some((k, _)) = cursor
                    .next(&sut)
                    .map_err(|e| TestCaseError::fail(e.to_string()))?
                {
                    visited += 1;
                    if doomed(k) {
                        cursor
                            .remove(&mut sut)
                            .map_err(|e| TestCaseError::fail(e.to_string()))?;
                    }
                }
                prop_assert_eq!(visited, model.len());
                model.retain(|k, _| !doomed(k));
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
        }
        prop_assert_eq!(sut.len(), model.len());
        if let Err(msg) = sut.check_invariants() {
            return Err(TestCaseError::fail(msg));
        }
    }

    let mut seen: Vec<(u32, i32)> = sut.iter().map(|(k, v)| (*k, *v)).collect();
    let mut expected: Vec<(u32, i32)> = model.into_iter().collect();
    seen.sort_unstable();
    expected.sort_unstable();
    prop_assert_eq!(seen, expected);
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashMap
// while most keys share a few hash values.
// - Every operation returns what the model returns.
// - Bins stay well formed through treeify, untreeify and resize splits.
// - Cursor sweeps visit each entry once and remove exactly the chosen keys.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_unordered_tree_bins(mask in prop_oneof![Just(0u64), Just(3), Just(0xff)], ops in arb_ops(200)) {
        run::<Unordered>(mask, ops)?;
    }

    #[test]
    fn prop_ordered_tree_bins(mask in prop_oneof![Just(0u64), Just(3), Just(0xff)], ops in arb_ops(200)) {
        run::<Natural>(mask, ops)?;
    }
}

#[test]
fn narrow_hashes_build_tree_bins() {
    let mut m: TreeBinHashMap<u32, u32, Narrow> = TreeBinHashMap::with_hasher(Narrow { mask: 3 });
    for k in 0..200 {
        m.insert(k, k);
    }
    assert_eq!(m.tree_bin_count(), 4);
    m.check_invariants().unwrap();
    m.retain(|k, _| *k < 100);
    assert_eq!(m.tree_bin_count(), 4);
    m.retain(|k, _| *k < 8);
    assert_eq!(m.tree_bin_count(), 0);
    m.check_invariants().unwrap();
}
