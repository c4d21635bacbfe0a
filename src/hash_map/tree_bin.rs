//! Tree bins: a red-black tree over one bucket's entries.
//!
//! Entries are ordered by hash, then by the map's optional [`BinOrder`],
//! then by creation sequence. Alongside the tree, every entry stays on a
//! doubly linked list in insertion order so the bin iterates, splits, and
//! reverts to a chain without consulting the tree shape.
//!
//! [`BinOrder`]: crate::BinOrder

use super::bin::{Bin, Entry};
use crate::config::UNTREEIFY_THRESHOLD;
use crate::rbtree::{NodeId, RbTree, Side, Slot};
use core::cmp::Ordering;

#[derive(Clone, Debug)]
pub(crate) struct Linked<K, V> {
    entry: Entry<K, V>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

#[derive(Clone, Debug)]
pub(crate) struct TreeBin<K, V> {
    tree: RbTree<Linked<K, V>>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl<K, V> Default for TreeBin<K, V> {
    fn default() -> Self {
        Self {
            tree: RbTree::new(),
            head: None,
            tail: None,
        }
    }
}

impl<K, V> TreeBin<K, V> {
    /// Treeifies a chain. `cmp(a, b)` is the map's optional key order.
    pub(crate) fn from_entries<C>(entries: Vec<Entry<K, V>>, cmp: &C) -> Self
    where
        C: Fn(&K, &K) -> Option<Ordering>,
    {
        let mut bin = Self::default();
        for entry in entries {
            bin.insert(entry, cmp);
        }
        bin
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.tree.len()
    }

    #[inline]
    pub(crate) fn head(&self) -> Option<NodeId> {
        self.head
    }

    #[inline]
    pub(crate) fn next_of(&self, id: NodeId) -> Option<NodeId> {
        self.tree.item(id).next
    }

    #[inline]
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.tree.contains(id)
    }

    #[inline]
    pub(crate) fn entry(&self, id: NodeId) -> &Entry<K, V> {
        &self.tree.item(id).entry
    }

    #[inline]
    pub(crate) fn entry_mut(&mut self, id: NodeId) -> &mut Entry<K, V> {
        &mut self.tree.item_mut(id).entry
    }

    /// Node ids in linear (insertion) order.
    pub(crate) fn linear_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len());
        let mut cur = self.head;
        while let Some(id) = cur {
            out.push(id);
            cur = self.next_of(id);
        }
        out
    }

    /// Ordinal of `id` in linear order.
    pub(crate) fn position_of(&self, id: NodeId) -> Option<usize> {
        let mut cur = self.head;
        let mut i = 0;
        while let Some(n) = cur {
            if n == id {
                return Some(i);
            }
            i += 1;
            cur = self.next_of(n);
        }
        None
    }

    pub(crate) fn find_seq(&self, seq: u64) -> Option<NodeId> {
        let mut cur = self.head;
        while let Some(id) = cur {
            if self.entry(id).seq == seq {
                return Some(id);
            }
            cur = self.next_of(id);
        }
        None
    }

    /// Looks up an entry with `hash` whose key satisfies `eq`.
    ///
    /// `cmp(stored)` orders the query against a stored key when the map has
    /// a key order. Where hashes tie and the order cannot decide, both
    /// subtrees are searched.
    pub(crate) fn find<E, C>(&self, hash: u32, eq: &E, cmp: &C) -> Option<NodeId>
    where
        E: Fn(&K) -> bool,
        C: Fn(&K) -> Option<Ordering>,
    {
        self.find_from(self.tree.root(), hash, eq, cmp)
    }

    fn find_from<E, C>(&self, start: Option<NodeId>, hash: u32, eq: &E, cmp: &C) -> Option<NodeId>
    where
        E: Fn(&K) -> bool,
        C: Fn(&K) -> Option<Ordering>,
    {
        let mut cur = start;
        while let Some(id) = cur {
            let e = self.entry(id);
            let (left, right) = (self.tree.left(id), self.tree.right(id));
            cur = match hash.cmp(&e.hash) {
                Ordering::Less => left,
                Ordering::Greater => right,
                Ordering::Equal if eq(&e.key) => return Some(id),
                Ordering::Equal => match (left, right) {
                    (None, _) => right,
                    (_, None) => left,
                    _ => match cmp(&e.key) {
                        Some(Ordering::Less) => left,
                        Some(Ordering::Greater) => right,
                        _ => {
                            if let Some(found) = self.find_from(right, hash, eq, cmp) {
                                return Some(found);
                            }
                            left
                        }
                    },
                },
            };
        }
        None
    }

    /// Links a new entry (known to be absent) into the tree and at the tail
    /// of the linear list.
    pub(crate) fn insert<C>(&mut self, entry: Entry<K, V>, cmp: &C) -> NodeId
    where
        C: Fn(&K, &K) -> Option<Ordering>,
    {
        let slot = self.placement(&entry, cmp);
        let prev = self.tail;
        let id = self.tree.insert_at(
            slot,
            Linked {
                entry,
                prev,
                next: None,
            },
        );
        match prev {
            Some(p) => self.tree.item_mut(p).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    fn placement<C>(&self, entry: &Entry<K, V>, cmp: &C) -> Slot
    where
        C: Fn(&K, &K) -> Option<Ordering>,
    {
        let mut cur = self.tree.root()?;
        loop {
            let e = self.entry(cur);
            let dir = match entry.hash.cmp(&e.hash) {
                Ordering::Equal => match cmp(&entry.key, &e.key) {
                    Some(o) if o != Ordering::Equal => o,
                    _ => entry.seq.cmp(&e.seq),
                },
                o => o,
            };
            let (next, side) = if dir == Ordering::Less {
                (self.tree.left(cur), Side::Left)
            } else {
                (self.tree.right(cur), Side::Right)
            };
            match next {
                Some(n) => cur = n,
                None => return Some((cur, side)),
            }
        }
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Entry<K, V>> {
        if !self.tree.contains(id) {
            return None;
        }
        let (prev, next) = {
            let l = self.tree.item(id);
            (l.prev, l.next)
        };
        match prev {
            Some(p) => self.tree.item_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.tree.item_mut(n).prev = prev,
            None => self.tail = prev,
        }
        self.tree.remove(id).map(|l| l.entry)
    }

    /// Mutable entries in linear order.
    pub(crate) fn entries_mut(&mut self) -> Vec<&mut Entry<K, V>> {
        let ids = self.linear_ids();
        self.tree
            .items_mut_in(&ids)
            .into_iter()
            .map(|l| &mut l.entry)
            .collect()
    }

    /// Untreeifies, keeping linear order.
    pub(crate) fn into_entries(self) -> Vec<Entry<K, V>> {
        let ids = self.linear_ids();
        self.tree
            .into_items(&ids)
            .into_iter()
            .map(|l| l.entry)
            .collect()
    }

    /// Splits the bin for a table that doubles from `bit` slots: entries
    /// whose hash has `bit` set move to the high half.
    ///
    /// A side receiving every entry keeps this tree as is; otherwise each
    /// side is rebuilt, as a tree only if it stays above the untreeify
    /// threshold.
    pub(crate) fn split<C>(self, bit: usize, cmp: &C) -> (Bin<K, V>, Bin<K, V>)
    where
        C: Fn(&K, &K) -> Option<Ordering>,
    {
        let high = self
            .linear_ids()
            .into_iter()
            .filter(|&id| self.entry(id).hash as usize & bit != 0)
            .count();
        if high == 0 {
            return (Bin::Tree(self), Bin::Empty);
        }
        if high == self.len() {
            return (Bin::Empty, Bin::Tree(self));
        }
        let (lo, hi): (Vec<_>, Vec<_>) = self
            .into_entries()
            .into_iter()
            .partition(|e| e.hash as usize & bit == 0);
        log::trace!("split tree bin: {} low, {} high", lo.len(), hi.len());
        (Bin::from_entries(lo, cmp), Bin::from_entries(hi, cmp))
    }

    /// Red-black invariants, hash order, size floor, and agreement between
    /// the tree and the linear list.
    pub(crate) fn check(&self) -> Result<(), String> {
        self.tree.check(|a, b| a.entry.hash <= b.entry.hash)?;
        if self.len() <= UNTREEIFY_THRESHOLD {
            return Err(format!("tree bin holds only {} entries", self.len()));
        }
        let mut prev = None;
        let mut count = 0;
        let mut cur = self.head;
        while let Some(id) = cur {
            if !self.tree.contains(id) {
                return Err("linear list points outside the tree".into());
            }
            let l = self.tree.item(id);
            if l.prev != prev {
                return Err("linear list back link mismatch".into());
            }
            count += 1;
            prev = Some(id);
            cur = l.next;
        }
        if prev != self.tail {
            return Err("linear list tail mismatch".into());
        }
        if count != self.len() {
            return Err(format!(
                "linear list holds {count} entries, tree holds {}",
                self.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hash: u32, seq: u64, key: &'static str) -> Entry<&'static str, u64> {
        Entry {
            hash,
            seq,
            key,
            value: seq,
        }
    }

    fn no_order(_: &&'static str, _: &&'static str) -> Option<Ordering> {
        None
    }

    fn keys(bin: &TreeBin<&'static str, u64>) -> Vec<&'static str> {
        bin.linear_ids().into_iter().map(|id| bin.entry(id).key).collect()
    }

    const NAMES: [&str; 10] = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];

    #[test]
    fn equal_hashes_are_all_reachable() {
        let entries = NAMES
            .iter()
            .enumerate()
            .map(|(i, k)| entry(7, i as u64, k))
            .collect();
        let bin = TreeBin::from_entries(entries, &no_order);
        bin.check().unwrap();
        for k in NAMES {
            let id = bin
                .find(7, &|s: &&str| *s == k, &|_: &&str| None)
                .unwrap_or_else(|| panic!("{k} not found"));
            assert_eq!(bin.entry(id).key, k);
        }
        assert!(bin.find(7, &|s: &&str| *s == "zz", &|_: &&str| None).is_none());
        assert!(bin.find(8, &|_: &&str| true, &|_: &&str| None).is_none());
    }

    #[test]
    fn key_order_narrows_tied_lookups() {
        let entries = NAMES
            .iter()
            .enumerate()
            .map(|(i, k)| entry(1, i as u64, k))
            .collect();
        let natural = |a: &&'static str, b: &&'static str| Some(a.cmp(b));
        let bin = TreeBin::from_entries(entries, &natural);
        bin.check().unwrap();
        for k in NAMES {
            let id = bin
                .find(1, &|s: &&str| *s == k, &|s: &&str| Some(k.cmp(s)))
                .unwrap();
            assert_eq!(bin.entry(id).key, k);
        }
    }

    #[test]
    fn linear_order_survives_removal() {
        let entries = NAMES
            .iter()
            .enumerate()
            .map(|(i, k)| entry(i as u32 % 3, i as u64, k))
            .collect();
        let mut bin = TreeBin::from_entries(entries, &no_order);
        let d = bin.find_seq(3).unwrap();
        assert_eq!(bin.position_of(d), Some(3));
        assert_eq!(bin.remove(d).map(|e| e.key), Some("d"));
        assert!(bin.remove(d).is_none());
        assert_eq!(keys(&bin), ["a", "b", "c", "e", "f", "g", "h", "i", "j"]);
        bin.check().unwrap();
        let entries = bin.into_entries();
        assert_eq!(entries.len(), 9);
        assert_eq!(entries[3].key, "e");
    }

    #[test]
    fn split_partitions_by_bit() {
        let entries = (0..16u32)
            .map(|i| entry(i, u64::from(i), NAMES[(i % 10) as usize]))
            .collect();
        let bin = TreeBin::from_entries(entries, &no_order);
        let (lo, hi) = bin.split(8, &no_order);
        // 8 entries each: both stay trees.
        match (&lo, &hi) {
            (Bin::Tree(l), Bin::Tree(h)) => {
                l.check().unwrap();
                h.check().unwrap();
                assert!(l.linear_ids().iter().all(|&id| l.entry(id).hash < 8));
                assert!(h.linear_ids().iter().all(|&id| h.entry(id).hash >= 8));
            }
            _ => panic!("expected two tree bins"),
        }

        let entries = (0..10u32)
            .map(|i| entry(i * 2, u64::from(i), NAMES[i as usize]))
            .collect();
        let bin = TreeBin::from_entries(entries, &no_order);
        // Bit 1 is never set in an even hash: the whole tree moves low.
        let (lo, hi) = bin.split(1, &no_order);
        assert!(matches!(lo, Bin::Tree(_)));
        assert!(matches!(hi, Bin::Empty));
    }

    #[test]
    fn small_split_halves_become_chains() {
        let entries = (0..8u32)
            .map(|i| entry(i, u64::from(i), NAMES[i as usize]))
            .collect();
        let bin = TreeBin::from_entries(entries, &no_order);
        let (lo, hi) = bin.split(4, &no_order);
        match (lo, hi) {
            (Bin::Chain(l), Bin::Chain(h)) => {
                assert_eq!(l.iter().map(|e| e.key).collect::<Vec<_>>(), ["a", "b", "c", "d"]);
                assert_eq!(h.iter().map(|e| e.key).collect::<Vec<_>>(), ["e", "f", "g", "h"]);
            }
            _ => panic!("expected two chains"),
        }
    }
}
