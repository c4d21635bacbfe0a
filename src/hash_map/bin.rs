//! One slot of the bucket array.

use super::tree_bin::TreeBin;
use crate::config::UNTREEIFY_THRESHOLD;
use crate::rbtree::NodeId;
use core::cmp::Ordering;
use core::mem;

#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) hash: u32,
    /// Creation order; unique within a map. Breaks hash ties in tree bins
    /// and identifies an entry across a resize.
    pub(crate) seq: u64,
    pub(crate) key: K,
    pub(crate) value: V,
}

/// A bin is either a plain chain or a red-black tree; conversion between the
/// two is explicit.
#[derive(Clone, Debug)]
pub(crate) enum Bin<K, V> {
    Empty,
    Chain(Vec<Entry<K, V>>),
    Tree(TreeBin<K, V>),
}

impl<K, V> Default for Bin<K, V> {
    fn default() -> Self {
        Bin::Empty
    }
}

/// Position of an entry inside its bin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BinSlot {
    Chain(usize),
    Tree(NodeId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Location {
    pub(crate) bin: usize,
    pub(crate) slot: BinSlot,
}

/// How the bin holding a given key is organized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinShape {
    Chain { len: usize },
    Tree { len: usize },
}

impl BinShape {
    pub fn len(&self) -> usize {
        match *self {
            BinShape::Chain { len } | BinShape::Tree { len } => len,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, BinShape::Tree { .. })
    }
}

impl<K, V> Bin<K, V> {
    /// Chain or tree, whichever suits `entries.len()` after a split.
    pub(crate) fn from_entries<C>(entries: Vec<Entry<K, V>>, cmp: &C) -> Self
    where
        C: Fn(&K, &K) -> Option<Ordering>,
    {
        if entries.is_empty() {
            Bin::Empty
        } else if entries.len() <= UNTREEIFY_THRESHOLD {
            Bin::Chain(entries)
        } else {
            Bin::Tree(TreeBin::from_entries(entries, cmp))
        }
    }

    pub(crate) fn shape(&self) -> Option<BinShape> {
        match self {
            Bin::Empty => None,
            Bin::Chain(chain) => Some(BinShape::Chain { len: chain.len() }),
            Bin::Tree(tree) => Some(BinShape::Tree { len: tree.len() }),
        }
    }

    pub(crate) fn entry(&self, slot: BinSlot) -> Option<&Entry<K, V>> {
        match (self, slot) {
            (Bin::Chain(chain), BinSlot::Chain(i)) => chain.get(i),
            (Bin::Tree(tree), BinSlot::Tree(id)) if tree.contains(id) => Some(tree.entry(id)),
            _ => None,
        }
    }

    pub(crate) fn entry_mut(&mut self, slot: BinSlot) -> Option<&mut Entry<K, V>> {
        match (self, slot) {
            (Bin::Chain(chain), BinSlot::Chain(i)) => chain.get_mut(i),
            (Bin::Tree(tree), BinSlot::Tree(id)) if tree.contains(id) => Some(tree.entry_mut(id)),
            _ => None,
        }
    }

    pub(crate) fn find_seq(&self, seq: u64) -> Option<BinSlot> {
        match self {
            Bin::Empty => None,
            Bin::Chain(chain) => chain.iter().position(|e| e.seq == seq).map(BinSlot::Chain),
            Bin::Tree(tree) => tree.find_seq(seq).map(BinSlot::Tree),
        }
    }

    /// Unlinks the entry at `slot`. The bin may be left empty or undersized;
    /// see [`Bin::settle`].
    pub(crate) fn take(&mut self, slot: BinSlot) -> Option<Entry<K, V>> {
        match (self, slot) {
            (Bin::Chain(chain), BinSlot::Chain(i)) if i < chain.len() => Some(chain.remove(i)),
            (Bin::Tree(tree), BinSlot::Tree(id)) => tree.remove(id),
            _ => None,
        }
    }

    /// Collapses an empty chain, or a tree that shrank to the untreeify
    /// threshold, after removals.
    pub(crate) fn settle(&mut self) {
        match self {
            Bin::Chain(chain) if chain.is_empty() => *self = Bin::Empty,
            Bin::Tree(tree) if tree.len() <= UNTREEIFY_THRESHOLD => {
                let tree = mem::take(tree);
                log::trace!("untreeify bin: {} entries left", tree.len());
                *self = Bin::chain_or_empty(tree.into_entries());
            }
            _ => {}
        }
    }

    pub(crate) fn chain_or_empty(entries: Vec<Entry<K, V>>) -> Self {
        if entries.is_empty() {
            Bin::Empty
        } else {
            Bin::Chain(entries)
        }
    }

    /// Entries in bin order: chain order, or a tree's linear order.
    pub(crate) fn into_entries(self) -> Vec<Entry<K, V>> {
        match self {
            Bin::Empty => Vec::new(),
            Bin::Chain(chain) => chain,
            Bin::Tree(tree) => tree.into_entries(),
        }
    }

    pub(crate) fn iter(&self) -> BinIter<'_, K, V> {
        match self {
            Bin::Empty => BinIter::Done,
            Bin::Chain(chain) => BinIter::Chain(chain.iter()),
            Bin::Tree(tree) => BinIter::Tree {
                bin: tree,
                next: tree.head(),
            },
        }
    }

    pub(crate) fn iter_mut(&mut self) -> BinIterMut<'_, K, V> {
        match self {
            Bin::Empty => BinIterMut::Done,
            Bin::Chain(chain) => BinIterMut::Chain(chain.iter_mut()),
            Bin::Tree(tree) => BinIterMut::Tree(tree.entries_mut().into_iter()),
        }
    }
}

pub(crate) enum BinIter<'a, K, V> {
    Done,
    Chain(core::slice::Iter<'a, Entry<K, V>>),
    Tree {
        bin: &'a TreeBin<K, V>,
        next: Option<NodeId>,
    },
}

impl<K, V> Clone for BinIter<'_, K, V> {
    fn clone(&self) -> Self {
        match self {
            BinIter::Done => BinIter::Done,
            BinIter::Chain(it) => BinIter::Chain(it.clone()),
            BinIter::Tree { bin, next } => BinIter::Tree {
                bin: *bin,
                next: *next,
            },
        }
    }
}

impl<'a, K, V> Iterator for BinIter<'a, K, V> {
    type Item = &'a Entry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            BinIter::Done => None,
            BinIter::Chain(it) => it.next(),
            BinIter::Tree { bin, next } => {
                let bin: &'a TreeBin<K, V> = *bin;
                let id = (*next)?;
                *next = bin.next_of(id);
                Some(bin.entry(id))
            }
        }
    }
}

pub(crate) enum BinIterMut<'a, K, V> {
    Done,
    Chain(core::slice::IterMut<'a, Entry<K, V>>),
    Tree(std::vec::IntoIter<&'a mut Entry<K, V>>),
}

impl<'a, K, V> Iterator for BinIterMut<'a, K, V> {
    type Item = &'a mut Entry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            BinIterMut::Done => None,
            BinIterMut::Chain(it) => it.next(),
            BinIterMut::Tree(it) => it.next(),
        }
    }
}
