//! TreeMap: an ordered map on the shared red-black core.
//!
//! Keys are kept in the order given by a [`KeyOrder`]; [`Natural`] uses the
//! keys' own `Ord`. Every key entering the tree passes
//! [`KeyOrder::validate`] first, so a tree never holds a key its order
//! cannot place.
//!
//! Reads come in three flavours: exact lookups, navigation relative to a
//! probe key (`floor`/`ceiling`/`lower`/`higher`), and bounded range views
//! ([`SubMap`], [`SubMapMut`]) that share the tree instead of copying it.

mod iter;
mod sub_map;

pub use iter::{IntoIter, Iter, IterMut, Keys, TreeCursor, Values, ValuesMut};
pub use sub_map::{SubIter, SubMap, SubMapMut, UnmodifiableView};

use crate::error::{MapError, Result};
use crate::guard::{DebugReentrancy, Generation};
use crate::order::{KeyOrder, Natural};
use crate::rbtree::{NodeId, RbTree};
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::mem;
use core::ops::{Bound, Index};
use sub_map::Range;

#[derive(Clone, Debug)]
pub(crate) struct TreeEntry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

/// An ordered map.
///
/// ```
/// use treebin_maps::TreeMap;
///
/// let mut m = TreeMap::new();
/// m.insert(5, "e");
/// m.insert(1, "a");
/// m.insert(3, "c");
/// assert_eq!(m.first_key(), Ok(&1));
/// assert_eq!(m.floor_key(&4), Some(&3));
/// assert_eq!(m.ceiling_key(&4), Some(&5));
/// assert_eq!(m.keys().copied().collect::<Vec<_>>(), [1, 3, 5]);
/// ```
#[derive(Clone)]
pub struct TreeMap<K, V, C = Natural> {
    tree: RbTree<TreeEntry<K, V>>,
    order: C,
    generation: Generation,
    reentrancy: DebugReentrancy,
}

impl<K: Ord, V> TreeMap<K, V> {
    pub fn new() -> Self {
        Self::with_order(Natural)
    }
}

impl<K, V, C: Default> Default for TreeMap<K, V, C> {
    fn default() -> Self {
        Self::with_order(C::default())
    }
}

impl<K, V, C> TreeMap<K, V, C> {
    pub fn with_order(order: C) -> Self {
        Self {
            tree: RbTree::new(),
            order,
            generation: Generation::default(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn order(&self) -> &C {
        &self.order
    }

    pub fn clear(&mut self) {
        self.tree.clear();
        self.generation.bump();
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.tree)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.tree)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// A detached ascending cursor positioned before the first entry.
    pub fn cursor(&self) -> TreeCursor {
        TreeCursor::new(self.generation.get(), self.tree.first(), None, false)
    }

    pub fn first_entry(&self) -> Option<(&K, &V)> {
        self.tree.first().map(|id| self.pair(id))
    }

    pub fn last_entry(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|id| self.pair(id))
    }

    /// Fails with [`MapError::NotFound`] on an empty map.
    pub fn first_key(&self) -> Result<&K> {
        self.first_entry()
            .map(|(k, _)| k)
            .ok_or_else(|| MapError::not_found("first key of an empty map"))
    }

    /// Fails with [`MapError::NotFound`] on an empty map.
    pub fn last_key(&self) -> Result<&K> {
        self.last_entry()
            .map(|(k, _)| k)
            .ok_or_else(|| MapError::not_found("last key of an empty map"))
    }

    /// Removes and returns the smallest entry.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let id = self.tree.first()?;
        self.remove_node(id)
    }

    /// Removes and returns the largest entry.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let id = self.tree.last()?;
        self.remove_node(id)
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|v| v == value)
    }

    /// Keeps the entries for which `keep` returns `true`, visiting them in
    /// key order.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let ids = self.tree.in_order_ids();
        let doomed: Vec<NodeId> = ids
            .into_iter()
            .filter(|&id| {
                let e = self.tree.item_mut(id);
                !keep(&e.key, &mut e.value)
            })
            .collect();
        if doomed.is_empty() {
            return;
        }
        for id in doomed {
            self.tree.remove(id);
        }
        self.generation.bump();
    }

    /// A view that rejects every mutation with
    /// [`MapError::UnsupportedMutation`].
    pub fn as_read_only(&self) -> UnmodifiableView<'_, K, V, C> {
        UnmodifiableView::new(self)
    }

    #[inline]
    fn pair(&self, id: NodeId) -> (&K, &V) {
        let e = self.tree.item(id);
        (&e.key, &e.value)
    }

    fn remove_node(&mut self, id: NodeId) -> Option<(K, V)> {
        let e = self.tree.remove(id)?;
        self.generation.bump();
        Some((e.key, e.value))
    }

    /// Exact match. Keys the order rejects are never present.
    fn find_node<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        let _guard = self.reentrancy.enter();
        self.order.validate(key).ok()?;
        self.tree
            .locate(|e| self.order.compare(key, e.key.borrow()))
            .ok()
    }

    /// Smallest node `>= key` (`> key` when not `inclusive`).
    fn ceiling_node<Q>(&self, key: &Q, inclusive: bool) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        let _guard = self.reentrancy.enter();
        self.order.validate(key).ok()?;
        let mut best = None;
        let mut cur = self.tree.root();
        while let Some(id) = cur {
            match self.order.compare(key, self.tree.item(id).key.borrow()) {
                Ordering::Less => {
                    best = Some(id);
                    cur = self.tree.left(id);
                }
                Ordering::Equal if inclusive => return Some(id),
                _ => cur = self.tree.right(id),
            }
        }
        best
    }

    /// Largest node `<= key` (`< key` when not `inclusive`).
    fn floor_node<Q>(&self, key: &Q, inclusive: bool) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        let _guard = self.reentrancy.enter();
        self.order.validate(key).ok()?;
        let mut best = None;
        let mut cur = self.tree.root();
        while let Some(id) = cur {
            match self.order.compare(key, self.tree.item(id).key.borrow()) {
                Ordering::Greater => {
                    best = Some(id);
                    cur = self.tree.right(id);
                }
                Ordering::Equal if inclusive => return Some(id),
                _ => cur = self.tree.left(id),
            }
        }
        best
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        self.find_node(key).map(|id| &self.tree.item(id).value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        self.find_node(key).map(|id| self.pair(id))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        let id = self.find_node(key)?;
        Some(&mut self.tree.item_mut(id).value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        self.find_node(key).is_some()
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        let id = self.find_node(key)?;
        self.remove_node(id)
    }

    /// Greatest key less than or equal to `key`.
    pub fn floor_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        self.floor_entry(key).map(|(k, _)| k)
    }

    /// Least key greater than or equal to `key`.
    pub fn ceiling_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        self.ceiling_entry(key).map(|(k, _)| k)
    }

    /// Greatest key strictly less than `key`.
    pub fn lower_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        self.lower_entry(key).map(|(k, _)| k)
    }

    /// Least key strictly greater than `key`.
    pub fn higher_key<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        self.higher_entry(key).map(|(k, _)| k)
    }

    pub fn floor_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        self.floor_node(key, true).map(|id| self.pair(id))
    }

    pub fn ceiling_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        self.ceiling_node(key, true).map(|id| self.pair(id))
    }

    pub fn lower_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        self.floor_node(key, false).map(|id| self.pair(id))
    }

    pub fn higher_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyOrder<Q>,
    {
        self.ceiling_node(key, false).map(|id| self.pair(id))
    }
}

impl<K, V, C: KeyOrder<K>> TreeMap<K, V, C> {
    /// Inserts `key`, returning the value it replaced.
    ///
    /// # Panics
    ///
    /// Panics if the order rejects `key`; use [`TreeMap::try_insert`] for
    /// orders with a validator.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.try_insert(key, value) {
            Ok(old) => old,
            Err(e) => panic!("TreeMap::insert: {e}"),
        }
    }

    /// Inserts `key` after checking it with [`KeyOrder::validate`].
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.order.validate(&key)?;
        match self.tree.locate(|e| self.order.compare(&key, &e.key)) {
            Ok(id) => Ok(Some(mem::replace(&mut self.tree.item_mut(id).value, value))),
            Err(slot) => {
                self.tree.insert_at(slot, TreeEntry { key, value });
                self.generation.bump();
                Ok(None)
            }
        }
    }

    /// Builds a balanced map in O(n) from entries in strictly increasing
    /// key order.
    ///
    /// Fails with [`MapError::InvalidArgument`] if two neighbours are out of
    /// order or equal, or with [`MapError::KeyOrdering`] if `order` rejects
    /// a key.
    pub fn from_sorted<I>(order: C, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let entries: Vec<TreeEntry<K, V>> = entries
            .into_iter()
            .map(|(key, value)| TreeEntry { key, value })
            .collect();
        for e in &entries {
            order.validate(&e.key)?;
        }
        if entries
            .windows(2)
            .any(|w| order.compare(&w[0].key, &w[1].key) != Ordering::Less)
        {
            return Err(MapError::invalid_argument(
                "entries are not in strictly increasing key order",
            ));
        }
        let mut map = Self::with_order(order);
        map.tree = RbTree::from_sorted(entries);
        Ok(map)
    }

    fn bound_range(&self, lo: Bound<K>, hi: Bound<K>) -> Result<Range<K>> {
        for key in [&lo, &hi] {
            if let Bound::Included(k) | Bound::Excluded(k) = key {
                self.order.validate(k)?;
            }
        }
        Range::new(lo, hi, &self.order)
    }

    /// Keys from `lo` to `hi`. Fails with [`MapError::InvalidArgument`]
    /// when `lo > hi`.
    pub fn sub_map(
        &self,
        lo: K,
        lo_inclusive: bool,
        hi: K,
        hi_inclusive: bool,
    ) -> Result<SubMap<'_, K, V, C>> {
        let range = self.bound_range(bound(lo, lo_inclusive), bound(hi, hi_inclusive))?;
        Ok(SubMap::new(self, range))
    }

    /// Keys below `hi` (or equal to it when `inclusive`).
    pub fn head_map(&self, hi: K, inclusive: bool) -> Result<SubMap<'_, K, V, C>> {
        let range = self.bound_range(Bound::Unbounded, bound(hi, inclusive))?;
        Ok(SubMap::new(self, range))
    }

    /// Keys above `lo` (or equal to it when `inclusive`).
    pub fn tail_map(&self, lo: K, inclusive: bool) -> Result<SubMap<'_, K, V, C>> {
        let range = self.bound_range(bound(lo, inclusive), Bound::Unbounded)?;
        Ok(SubMap::new(self, range))
    }

    /// The whole map in descending order.
    pub fn descending_map(&self) -> SubMap<'_, K, V, C> {
        SubMap::new(self, Range::full().reversed())
    }

    pub fn sub_map_mut(
        &mut self,
        lo: K,
        lo_inclusive: bool,
        hi: K,
        hi_inclusive: bool,
    ) -> Result<SubMapMut<'_, K, V, C>> {
        let range = self.bound_range(bound(lo, lo_inclusive), bound(hi, hi_inclusive))?;
        Ok(SubMapMut::new(self, range))
    }

    pub fn head_map_mut(&mut self, hi: K, inclusive: bool) -> Result<SubMapMut<'_, K, V, C>> {
        let range = self.bound_range(Bound::Unbounded, bound(hi, inclusive))?;
        Ok(SubMapMut::new(self, range))
    }

    pub fn tail_map_mut(&mut self, lo: K, inclusive: bool) -> Result<SubMapMut<'_, K, V, C>> {
        let range = self.bound_range(bound(lo, inclusive), Bound::Unbounded)?;
        Ok(SubMapMut::new(self, range))
    }

    pub fn descending_map_mut(&mut self) -> SubMapMut<'_, K, V, C> {
        SubMapMut::new(self, Range::full().reversed())
    }

    /// Verifies the red-black invariants and strict key order.
    #[doc(hidden)]
    pub fn check_invariants(&self) -> core::result::Result<(), String> {
        self.tree
            .check(|a, b| self.order.compare(&a.key, &b.key) == Ordering::Less)?;
        Ok(())
    }
}

pub(crate) fn bound<K>(key: K, inclusive: bool) -> Bound<K> {
    if inclusive {
        Bound::Included(key)
    } else {
        Bound::Excluded(key)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for TreeMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq, C> PartialEq for TreeMap<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C> Eq for TreeMap<K, V, C> {}

impl<K, Q, V, C> Index<&Q> for TreeMap<K, V, C>
where
    K: Borrow<Q>,
    Q: ?Sized,
    C: KeyOrder<Q>,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("key not found in TreeMap"),
        }
    }
}

impl<K, V, C: KeyOrder<K>> Extend<(K, V)> for TreeMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, C: KeyOrder<K> + Default> FromIterator<(K, V)> for TreeMap<K, V, C> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, C> IntoIterator for &'a TreeMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, C> IntoIterator for &'a mut TreeMap<K, V, C> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, C> IntoIterator for TreeMap<K, V, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.tree)
    }
}
