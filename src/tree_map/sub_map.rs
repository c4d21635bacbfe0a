//! Bounded views over a [`TreeMap`].
//!
//! A view owns no nodes. It holds a [`Range`] (low and high [`Bound`]s in the
//! backing map's order plus a direction) and answers every query by walking
//! the backing tree and discarding what falls outside. Ascending and
//! descending views share the same absolute primitives; the descending ones
//! swap "lowest" with "highest" and successor with predecessor.

use super::iter::TreeCursor;
use super::{bound, TreeEntry, TreeMap};
use crate::error::{MapError, Result};
use crate::order::KeyOrder;
use crate::rbtree::{NodeId, RbTree};
use core::cmp::Ordering;
use core::fmt;
use core::iter::FusedIterator;
use core::ops::{Bound, Deref};

#[derive(Clone, Debug)]
pub(crate) struct Range<K> {
    lo: Bound<K>,
    hi: Bound<K>,
    descending: bool,
}

impl<K> Range<K> {
    pub(crate) fn full() -> Self {
        Self {
            lo: Bound::Unbounded,
            hi: Bound::Unbounded,
            descending: false,
        }
    }

    /// Fails when both ends are bounded and `lo > hi`.
    pub(crate) fn new<C: KeyOrder<K>>(lo: Bound<K>, hi: Bound<K>, order: &C) -> Result<Self> {
        if let (Bound::Included(l) | Bound::Excluded(l), Bound::Included(h) | Bound::Excluded(h)) =
            (&lo, &hi)
        {
            if order.compare(l, h) == Ordering::Greater {
                return Err(MapError::invalid_argument("fromKey > toKey"));
            }
        }
        Ok(Self {
            lo,
            hi,
            descending: false,
        })
    }

    pub(crate) fn reversed(mut self) -> Self {
        self.descending = !self.descending;
        self
    }

    fn too_low<C: KeyOrder<K>>(&self, key: &K, order: &C) -> bool {
        match &self.lo {
            Bound::Unbounded => false,
            Bound::Included(lo) => order.compare(key, lo) == Ordering::Less,
            Bound::Excluded(lo) => order.compare(key, lo) != Ordering::Greater,
        }
    }

    fn too_high<C: KeyOrder<K>>(&self, key: &K, order: &C) -> bool {
        match &self.hi {
            Bound::Unbounded => false,
            Bound::Included(hi) => order.compare(key, hi) == Ordering::Greater,
            Bound::Excluded(hi) => order.compare(key, hi) != Ordering::Less,
        }
    }

    pub(crate) fn contains<C: KeyOrder<K>>(&self, key: &K, order: &C) -> bool {
        !self.too_low(key, order) && !self.too_high(key, order)
    }

    /// Like `contains`, but treats both ends as inclusive.
    fn contains_closed<C: KeyOrder<K>>(&self, key: &K, order: &C) -> bool {
        let above_lo = match &self.lo {
            Bound::Unbounded => true,
            Bound::Included(lo) | Bound::Excluded(lo) => order.compare(key, lo) != Ordering::Less,
        };
        let below_hi = match &self.hi {
            Bound::Unbounded => true,
            Bound::Included(hi) | Bound::Excluded(hi) => {
                order.compare(key, hi) != Ordering::Greater
            }
        };
        above_lo && below_hi
    }

    /// A sub-range of this one, with `from`/`to` given in view order.
    /// Unbounded ends inherit the current bound.
    pub(crate) fn restrict<C: KeyOrder<K>>(
        &self,
        from: Bound<K>,
        to: Bound<K>,
        order: &C,
    ) -> Result<Self>
    where
        K: Clone,
    {
        let from = self.narrow(from, "fromKey out of range", order)?;
        let to = self.narrow(to, "toKey out of range", order)?;
        let (from, to) = (
            from.unwrap_or_else(|| self.view_lo().clone()),
            to.unwrap_or_else(|| self.view_hi().clone()),
        );
        let (lo, hi) = if self.descending {
            (to, from)
        } else {
            (from, to)
        };
        let mut range = Self::new(lo, hi, order)?;
        range.descending = self.descending;
        Ok(range)
    }

    /// Checks one requested bound; `None` means "keep the current one".
    fn narrow<C: KeyOrder<K>>(
        &self,
        wanted: Bound<K>,
        message: &'static str,
        order: &C,
    ) -> Result<Option<Bound<K>>> {
        let (key, inclusive) = match wanted {
            Bound::Unbounded => return Ok(None),
            Bound::Included(k) => (k, true),
            Bound::Excluded(k) => (k, false),
        };
        order.validate(&key)?;
        let admitted = if inclusive {
            self.contains(&key, order)
        } else {
            self.contains_closed(&key, order)
        };
        if admitted {
            Ok(Some(bound(key, inclusive)))
        } else {
            Err(MapError::invalid_argument(message))
        }
    }

    fn view_lo(&self) -> &Bound<K> {
        if self.descending {
            &self.hi
        } else {
            &self.lo
        }
    }

    fn view_hi(&self) -> &Bound<K> {
        if self.descending {
            &self.lo
        } else {
            &self.hi
        }
    }

    fn abs_lowest<V, C: KeyOrder<K>>(&self, map: &TreeMap<K, V, C>) -> Option<NodeId> {
        let id = match &self.lo {
            Bound::Unbounded => map.tree.first(),
            Bound::Included(k) => map.ceiling_node(k, true),
            Bound::Excluded(k) => map.ceiling_node(k, false),
        }?;
        self.below_hi(map, id)
    }

    fn abs_highest<V, C: KeyOrder<K>>(&self, map: &TreeMap<K, V, C>) -> Option<NodeId> {
        let id = match &self.hi {
            Bound::Unbounded => map.tree.last(),
            Bound::Included(k) => map.floor_node(k, true),
            Bound::Excluded(k) => map.floor_node(k, false),
        }?;
        self.above_lo(map, id)
    }

    fn below_hi<V, C: KeyOrder<K>>(&self, map: &TreeMap<K, V, C>, id: NodeId) -> Option<NodeId> {
        (!self.too_high(&map.tree.item(id).key, &map.order)).then_some(id)
    }

    fn above_lo<V, C: KeyOrder<K>>(&self, map: &TreeMap<K, V, C>, id: NodeId) -> Option<NodeId> {
        (!self.too_low(&map.tree.item(id).key, &map.order)).then_some(id)
    }

    /// Smallest in-range node `>= key` (`> key` unless `inclusive`).
    fn abs_ceiling<V, C: KeyOrder<K>>(
        &self,
        map: &TreeMap<K, V, C>,
        key: &K,
        inclusive: bool,
    ) -> Option<NodeId> {
        if self.too_low(key, &map.order) {
            return self.abs_lowest(map);
        }
        let id = map.ceiling_node(key, inclusive)?;
        self.below_hi(map, id)
    }

    /// Largest in-range node `<= key` (`< key` unless `inclusive`).
    fn abs_floor<V, C: KeyOrder<K>>(
        &self,
        map: &TreeMap<K, V, C>,
        key: &K,
        inclusive: bool,
    ) -> Option<NodeId> {
        if self.too_high(key, &map.order) {
            return self.abs_highest(map);
        }
        let id = map.floor_node(key, inclusive)?;
        self.above_lo(map, id)
    }

    /// First node above the range.
    fn abs_high_fence<V, C: KeyOrder<K>>(&self, map: &TreeMap<K, V, C>) -> Option<NodeId> {
        match &self.hi {
            Bound::Unbounded => None,
            Bound::Included(k) => map.ceiling_node(k, false),
            Bound::Excluded(k) => map.ceiling_node(k, true),
        }
    }

    /// First node below the range.
    fn abs_low_fence<V, C: KeyOrder<K>>(&self, map: &TreeMap<K, V, C>) -> Option<NodeId> {
        match &self.lo {
            Bound::Unbounded => None,
            Bound::Included(k) => map.floor_node(k, false),
            Bound::Excluded(k) => map.floor_node(k, true),
        }
    }

    // View-direction primitives.

    pub(crate) fn lowest<V, C: KeyOrder<K>>(&self, map: &TreeMap<K, V, C>) -> Option<NodeId> {
        if self.descending {
            self.abs_highest(map)
        } else {
            self.abs_lowest(map)
        }
    }

    pub(crate) fn highest<V, C: KeyOrder<K>>(&self, map: &TreeMap<K, V, C>) -> Option<NodeId> {
        if self.descending {
            self.abs_lowest(map)
        } else {
            self.abs_highest(map)
        }
    }

    /// View-order ceiling (`inclusive`) or higher.
    fn ceiling<V, C: KeyOrder<K>>(
        &self,
        map: &TreeMap<K, V, C>,
        key: &K,
        inclusive: bool,
    ) -> Option<NodeId> {
        if self.descending {
            self.abs_floor(map, key, inclusive)
        } else {
            self.abs_ceiling(map, key, inclusive)
        }
    }

    /// View-order floor (`inclusive`) or lower.
    fn floor<V, C: KeyOrder<K>>(
        &self,
        map: &TreeMap<K, V, C>,
        key: &K,
        inclusive: bool,
    ) -> Option<NodeId> {
        if self.descending {
            self.abs_ceiling(map, key, inclusive)
        } else {
            self.abs_floor(map, key, inclusive)
        }
    }

    fn fence<V, C: KeyOrder<K>>(&self, map: &TreeMap<K, V, C>) -> Option<NodeId> {
        if self.descending {
            self.abs_low_fence(map)
        } else {
            self.abs_high_fence(map)
        }
    }

    fn ids<V, C: KeyOrder<K>>(&self, map: &TreeMap<K, V, C>) -> Vec<NodeId> {
        let mut it = SubIter::new(map, self);
        let mut out = Vec::new();
        while let Some(id) = it.next_id() {
            out.push(id);
        }
        out
    }
}

/// Iterator over a view's entries, in view order.
pub struct SubIter<'a, K, V> {
    tree: &'a RbTree<TreeEntry<K, V>>,
    next: Option<NodeId>,
    fence: Option<NodeId>,
    descending: bool,
}

impl<'a, K, V> SubIter<'a, K, V> {
    fn new<C: KeyOrder<K>>(map: &'a TreeMap<K, V, C>, range: &Range<K>) -> Self {
        Self {
            tree: &map.tree,
            next: range.lowest(map),
            fence: range.fence(map),
            descending: range.descending,
        }
    }

    fn next_id(&mut self) -> Option<NodeId> {
        let id = self.next.filter(|&id| Some(id) != self.fence)?;
        self.next = if self.descending {
            self.tree.predecessor(id)
        } else {
            self.tree.successor(id)
        };
        Some(id)
    }
}

impl<'a, K, V> Iterator for SubIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next_id()?;
        let e = self.tree.item(id);
        Some((&e.key, &e.value))
    }
}

impl<K, V> FusedIterator for SubIter<'_, K, V> {}

/// Reads shared by [`SubMap`] and [`SubMapMut`]. Expects `self.backing()`
/// and `self.range`; `$lt` is the lifetime of the views it derives.
macro_rules! view_reads {
    ($lt:lifetime) => {
        /// Number of entries in range. Walks the range.
        pub fn len(&self) -> usize {
            self.iter().count()
        }

        pub fn is_empty(&self) -> bool {
            self.range.lowest(self.backing()).is_none()
        }

        /// Whether `key` lies inside this view's bounds.
        pub fn in_range(&self, key: &K) -> bool {
            self.range.contains(key, &self.backing().order)
        }

        /// The view's order: the backing order, reversed for descending views.
        pub fn compare(&self, a: &K, b: &K) -> Ordering {
            let o = self.backing().order.compare(a, b);
            if self.range.descending {
                o.reverse()
            } else {
                o
            }
        }

        pub fn get(&self, key: &K) -> Option<&V> {
            if !self.in_range(key) {
                return None;
            }
            self.backing().get(key)
        }

        pub fn contains_key(&self, key: &K) -> bool {
            self.get(key).is_some()
        }

        pub fn first_entry(&self) -> Option<(&K, &V)> {
            let map = self.backing();
            self.range.lowest(map).map(|id| map.pair(id))
        }

        pub fn last_entry(&self) -> Option<(&K, &V)> {
            let map = self.backing();
            self.range.highest(map).map(|id| map.pair(id))
        }

        /// Fails with [`MapError::NotFound`] on an empty view.
        pub fn first_key(&self) -> Result<&K> {
            self.first_entry()
                .map(|(k, _)| k)
                .ok_or_else(|| MapError::not_found("first key of an empty view"))
        }

        /// Fails with [`MapError::NotFound`] on an empty view.
        pub fn last_key(&self) -> Result<&K> {
            self.last_entry()
                .map(|(k, _)| k)
                .ok_or_else(|| MapError::not_found("last key of an empty view"))
        }

        pub fn ceiling_entry(&self, key: &K) -> Option<(&K, &V)> {
            let map = self.backing();
            self.range.ceiling(map, key, true).map(|id| map.pair(id))
        }

        pub fn higher_entry(&self, key: &K) -> Option<(&K, &V)> {
            let map = self.backing();
            self.range.ceiling(map, key, false).map(|id| map.pair(id))
        }

        pub fn floor_entry(&self, key: &K) -> Option<(&K, &V)> {
            let map = self.backing();
            self.range.floor(map, key, true).map(|id| map.pair(id))
        }

        pub fn lower_entry(&self, key: &K) -> Option<(&K, &V)> {
            let map = self.backing();
            self.range.floor(map, key, false).map(|id| map.pair(id))
        }

        pub fn ceiling_key(&self, key: &K) -> Option<&K> {
            self.ceiling_entry(key).map(|(k, _)| k)
        }

        pub fn higher_key(&self, key: &K) -> Option<&K> {
            self.higher_entry(key).map(|(k, _)| k)
        }

        pub fn floor_key(&self, key: &K) -> Option<&K> {
            self.floor_entry(key).map(|(k, _)| k)
        }

        pub fn lower_key(&self, key: &K) -> Option<&K> {
            self.lower_entry(key).map(|(k, _)| k)
        }

        pub fn iter(&self) -> SubIter<'_, K, V> {
            SubIter::new(self.backing(), &self.range)
        }

        pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
            self.iter().map(|(k, _)| k)
        }

        pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
            self.iter().map(|(_, v)| v)
        }

        /// A fail-fast cursor over this view, usable with the backing map.
        pub fn cursor(&self) -> TreeCursor {
            let map = self.backing();
            TreeCursor::new(
                map.generation.get(),
                self.range.lowest(map),
                self.range.fence(map),
                self.range.descending,
            )
        }

        /// Narrower view; bounds are in view order and must lie inside this
        /// view.
        pub fn sub_map(
            &self,
            from: K,
            from_inclusive: bool,
            to: K,
            to_inclusive: bool,
        ) -> Result<SubMap<$lt, K, V, C>>
        where
            K: Clone,
        {
            let range = self.range.restrict(
                bound(from, from_inclusive),
                bound(to, to_inclusive),
                &self.backing().order,
            )?;
            Ok(SubMap::new(self.backing(), range))
        }

        pub fn head_map(&self, to: K, inclusive: bool) -> Result<SubMap<$lt, K, V, C>>
        where
            K: Clone,
        {
            let range =
                self.range
                    .restrict(Bound::Unbounded, bound(to, inclusive), &self.backing().order)?;
            Ok(SubMap::new(self.backing(), range))
        }

        pub fn tail_map(&self, from: K, inclusive: bool) -> Result<SubMap<$lt, K, V, C>>
        where
            K: Clone,
        {
            let range =
                self.range
                    .restrict(bound(from, inclusive), Bound::Unbounded, &self.backing().order)?;
            Ok(SubMap::new(self.backing(), range))
        }

        /// The same range in the opposite direction.
        pub fn descending_map(&self) -> SubMap<$lt, K, V, C>
        where
            K: Clone,
        {
            SubMap::new(self.backing(), self.range.clone().reversed())
        }
    };
}

/// Read-only view of a key range of a [`TreeMap`].
pub struct SubMap<'a, K, V, C> {
    map: &'a TreeMap<K, V, C>,
    range: Range<K>,
}

impl<'a, K, V, C: KeyOrder<K>> SubMap<'a, K, V, C> {
    pub(crate) fn new(map: &'a TreeMap<K, V, C>, range: Range<K>) -> Self {
        Self { map, range }
    }

    #[inline]
    fn backing(&self) -> &'a TreeMap<K, V, C> {
        self.map
    }

    view_reads!('a);
}

impl<'a, K, V, C: KeyOrder<K>> IntoIterator for &'a SubMap<'_, K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = SubIter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: KeyOrder<K>> fmt::Debug for SubMap<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Read/write view of a key range of a [`TreeMap`].
///
/// Writes outside the range fail with [`MapError::InvalidArgument`].
///
/// ```
/// use treebin_maps::{MapError, TreeMap};
///
/// let mut m: TreeMap<i32, &str> = [(1, "a"), (3, "c"), (5, "e")].into_iter().collect();
/// let mut head = m.head_map_mut(3, false).unwrap();
/// assert_eq!(head.keys().copied().collect::<Vec<_>>(), [1]);
/// assert!(matches!(head.insert(10, "x"), Err(MapError::InvalidArgument { .. })));
/// head.insert(2, "b").unwrap();
/// assert_eq!(m.len(), 4);
/// ```
pub struct SubMapMut<'a, K, V, C> {
    map: &'a mut TreeMap<K, V, C>,
    range: Range<K>,
}

impl<'a, K, V, C: KeyOrder<K>> SubMapMut<'a, K, V, C> {
    pub(crate) fn new(map: &'a mut TreeMap<K, V, C>, range: Range<K>) -> Self {
        Self { map, range }
    }

    #[inline]
    fn backing(&self) -> &TreeMap<K, V, C> {
        &*self.map
    }

    view_reads!('_);

    /// Reborrows as a read-only view.
    pub fn as_view(&self) -> SubMap<'_, K, V, C>
    where
        K: Clone,
    {
        SubMap::new(&*self.map, self.range.clone())
    }

    /// Inserts inside the range; keys outside it are refused.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.map.order.validate(&key)?;
        if !self.in_range(&key) {
            return Err(MapError::invalid_argument("key out of range"));
        }
        self.map.try_insert(key, value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if !self.in_range(key) {
            return None;
        }
        self.map.get_mut(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        if !self.in_range(key) {
            return None;
        }
        self.map.remove(key)
    }

    /// Removes the first entry in view order.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let id = self.range.lowest(&*self.map)?;
        self.map.remove_node(id)
    }

    /// Removes the last entry in view order.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let id = self.range.highest(&*self.map)?;
        self.map.remove_node(id)
    }

    /// Removes every entry in range.
    pub fn clear(&mut self) {
        let ids = self.range.ids(&*self.map);
        if ids.is_empty() {
            return;
        }
        for id in ids {
            self.map.tree.remove(id);
        }
        self.map.generation.bump();
    }

    pub fn sub_map_mut(
        &mut self,
        from: K,
        from_inclusive: bool,
        to: K,
        to_inclusive: bool,
    ) -> Result<SubMapMut<'_, K, V, C>>
    where
        K: Clone,
    {
        let range = self.range.restrict(
            bound(from, from_inclusive),
            bound(to, to_inclusive),
            &self.map.order,
        )?;
        Ok(SubMapMut::new(&mut *self.map, range))
    }

    pub fn head_map_mut(&mut self, to: K, inclusive: bool) -> Result<SubMapMut<'_, K, V, C>>
    where
        K: Clone,
    {
        let range = self
            .range
            .restrict(Bound::Unbounded, bound(to, inclusive), &self.map.order)?;
        Ok(SubMapMut::new(&mut *self.map, range))
    }

    pub fn tail_map_mut(&mut self, from: K, inclusive: bool) -> Result<SubMapMut<'_, K, V, C>>
    where
        K: Clone,
    {
        let range = self
            .range
            .restrict(bound(from, inclusive), Bound::Unbounded, &self.map.order)?;
        Ok(SubMapMut::new(&mut *self.map, range))
    }

    pub fn descending_map_mut(&mut self) -> SubMapMut<'_, K, V, C>
    where
        K: Clone,
    {
        let range = self.range.clone().reversed();
        SubMapMut::new(&mut *self.map, range)
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: KeyOrder<K>> fmt::Debug for SubMapMut<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Read-only handle to a whole [`TreeMap`]. Reads go through `Deref`;
/// mutators fail with [`MapError::UnsupportedMutation`].
pub struct UnmodifiableView<'a, K, V, C> {
    map: &'a TreeMap<K, V, C>,
}

impl<'a, K, V, C> UnmodifiableView<'a, K, V, C> {
    pub(crate) fn new(map: &'a TreeMap<K, V, C>) -> Self {
        Self { map }
    }

    pub fn insert(&self, _key: K, _value: V) -> Result<Option<V>> {
        Err(MapError::unsupported("insert"))
    }

    pub fn remove(&self, _key: &K) -> Result<Option<V>> {
        Err(MapError::unsupported("remove"))
    }

    pub fn pop_first(&self) -> Result<Option<(K, V)>> {
        Err(MapError::unsupported("pop_first"))
    }

    pub fn pop_last(&self) -> Result<Option<(K, V)>> {
        Err(MapError::unsupported("pop_last"))
    }

    pub fn clear(&self) -> Result<()> {
        Err(MapError::unsupported("clear"))
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for UnmodifiableView<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.map, f)
    }
}

impl<K, V, C> Deref for UnmodifiableView<'_, K, V, C> {
    type Target = TreeMap<K, V, C>;

    fn deref(&self) -> &Self::Target {
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten() -> TreeMap<i32, i32> {
        (0..10).map(|i| (i * 10, i)).collect()
    }

    fn keys<'a>(it: impl Iterator<Item = (&'a i32, &'a i32)>) -> Vec<i32> {
        it.map(|(k, _)| *k).collect()
    }

    #[test]
    fn bounds_and_fences() {
        let m = ten();
        let v = m.sub_map(20, true, 50, false).unwrap();
        assert_eq!(keys(v.iter()), [20, 30, 40]);
        let v = m.sub_map(15, false, 50, true).unwrap();
        assert_eq!(keys(v.iter()), [20, 30, 40, 50]);
        let v = m.sub_map(20, false, 20, false).unwrap();
        assert!(v.is_empty());
        assert_eq!(v.len(), 0);
        let v = m.tail_map(85, true).unwrap();
        assert_eq!(keys(v.iter()), [90]);
    }

    #[test]
    fn descending_view_reverses_navigation() {
        let m = ten();
        let v = m.sub_map(20, true, 60, true).unwrap().descending_map();
        assert_eq!(keys(v.iter()), [60, 50, 40, 30, 20]);
        assert_eq!(v.first_key(), Ok(&60));
        assert_eq!(v.last_key(), Ok(&20));
        assert_eq!(v.ceiling_key(&45), Some(&40));
        assert_eq!(v.higher_key(&40), Some(&30));
        assert_eq!(v.floor_key(&45), Some(&50));
        assert_eq!(v.lower_key(&60), None);
        assert_eq!(v.ceiling_key(&100), Some(&60));
        assert_eq!(v.compare(&1, &2), Ordering::Greater);
    }

    #[test]
    fn narrowing_must_stay_inside() {
        let m = ten();
        let v = m.sub_map(20, true, 60, false).unwrap();
        let err = v.sub_map(10, true, 30, true).unwrap_err();
        assert_eq!(err, MapError::invalid_argument("fromKey out of range"));
        // An exclusive bound may sit on the edge of the closed range.
        let w = v.head_map(60, false).unwrap();
        assert_eq!(keys(w.iter()), [20, 30, 40, 50]);
        assert!(v.head_map(60, true).is_err());
        let w = v.tail_map(35, true).unwrap();
        assert_eq!(keys(w.iter()), [40, 50]);

        let d = v.descending_map();
        // In view order `from` is the high end.
        let w = d.sub_map(50, true, 30, true).unwrap();
        assert_eq!(keys(w.iter()), [50, 40, 30]);
        assert!(d.sub_map(30, true, 50, true).is_err());
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let m = ten();
        let err = m.sub_map(50, true, 20, true).err().unwrap();
        assert_eq!(err, MapError::invalid_argument("fromKey > toKey"));
    }

    #[test]
    fn mutable_view_writes_through() {
        let mut m = ten();
        {
            let mut v = m.sub_map_mut(20, true, 50, true).unwrap();
            assert_eq!(v.insert(25, 99), Ok(None));
            assert!(v.insert(55, 0).is_err());
            assert_eq!(v.remove(&90), None);
            assert_eq!(v.pop_first(), Some((20, 2)));
            assert_eq!(v.pop_last(), Some((50, 5)));
            *v.get_mut(&30).unwrap() += 100;
            let mut d = v.descending_map_mut();
            assert_eq!(d.pop_first(), Some((40, 4)));
        }
        assert_eq!(m.get(&30), Some(&103));
        assert_eq!(keys(m.iter()), [0, 10, 25, 30, 60, 70, 80, 90]);
        m.check_invariants().unwrap();

        m.tail_map_mut(60, true).unwrap().clear();
        assert_eq!(keys(m.iter()), [0, 10, 25, 30]);
        m.check_invariants().unwrap();
    }

    #[test]
    fn read_only_view_refuses_mutation() {
        let m = ten();
        let v = m.as_read_only();
        assert_eq!(v.get(&30), Some(&3));
        assert_eq!(v.len(), 10);
        assert_eq!(v.insert(1, 1), Err(MapError::unsupported("insert")));
        assert_eq!(v.remove(&30), Err(MapError::unsupported("remove")));
        assert!(matches!(
            v.clear(),
            Err(MapError::UnsupportedMutation { .. })
        ));
        assert_eq!(m.len(), 10);
    }

    #[test]
    fn view_cursor_stops_at_fence() {
        let mut m = ten();
        let mut cursor = m.head_map(40, false).unwrap().cursor();
        let mut seen = Vec::new();
        while let Some((k, _)) = cursor.next(&m).unwrap() {
            seen.push(*k);
            if *k == 10 {
                cursor.remove(&mut m).unwrap();
            }
        }
        assert_eq!(seen, [0, 10, 20, 30]);
        assert!(!m.contains_key(&10));
    }

    #[test]
    fn views_debug_as_their_entries() {
        let mut m = ten();
        let v = m.sub_map(10, true, 30, true).unwrap();
        assert_eq!(format!("{v:?}"), "{10: 1, 20: 2, 30: 3}");
        assert_eq!(format!("{:?}", v.descending_map()), "{30: 3, 20: 2, 10: 1}");
        assert_eq!(format!("{:?}", m.as_read_only()), format!("{m:?}"));
        let err = m.sub_map(30, true, 10, true).unwrap_err();
        assert_eq!(err, MapError::invalid_argument("fromKey > toKey"));
        let w = m.tail_map_mut(80, false).unwrap();
        assert_eq!(format!("{w:?}"), "{90: 9}");
    }
}
