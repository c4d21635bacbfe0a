//! Iteration over a [`TreeMap`](super::TreeMap).

use super::{TreeEntry, TreeMap};
use crate::error::{MapError, Result};
use crate::guard::Stamp;
use crate::rbtree::{NodeId, RbTree};
use core::iter::FusedIterator;

/// Double-ended iterator over `(&K, &V)` in key order.
pub struct Iter<'a, K, V> {
    tree: &'a RbTree<TreeEntry<K, V>>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) fn new(tree: &'a RbTree<TreeEntry<K, V>>) -> Self {
        Self {
            tree,
            front: tree.first(),
            back: tree.last(),
            remaining: tree.len(),
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front?;
        self.front = self.tree.successor(id);
        self.remaining -= 1;
        let e = self.tree.item(id);
        Some((&e.key, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.back?;
        self.back = self.tree.predecessor(id);
        self.remaining -= 1;
        let e = self.tree.item(id);
        Some((&e.key, &e.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Double-ended iterator over `(&K, &mut V)` in key order.
pub struct IterMut<'a, K, V> {
    entries: std::vec::IntoIter<&'a mut TreeEntry<K, V>>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(super) fn new(tree: &'a mut RbTree<TreeEntry<K, V>>) -> Self {
        let ids = tree.in_order_ids();
        Self {
            entries: tree.items_mut_in(&ids).into_iter(),
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(|e| (&e.key, &mut e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.entries.next_back().map(|e| (&e.key, &mut e.value))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

pub struct Keys<'a, K, V> {
    pub(super) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

pub struct Values<'a, K, V> {
    pub(super) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

pub struct ValuesMut<'a, K, V> {
    pub(super) inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<&'a mut V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Owning iterator in key order.
pub struct IntoIter<K, V> {
    entries: std::vec::IntoIter<TreeEntry<K, V>>,
}

impl<K, V> IntoIter<K, V> {
    pub(super) fn new(tree: RbTree<TreeEntry<K, V>>) -> Self {
        Self {
            entries: tree.into_items_in_order().into_iter(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.entries.next().map(|e| (e.key, e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<(K, V)> {
        self.entries.next_back().map(|e| (e.key, e.value))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

/// A fail-fast position in a [`TreeMap`] (or one of its views) that does
/// not borrow it between steps.
///
/// Removal through the cursor keeps it valid; any other structural change
/// makes the next call fail with [`MapError::ConcurrentStructuralChange`].
/// Stepping it against a different map fails with
/// [`MapError::InvalidArgument`].
///
/// ```
/// use treebin_maps::TreeMap;
///
/// let mut m: TreeMap<i32, i32> = (0..6).map(|i| (i, i)).collect();
/// let mut cursor = m.cursor();
/// while let Some((k, _)) = cursor.next(&m).unwrap() {
///     if k % 2 == 0 {
///         cursor.remove(&mut m).unwrap();
///     }
/// }
/// assert_eq!(m.keys().copied().collect::<Vec<_>>(), [1, 3, 5]);
/// ```
#[derive(Clone, Debug)]
pub struct TreeCursor {
    expected: Stamp,
    next: Option<NodeId>,
    /// First node past the end of the walk; `None` walks to the tree's end.
    fence: Option<NodeId>,
    last: Option<NodeId>,
    descending: bool,
}

impl TreeCursor {
    pub(crate) fn new(
        generation: Stamp,
        start: Option<NodeId>,
        fence: Option<NodeId>,
        descending: bool,
    ) -> Self {
        Self {
            expected: generation,
            next: start,
            fence,
            last: None,
            descending,
        }
    }

    /// Returns the next entry, or `Ok(None)` at the end of the walk.
    #[allow(clippy::should_implement_trait)]
    pub fn next<'m, K, V, C>(&mut self, map: &'m TreeMap<K, V, C>) -> Result<Option<(&'m K, &'m V)>> {
        map.generation.expect(self.expected)?;
        let Some(id) = self.next.filter(|&id| Some(id) != self.fence) else {
            return Ok(None);
        };
        self.next = if self.descending {
            map.tree.predecessor(id)
        } else {
            map.tree.successor(id)
        };
        self.last = Some(id);
        Ok(Some(map.pair(id)))
    }

    /// Removes the entry most recently returned by [`TreeCursor::next`].
    pub fn remove<K, V, C>(&mut self, map: &mut TreeMap<K, V, C>) -> Result<(K, V)> {
        map.generation.expect(self.expected)?;
        let id = self
            .last
            .take()
            .ok_or_else(|| MapError::not_found("cursor has no current entry"))?;
        let removed = map
            .remove_node(id)
            .ok_or_else(|| MapError::not_found("cursor entry vanished"))?;
        self.expected = map.generation.get();
        Ok(removed)
    }
}
