//! Iteration over a [`TreeBinHashMap`]: borrowing iterators, the owning
//! iterator, and the detached fail-fast [`HashCursor`].

use super::bin::{Bin, BinIter, BinIterMut, BinSlot, Entry, Location};
use super::TreeBinHashMap;
use crate::config::UNTREEIFY_THRESHOLD;
use crate::error::{MapError, Result};
use crate::guard::Stamp;
use crate::rbtree::NodeId;
use core::iter::FusedIterator;

/// Iterator over `(&K, &V)` in bin order.
pub struct Iter<'a, K, V> {
    bins: core::slice::Iter<'a, Bin<K, V>>,
    current: BinIter<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) fn new(table: &'a [Bin<K, V>], len: usize) -> Self {
        Self {
            bins: table.iter(),
            current: BinIter::Done,
            remaining: len,
        }
    }
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            bins: self.bins.clone(),
            current: self.current.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.current.next() {
                self.remaining -= 1;
                return Some((&e.key, &e.value));
            }
            self.current = self.bins.next()?.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over `(&K, &mut V)` in bin order.
pub struct IterMut<'a, K, V> {
    bins: core::slice::IterMut<'a, Bin<K, V>>,
    current: BinIterMut<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(super) fn new(table: &'a mut [Bin<K, V>], len: usize) -> Self {
        Self {
            bins: table.iter_mut(),
            current: BinIterMut::Done,
            remaining: len,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.current.next() {
                self.remaining -= 1;
                return Some((&e.key, &mut e.value));
            }
            self.current = self.bins.next()?.iter_mut();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

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

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

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

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

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

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

/// Owning iterator, produced by `into_iter` and `drain`.
pub struct IntoIter<K, V> {
    bins: std::vec::IntoIter<Bin<K, V>>,
    current: std::vec::IntoIter<Entry<K, V>>,
    remaining: usize,
}

impl<K, V> IntoIter<K, V> {
    pub(super) fn new(table: Vec<Bin<K, V>>, len: usize) -> Self {
        Self {
            bins: table.into_iter(),
            current: Vec::new().into_iter(),
            remaining: len,
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        loop {
            if let Some(e) = self.current.next() {
                self.remaining -= 1;
                return Some((e.key, e.value));
            }
            self.current = self.bins.next()?.into_entries().into_iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CursorPos {
    /// Bin not entered yet.
    Fresh,
    /// Next chain index to visit.
    Chain(usize),
    /// Next tree node in linear order; `None` once the bin is done.
    Tree(Option<NodeId>),
}

/// A position in a [`TreeBinHashMap`] that does not borrow it.
///
/// Each step takes the map again, so the map may be mutated between steps.
/// Any structural change not made through [`HashCursor::remove`] is
/// reported as [`MapError::ConcurrentStructuralChange`]; a map other than
/// the one the cursor came from is rejected with [`MapError::InvalidArgument`].
///
/// ```
/// use treebin_maps::TreeBinHashMap;
///
/// let mut m: TreeBinHashMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
/// let mut cursor = m.cursor();
/// while let Some((_, v)) = cursor.next(&m).unwrap() {
///     if v % 2 == 1 {
///         cursor.remove(&mut m).unwrap();
///     }
/// }
/// assert_eq!(m.len(), 5);
///
/// let mut cursor = m.cursor();
/// m.insert(100, 100);
/// assert!(cursor.next(&m).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct HashCursor {
    expected: Stamp,
    bin: usize,
    pos: CursorPos,
    last: Option<Location>,
}

impl HashCursor {
    pub(super) fn new(generation: Stamp) -> Self {
        Self {
            expected: generation,
            bin: 0,
            pos: CursorPos::Fresh,
            last: None,
        }
    }

    fn advance_bin(&mut self) {
        self.bin += 1;
        self.pos = CursorPos::Fresh;
    }

    /// Returns the next entry, or `Ok(None)` once the map is exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next<'m, K, V, S, O>(
        &mut self,
        map: &'m TreeBinHashMap<K, V, S, O>,
    ) -> Result<Option<(&'m K, &'m V)>> {
        map.generation.expect(self.expected)?;
        loop {
            let Some(bin) = map.table.get(self.bin) else {
                return Ok(None);
            };
            let here = self.bin;
            match (bin, self.pos) {
                (Bin::Chain(_), CursorPos::Fresh) => self.pos = CursorPos::Chain(0),
                (Bin::Tree(tree), CursorPos::Fresh) => self.pos = CursorPos::Tree(tree.head()),
                (Bin::Chain(chain), CursorPos::Chain(i)) if i < chain.len() => {
                    self.pos = CursorPos::Chain(i + 1);
                    self.last = Some(Location {
                        bin: here,
                        slot: BinSlot::Chain(i),
                    });
                    let e = &chain[i];
                    return Ok(Some((&e.key, &e.value)));
                }
                (Bin::Tree(tree), CursorPos::Tree(Some(id))) if tree.contains(id) => {
                    self.pos = CursorPos::Tree(tree.next_of(id));
                    self.last = Some(Location {
                        bin: here,
                        slot: BinSlot::Tree(id),
                    });
                    let e = tree.entry(id);
                    return Ok(Some((&e.key, &e.value)));
                }
                _ => self.advance_bin(),
            }
        }
    }

    /// Removes the entry most recently returned by [`HashCursor::next`].
    ///
    /// Fails with [`MapError::NotFound`] when nothing has been returned
    /// since the last removal.
    pub fn remove<K, V, S, O>(&mut self, map: &mut TreeBinHashMap<K, V, S, O>) -> Result<(K, V)> {
        map.generation.expect(self.expected)?;
        let loc = self
            .last
            .take()
            .ok_or_else(|| MapError::not_found("cursor has no current entry"))?;
        if loc.bin == self.bin {
            self.pos = match (&map.table[loc.bin], self.pos, loc.slot) {
                (_, CursorPos::Chain(i), BinSlot::Chain(j)) if j < i => CursorPos::Chain(i - 1),
                // The bin is about to revert to a chain in linear order.
                (Bin::Tree(tree), CursorPos::Tree(next), BinSlot::Tree(_))
                    if tree.len() - 1 <= UNTREEIFY_THRESHOLD =>
                {
                    let index = match next {
                        Some(n) => tree.position_of(n).map_or(tree.len() - 1, |p| p - 1),
                        None => tree.len() - 1,
                    };
                    CursorPos::Chain(index)
                }
                (_, pos, _) => pos,
            };
        }
        let entry = map
            .remove_at(loc)
            .ok_or_else(|| MapError::not_found("cursor entry vanished"))?;
        self.expected = map.generation.get();
        Ok((entry.key, entry.value))
    }
}
