//! TreeBinHashMap: separate-chaining hash map whose crowded bins turn into
//! red-black trees.
//!
//! Layout
//! - A power-of-two `Vec<Bin>`; a key lives in bin `hash & (capacity - 1)`.
//! - A bin is a `Chain` (a `Vec` scanned linearly) until it holds
//!   [`TREEIFY_THRESHOLD`] entries, then a `Tree` bin, as long as the table
//!   has at least [`MIN_TREEIFY_CAPACITY`] slots. Smaller tables resize
//!   instead.
//! - A tree bin reverts to a chain once it holds [`UNTREEIFY_THRESHOLD`]
//!   entries or fewer, after a removal or a resize split.
//!
//! Hashing
//! - The build hasher's `u64` is folded to 32 bits and its upper half is
//!   XORed into the lower half, so keys whose hashes differ only in high
//!   bits still spread over a small table.
//! - Every entry stores its spread hash; rehashing never calls `Hash` again.
//!
//! Structural changes (new keys, removals, resizes, clears) bump a
//! generation that detached [`HashCursor`]s check on every step.

mod bin;
mod iter;
mod proptests;
mod tree_bin;

pub use bin::BinShape;
pub use iter::{HashCursor, IntoIter, Iter, IterMut, Keys, Values, ValuesMut};

use crate::config::{
    threshold_for, HashMapConfig, DEFAULT_INITIAL_CAPACITY, MAXIMUM_CAPACITY,
    MIN_TREEIFY_CAPACITY, TREEIFY_THRESHOLD, UNBOUNDED_THRESHOLD,
};
use crate::error::Result;
use crate::guard::{DebugReentrancy, Generation};
use crate::order::{BinOrder, Natural, Unordered};
use bin::{Bin, BinSlot, Entry, Location};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use core::ops::Index;
use hashbrown::hash_map::DefaultHashBuilder;
use tree_bin::TreeBin;

/// Folds a 64-bit hash to 32 bits and mixes the high half down.
#[inline]
fn spread(h: u64) -> u32 {
    let h = (h ^ (h >> 32)) as u32;
    h ^ (h >> 16)
}

#[inline]
fn index_for(hash: u32, capacity: usize) -> usize {
    hash as usize & (capacity - 1)
}

fn empty_table<K, V>(capacity: usize) -> Vec<Bin<K, V>> {
    let mut table = Vec::with_capacity(capacity);
    table.resize_with(capacity, Bin::default);
    table
}

/// A hash map with chain and tree bins.
///
/// `O` decides whether colliding keys are ordered inside a tree bin:
/// [`Unordered`] (the default) breaks hash ties by insertion sequence,
/// [`Natural`] uses the keys' `Ord` to cut lookups down to one path.
///
/// ```
/// use treebin_maps::TreeBinHashMap;
///
/// let mut m = TreeBinHashMap::new();
/// assert_eq!(m.insert("a", 1), None);
/// assert_eq!(m.insert("a", 2), Some(1));
/// assert_eq!(m.get("a"), Some(&2));
/// assert_eq!(m.remove("a"), Some(2));
/// assert!(m.is_empty());
/// ```
#[derive(Clone)]
pub struct TreeBinHashMap<K, V, S = DefaultHashBuilder, O = Unordered> {
    table: Vec<Bin<K, V>>,
    len: usize,
    // Before the first allocation: the initial table size (0 = default).
    threshold: usize,
    load_factor: f32,
    generation: Generation,
    next_seq: u64,
    hasher: S,
    order: O,
    reentrancy: DebugReentrancy,
}

impl<K, V> TreeBinHashMap<K, V> {
    pub fn new() -> Self {
        Self::from_parts(HashMapConfig::default(), DefaultHashBuilder::default(), Unordered)
    }

    /// Capacities above [`MAXIMUM_CAPACITY`] are clamped.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_parts(
            HashMapConfig::new().initial_capacity(capacity.min(MAXIMUM_CAPACITY)),
            DefaultHashBuilder::default(),
            Unordered,
        )
    }

    pub fn with_capacity_and_load_factor(capacity: usize, load_factor: f32) -> Result<Self> {
        Self::with_config(
            HashMapConfig::new()
                .initial_capacity(capacity)
                .load_factor(load_factor),
        )
    }

    pub fn with_config(config: HashMapConfig) -> Result<Self> {
        Self::with_parts(config, DefaultHashBuilder::default(), Unordered)
    }
}

impl<K, V> TreeBinHashMap<K, V, DefaultHashBuilder, Natural> {
    /// A map whose tree bins order colliding keys by `Ord`.
    pub fn new_ordered() -> Self {
        Self::from_parts(HashMapConfig::default(), DefaultHashBuilder::default(), Natural)
    }
}

impl<K, V, S> TreeBinHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_parts(HashMapConfig::default(), hasher, Unordered)
    }

    pub fn with_config_and_hasher(config: HashMapConfig, hasher: S) -> Result<Self> {
        Self::with_parts(config, hasher, Unordered)
    }
}

impl<K, V, S: Default, O: Default> Default for TreeBinHashMap<K, V, S, O> {
    fn default() -> Self {
        Self::from_parts(HashMapConfig::default(), S::default(), O::default())
    }
}

impl<K, V, S, O> TreeBinHashMap<K, V, S, O> {
    /// Fully explicit constructor. Fails on an invalid load factor.
    pub fn with_parts(config: HashMapConfig, hasher: S, order: O) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, hasher, order))
    }

    fn from_parts(config: HashMapConfig, hasher: S, order: O) -> Self {
        Self {
            table: Vec::new(),
            len: 0,
            threshold: config.initial_table_size(),
            load_factor: config.load_factor,
            generation: Generation::default(),
            next_seq: 0,
            hasher,
            order,
            reentrancy: DebugReentrancy::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bins; 0 until the first insertion.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.len()
    }

    /// Entry count above which the next insertion resizes. Before the
    /// first allocation this is the pending initial table size.
    #[inline]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    #[inline]
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Number of bins currently organized as trees.
    pub fn tree_bin_count(&self) -> usize {
        self.table
            .iter()
            .filter(|b| matches!(b, Bin::Tree(_)))
            .count()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.table, self.len)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.table, self.len)
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

    /// Empties the map, keeping its capacity, and yields the removed
    /// entries in bin order.
    pub fn drain(&mut self) -> IntoIter<K, V> {
        let len = mem::take(&mut self.len);
        let cap = self.table.len();
        let table = mem::replace(&mut self.table, empty_table(cap));
        self.generation.bump();
        IntoIter::new(table, len)
    }

    /// Removes every entry. Capacity is retained.
    pub fn clear(&mut self) {
        for bin in &mut self.table {
            *bin = Bin::Empty;
        }
        self.len = 0;
        self.generation.bump();
    }

    /// Keeps the entries for which `keep` returns `true`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut removed = 0;
        for bin in &mut self.table {
            match bin {
                Bin::Empty => continue,
                Bin::Chain(chain) => {
                    let before = chain.len();
                    chain.retain_mut(|e| keep(&e.key, &mut e.value));
                    removed += before - chain.len();
                }
                Bin::Tree(tree) => {
                    let doomed: Vec<_> = tree
                        .linear_ids()
                        .into_iter()
                        .filter(|&id| {
                            let e = tree.entry_mut(id);
                            !keep(&e.key, &mut e.value)
                        })
                        .collect();
                    removed += doomed.len();
                    for id in doomed {
                        tree.remove(id);
                    }
                }
            }
            bin.settle();
        }
        if removed > 0 {
            self.len -= removed;
            self.generation.bump();
        }
    }

    /// A detached cursor positioned before the first entry.
    pub fn cursor(&self) -> HashCursor {
        HashCursor::new(self.generation.get())
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|v| v == value)
    }

    fn entry_at(&self, loc: Location) -> Option<&Entry<K, V>> {
        self.table.get(loc.bin)?.entry(loc.slot)
    }

    fn entry_at_mut(&mut self, loc: Location) -> Option<&mut Entry<K, V>> {
        self.table.get_mut(loc.bin)?.entry_mut(loc.slot)
    }

    /// Unlinks the entry at `loc` and collapses its bin if needed.
    fn remove_at(&mut self, loc: Location) -> Option<Entry<K, V>> {
        let bin = self.table.get_mut(loc.bin)?;
        let entry = bin.take(loc.slot)?;
        bin.settle();
        self.len -= 1;
        self.generation.bump();
        Some(entry)
    }

    fn locate_seq(&self, hash: u32, seq: u64) -> Option<Location> {
        if self.table.is_empty() {
            return None;
        }
        let bin = index_for(hash, self.table.len());
        let slot = self.table[bin].find_seq(seq)?;
        Some(Location { bin, slot })
    }
}

impl<K, V, S, O> TreeBinHashMap<K, V, S, O>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash_of<Q>(&self, q: &Q) -> u32
    where
        Q: ?Sized + Hash,
    {
        spread(self.hasher.hash_one(q))
    }

    fn find_location<Q>(&self, hash: u32, q: &Q) -> Option<Location>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        O: BinOrder<Q>,
    {
        if self.table.is_empty() {
            return None;
        }
        let bin = index_for(hash, self.table.len());
        let slot = match &self.table[bin] {
            Bin::Empty => None,
            Bin::Chain(chain) => chain
                .iter()
                .position(|e| e.hash == hash && e.key.borrow() == q)
                .map(BinSlot::Chain),
            Bin::Tree(tree) => tree
                .find(
                    hash,
                    &|k: &K| k.borrow() == q,
                    &|k: &K| self.order.compare(q, k.borrow()),
                )
                .map(BinSlot::Tree),
        }?;
        Some(Location { bin, slot })
    }

    fn lookup<Q>(&self, key: &Q) -> Option<&Entry<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: BinOrder<Q>,
    {
        let _guard = self.reentrancy.enter();
        let loc = self.find_location(self.hash_of(key), key)?;
        self.entry_at(loc)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: BinOrder<Q>,
    {
        self.lookup(key).map(|e| &e.value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: BinOrder<Q>,
    {
        self.lookup(key).map(|e| (&e.key, &e.value))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: BinOrder<Q>,
    {
        self.lookup(key).is_some()
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: BinOrder<Q>,
    {
        let loc = self.find_location(self.hash_of(key), key)?;
        self.entry_at_mut(loc).map(|e| &mut e.value)
    }

    /// Shape and length of the bin that holds `key`, if present.
    pub fn bin_shape<Q>(&self, key: &Q) -> Option<BinShape>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: BinOrder<Q>,
    {
        let _guard = self.reentrancy.enter();
        let loc = self.find_location(self.hash_of(key), key)?;
        self.table[loc.bin].shape()
    }

    /// Removes `key`, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: BinOrder<Q>,
    {
        let loc = self.find_location(self.hash_of(key), key)?;
        self.remove_at(loc).map(|e| (e.key, e.value))
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: BinOrder<Q>,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key` only while it maps to `value`.
    pub fn remove_if<Q>(&mut self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: BinOrder<Q>,
        V: PartialEq,
    {
        let Some(loc) = self.find_location(self.hash_of(key), key) else {
            return false;
        };
        if self.entry_at(loc).map_or(true, |e| e.value != *value) {
            return false;
        }
        self.remove_at(loc).is_some()
    }

    /// Replaces the value of an existing key. Not a structural change.
    pub fn replace<Q>(&mut self, key: &Q, value: V) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: BinOrder<Q>,
    {
        self.get_mut(key).map(|slot| mem::replace(slot, value))
    }

    /// Replaces the value of `key` only while it equals `old`.
    pub fn replace_if<Q>(&mut self, key: &Q, old: &V, new: V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: BinOrder<Q>,
        V: PartialEq,
    {
        match self.get_mut(key) {
            Some(slot) if *slot == *old => {
                *slot = new;
                true
            }
            _ => false,
        }
    }
}

impl<K, V, S, O> TreeBinHashMap<K, V, S, O>
where
    K: Hash + Eq,
    S: BuildHasher,
    O: BinOrder<K>,
{
    /// Inserts `key`, returning the value it replaced.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_of(&key);
        match self
            .find_location(hash, &key)
            .and_then(|loc| self.entry_at_mut(loc))
        {
            Some(e) => Some(mem::replace(&mut e.value, value)),
            None => {
                self.insert_new(hash, key, value);
                None
            }
        }
    }

    /// Inserts only when `key` is absent; otherwise leaves the map unchanged
    /// and returns the current value.
    pub fn put_if_absent(&mut self, key: K, value: V) -> Option<&mut V> {
        let hash = self.hash_of(&key);
        if let Some(loc) = self.find_location(hash, &key) {
            return self.entry_at_mut(loc).map(|e| &mut e.value);
        }
        self.insert_new(hash, key, value);
        None
    }

    /// Recomputes the mapping for `key`. `remap` sees the current value, if
    /// any; returning `None` removes the entry (or inserts nothing).
    pub fn compute<F>(&mut self, key: K, remap: F) -> Option<&mut V>
    where
        F: FnOnce(&K, Option<&V>) -> Option<V>,
    {
        let hash = self.hash_of(&key);
        match self.find_location(hash, &key) {
            Some(loc) => {
                let e = self.entry_at_mut(loc)?;
                match remap(&e.key, Some(&e.value)) {
                    Some(v) => {
                        e.value = v;
                        self.entry_at_mut(loc).map(|e| &mut e.value)
                    }
                    None => {
                        self.remove_at(loc);
                        None
                    }
                }
            }
            None => {
                let value = remap(&key, None)?;
                self.insert_fresh(hash, key, value)
            }
        }
    }

    /// Returns the value for `key`, computing and inserting one if absent.
    pub fn compute_if_absent<F>(&mut self, key: K, make: F) -> Option<&mut V>
    where
        F: FnOnce(&K) -> Option<V>,
    {
        let hash = self.hash_of(&key);
        if let Some(loc) = self.find_location(hash, &key) {
            return self.entry_at_mut(loc).map(|e| &mut e.value);
        }
        let value = make(&key)?;
        self.insert_fresh(hash, key, value)
    }

    /// Recomputes an existing mapping; `None` from `remap` removes it.
    pub fn compute_if_present<Q, F>(&mut self, key: &Q, remap: F) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: BinOrder<Q>,
        F: FnOnce(&K, &V) -> Option<V>,
    {
        let loc = self.find_location(self.hash_of(key), key)?;
        let e = self.entry_at_mut(loc)?;
        match remap(&e.key, &e.value) {
            Some(v) => {
                e.value = v;
                self.entry_at_mut(loc).map(|e| &mut e.value)
            }
            None => {
                self.remove_at(loc);
                None
            }
        }
    }

    /// Inserts `value` if `key` is absent, otherwise combines it with the
    /// current value; `None` from `combine` removes the entry.
    pub fn merge<F>(&mut self, key: K, value: V, combine: F) -> Option<&mut V>
    where
        F: FnOnce(&V, V) -> Option<V>,
    {
        let hash = self.hash_of(&key);
        let Some(loc) = self.find_location(hash, &key) else {
            return self.insert_fresh(hash, key, value);
        };
        let e = self.entry_at_mut(loc)?;
        match combine(&e.value, value) {
            Some(v) => {
                e.value = v;
                self.entry_at_mut(loc).map(|e| &mut e.value)
            }
            None => {
                self.remove_at(loc);
                None
            }
        }
    }

    /// Copies every entry of `other` into this map, presizing first.
    pub fn put_all<S2, O2>(&mut self, other: &TreeBinHashMap<K, V, S2, O2>)
    where
        K: Clone,
        V: Clone,
    {
        self.reserve(other.len());
        for (k, v) in other.iter() {
            self.insert(k.clone(), v.clone());
        }
    }

    /// Grows the table so `additional` more entries fit without a resize.
    pub fn reserve(&mut self, additional: usize) {
        if additional == 0 {
            return;
        }
        let wanted = self.len.saturating_add(additional);
        if self.table.is_empty() {
            let size = HashMapConfig::table_size_for_len(wanted, self.load_factor);
            if size > self.threshold {
                self.threshold = size;
            }
        } else {
            while wanted > self.threshold && self.table.len() < MAXIMUM_CAPACITY {
                self.resize();
            }
        }
    }

    /// Inserts a key known to be absent and returns a handle to its value.
    fn insert_fresh(&mut self, hash: u32, key: K, value: V) -> Option<&mut V> {
        let seq = self.insert_new(hash, key, value);
        let loc = self.locate_seq(hash, seq)?;
        self.entry_at_mut(loc).map(|e| &mut e.value)
    }

    /// Links a new entry, then treeifies or resizes as needed. Returns the
    /// entry's sequence number; its location may have moved by then.
    fn insert_new(&mut self, hash: u32, key: K, value: V) -> u64 {
        if self.table.is_empty() {
            self.resize();
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let entry = Entry {
            hash,
            seq,
            key,
            value,
        };
        let index = index_for(hash, self.table.len());
        let order = &self.order;
        let bin = &mut self.table[index];
        let crowded = match bin {
            Bin::Empty => {
                *bin = Bin::Chain(vec![entry]);
                false
            }
            Bin::Chain(chain) => {
                chain.push(entry);
                chain.len() >= TREEIFY_THRESHOLD
            }
            Bin::Tree(tree) => {
                tree.insert(entry, &|a: &K, b: &K| order.compare(a, b));
                false
            }
        };
        self.len += 1;
        self.generation.bump();
        if crowded {
            self.treeify_bin(index);
        }
        // A truncated threshold may need more than one doubling.
        while self.len > self.threshold && self.table.len() < MAXIMUM_CAPACITY {
            self.resize();
        }
        seq
    }

    /// Converts a crowded chain to a tree bin, or grows a small table instead.
    fn treeify_bin(&mut self, index: usize) {
        if self.table.len() < MIN_TREEIFY_CAPACITY {
            self.resize();
            return;
        }
        let order = &self.order;
        let bin = &mut self.table[index];
        if let Bin::Chain(chain) = bin {
            let entries = mem::take(chain);
            log::trace!("treeify bin {index}: {} entries", entries.len());
            *bin = Bin::Tree(TreeBin::from_entries(entries, &|a: &K, b: &K| {
                order.compare(a, b)
            }));
        }
    }

    /// Allocates the table or doubles it, splitting every bin between its
    /// old index and `index + old_capacity`.
    fn resize(&mut self) {
        let old_cap = self.table.len();
        let new_cap = if old_cap == 0 {
            if self.threshold > 0 {
                self.threshold
            } else {
                DEFAULT_INITIAL_CAPACITY
            }
        } else if old_cap >= MAXIMUM_CAPACITY {
            if self.threshold != UNBOUNDED_THRESHOLD {
                log::warn!(
                    "hash table reached maximum capacity {MAXIMUM_CAPACITY}; bins will grow unbounded"
                );
                self.threshold = UNBOUNDED_THRESHOLD;
            }
            return;
        } else {
            old_cap << 1
        };
        self.threshold = threshold_for(new_cap, self.load_factor);
        let old = mem::replace(&mut self.table, empty_table(new_cap));
        let order = &self.order;
        let cmp = |a: &K, b: &K| order.compare(a, b);
        for (j, bin) in old.into_iter().enumerate() {
            match bin {
                Bin::Empty => {}
                Bin::Chain(chain) if chain.len() == 1 => {
                    let i = index_for(chain[0].hash, new_cap);
                    self.table[i] = Bin::Chain(chain);
                }
                Bin::Chain(chain) => {
                    let (lo, hi): (Vec<_>, Vec<_>) = chain
                        .into_iter()
                        .partition(|e| e.hash as usize & old_cap == 0);
                    self.table[j] = Bin::chain_or_empty(lo);
                    self.table[j + old_cap] = Bin::chain_or_empty(hi);
                }
                Bin::Tree(tree) => {
                    let (lo, hi) = tree.split(old_cap, &cmp);
                    self.table[j] = lo;
                    self.table[j + old_cap] = hi;
                }
            }
        }
        log::debug!(
            "resized hash table {old_cap} -> {new_cap} ({} entries, threshold {})",
            self.len,
            self.threshold
        );
        self.generation.bump();
    }

    /// Verifies bin placement, stored hashes, bin shapes, size bookkeeping
    /// and the threshold.
    #[doc(hidden)]
    pub fn check_invariants(&self) -> core::result::Result<(), String> {
        let cap = self.table.len();
        if cap != 0 && !cap.is_power_of_two() {
            return Err(format!("capacity {cap} is not a power of two"));
        }
        let mut count = 0;
        for (i, bin) in self.table.iter().enumerate() {
            match bin {
                Bin::Empty => {}
                Bin::Chain(chain) if chain.is_empty() => {
                    return Err(format!("bin {i} is an empty chain"));
                }
                Bin::Chain(_) => {}
                Bin::Tree(tree) => tree.check().map_err(|e| format!("bin {i}: {e}"))?,
            }
            for e in bin.iter() {
                if e.hash != self.hash_of(&e.key) {
                    return Err(format!("bin {i}: stale stored hash"));
                }
                if index_for(e.hash, cap) != i {
                    return Err(format!("bin {i}: entry belongs in another bin"));
                }
                if e.seq >= self.next_seq {
                    return Err(format!("bin {i}: sequence number from the future"));
                }
                count += 1;
            }
        }
        if count != self.len {
            return Err(format!("len is {} but {count} entries are reachable", self.len));
        }
        if cap != 0 {
            let expected = threshold_for(cap, self.load_factor);
            if self.threshold != expected && self.threshold != UNBOUNDED_THRESHOLD {
                return Err(format!(
                    "threshold {} does not match capacity {cap}",
                    self.threshold
                ));
            }
            if self.len > self.threshold {
                return Err(format!("len {} above threshold {}", self.len, self.threshold));
            }
        }
        Ok(())
    }
}

impl<K, V, S, O> fmt::Debug for TreeBinHashMap<K, V, S, O>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, O> PartialEq for TreeBinHashMap<K, V, S, O>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    O: BinOrder<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S, O> Eq for TreeBinHashMap<K, V, S, O>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    O: BinOrder<K>,
{
}

impl<K, Q, V, S, O> Index<&Q> for TreeBinHashMap<K, V, S, O>
where
    K: Hash + Eq + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
    O: BinOrder<Q>,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Some(v) => v,
            None => panic!("key not found in TreeBinHashMap"),
        }
    }
}

impl<K, V, S, O> Extend<(K, V)> for TreeBinHashMap<K, V, S, O>
where
    K: Hash + Eq,
    S: BuildHasher,
    O: BinOrder<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        // Duplicates are likely when the map already holds entries.
        let hint = if self.is_empty() {
            iter.size_hint().0
        } else {
            (iter.size_hint().0 + 1) / 2
        };
        self.reserve(hint);
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S, O> Extend<(&'a K, &'a V)> for TreeBinHashMap<K, V, S, O>
where
    K: Hash + Eq + Copy,
    V: Copy,
    S: BuildHasher,
    O: BinOrder<K>,
{
    fn extend<I: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: I) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

impl<K, V, S, O> FromIterator<(K, V)> for TreeBinHashMap<K, V, S, O>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    O: BinOrder<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S, O> IntoIterator for &'a TreeBinHashMap<K, V, S, O> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, O> IntoIterator for &'a mut TreeBinHashMap<K, V, S, O> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S, O> IntoIterator for TreeBinHashMap<K, V, S, O> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.table, self.len)
    }
}
