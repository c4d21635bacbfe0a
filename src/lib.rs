//! treebin-maps: a hash map whose crowded bins turn into red-black trees,
//! and an ordered tree map with bounded, optionally descending views.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: two map engines built on one arena red-black core, so the
//!   balancing code is written and verified once.
//! - Layers:
//!   - `RbTree<T>`: red-black tree over a `slotmap` arena. Nodes are
//!     addressed by stable `NodeId`s; removal relinks nodes instead of
//!     moving items, so ids held by cursors stay meaningful.
//!   - `TreeBinHashMap<K, V, S, O>`: power-of-two bucket array of bins.
//!     A bin is a chain until it holds 8 entries in a table of at least
//!     64 slots, then it becomes a tree bin ordered by hash, by `O` when
//!     the keys are mutually comparable, and finally by insertion sequence.
//!   - `TreeMap<K, V, C>`: sorted map ordered by a `KeyOrder` comparator,
//!     with `SubMap`/`SubMapMut` views over a half-open or closed range.
//!
//! Constraints
//! - Single-threaded: no internal synchronization.
//! - No `unsafe`; structural links are arena indices.
//! - O(1) average hash lookups; O(log n) worst case within a tree bin.
//! - O(log n) tree-map operations; sub-map `len` is a counted walk.
//!
//! Fail-fast cursors
//! - Borrowing iterators are protected by the borrow checker. The detached
//!   `HashCursor` and `TreeCursor` instead snapshot a generation counter
//!   that every structural change bumps; a mismatch surfaces as
//!   `MapError::ConcurrentStructuralChange`. Removal through the cursor
//!   itself keeps it valid.
//!
//! Reentrancy policy
//! - Lookup paths taking `&self` run user `Hash`/`Eq`/comparator code while
//!   walking bins. A debug-only guard panics if that code re-enters the same
//!   map. `&mut self` paths cannot be re-entered at all.
//!
//! Hashing
//! - Each entry stores its spread 32-bit hash. Resizing splits every bin by
//!   one hash bit and never calls `K: Hash` again.
//!
//! Notes and non-goals
//! - No concurrent variant, no linked (access-ordered) variant.
//! - Keys are immutable once inserted; there is no `key_mut`.

pub mod config;
mod error;
mod guard;
pub mod hash_map;
mod order;
mod rbtree;
#[cfg(feature = "serde")]
mod serde;
pub mod tree_map;

// Public surface
pub use config::HashMapConfig;
pub use error::{MapError, Result};
pub use hash_map::{BinShape, HashCursor, TreeBinHashMap};
pub use order::{
    AcceptAll, BinOrder, FnOrder, KeyOrder, Natural, PartialNatural, Reverse, Unordered, Validator,
};
pub use tree_map::{SubMap, SubMapMut, TreeCursor, TreeMap, UnmodifiableView};
