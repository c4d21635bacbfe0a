//! Bookkeeping shared by both engines: the structural generation that
//! cursors compare against, and a debug-only reentrancy check.

use crate::error::{MapError, Result};
use core::cell::Cell;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Counts structural changes (insertions of new keys, removals, resizes,
/// clears). Value replacement does not count.
///
/// Each map gets its own owner id, including clones, so a cursor never
/// validates against a map it was not taken from.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Generation {
    owner: u64,
    count: u64,
}

/// A cursor's snapshot of a [`Generation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Stamp {
    owner: u64,
    count: u64,
}

impl Generation {
    pub(crate) fn new() -> Self {
        Self {
            owner: NEXT_OWNER.fetch_add(1, AtomicOrdering::Relaxed),
            count: 0,
        }
    }

    #[inline]
    pub(crate) fn bump(&mut self) {
        self.count = self.count.wrapping_add(1);
    }

    #[inline]
    pub(crate) fn get(&self) -> Stamp {
        Stamp {
            owner: self.owner,
            count: self.count,
        }
    }

    /// Fails when a cursor's snapshot no longer matches, or was taken from
    /// another map.
    #[inline]
    pub(crate) fn expect(&self, snapshot: Stamp) -> Result<()> {
        if snapshot.owner != self.owner {
            Err(MapError::invalid_argument("cursor belongs to a different map"))
        } else if snapshot.count != self.count {
            Err(MapError::structural_change(snapshot.count, self.count))
        } else {
            Ok(())
        }
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Generation {
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// Detects user code (`Hash`, `Eq`, `Ord`, comparators) calling back into
/// the map it is being invoked from. Debug builds panic on nested entry;
/// release builds compile the check away.
///
/// The tracker is `Send` but not `Sync`: a map may move between threads or
/// sit behind a caller's lock, never be shared unsynchronized.
#[derive(Debug)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    _unsync: PhantomData<Cell<()>>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _unsync: PhantomData,
        }
    }

    /// Marks the map busy until the returned guard drops.
    #[cfg(debug_assertions)]
    #[inline]
    pub(crate) fn enter(&self) -> Entered<'_> {
        assert!(
            !self.busy.replace(true),
            "reentrant call into a map from its own key or comparator code"
        );
        Entered { owner: self }
    }

    #[cfg(not(debug_assertions))]
    #[inline]
    pub(crate) fn enter(&self) -> Entered<'_> {
        Entered {
            _owner: PhantomData,
        }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

// A cloned map starts idle regardless of the source's state.
impl Clone for DebugReentrancy {
    fn clone(&self) -> Self {
        Self::new()
    }
}

pub(crate) struct Entered<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a ()>,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.busy.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_detects_divergence() {
        let mut g = Generation::default();
        let snap = g.get();
        assert!(g.expect(snap).is_ok());
        g.bump();
        assert_eq!(g.expect(snap), Err(MapError::structural_change(0, 1)));
    }

    #[test]
    fn generation_rejects_foreign_snapshots() {
        let a = Generation::new();
        let b = Generation::new();
        assert!(matches!(
            b.expect(a.get()),
            Err(MapError::InvalidArgument { .. })
        ));
        let c = a.clone();
        assert!(c.expect(a.get()).is_err());
        assert!(c.expect(c.get()).is_ok());
    }

    #[test]
    fn sequential_entries_are_fine() {
        let r = DebugReentrancy::new();
        drop(r.enter());
        let _g = r.enter();
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_entry_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = r.enter();
            let _inner = r.enter();
        }));
        assert!(res.is_err(), "expected nested entry to panic in debug builds");
    }

    #[test]
    fn maps_can_move_between_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<DebugReentrancy>();
    }
}
