//! Key orderings.
//!
//! Two capabilities live here:
//! - [`KeyOrder`]: the total order a [`TreeMap`](crate::TreeMap) is sorted by,
//!   either the keys' own `Ord` ([`Natural`]) or a caller-supplied comparator.
//! - [`BinOrder`]: the optional order a [`TreeBinHashMap`](crate::TreeBinHashMap)
//!   uses to break hash ties inside a tree bin. Whether keys are comparable
//!   is decided by the type chosen here at compile time.

use crate::error::{MapError, Result};
use core::cmp::Ordering;
use core::fmt;

/// A total order over keys of type `K`.
///
/// `compare` must be consistent for the lifetime of a map. `validate` is the
/// capability test applied to keys entering a tree: it rejects keys the order
/// cannot place (for example a NaN under [`PartialNatural`]).
pub trait KeyOrder<K: ?Sized> {
    fn compare(&self, a: &K, b: &K) -> Ordering;

    fn validate(&self, _key: &K) -> Result<()> {
        Ok(())
    }
}

/// The keys' own `Ord`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Natural;

impl<K: ?Sized + Ord> KeyOrder<K> for Natural {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// `PartialOrd` keys, restricted to those comparable with themselves.
///
/// Floating point keys are the usual customer: every non-NaN value is
/// admitted and NaN is refused with [`MapError::KeyOrdering`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PartialNatural;

impl<K: ?Sized + PartialOrd> KeyOrder<K> for PartialNatural {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.partial_cmp(b).unwrap_or(Ordering::Equal)
    }

    fn validate(&self, key: &K) -> Result<()> {
        match key.partial_cmp(key) {
            Some(Ordering::Equal) => Ok(()),
            _ => Err(MapError::key_ordering("key is not comparable with itself")),
        }
    }
}

/// A comparator closure, optionally paired with a key validator.
///
/// ```
/// use treebin_maps::{FnOrder, TreeMap};
///
/// let mut m = TreeMap::with_order(FnOrder::new(|a: &String, b: &String| {
///     a.len().cmp(&b.len()).then_with(|| a.cmp(b))
/// }));
/// m.insert("ccc".to_string(), 3);
/// m.insert("a".to_string(), 1);
/// m.insert("bb".to_string(), 2);
/// assert_eq!(m.keys().cloned().collect::<Vec<_>>(), ["a", "bb", "ccc"]);
/// ```
#[derive(Clone, Copy)]
pub struct FnOrder<F, P = AcceptAll> {
    compare: F,
    validator: P,
}

/// Validator of an [`FnOrder`] built without one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AcceptAll;

/// A key predicate attached with [`FnOrder::with_validator`].
#[derive(Clone, Copy)]
pub struct Validator<P>(P);

impl<F> FnOrder<F> {
    pub fn new(compare: F) -> Self {
        FnOrder {
            compare,
            validator: AcceptAll,
        }
    }

    /// Rejects keys for which `accept` returns `false` with
    /// [`MapError::KeyOrdering`].
    ///
    /// ```
    /// use treebin_maps::{FnOrder, TreeMap};
    ///
    /// let order = FnOrder::new(|a: &f64, b: &f64| a.total_cmp(b))
    ///     .with_validator(|k: &f64| !k.is_nan());
    /// let mut m = TreeMap::with_order(order);
    /// assert!(m.try_insert(1.0, "one").is_ok());
    /// assert!(m.try_insert(f64::NAN, "nan").is_err());
    /// ```
    pub fn with_validator<P>(self, accept: P) -> FnOrder<F, Validator<P>> {
        FnOrder {
            compare: self.compare,
            validator: Validator(accept),
        }
    }
}

impl<F, P> fmt::Debug for FnOrder<F, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnOrder(..)")
    }
}

impl<K: ?Sized, F> KeyOrder<K> for FnOrder<F>
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.compare)(a, b)
    }
}

impl<K: ?Sized, F, P> KeyOrder<K> for FnOrder<F, Validator<P>>
where
    F: Fn(&K, &K) -> Ordering,
    P: Fn(&K) -> bool,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.compare)(a, b)
    }

    fn validate(&self, key: &K) -> Result<()> {
        if (self.validator.0)(key) {
            Ok(())
        } else {
            Err(MapError::key_ordering("key rejected by comparator"))
        }
    }
}

/// Inverts another order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reverse<C>(pub C);

impl<K: ?Sized, C: KeyOrder<K>> KeyOrder<K> for Reverse<C> {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self.0.compare(b, a)
    }

    fn validate(&self, key: &K) -> Result<()> {
        self.0.validate(key)
    }
}

/// Optional order used to place colliding keys inside a hash tree bin.
///
/// Returning `None`, or `Some(Equal)` for unequal keys, makes the bin fall
/// back to a creation-order tie-break; lookups then search both subtrees.
pub trait BinOrder<Q: ?Sized> {
    fn compare(&self, a: &Q, b: &Q) -> Option<Ordering>;
}

/// Keys carry no usable order; hash ties are broken by creation order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Unordered;

impl<Q: ?Sized> BinOrder<Q> for Unordered {
    #[inline]
    fn compare(&self, _a: &Q, _b: &Q) -> Option<Ordering> {
        None
    }
}

impl<Q: ?Sized + Ord> BinOrder<Q> for Natural {
    #[inline]
    fn compare(&self, a: &Q, b: &Q) -> Option<Ordering> {
        Some(a.cmp(b))
    }
}
