//! Sizing policy for the hash-map engine.

use crate::error::{MapError, Result};

/// Capacity used when a map is allocated without a size hint.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Largest bucket array the engine allocates. Beyond it the threshold is
/// lifted and bins simply grow longer.
pub const MAXIMUM_CAPACITY: usize = 1 << 30;

pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// A chain holding this many entries is converted to a tree bin.
pub const TREEIFY_THRESHOLD: usize = 8;

/// A tree bin left with this many entries or fewer reverts to a chain.
pub const UNTREEIFY_THRESHOLD: usize = 6;

/// Bins are only treeified once the table has at least this many slots;
/// smaller tables are resized instead.
pub const MIN_TREEIFY_CAPACITY: usize = 64;

/// Threshold used once the table can no longer grow.
pub(crate) const UNBOUNDED_THRESHOLD: usize = i32::MAX as usize;

/// Load factors read back from serialized maps are clamped to this range.
pub(crate) const SANE_LOAD_FACTORS: (f32, f32) = (0.25, 4.0);

/// Smallest power of two `>= cap`, clamped to `[1, MAXIMUM_CAPACITY]`.
pub fn table_size_for(cap: usize) -> usize {
    if cap >= MAXIMUM_CAPACITY {
        MAXIMUM_CAPACITY
    } else {
        cap.max(1).next_power_of_two()
    }
}

/// `capacity * load_factor`, saturating at [`UNBOUNDED_THRESHOLD`].
pub(crate) fn threshold_for(capacity: usize, load_factor: f32) -> usize {
    let ft = capacity as f64 * f64::from(load_factor);
    if capacity < MAXIMUM_CAPACITY && ft < UNBOUNDED_THRESHOLD as f64 {
        ft as usize
    } else {
        UNBOUNDED_THRESHOLD
    }
}

/// Construction parameters for [`TreeBinHashMap`](crate::TreeBinHashMap).
///
/// ```
/// use treebin_maps::HashMapConfig;
///
/// let cfg = HashMapConfig::new().initial_capacity(100).load_factor(0.5);
/// assert!(cfg.validate().is_ok());
/// assert!(HashMapConfig::new().load_factor(f32::NAN).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashMapConfig {
    /// Requested number of slots; rounded up to a power of two on first use.
    /// Zero means "allocate the default size lazily".
    pub initial_capacity: usize,
    /// Ratio of entries to slots that triggers a resize.
    pub load_factor: f32,
}

impl Default for HashMapConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl HashMapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Builds a config from a signed capacity, as received from callers that
    /// cannot express the constraint in the type.
    pub fn from_signed(initial_capacity: i64, load_factor: f32) -> Result<Self> {
        let capacity = usize::try_from(initial_capacity).map_err(|_| {
            MapError::invalid_argument(format!("illegal initial capacity: {initial_capacity}"))
        })?;
        let cfg = Self::new().initial_capacity(capacity).load_factor(load_factor);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.load_factor.is_finite() || self.load_factor <= 0.0 {
            return Err(MapError::invalid_argument(format!(
                "illegal load factor: {}",
                self.load_factor
            )));
        }
        Ok(())
    }

    /// Slot count of the first allocation, or 0 for the default size.
    pub(crate) fn initial_table_size(&self) -> usize {
        if self.initial_capacity == 0 {
            0
        } else {
            table_size_for(self.initial_capacity)
        }
    }

    /// Table size able to hold `len` entries without resizing.
    pub(crate) fn table_size_for_len(len: usize, load_factor: f32) -> usize {
        let wanted = (len as f64 / f64::from(load_factor)) + 1.0;
        if wanted >= MAXIMUM_CAPACITY as f64 {
            MAXIMUM_CAPACITY
        } else {
            table_size_for(wanted as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_size_rounds_up_to_power_of_two() {
        assert_eq!(table_size_for(0), 1);
        assert_eq!(table_size_for(1), 1);
        assert_eq!(table_size_for(2), 2);
        assert_eq!(table_size_for(3), 4);
        assert_eq!(table_size_for(17), 32);
        assert_eq!(table_size_for(64), 64);
        assert_eq!(table_size_for(usize::MAX), MAXIMUM_CAPACITY);
    }

    #[test]
    fn threshold_saturates_at_ceiling() {
        assert_eq!(threshold_for(16, 0.75), 12);
        assert_eq!(threshold_for(64, 1.0), 64);
        assert_eq!(threshold_for(MAXIMUM_CAPACITY, 0.75), UNBOUNDED_THRESHOLD);
        assert_eq!(threshold_for(1 << 29, 8.0), UNBOUNDED_THRESHOLD);
    }

    #[test]
    fn load_factor_must_be_positive_and_finite() {
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let err = HashMapConfig::new().load_factor(bad).validate().unwrap_err();
            assert_eq!(err.category(), "argument");
        }
        assert!(HashMapConfig::new().load_factor(0.1).validate().is_ok());
    }

    #[test]
    fn negative_capacity_is_rejected() {
        let err = HashMapConfig::from_signed(-1, 0.75).unwrap_err();
        assert!(matches!(err, MapError::InvalidArgument { .. }));
        let ok = HashMapConfig::from_signed(10, 0.75).unwrap();
        assert_eq!(ok.initial_table_size(), 16);
    }

    #[test]
    fn presize_for_len_leaves_headroom() {
        assert_eq!(HashMapConfig::table_size_for_len(12, 0.75), 32);
        assert_eq!(HashMapConfig::table_size_for_len(0, 0.75), 1);
        assert_eq!(HashMapConfig::table_size_for_len(100, 4.0), 32);
    }
}
