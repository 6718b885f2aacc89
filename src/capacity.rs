//! Provides [`Capacity`], the validated size of a queue's ring.
use crate::error::{ConfigError, ConfigResult};
use crate::sequence::Sequence;
use std::fmt;

/// A non-zero power of two.
///
/// Ring indexes are computed as `sequence & mask`, which is only a modulo when
/// the capacity is a power of two. One slot is always kept empty to tell a full
/// ring from an empty one, so a queue of capacity `n` holds at most `n - 1` items.
///
/// # Examples
///
/// ```
/// use lfring::Capacity;
///
/// let capacity = Capacity::new(8).unwrap();
///
/// assert_eq!(capacity.get(), 8);
/// assert_eq!(capacity.usable(), 7);
/// assert!(Capacity::new(6).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "usize", into = "usize"))]
pub struct Capacity(usize);

impl Capacity {
    /// Validates `requested`.
    ///
    /// Returns [`ConfigError::InvalidCapacity`] if it is zero or not a power of two.
    pub const fn new(requested: usize) -> ConfigResult<Self> {
        // `is_power_of_two` is false for zero.
        if requested.is_power_of_two() && requested <= Sequence::MAX as usize {
            Ok(Self(requested))
        } else {
            Err(ConfigError::InvalidCapacity { requested })
        }
    }

    /// Returns the number of slots in the ring.
    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Returns `capacity - 1`, the bit mask mapping a sequence to its slot.
    #[inline]
    pub const fn mask(self) -> usize {
        self.0 - 1
    }

    /// Returns how many items the queue can hold at once, which is also `capacity - 1`.
    #[inline]
    pub const fn usable(self) -> usize {
        self.mask()
    }
}

impl TryFrom<usize> for Capacity {
    type Error = ConfigError;

    fn try_from(requested: usize) -> ConfigResult<Self> {
        Self::new(requested)
    }
}

impl From<Capacity> for usize {
    fn from(capacity: Capacity) -> Self {
        capacity.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
