//! The construction-time error of the crate.
//!
//! A queue has exactly one way to fail: being asked for an impossible capacity.
//! Full and empty are ordinary outcomes of `enqueue` and `dequeue`, not errors.

/// Convenience result alias for fallible queue configuration.
pub type ConfigResult<T, E = ConfigError> = Result<T, E>;

/// Errors surfaced while configuring a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The requested capacity is zero or not a power of two.
    #[error("queue capacity {requested} must be a non-zero power of two")]
    InvalidCapacity {
        /// The rejected capacity.
        requested: usize,
    },
}
