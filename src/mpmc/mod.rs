//! This module contains the implementation of the MPMC queue.
//!
//! [`bounded`]: a fixed-capacity ring buffer coordinated by a cursor and a barrier
//! per side. Use [`Queue`] or [`UnpaddedQueue`].
mod bounded;

pub use bounded::*;
