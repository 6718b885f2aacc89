//! This module abstracts over `loom` and `std` depending on whether we
//! are model-checking the queue or not.
//!
//! Build with `RUSTFLAGS="--cfg lfring_loom"` to run the tests against `loom`.

#[cfg(not(all(test, lfring_loom)))]
mod std;
#[cfg(not(all(test, lfring_loom)))]
pub(crate) use self::std::*;

#[cfg(all(test, lfring_loom))]
mod mocked;
#[cfg(all(test, lfring_loom))]
pub(crate) use self::mocked::*;
