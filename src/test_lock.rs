//! This module contains a lock for heavy multi-threaded tests.
use std::sync::{Mutex, MutexGuard, PoisonError};

static TEST_LOCK: Mutex<()> = Mutex::new(());

/// Serializes stress tests so that they do not steal cores from each other.
///
/// A test that panicked while holding the lock does not poison the others.
pub(crate) fn lock_heavy_test() -> MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}
