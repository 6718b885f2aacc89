//! This module provides a [`Backoff`] that the queue uses while it waits for an
//! earlier reservation to be published or released.
//!
//! It is also handy for callers that retry [`enqueue`](crate::Queue::enqueue) on a
//! full queue or [`dequeue`](crate::Queue::dequeue) on an empty one, because the
//! queue itself never waits for space or for items.
use crate::loom_bindings;
use std::cell::Cell;
use std::fmt;

const SPIN_LIMIT: u32 = 6;

/// Exponential backoff for spin loops.
///
/// Each step spins roughly twice as long as the previous one. Once the spin budget
/// is exhausted, [`snooze`](Backoff::snooze) yields the thread to the OS scheduler
/// instead, and [`is_completed`](Backoff::is_completed) starts returning `true`.
///
/// # Examples
///
/// Retrying a push into a full queue:
///
/// ```
/// use lfring::{Backoff, Queue};
///
/// let queue = Queue::new(4).unwrap();
/// let backoff = Backoff::new();
/// let mut item = 1;
///
/// loop {
///     match queue.enqueue(item) {
///         Ok(()) => break,
///         Err(rejected) => {
///             item = rejected;
///             backoff.snooze();
///         }
///     }
/// }
///
/// assert_eq!(queue.dequeue(), Some(1));
/// ```
pub struct Backoff {
    step: Cell<u32>,
}

impl Backoff {
    /// Creates a new `Backoff`.
    #[inline]
    pub fn new() -> Self {
        Self { step: Cell::new(0) }
    }

    /// Resets the backoff to its first step.
    #[inline]
    pub fn reset(&self) {
        self.step.set(0);
    }

    /// Backs off after losing a race to a thread that made progress.
    ///
    /// Only executes *PAUSE*/*YIELD* instructions; never gives up the time slice.
    #[inline]
    pub fn spin(&self) {
        for _ in 0..1 << self.step.get().min(SPIN_LIMIT) {
            loom_bindings::hint::spin_loop();
        }

        if self.step.get() <= SPIN_LIMIT {
            self.step.set(self.step.get() + 1);
        }
    }

    /// Backs off while waiting for another thread to make progress.
    ///
    /// Spins first and yields the current thread once the spin budget is exhausted.
    #[inline]
    pub fn snooze(&self) {
        if self.step.get() <= SPIN_LIMIT {
            for _ in 0..1 << self.step.get() {
                loom_bindings::hint::spin_loop();
            }
        } else {
            loom_bindings::thread::yield_now();
        }

        if self.step.get() <= SPIN_LIMIT {
            self.step.set(self.step.get() + 1);
        }
    }

    /// Returns `true` once spinning is over and every further
    /// [`snooze`](Backoff::snooze) yields the thread.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step.get() > SPIN_LIMIT
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backoff")
            .field("step", &self.step.get())
            .field("is_completed", &self.is_completed())
            .finish()
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
