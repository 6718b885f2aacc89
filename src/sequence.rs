//! Sequence numbers and the counter cells the queue keeps them in.
use crate::loom_bindings::sync::atomic::AtomicI64;
use std::ops::Deref;

/// A monotonically increasing identity of an enqueue or a dequeue.
///
/// It is signed so that `producer_cursor - consumer_barrier` is a plain
/// difference. At a billion operations per second it overflows in ~292 years.
pub type Sequence = i64;

/// The atomic cell behind every queue counter.
pub type AtomicSequence = AtomicI64;

/// A counter padded to its own cache line. The default counter layout of
/// [`Queue`](crate::mpmc::Queue).
pub type CachePaddedSequence = crate::cache_padded::CachePaddedAtomicI64;

/// A counter without padding. The four counters of an
/// [`UnpaddedQueue`](crate::mpmc::UnpaddedQueue) share one or two cache lines.
pub struct NotCachePaddedSequence(AtomicSequence);

impl Deref for NotCachePaddedSequence {
    type Target = AtomicSequence;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Default for NotCachePaddedSequence {
    fn default() -> Self {
        Self(AtomicSequence::new(0))
    }
}

/// The bound a counter layout satisfies to be used by a [`Queue`](crate::mpmc::Queue).
///
/// It is implemented for everything that dereferences to an [`AtomicSequence`]
/// and starts from zero by default.
pub trait SequenceCounter: Deref<Target = AtomicSequence> + Default {}

impl<C: Deref<Target = AtomicSequence> + Default> SequenceCounter for C {}
