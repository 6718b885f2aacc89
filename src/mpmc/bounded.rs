//! This module provides the bounded multi-producer, multi-consumer queue.
//! Read more in [`Queue`].
use crate::backoff::Backoff;
use crate::capacity::Capacity;
use crate::error::ConfigResult;
use crate::loom_bindings::cell::UnsafeCell;
use crate::sequence::{
    AtomicSequence, CachePaddedSequence, NotCachePaddedSequence, Sequence, SequenceCounter,
};
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

// Implementation notes.
//
// The queue has no per-slot state. Four monotonic counters describe every slot:
//
//   consumer_barrier <= consumer_cursor <= producer_barrier <= producer_cursor
//
// A sequence `s` lives in slot `s & mask`. Sequences in
//   (producer_barrier, producer_cursor]  are reserved by producers and being written;
//   (consumer_cursor, producer_barrier]  are published and wait for a consumer;
//   (consumer_barrier, consumer_cursor]  are reserved by consumers and being read.
// Everything else is empty.
//
// A cursor is only ever moved by a CAS from `c` to `c + 1`, so every thread that wins
// it owns exactly one sequence and nobody else touches that slot until the matching
// barrier moves past it.
//
// A barrier is moved the same way, but a thread can only move it from the sequence
// *before* its own. That forces barriers to advance in reservation order: if the owner
// of `s` is slow, the owner of `s + 1` waits for it. Consumers compare against the
// producer barrier, so they never read a slot that is reserved but not written yet, and
// producers compare against the consumer barrier, so they never overwrite a slot that
// is reserved but not read yet.
//
// Memory ordering. The barrier CAS is `Release` and the opposite side loads the barrier
// with `Acquire`. Every later barrier CAS is a read-modify-write, so it continues the
// release sequence of the earlier ones: observing `producer_barrier >= s` makes the
// writes of *all* slots up to `s` visible, not only the last one. Cursors need nothing
// stronger than `Relaxed`: they only arbitrate ownership.
//
// Full and empty. The producer side refuses to reserve when
// `producer_cursor - consumer_barrier >= mask`, so at most `capacity - 1` sequences are
// ever in flight and the slot after the newest one is always free. Otherwise a full ring
// and an empty ring would have equal counters.

/// One cell of the ring. Initialized exactly for the sequences the counters mark as
/// reserved-and-written, published or reserved-by-consumer.
struct Slot<T> {
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// # Safety
    ///
    /// The caller owns the slot's sequence on the producer side and the slot is empty.
    #[inline(always)]
    unsafe fn write(&self, value: T) {
        self.value
            .with_mut(|ptr| unsafe { ptr.write(MaybeUninit::new(value)) });
    }

    /// # Safety
    ///
    /// The caller owns the slot's sequence on the consumer side and the slot is published.
    #[inline(always)]
    unsafe fn read(&self) -> T {
        self.value.with(|ptr| unsafe { (*ptr).assume_init_read() })
    }

    /// # Safety
    ///
    /// The slot holds a published value and no other thread can access the queue.
    unsafe fn drop_value(&self) {
        self.value
            .with_mut(|ptr| unsafe { (*ptr).assume_init_drop() });
    }
}

/// A bounded, lock-free, multi-producer, multi-consumer FIFO queue.
///
/// Any number of threads may call [`enqueue`](Queue::enqueue) and
/// [`dequeue`](Queue::dequeue) concurrently through a shared reference
/// (wrap the queue in an [`Arc`](std::sync::Arc) or borrow it from scoped threads).
/// Neither operation waits for space or for items: a full queue hands the value
/// back, an empty queue returns `None`. Retrying is up to the caller,
/// for example with a [`Backoff`].
///
/// A queue created with capacity `n` holds at most `n - 1` items.
///
/// The `Counter` parameter picks the memory layout of the four counters.
/// The default, [`CachePaddedSequence`], keeps every counter on its own cache line
/// so producers and consumers do not invalidate each other's lines.
/// [`UnpaddedQueue`] packs them tightly and saves some memory.
///
/// # Examples
///
/// ```
/// use lfring::Queue;
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(Queue::new(1024).unwrap());
///
/// let producers: Vec<_> = (0..4)
///     .map(|p| {
///         let queue = queue.clone();
///
///         thread::spawn(move || {
///             for i in 0..100 {
///                 let mut value = p * 100 + i;
///
///                 while let Err(rejected) = queue.enqueue(value) {
///                     value = rejected;
///                     thread::yield_now();
///                 }
///             }
///         })
///     })
///     .collect();
///
/// for producer in producers {
///     producer.join().unwrap();
/// }
///
/// let mut sum = 0;
/// while let Some(value) = queue.dequeue() {
///     sum += value;
/// }
///
/// assert_eq!(sum, (0..400).sum::<i32>());
/// ```
#[repr(C)]
pub struct Queue<T, Counter: SequenceCounter = CachePaddedSequence> {
    producer_cursor: Counter,
    producer_barrier: Counter,
    consumer_cursor: Counter,
    consumer_barrier: Counter,
    mask: Sequence,
    capacity: Capacity,
    slots: Box<[Slot<T>]>,
}

/// A [`Queue`] whose counters are not cache padded.
pub type UnpaddedQueue<T> = Queue<T, NotCachePaddedSequence>;

impl<T> Queue<T> {
    /// Creates a queue with `capacity` slots and cache-padded counters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`](crate::ConfigError::InvalidCapacity)
    /// if `capacity` is zero or not a power of two.
    ///
    /// # Examples
    ///
    /// ```
    /// use lfring::Queue;
    ///
    /// let queue = Queue::new(4).unwrap();
    ///
    /// assert_eq!(queue.dequeue(), None);
    /// assert_eq!(queue.enqueue(0), Ok(()));
    /// assert_eq!(queue.enqueue(1), Ok(()));
    /// assert_eq!(queue.enqueue(2), Ok(()));
    /// assert_eq!(queue.enqueue(3), Err(3)); // one slot always stays free
    /// assert_eq!(queue.dequeue(), Some(0));
    ///
    /// assert!(Queue::<u32>::new(3).is_err());
    /// ```
    pub fn new(capacity: usize) -> ConfigResult<Self> {
        Self::with_layout(capacity)
    }
}

impl<T, Counter: SequenceCounter> Queue<T, Counter> {
    /// Creates a queue with `capacity` slots and the `Counter` layout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`](crate::ConfigError::InvalidCapacity)
    /// if `capacity` is zero or not a power of two.
    ///
    /// # Examples
    ///
    /// ```
    /// use lfring::UnpaddedQueue;
    ///
    /// let queue: UnpaddedQueue<&str> = UnpaddedQueue::with_layout(2).unwrap();
    ///
    /// assert_eq!(queue.enqueue("a"), Ok(()));
    /// assert_eq!(queue.enqueue("b"), Err("b"));
    /// ```
    pub fn with_layout(capacity: usize) -> ConfigResult<Self> {
        Ok(Self::from_capacity(Capacity::new(capacity)?))
    }

    /// Creates a queue from an already validated [`Capacity`].
    #[allow(
        clippy::cast_possible_wrap,
        reason = "`Capacity` never exceeds `Sequence::MAX`"
    )]
    pub fn from_capacity(capacity: Capacity) -> Self {
        let slots = (0..capacity.get()).map(|_| Slot::new()).collect();

        log::debug!(
            "created mpmc queue: capacity={capacity}, usable={}, counter size={} bytes",
            capacity.usable(),
            size_of::<Counter>()
        );

        Self {
            producer_cursor: Counter::default(),
            producer_barrier: Counter::default(),
            consumer_cursor: Counter::default(),
            consumer_barrier: Counter::default(),
            mask: capacity.mask() as Sequence,
            capacity,
            slots,
        }
    }

    /// Returns the number of slots in the ring. It is always a power of two.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Returns how many items the queue can hold at once: `capacity - 1`.
    #[inline]
    pub fn usable_capacity(&self) -> usize {
        self.capacity.usable()
    }

    /// Returns the number of published items no consumer has reserved yet.
    ///
    /// Under concurrent use it is a snapshot that may be outdated on return.
    #[allow(
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation,
        reason = "the length is in `0..=mask`"
    )]
    pub fn len(&self) -> usize {
        let backoff = Backoff::new();

        loop {
            let consumer_cursor = self.consumer_cursor.load(Relaxed);
            let producer_barrier = self.producer_barrier.load(Relaxed);
            let len = producer_barrier - consumer_cursor;

            if (0..=self.mask).contains(&len) {
                return len as usize;
            }

            // Either load may be stale relative to the other, so the pair is
            // inconsistent. Try again.
            backoff.spin();
        }
    }

    /// Returns `true` if [`dequeue`](Queue::dequeue) would currently find nothing.
    ///
    /// Under concurrent use it is a snapshot that may be outdated on return.
    pub fn is_empty(&self) -> bool {
        let consumer_cursor = self.consumer_cursor.load(Relaxed);

        self.producer_barrier.load(Relaxed) == consumer_cursor
    }

    /// Returns `true` if [`enqueue`](Queue::enqueue) would currently be rejected.
    ///
    /// Under concurrent use it is a snapshot that may be outdated on return.
    pub fn is_full(&self) -> bool {
        let producer_cursor = self.producer_cursor.load(Relaxed);

        producer_cursor - self.consumer_barrier.load(Relaxed) >= self.mask
    }

    /// Pushes `value` to the back of the queue.
    ///
    /// Returns `Err(value)` without taking it if the queue is full. It never waits for
    /// space; it only spins while earlier producers finish publishing their own values.
    ///
    /// Values are delivered in the order in which their producers reserved a sequence.
    pub fn enqueue(&self, value: T) -> Result<(), T> {
        let backoff = Backoff::new();

        let reserved = loop {
            let producer_cursor = self.producer_cursor.load(Relaxed);
            // Pairs with the `Release` in `dequeue`: the slot we are about to
            // overwrite has been read.
            let consumer_barrier = self.consumer_barrier.load(Acquire);

            // Not `consumer_cursor`: a reserved slot may still be being read.
            if producer_cursor - consumer_barrier >= self.mask {
                return Err(value);
            }

            if self
                .producer_cursor
                .compare_exchange_weak(producer_cursor, producer_cursor + 1, Relaxed, Relaxed)
                .is_ok()
            {
                break producer_cursor;
            }

            backoff.spin();
        };

        unsafe { self.slot(reserved + 1).write(value) };

        Self::advance_barrier(&*self.producer_barrier, reserved, "producer");

        Ok(())
    }

    /// Pops the oldest value from the queue.
    ///
    /// Returns `None` if no value is published. It never waits for values; it only
    /// spins while earlier consumers finish reading their own values.
    pub fn dequeue(&self) -> Option<T> {
        let backoff = Backoff::new();

        let reserved = loop {
            let consumer_cursor = self.consumer_cursor.load(Relaxed);
            // Pairs with the `Release` in `enqueue`: the slot we are about to
            // read has been written.
            let producer_barrier = self.producer_barrier.load(Acquire);

            debug_assert!(producer_barrier >= consumer_cursor);

            // Not `producer_cursor`: a reserved slot may still be being written.
            if producer_barrier == consumer_cursor {
                return None;
            }

            if self
                .consumer_cursor
                .compare_exchange_weak(consumer_cursor, consumer_cursor + 1, Relaxed, Relaxed)
                .is_ok()
            {
                break consumer_cursor;
            }

            backoff.spin();
        };

        let value = unsafe { self.slot(reserved + 1).read() };

        Self::advance_barrier(&*self.consumer_barrier, reserved, "consumer");

        Some(value)
    }

    /// Moves `barrier` from `reserved` to `reserved + 1`, waiting for every earlier
    /// reservation on the same side to move it first.
    #[inline(always)]
    fn advance_barrier(barrier: &AtomicSequence, reserved: Sequence, side: &'static str) {
        let backoff = Backoff::new();
        let mut stall_reported = false;

        while barrier
            .compare_exchange_weak(reserved, reserved + 1, Release, Relaxed)
            .is_err()
        {
            if !stall_reported && backoff.is_completed() {
                stall_reported = true;

                log::trace!(
                    "{side} barrier stalled at {}: waiting for sequence {reserved} to complete",
                    barrier.load(Relaxed)
                );
            }

            backoff.snooze();
        }
    }

    #[inline(always)]
    #[allow(
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation,
        reason = "a masked sequence is a slot index"
    )]
    fn slot(&self, sequence: Sequence) -> &Slot<T> {
        &self.slots[(sequence & self.mask) as usize]
    }

    #[cfg(all(test, not(lfring_loom)))]
    pub(crate) fn counters(&self) -> [Sequence; 4] {
        [
            self.producer_cursor.load(Relaxed),
            self.producer_barrier.load(Relaxed),
            self.consumer_cursor.load(Relaxed),
            self.consumer_barrier.load(Relaxed),
        ]
    }
}

impl<T, Counter: SequenceCounter> fmt::Debug for Queue<T, Counter> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &self.capacity.get())
            .field("producer_cursor", &self.producer_cursor.load(Relaxed))
            .field("producer_barrier", &self.producer_barrier.load(Relaxed))
            .field("consumer_cursor", &self.consumer_cursor.load(Relaxed))
            .field("consumer_barrier", &self.consumer_barrier.load(Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T, Counter: SequenceCounter> Drop for Queue<T, Counter> {
    fn drop(&mut self) {
        // `&mut self`: no operation is in flight, every cursor equals its barrier.
        let consumer_barrier = self.consumer_barrier.load(Relaxed);
        let producer_barrier = self.producer_barrier.load(Relaxed);

        debug_assert_eq!(consumer_barrier, self.consumer_cursor.load(Relaxed));
        debug_assert_eq!(producer_barrier, self.producer_cursor.load(Relaxed));

        if producer_barrier == consumer_barrier {
            return;
        }

        log::trace!(
            "dropping {} unconsumed items with the queue",
            producer_barrier - consumer_barrier
        );

        for sequence in consumer_barrier + 1..=producer_barrier {
            unsafe { self.slot(sequence).drop_value() };
        }
    }
}

unsafe impl<T: Send, Counter: SequenceCounter + Send> Send for Queue<T, Counter> {}
unsafe impl<T: Send, Counter: SequenceCounter + Sync> Sync for Queue<T, Counter> {}

#[cfg(all(test, not(lfring_loom)))]
mod tests {
    use super::*;
    use crate::test_utils::init_logger;
    use crate::ConfigError;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_empty_then_fill_then_drain() {
        init_logger();

        let queue = Queue::new(4).unwrap();

        assert_eq!(queue.dequeue(), None);

        assert_eq!(queue.enqueue(0), Ok(()));
        assert_eq!(queue.enqueue(1), Ok(()));
        assert_eq!(queue.enqueue(2), Ok(()));
        assert_eq!(queue.enqueue(3), Err(3));

        assert_eq!(queue.dequeue(), Some(0));
        assert_eq!(queue.enqueue(3), Ok(()));

        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), Some(3));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_fill_drain_refill() {
        let queue = Queue::new(4).unwrap();

        assert_eq!(queue.enqueue(0), Ok(()));
        assert_eq!(queue.dequeue(), Some(0));

        assert_eq!(queue.enqueue(1), Ok(()));
        assert_eq!(queue.enqueue(2), Ok(()));
        assert_eq!(queue.enqueue(3), Ok(()));
        assert_eq!(queue.enqueue(4), Err(4));

        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.enqueue(5), Ok(()));

        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), Some(3));
        assert_eq!(queue.dequeue(), Some(5));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_invalid_capacities() {
        assert_eq!(
            Queue::<u8>::new(0).unwrap_err(),
            ConfigError::InvalidCapacity { requested: 0 }
        );
        assert_eq!(
            Queue::<u8>::new(3).unwrap_err(),
            ConfigError::InvalidCapacity { requested: 3 }
        );

        for capacity in [1, 2, 1024] {
            let queue = Queue::<u8>::new(capacity).unwrap();

            assert_eq!(queue.capacity(), capacity);
            assert_eq!(queue.usable_capacity(), capacity - 1);
        }
    }

    #[test]
    fn test_capacity_one_is_always_full_and_empty() {
        let queue = Queue::new(1).unwrap();

        assert!(queue.is_full());
        assert!(queue.is_empty());
        assert_eq!(queue.enqueue('x'), Err('x'));
        assert_eq!(queue.dequeue(), None);
        assert_eq!(queue.counters(), [0; 4]);
    }

    #[test]
    fn test_capacity_two_holds_one_item() {
        let queue: UnpaddedQueue<_> = UnpaddedQueue::with_layout(2).unwrap();

        for i in 0..10 {
            assert_eq!(queue.enqueue(i), Ok(()));
            assert!(queue.is_full());
            assert_eq!(queue.enqueue(i + 100), Err(i + 100));
            assert_eq!(queue.dequeue(), Some(i));
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn test_rejections_leave_counters_unchanged() {
        let queue = Queue::new(8).unwrap();
        let empty = queue.counters();

        assert_eq!(queue.dequeue(), None);
        assert_eq!(queue.counters(), empty);

        for i in 0..7 {
            queue.enqueue(i).unwrap();
        }

        let full = queue.counters();

        assert_eq!(full, [7, 7, 0, 0]);
        assert_eq!(queue.enqueue(7), Err(7));
        assert_eq!(queue.counters(), full);

        for i in 0..7 {
            assert_eq!(queue.dequeue(), Some(i));
        }

        assert_eq!(queue.counters(), [7; 4]);
    }

    #[test]
    fn test_len_is_empty_is_full() {
        let queue = Queue::new(4).unwrap();

        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
        assert!(!queue.is_full());

        queue.enqueue("a").unwrap();
        queue.enqueue("b").unwrap();

        assert_eq!(queue.len(), 2);
        assert!(!queue.is_empty());
        assert!(!queue.is_full());

        queue.enqueue("c").unwrap();

        assert_eq!(queue.len(), 3);
        assert!(queue.is_full());

        queue.dequeue().unwrap();

        assert_eq!(queue.len(), 2);
        assert!(!queue.is_full());
    }

    #[test]
    fn test_owned_payloads_wrap_around() {
        let queue = Queue::new(4).unwrap();

        for round in 0..10 {
            for i in 0..3 {
                queue.enqueue(format!("{round}-{i}")).unwrap();
            }

            for i in 0..3 {
                assert_eq!(queue.dequeue().as_deref(), Some(format!("{round}-{i}").as_str()));
            }
        }

        assert!(queue.is_empty());
    }

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_drop_releases_unconsumed_items() {
        init_logger();

        let drops = Arc::new(AtomicUsize::new(0));
        let queue = Queue::new(8).unwrap();

        // Move the window across the end of the ring first.
        for _ in 0..6 {
            queue.enqueue(DropCounter(drops.clone())).ok().unwrap();
            drop(queue.dequeue());
        }

        assert_eq!(drops.load(Ordering::Relaxed), 6);

        for _ in 0..5 {
            queue.enqueue(DropCounter(drops.clone())).ok().unwrap();
        }

        drop(queue.dequeue());
        assert_eq!(drops.load(Ordering::Relaxed), 7);

        drop(queue);
        assert_eq!(drops.load(Ordering::Relaxed), 11);
    }

    #[test]
    fn test_rejected_value_is_handed_back() {
        let drops = Arc::new(AtomicUsize::new(0));
        let queue = Queue::new(2).unwrap();

        queue.enqueue(DropCounter(drops.clone())).ok().unwrap();

        let rejected = queue.enqueue(DropCounter(drops.clone()));

        assert!(rejected.is_err());
        assert_eq!(drops.load(Ordering::Relaxed), 0);

        drop(rejected);
        assert_eq!(drops.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_debug_shows_counters() {
        let queue = Queue::new(4).unwrap();

        queue.enqueue(1).unwrap();

        assert_eq!(
            format!("{queue:?}"),
            "Queue { capacity: 4, producer_cursor: 1, producer_barrier: 1, \
             consumer_cursor: 0, consumer_barrier: 0, .. }"
        );
    }

    proptest! {
        #[test]
        fn test_queue_matches_bounded_fifo_model(
            shift in 0u32..5,
            ops in proptest::collection::vec(proptest::option::of(any::<u16>()), 0..256),
        ) {
            let capacity = 1usize << shift;
            let queue = Queue::new(capacity).unwrap();
            let mut model = VecDeque::new();

            for op in ops {
                let before = queue.counters();

                if let Some(value) = op {
                    let result = queue.enqueue(value);

                    if model.len() < capacity - 1 {
                        prop_assert_eq!(result, Ok(()));
                        model.push_back(value);
                    } else {
                        prop_assert_eq!(result, Err(value));
                        prop_assert_eq!(queue.counters(), before);
                    }
                } else {
                    let popped = queue.dequeue();

                    prop_assert_eq!(popped, model.pop_front());

                    if popped.is_none() {
                        prop_assert_eq!(queue.counters(), before);
                    }
                }

                prop_assert!(queue.len() <= capacity - 1);
                prop_assert_eq!(queue.len(), model.len());
                prop_assert_eq!(queue.is_empty(), model.is_empty());
                prop_assert_eq!(queue.is_full(), model.len() == capacity - 1);
            }
        }
    }
}
