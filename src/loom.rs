//! Model-checks the queue protocol with `loom`.
//!
//! Run with `RUSTFLAGS="--cfg lfring_loom" cargo test --release --lib loom`.
use crate::mpmc::Queue;
use loom::sync::Arc;
use loom::thread;

fn model(f: impl Fn() + Sync + Send + 'static) {
    let mut builder = loom::model::Builder::new();

    builder.preemption_bound = Some(3);
    builder.check(f);
}

fn enqueue_spinning(queue: &Queue<usize>, mut value: usize) {
    while let Err(rejected) = queue.enqueue(value) {
        value = rejected;

        thread::yield_now();
    }
}

fn dequeue_spinning(queue: &Queue<usize>) -> usize {
    loop {
        if let Some(value) = queue.dequeue() {
            return value;
        }

        thread::yield_now();
    }
}

#[test]
fn loom_spsc_preserves_order() {
    model(|| {
        let queue = Arc::new(Queue::new(4).unwrap());
        let producer_queue = queue.clone();

        let producer = thread::spawn(move || {
            for i in 0..3 {
                enqueue_spinning(&producer_queue, i);
            }
        });

        let received: Vec<_> = (0..3).map(|_| dequeue_spinning(&queue)).collect();

        producer.join().unwrap();

        assert_eq!(received, [0, 1, 2]);
        assert_eq!(queue.dequeue(), None);
    });
}

#[test]
fn loom_spsc_full_boundary() {
    model(|| {
        // One usable slot: the producer has to wait for the consumer's release.
        let queue = Arc::new(Queue::new(2).unwrap());
        let producer_queue = queue.clone();

        let producer = thread::spawn(move || {
            enqueue_spinning(&producer_queue, 1);
            enqueue_spinning(&producer_queue, 2);
        });

        assert_eq!(dequeue_spinning(&queue), 1);
        assert_eq!(dequeue_spinning(&queue), 2);

        producer.join().unwrap();
    });
}

#[test]
fn loom_mpsc_publishes_every_value() {
    model(|| {
        let queue = Arc::new(Queue::new(4).unwrap());

        let producers: Vec<_> = (1..=2)
            .map(|value| {
                let queue = queue.clone();

                thread::spawn(move || enqueue_spinning(&queue, value))
            })
            .collect();

        let mut received = [dequeue_spinning(&queue), dequeue_spinning(&queue)];

        for producer in producers {
            producer.join().unwrap();
        }

        received.sort_unstable();

        assert_eq!(received, [1, 2]);
        assert!(queue.is_empty());
    });
}

#[test]
fn loom_mpmc_no_loss_no_duplication() {
    model(|| {
        let queue = Arc::new(Queue::new(2).unwrap());

        let producers: Vec<_> = (1..=2)
            .map(|value| {
                let queue = queue.clone();

                thread::spawn(move || enqueue_spinning(&queue, value))
            })
            .collect();

        let consumer_queue = queue.clone();
        let consumer = thread::spawn(move || dequeue_spinning(&consumer_queue));

        let mine = dequeue_spinning(&queue);

        for producer in producers {
            producer.join().unwrap();
        }

        let mut received = [mine, consumer.join().unwrap()];

        received.sort_unstable();

        assert_eq!(received, [1, 2]);
        assert_eq!(queue.dequeue(), None);
    });
}

#[test]
fn loom_len_stays_within_capacity() {
    model(|| {
        let queue = Arc::new(Queue::new(4).unwrap());
        let producer_queue = queue.clone();
        let consumer_queue = queue.clone();

        let producer = thread::spawn(move || {
            enqueue_spinning(&producer_queue, 1);
            enqueue_spinning(&producer_queue, 2);
        });
        let consumer = thread::spawn(move || dequeue_spinning(&consumer_queue));

        // The consumer cursor may be observed ahead of a stale producer barrier.
        for _ in 0..2 {
            assert!(queue.len() <= queue.usable_capacity());
        }

        producer.join().unwrap();
        assert_eq!(consumer.join().unwrap(), 1);
        assert_eq!(queue.len(), 1);
    });
}

#[test]
fn loom_drop_releases_leftovers() {
    model(|| {
        let queue = Arc::new(Queue::new(4).unwrap());
        let producer_queue = queue.clone();

        let producer = thread::spawn(move || {
            enqueue_spinning(&producer_queue, 1);
            enqueue_spinning(&producer_queue, 2);
        });

        // Whatever is left is dropped by the last `Arc`.
        let _ = queue.dequeue();

        producer.join().unwrap();
    });
}
