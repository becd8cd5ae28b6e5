//! Integration tests for the bounded MPMC queue.
//!
//! Single-threaded tests pin down the structural behavior (capacity bound,
//! FIFO order, slot recycling); the threaded tests check the lock-free
//! guarantees that matter under contention: no loss, no duplication, and
//! exactly one claimant per sequence number.

use ringmpmc::Queue;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// The concrete capacity-4 scenario: fill with A-D, overflow with E, drain
/// interleaved with a refill.
#[test]
fn capacity_four_scenario() {
    let queue = Queue::with_capacity(4).unwrap();

    for c in ['A', 'B', 'C', 'D'] {
        assert!(queue.try_enqueue(c).is_ok());
    }

    // Full: E is rejected and the contents are untouched.
    assert_eq!(queue.try_enqueue('E'), Err('E'));
    assert_eq!(queue.len(), 4);

    assert_eq!(queue.try_dequeue(), Some('A'));

    // One slot freed: E now fits.
    assert!(queue.try_enqueue('E').is_ok());

    assert_eq!(queue.try_dequeue(), Some('B'));
    assert_eq!(queue.try_dequeue(), Some('C'));
    assert_eq!(queue.try_dequeue(), Some('D'));
    assert_eq!(queue.try_dequeue(), Some('E'));
    assert_eq!(queue.try_dequeue(), None);
}

#[test]
fn exactly_capacity_enqueues_succeed() {
    for capacity in [2, 3, 8, 17, 64] {
        let queue = Queue::with_capacity(capacity).unwrap();

        for i in 0..capacity {
            assert!(
                queue.try_enqueue(i).is_ok(),
                "enqueue {} of {} failed",
                i,
                capacity
            );
        }
        assert_eq!(queue.try_enqueue(usize::MAX), Err(usize::MAX));
        assert_eq!(queue.len(), capacity);
    }
}

/// Producer and consumer on separate threads: values come out in exactly the
/// order they went in.
#[test]
fn spsc_fifo_across_threads() {
    const COUNT: u64 = 100_000;

    let queue = Arc::new(Queue::with_capacity(64).unwrap());
    let producer_queue = Arc::clone(&queue);

    let producer = thread::spawn(move || {
        for i in 0..COUNT {
            let mut value = i;
            loop {
                match producer_queue.try_enqueue(value) {
                    Ok(()) => break,
                    Err(v) => {
                        value = v;
                        std::hint::spin_loop();
                    }
                }
            }
        }
    });

    let mut expected = 0u64;
    while expected < COUNT {
        if let Some(value) = queue.try_dequeue() {
            assert_eq!(value, expected, "FIFO order violated");
            expected += 1;
        } else {
            std::hint::spin_loop();
        }
    }

    producer.join().unwrap();
    assert!(queue.is_empty());
}

/// P producers each enqueue a distinct multiset; C consumers drain until every
/// value has been claimed. The union of the outputs must equal the union of
/// the inputs, each value exactly once.
#[test]
fn mpmc_no_loss_no_duplication() {
    const PRODUCERS: u64 = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: u64 = 10_000;
    const TOTAL: usize = (PRODUCERS * PER_PRODUCER) as usize;

    let queue = Arc::new(Queue::with_capacity(128).unwrap());
    let consumed_total = Arc::new(AtomicUsize::new(0));

    let mut producers = Vec::new();
    for producer_id in 0..PRODUCERS {
        let queue = Arc::clone(&queue);
        producers.push(thread::spawn(move || {
            for seq in 0..PER_PRODUCER {
                // Tag each payload with its origin and intended order.
                let mut value = (producer_id << 32) | seq;
                loop {
                    match queue.try_enqueue(value) {
                        Ok(()) => break,
                        Err(v) => {
                            value = v;
                            std::hint::spin_loop();
                        }
                    }
                }
            }
        }));
    }

    let mut consumers = Vec::new();
    for _ in 0..CONSUMERS {
        let queue = Arc::clone(&queue);
        let consumed_total = Arc::clone(&consumed_total);
        consumers.push(thread::spawn(move || {
            let mut local = Vec::new();
            while consumed_total.load(Ordering::Relaxed) < TOTAL {
                if let Some(value) = queue.try_dequeue() {
                    consumed_total.fetch_add(1, Ordering::Relaxed);
                    local.push(value);
                } else {
                    std::hint::spin_loop();
                }
            }
            local
        }));
    }

    for p in producers {
        p.join().unwrap();
    }

    let per_consumer: Vec<Vec<u64>> = consumers.into_iter().map(|c| c.join().unwrap()).collect();

    // Values a single consumer receives from a single producer arrive in that
    // producer's enqueue order: later enqueues occupy later sequence numbers,
    // and one consumer's successive claims have increasing sequence numbers.
    for received in &per_consumer {
        let mut last_seq = vec![None::<u64>; PRODUCERS as usize];
        for value in received {
            let producer_id = (value >> 32) as usize;
            let seq = value & 0xFFFF_FFFF;
            if let Some(prev) = last_seq[producer_id] {
                assert!(
                    seq > prev,
                    "per-producer order violated: {} after {}",
                    seq,
                    prev
                );
            }
            last_seq[producer_id] = Some(seq);
        }
    }

    // No loss, no duplication.
    let mut all: Vec<u64> = per_consumer.into_iter().flatten().collect();
    assert_eq!(all.len(), TOTAL);
    let unique: HashSet<u64> = all.iter().copied().collect();
    assert_eq!(unique.len(), TOTAL, "duplicated value observed");

    all.sort_unstable();
    let mut expected: Vec<u64> = (0..PRODUCERS)
        .flat_map(|p| (0..PER_PRODUCER).map(move |s| (p << 32) | s))
        .collect();
    expected.sort_unstable();
    assert_eq!(all, expected);

    assert!(queue.is_empty());
}

/// Two producers hammering a full queue must not disturb its contents.
#[test]
fn contended_enqueue_on_full_queue_is_harmless() {
    let queue = Arc::new(Queue::with_capacity(4).unwrap());
    for i in 0..4u64 {
        assert!(queue.try_enqueue(i).is_ok());
    }

    let mut handles = Vec::new();
    for _ in 0..2 {
        let queue = Arc::clone(&queue);
        handles.push(thread::spawn(move || {
            for _ in 0..1_000 {
                assert!(queue.try_enqueue(u64::MAX).is_err());
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    for i in 0..4u64 {
        assert_eq!(queue.try_dequeue(), Some(i));
    }
    assert_eq!(queue.try_dequeue(), None);
}

/// Non-Copy payloads move through the queue intact.
#[test]
fn string_payloads_round_trip() {
    let queue = Queue::with_capacity(8).unwrap();

    for i in 0..8 {
        assert!(queue.try_enqueue(format!("message-{i}")).is_ok());
    }
    for i in 0..8 {
        assert_eq!(queue.try_dequeue().as_deref(), Some(format!("message-{i}").as_str()));
    }
}
