use crate::invariants::{
    debug_assert_bounded_count, debug_assert_head_not_past_tail, debug_assert_slot_version,
};
use crate::QueueError;
use crossbeam_utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// This MPMC queue replaces per-slot locks with a per-slot sequence version.
// For ring index `i = n mod capacity`:
//
// - version == n              the slot is empty and eligible to receive the
//                             value for sequence n
// - version == n + 1          the slot holds the published value for
//                             sequence n, eligible for consumption
// - after consumption         version becomes n + capacity, which is exactly
//                             the eligibility value for the next production
//                             cycle at this index
//
// Slots are initialized once with `version[i] = i` and cycle forever.
//
// ## Memory Ordering Protocol
//
// **Producer (try_enqueue):**
// 1. Load `tail` with Relaxed (just this thread's guess at the next position)
// 2. Load slot version with Acquire; must equal `tail` or fail
// 3. CAS `tail -> tail + 1` with Relaxed; losing the race fails the call
// 4. Write the payload (plain write, protected by CAS exclusivity)
// 5. Store `tail + 1` into the version with Release (publishes the payload)
//
// **Consumer (try_dequeue):** the exact mirror against `head`, requiring
// version `head + 1` and retiring the slot with `head + capacity`.
//
// The Release store in step 5 pairs with the Acquire load in step 2 of a
// future operation on the same slot: for any single ring position the
// writes and reads form a strict happens-before chain, which is what makes
// the non-atomic payload access safe without a lock.
//
// ## Exclusivity Window
//
// A thread holds exclusive rights to a slot's payload strictly between
// winning the counter CAS and completing its release store. At all other
// times no thread has exclusive rights, and any thread may attempt to claim
// the slot once its version becomes eligible.
//
// ## Sequence Numbers
//
// `head` and `tail` are unbounded u64 sequence numbers, not wrapped indices.
// At 10 billion operations/second, u64 wrap takes ~58 years; wrap-around is
// treated as out of scope.
//
// =============================================================================

/// One fixed ring position, reused forever.
///
/// Padded to whole cache lines (`CachePadded` at the ring level) so adjacent
/// slots never share a line.
struct Slot<T> {
    /// Sequence version encoding write/read eligibility (see module header).
    version: AtomicU64,
    /// Payload; exclusively owned by whichever thread currently holds the
    /// claim on this slot, uninitialized otherwise.
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Bounded lock-free MPMC queue.
///
/// A fixed-capacity queue supporting many concurrent producers and many
/// concurrent consumers on the same instance. All operations take `&self`;
/// the queue is not `Clone`; share it behind an `Arc` (or borrow it with
/// scoped threads).
///
/// `try_enqueue` and `try_dequeue` never block and never spin internally: a
/// failure is deliberately ambiguous between "full/empty" and "lost a race
/// against a concurrent peer", and retrying is the caller's policy choice.
pub struct Queue<T> {
    /// Next sequence number to consume (CAS-claimed by consumers).
    head: CachePadded<AtomicU64>,
    /// Next sequence number to produce (CAS-claimed by producers).
    tail: CachePadded<AtomicU64>,
    /// Ring storage, allocated once at construction, never resized.
    ///
    /// `Box<[_]>` rather than `Vec<_>`: the size is fixed for the queue's
    /// entire lifetime and the intent is a single contiguous allocation.
    slots: Box<[CachePadded<Slot<T>>]>,
    /// Fixed capacity, immutable after construction. Kept as u64 so index
    /// math stays in sequence-number space.
    capacity: u64,
}

impl<T> std::fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

// Safety: the slot version protocol establishes a happens-before chain for
// every payload access, so the queue is Send + Sync whenever T can be sent
// between threads.
unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T> Queue<T> {
    /// Smallest supported capacity.
    ///
    /// At capacity 1 the version encoding degenerates: `n + 1` would mark a
    /// slot both "published for sequence n" and "eligible to produce sequence
    /// n + 1", letting a producer overwrite an unconsumed value.
    pub const MIN_CAPACITY: usize = 2;

    /// Creates a queue with the given fixed capacity.
    ///
    /// Every slot's version is initialized to its own index and both counters
    /// start at zero. Capacities below [`MIN_CAPACITY`] are rejected;
    /// allocation failure aborts (there is no degraded mode).
    ///
    /// Arbitrary capacities are supported otherwise; there is no power-of-two
    /// requirement.
    ///
    /// [`MIN_CAPACITY`]: Queue::MIN_CAPACITY
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        if capacity < Self::MIN_CAPACITY {
            return Err(QueueError::CapacityTooSmall {
                requested: capacity,
                min: Self::MIN_CAPACITY,
            });
        }

        let mut slots = Vec::with_capacity(capacity);
        for i in 0..capacity {
            slots.push(CachePadded::new(Slot {
                version: AtomicU64::new(i as u64),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            }));
        }

        Ok(Self {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            slots: slots.into_boxed_slice(),
            capacity: capacity as u64,
        })
    }

    // ---------------------------------------------------------------------
    // ACCESSORS
    // ---------------------------------------------------------------------

    /// Returns the fixed capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Returns the current number of items in the queue.
    ///
    /// A snapshot, not a synchronization point: under concurrency the value
    /// may be stale by the time it is observed.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.saturating_sub(head) as usize
    }

    /// Returns true if the queue is empty (snapshot semantics, see [`len`]).
    ///
    /// [`len`]: Queue::len
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the queue is full (snapshot semantics, see [`len`]).
    ///
    /// [`len`]: Queue::len
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    /// Returns the slot for a sequence number.
    #[inline]
    fn slot(&self, seq: u64) -> &Slot<T> {
        &self.slots[(seq % self.capacity) as usize]
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Attempts to enqueue a value without blocking.
    ///
    /// On failure the value is handed back. `Err` does not distinguish a
    /// structurally full queue from a lost CAS race against another producer;
    /// callers needing that distinction must add external bookkeeping.
    pub fn try_enqueue(&self, value: T) -> Result<(), T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let slot = self.slot(tail);

        // Not yet eligible for production: either the slot still holds an
        // unconsumed value, or (first cycle) the counter raced ahead of this
        // thread's view. Pairs with the Release store in try_dequeue.
        if slot.version.load(Ordering::Acquire) != tail {
            return Err(value);
        }

        // Race to claim this sequence number. Losing means another producer
        // advanced tail first.
        if self
            .tail
            .compare_exchange(tail, tail.wrapping_add(1), Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return Err(value);
        }

        // INV-VER-01: nothing may touch the version while we hold the claim
        debug_assert_slot_version!(slot.version.load(Ordering::Relaxed), tail);

        // INV-CNT-01: claimed sequence numbers never exceed capacity
        debug_assert_bounded_count!(
            tail.wrapping_add(1)
                .saturating_sub(self.head.load(Ordering::Relaxed)) as usize,
            self.capacity()
        );

        // SAFETY: winning the CAS grants exclusive, temporary ownership of
        // this slot's payload. No other producer can claim sequence `tail`
        // again, and no consumer reads the payload until the version becomes
        // `tail + 1`.
        unsafe {
            (*slot.value.get()).write(value);
        }

        // Publish. Pairs with the Acquire load in a future try_dequeue (or
        // try_enqueue, a full capacity cycle later), making the payload write
        // above visible to whichever thread observes this version. A Rust
        // move cannot fail or observably partially complete, so the payload
        // is always fully written before this store.
        slot.version.store(tail.wrapping_add(1), Ordering::Release);

        Ok(())
    }

    /// Enqueue with adaptive backoff. Spins, yields, then gives up.
    ///
    /// A convenience retry loop over [`try_enqueue`]; the value is handed
    /// back if the queue stays full (or contended) past the backoff budget.
    ///
    /// [`try_enqueue`]: Queue::try_enqueue
    pub fn enqueue_with_backoff(&self, value: T) -> Result<(), T> {
        let backoff = Backoff::new();
        let mut value = value;
        loop {
            match self.try_enqueue(value) {
                Ok(()) => return Ok(()),
                Err(v) => {
                    if backoff.is_completed() {
                        return Err(v);
                    }
                    value = v;
                    backoff.snooze();
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Attempts to dequeue a value without blocking.
    ///
    /// `None` does not distinguish a structurally empty queue from a lost CAS
    /// race against another consumer.
    pub fn try_dequeue(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);
        let slot = self.slot(head);

        // A published, unread value for this sequence carries version
        // `head + 1`. Anything else means empty from this thread's point of
        // view. Pairs with the Release store in try_enqueue, making the
        // producer's payload write visible below.
        if slot.version.load(Ordering::Acquire) != head.wrapping_add(1) {
            return None;
        }

        // Race to claim this sequence number against other consumers.
        if self
            .head
            .compare_exchange(head, head.wrapping_add(1), Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }

        // INV-VER-01: nothing may touch the version while we hold the claim
        debug_assert_slot_version!(slot.version.load(Ordering::Relaxed), head.wrapping_add(1));

        // INV-CNT-01: consumers only claim published sequence numbers
        debug_assert_head_not_past_tail!(
            head.wrapping_add(1),
            self.tail.load(Ordering::Relaxed)
        );

        // SAFETY: winning the CAS grants exclusive, temporary ownership of
        // this slot's payload, which the producer fully initialized before
        // its Release store (observed by the Acquire load above).
        let value = unsafe { (*slot.value.get()).assume_init_read() };

        // Retire the slot: `head + capacity` is exactly the eligibility
        // value for the next production cycle at this ring index.
        slot.version
            .store(head.wrapping_add(self.capacity), Ordering::Release);

        Some(value)
    }

    /// Dequeue with adaptive backoff. Spins, yields, then gives up.
    ///
    /// A convenience retry loop over [`try_dequeue`].
    ///
    /// [`try_dequeue`]: Queue::try_dequeue
    pub fn dequeue_with_backoff(&self) -> Option<T> {
        let backoff = Backoff::new();
        loop {
            if let Some(value) = self.try_dequeue() {
                return Some(value);
            }
            if backoff.is_completed() {
                return None;
            }
            backoff.snooze();
        }
    }
}

impl<T> Drop for Queue<T> {
    fn drop(&mut self) {
        // Drop all published-but-unconsumed values. `&mut self` guarantees
        // no operation is in flight, so every sequence in [head, tail) has
        // completed its publish.
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();

        let mut pos = head;
        while pos != tail {
            let slot = self.slot(pos);
            // SAFETY: the value for sequence `pos` was fully written by its
            // producer and never moved out by a consumer.
            unsafe {
                (*slot.value.get()).assume_init_drop();
            }
            pos = pos.wrapping_add(1);
        }
    }
}
