//! RingMPMC - Lock-Free Bounded Multi-Producer Multi-Consumer Queue
//!
//! A fixed-capacity MPMC queue where every ring slot carries its own sequence
//! version. The version encodes whether the slot is ready to be written or
//! ready to be read, replacing per-slot locks; two CAS-driven position
//! counters (`head`, `tail`) let exactly one thread claim each sequence
//! number.
//!
//! # Key Features
//!
//! - Cache-line padding on every slot and both counters (false sharing
//!   elimination via `crossbeam_utils::CachePadded`)
//! - Non-blocking `try_enqueue` / `try_dequeue` that never spin internally
//! - Adaptive backoff conveniences (spin → yield → give up)
//! - Arbitrary positive capacities (no power-of-two requirement)
//!
//! Progress is lock-free, not wait-free: some thread always completes, but
//! any individual thread may lose a race and have to retry.
//!
//! # Example
//!
//! ```
//! use ringmpmc::Queue;
//!
//! let queue = Queue::with_capacity(8).unwrap();
//!
//! // Non-blocking API: the value is handed back on failure.
//! assert!(queue.try_enqueue(42u64).is_ok());
//!
//! // Mirror side: `None` means empty or a lost race.
//! assert_eq!(queue.try_dequeue(), Some(42));
//! assert_eq!(queue.try_dequeue(), None);
//! ```

mod error;
mod invariants;
mod queue;

pub use error::QueueError;
pub use queue::Queue;
