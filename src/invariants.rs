//! Debug assertion macros for the slot-version protocol invariants.
//!
//! These macros provide runtime checks for the core correctness properties of
//! the queue. They are only active in debug builds, so there is zero overhead
//! in release builds.

// =============================================================================
// INV-CNT-01: Bounded Count
// =============================================================================

/// Assert that the number of claimed-but-unconsumed sequence numbers never
/// exceeds capacity.
///
/// **Invariant**: `0 ≤ (tail - head) ≤ capacity`
///
/// Used in: `try_enqueue()` after winning the tail CAS
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "INV-CNT-01 violated: count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that head never advances past tail.
///
/// **Invariant**: `head ≤ tail` (a consumer can only claim published sequence
/// numbers, and publication requires a prior tail advance)
///
/// Used in: `try_dequeue()` after winning the head CAS
macro_rules! debug_assert_head_not_past_tail {
    ($new_head:expr, $tail:expr) => {
        debug_assert!(
            $new_head <= $tail,
            "INV-CNT-01 violated: head {} advanced beyond tail {}",
            $new_head,
            $tail
        )
    };
}

// =============================================================================
// INV-VER-01: Slot Version Cycle
// =============================================================================

/// Assert that a claimed slot still carries the expected version.
///
/// **Invariant**: for sequence `n` at index `n mod capacity`, the slot version
/// is exactly `n` when eligible for production and exactly `n + 1` when
/// eligible for consumption. Between winning the counter CAS and the release
/// store, no other thread may change the version.
///
/// Used in: `try_enqueue()` / `try_dequeue()` between claim and publish
macro_rules! debug_assert_slot_version {
    ($version:expr, $expected:expr) => {
        debug_assert!(
            $version == $expected,
            "INV-VER-01 violated: slot version {} while claimed for sequence {}",
            $version,
            $expected
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_slot_version;
