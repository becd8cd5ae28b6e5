use thiserror::Error;

/// Error types for queue construction.
///
/// The steady-state operations do not use this type: `try_enqueue` hands the
/// value back on failure and `try_dequeue` returns `None`, deliberately not
/// distinguishing "structurally full/empty" from "lost a CAS race".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The requested capacity is below the supported minimum.
    ///
    /// Zero slots cannot hold anything, and at exactly one slot the version
    /// encoding is ambiguous: the publication marker for sequence `n`
    /// (`n + 1`) coincides with the production-eligibility marker for
    /// sequence `n + 1`, so a second producer would overwrite an unconsumed
    /// value and the consumer would stall forever.
    #[error("capacity {requested} is below the minimum of {min}")]
    CapacityTooSmall {
        /// The capacity that was requested.
        requested: usize,
        /// The smallest capacity the version protocol supports.
        min: usize,
    },
}
