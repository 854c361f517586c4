use crate::node::Node;

/// Recoverable producer-side errors.
///
/// Pool exhaustion and bin overflow are deliberately **not** members of
/// this enum: both are treated as fatal invariant violations, so the
/// core panics at the violation site (via the `debug_assert_*!` macros
/// in [`crate::invariants`] plus an unconditional check) instead of
/// threading a `Result` through the hot loop for a condition that, by
/// construction, should never occur once sizing is correct.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterError {
    /// The urgent ring was still full after the producer's backoff budget
    /// was exhausted. The backlog table's `in_bin` bit remains set, so a
    /// later drain will still pick the flow up — this is surfaced so the
    /// caller can decide whether to retry the enqueue itself.
    #[error("urgent ring full, backlog signal for ({src}, {dst}) not enqueued")]
    Backpressure { src: Node, dst: Node },

    /// `add_backlog` would have overflowed `u32::MAX`; the demand counter
    /// was saturated at `u32::MAX` instead.
    #[error("demand for ({src}, {dst}) saturated at u32::MAX")]
    OverRequestSaturated { src: Node, dst: Node },
}
