//! Debug assertion macros for ring buffer and admission-core invariants.
//!
//! These macros provide runtime checks for the invariants this crate
//! depends on for soundness. They are only active in debug builds
//! (`#[cfg(debug_assertions)]`), so there is zero overhead in release builds.
//!
//! Used by `Ring<T>`, the backlog table, and the rack-capacity tracker.

// =============================================================================
// INV-SEQ-01: Bounded Count
// =============================================================================

/// Assert that count does not exceed capacity.
///
/// **Invariant**: `0 ≤ (tail - head) ≤ capacity`
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "INV-SEQ-01 violated: count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that head does not advance past tail.
///
/// **Invariant**: `head ≤ tail` (after advance)
macro_rules! debug_assert_head_not_past_tail {
    ($new_head:expr, $tail:expr) => {
        debug_assert!(
            $new_head <= $tail,
            "INV-SEQ-01 violated: advancing head {} beyond tail {}",
            $new_head,
            $tail
        )
    };
}

// =============================================================================
// INV-SEQ-02: Monotonic Progress
// =============================================================================

/// Assert that a sequence number only increases (monotonic progress).
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "INV-SEQ-02 violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-INIT-01: Initialized Range Check
// =============================================================================

/// Assert that we're reading from an initialized slot.
///
/// **Invariant**: `buffer[i] is initialized ⟺ head ≤ sequence(i) < tail`
macro_rules! debug_assert_initialized_read {
    ($pos:expr, $head:expr, $tail:expr) => {
        debug_assert!(
            $pos >= $head && $pos < $tail,
            "INV-INIT-01 violated: reading slot at seq {} outside initialized range [{}, {})",
            $pos,
            $head,
            $tail
        )
    };
}

// =============================================================================
// INV-BIN-01: Bin occupancy never exceeds its fixed capacity
// =============================================================================

/// Assert that a bin's entry count stays within its allocated capacity.
///
/// **Invariant**: pushing into a full bin is a sizing-contract violation.
macro_rules! debug_assert_bin_not_over_capacity {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "INV-BIN-01 violated: bin count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// INV-RACK-01: Rack counters never exceed the node count of a rack
// =============================================================================

/// Assert a per-timeslot rack counter stays within the rack's node count.
macro_rules! debug_assert_rack_count_sane {
    ($count:expr, $nodes_per_rack:expr) => {
        debug_assert!(
            $count <= $nodes_per_rack,
            "INV-RACK-01 violated: rack counter {} exceeds nodes-per-rack {}",
            $count,
            $nodes_per_rack
        )
    };
}

pub(crate) use debug_assert_bin_not_over_capacity;
pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_initialized_read;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_rack_count_sane;
