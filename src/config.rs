/// Topology and batch sizing for one [`crate::status::AdmissibleStatus`] /
/// [`crate::core::AdmissionCore`] pair.
///
/// A `const fn` constructor asserts its invariants once, at construction
/// time, rather than checking them on every hot-path call.
#[derive(Debug, Clone, Copy)]
pub struct TopologyConfig {
    /// `N = 1 << nodes_shift` end-hosts in the scheduled region.
    pub nodes_shift: u8,
    /// `nodes_per_rack = 1 << nodes_per_rack_shift`.
    pub nodes_per_rack_shift: u8,
    /// `B = 1 << batch_shift` timeslots per batch.
    pub batch_shift: u8,
}

/// A handful of overflow bins beyond the `N * B` base grid, for entries
/// that would otherwise need a priority level with no assigned slot (e.g.
/// flows re-armed mid-batch).
pub const OVERFLOW_BIN_COUNT: usize = 4;

/// Reserved destination id meaning "exit the scheduled region". Chosen as `u32::MAX` so it never collides with a real `NodeId` for
/// any `nodes_shift <= 31`.
pub const OUT_OF_BOUNDARY_NODE_ID: u32 = u32::MAX;

impl TopologyConfig {
    /// Creates a new topology configuration.
    ///
    /// # Panics
    ///
    /// Panics if `nodes_shift` is 0 or greater than 20 (1M nodes max), if
    /// `nodes_per_rack_shift` is greater than `nodes_shift`, or if
    /// `batch_shift` is greater than 12 (4096 timeslots max).
    pub const fn new(nodes_shift: u8, nodes_per_rack_shift: u8, batch_shift: u8) -> Self {
        assert!(
            nodes_shift > 0 && nodes_shift <= 20,
            "nodes_shift must be between 1 and 20 (max 1M nodes)"
        );
        assert!(
            nodes_per_rack_shift <= nodes_shift,
            "nodes_per_rack_shift cannot exceed nodes_shift"
        );
        assert!(batch_shift <= 12, "batch_shift must be at most 12 (max 4096 timeslots)");

        Self {
            nodes_shift,
            nodes_per_rack_shift,
            batch_shift,
        }
    }

    /// `N`: number of end-hosts in the scheduled region.
    #[inline]
    pub const fn num_nodes(&self) -> u32 {
        1 << self.nodes_shift
    }

    /// Number of end-hosts per rack.
    #[inline]
    pub const fn nodes_per_rack(&self) -> u32 {
        1 << self.nodes_per_rack_shift
    }

    /// `R`: number of racks.
    #[inline]
    pub const fn num_racks(&self) -> u32 {
        self.num_nodes() >> self.nodes_per_rack_shift
    }

    /// `B`: timeslots per batch.
    #[inline]
    pub const fn batch_size(&self) -> u32 {
        1 << self.batch_shift
    }

    /// Capacity of a small (ingress) bin: `N`.
    #[inline]
    pub const fn small_bin_size(&self) -> usize {
        self.num_nodes() as usize
    }

    /// Capacity of a large (cascade) bin: `2 * N * B`. `in_bin` keeps at
    /// most one live entry per `(src, dst)` pair in the whole cascade at a
    /// time, but a single timeslot's bin can still accumulate every
    /// flow that has deferred onto it batch after batch before any of them
    /// clear their endpoint or rack conflict, so the cascade's worst case
    /// is sized against the full batch rather than a small constant
    /// multiple of `N`.
    #[inline]
    pub const fn large_bin_size(&self) -> usize {
        2 * self.num_nodes() as usize * self.batch_size() as usize
    }

    /// Bin pool size: two bins per timeslot (the batch currently in
    /// flight and the one being built behind it) plus a fixed overflow
    /// allotment for handle churn between `alloc`/`release` calls.
    #[inline]
    pub const fn num_bins(&self) -> usize {
        2 * self.batch_size() as usize + OVERFLOW_BIN_COUNT
    }

    /// Maps a node id to its rack id. Does not check `OUT_OF_BOUNDARY`.
    #[inline]
    pub const fn rack_of(&self, node: u32) -> u32 {
        node >> self.nodes_per_rack_shift
    }
}

impl Default for TopologyConfig {
    /// `N = 8`, one rack, `B = 8` — a small topology convenient for tests.
    fn default() -> Self {
        Self::new(3, 3, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_reference_scenarios() {
        let cfg = TopologyConfig::default();
        assert_eq!(cfg.num_nodes(), 8);
        assert_eq!(cfg.batch_size(), 8);
        assert_eq!(cfg.num_racks(), 1);
    }

    #[test]
    fn multi_rack_topology() {
        // N=128, R=4 racks of 32
        let cfg = TopologyConfig::new(7, 5, 3);
        assert_eq!(cfg.num_nodes(), 128);
        assert_eq!(cfg.nodes_per_rack(), 32);
        assert_eq!(cfg.num_racks(), 4);
        assert_eq!(cfg.rack_of(0), 0);
        assert_eq!(cfg.rack_of(32), 1);
        assert_eq!(cfg.rack_of(96), 3);
    }

    #[test]
    #[should_panic(expected = "nodes_shift must be")]
    fn rejects_zero_nodes_shift() {
        let _ = TopologyConfig::new(0, 0, 3);
    }
}
