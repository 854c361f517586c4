use crate::bin::{Bin, BinSizeClass};
use crate::config::TopologyConfig;
use crate::ring::Ring;

/// A handle into [`BinPool`]'s arena. Bins are exclusively owned by
/// whichever of {pool, a core's cascade} currently holds the handle —
/// exactly one of those holds a given handle at any time, which is the
/// pipeline's central invariant.
pub type BinHandle = usize;

/// A pool of pre-allocated large bins, circulated through a free-list
/// ring. No bin is ever freed during steady state; lifetime is
/// implicit in whether a handle currently sits in `free` or in a core's
/// cascade.
pub struct BinPool {
    arena: Vec<Bin>,
    free: Ring<BinHandle>,
}

impl BinPool {
    /// Allocates `cfg.num_bins()` large bins and enqueues all of their
    /// handles onto the free ring.
    pub fn new(cfg: &TopologyConfig) -> Self {
        let n = cfg.num_bins();
        let arena: Vec<Bin> = (0..n).map(|_| Bin::new(BinSizeClass::Large, cfg.large_bin_size())).collect();
        let free = Ring::new(n.next_power_of_two().max(1));
        for handle in 0..n {
            let ok = free.enqueue(handle);
            debug_assert!(ok, "free ring undersized for pool capacity");
        }
        Self { arena, free }
    }

    /// Takes a bin handle from the pool.
    ///
    /// # Panics
    ///
    /// Panics if the pool is exhausted — pool exhaustion is a fatal
    /// invariant violation (bins leaked), not a recoverable condition
    /// the core can defer or retry around.
    pub fn alloc(&self) -> BinHandle {
        self.free.dequeue().expect("bin pool exhausted: invariant violation, bins leaked")
    }

    /// Returns a handle to the pool, clearing its bin first. Called once
    /// a bin has been fully processed at batch end.
    pub fn release(&mut self, handle: BinHandle) {
        self.arena[handle].clear();
        let ok = self.free.enqueue(handle);
        debug_assert!(ok, "free ring undersized for pool capacity");
    }

    #[inline]
    pub fn get_mut(&mut self, handle: BinHandle) -> &mut Bin {
        &mut self.arena[handle]
    }

    #[inline]
    pub fn get(&self, handle: BinHandle) -> &Bin {
        &self.arena[handle]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_release_roundtrip() {
        let cfg = TopologyConfig::default();
        let mut pool = BinPool::new(&cfg);
        let h = pool.alloc();
        pool.get_mut(h).push_back(crate::bin::DemandEntry {
            src: crate::node::Node(0),
            dst: crate::node::Node(1),
            metric: 0,
            epoch_at_insert: 0,
        });
        assert_eq!(pool.get(h).len(), 1);
        pool.release(h);
        assert_eq!(pool.get(h).len(), 0);
    }

    #[test]
    #[should_panic(expected = "bin pool exhausted")]
    fn exhaustion_is_fatal() {
        let cfg = TopologyConfig::default();
        let pool = BinPool::new(&cfg);
        for _ in 0..cfg.num_bins() {
            pool.alloc();
        }
        pool.alloc();
    }
}
