use crate::config::TopologyConfig;
use crate::node::Node;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Per-(src,dst) demand counter plus the "already represented in some bin"
/// bit.
struct BacklogCell {
    demand: AtomicU32,
    in_bin: AtomicBool,
}

/// What the caller must do after a successful [`BacklogTable::add_backlog`].
pub struct AddBacklogOutcome {
    /// `true` ⇒ this call transitioned the flow from empty to non-empty;
    /// the caller (the ingress producer) must enqueue
    /// `(src, dst, metric_init)` onto the urgent ring before returning.
    pub signal: bool,
    /// Whether `demand` saturated at `u32::MAX` on this call rather than
    /// reflecting the full requested amount.
    pub saturated: bool,
}

/// The dense `N x N` backlog table. A hash map keyed by `(src, dst)` would
/// cost a hash per hot-path touch; at the target deployments' `N <= 1024`
/// the dense layout is at most a few MiB and wins on cache locality.
pub struct BacklogTable {
    num_nodes: u32,
    /// Row width: `num_nodes` real destinations plus one reserved column
    /// for `Node::OUT_OF_BOUNDARY`, so out-of-boundary demand gets its own
    /// counter instead of aliasing a real node's column.
    row_width: u32,
    cells: Vec<BacklogCell>,
    /// Reset epoch per sender. Bumped by `reset_sender`;
    /// compared against the epoch a bin entry was inserted under to
    /// silently drop stale entries.
    reset_epoch: Vec<AtomicU32>,
}

impl BacklogTable {
    pub fn new(cfg: &TopologyConfig) -> Self {
        let n = cfg.num_nodes();
        let row_width = n + 1;
        let cells = (0..(n as u64 * row_width as u64))
            .map(|_| BacklogCell { demand: AtomicU32::new(0), in_bin: AtomicBool::new(false) })
            .collect();
        let reset_epoch = (0..n).map(|_| AtomicU32::new(0)).collect();
        Self { num_nodes: n, row_width, cells, reset_epoch }
    }

    #[inline]
    fn index(&self, src: Node, dst: Node) -> usize {
        debug_assert!(!src.is_out_of_boundary());
        let dst_idx = if dst.is_out_of_boundary() { self.num_nodes } else { dst.0 };
        src.0 as usize * self.row_width as usize + dst_idx as usize
    }

    /// Current reset epoch for `src`.
    #[inline]
    pub fn epoch_of(&self, src: Node) -> u32 {
        self.reset_epoch[src.0 as usize].load(Ordering::Acquire)
    }

    /// Whether an entry inserted under `epoch_at_insert` is stale relative
    /// to `src`'s current epoch.
    #[inline]
    pub fn is_stale(&self, src: Node, epoch_at_insert: u32) -> bool {
        epoch_at_insert != self.epoch_of(src)
    }

    /// Current demand for `(src, dst)` (test/diagnostic use).
    pub fn demand(&self, src: Node, dst: Node) -> u32 {
        self.cells[self.index(src, dst)].demand.load(Ordering::Acquire)
    }

    /// Whether `(src, dst)` is currently represented in some bin.
    pub fn in_bin(&self, src: Node, dst: Node) -> bool {
        self.cells[self.index(src, dst)].in_bin.load(Ordering::Acquire)
    }

    /// Atomically adds `extra` to `(src, dst)`'s demand. Concurrency:
    /// this races with the core's `consume_one` on producer threads;
    /// `in_bin` is flipped with a compare-exchange so exactly one
    /// producer wins the `signal` obligation.
    pub fn add_backlog(&self, src: Node, dst: Node, extra: u32) -> AddBacklogOutcome {
        let cell = &self.cells[self.index(src, dst)];

        let mut saturated = false;
        let mut current = cell.demand.load(Ordering::Relaxed);
        loop {
            let new_val = current.checked_add(extra).unwrap_or_else(|| {
                saturated = true;
                u32::MAX
            });
            match cell.demand.compare_exchange_weak(current, new_val, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }

        // Only the transition false -> true yields the signal obligation.
        let signal = cell
            .in_bin
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok();

        AddBacklogOutcome { signal, saturated }
    }

    /// Decrements `(src, dst)`'s demand by one packet admitted. Returns
    /// the remaining demand and whether the flow is still represented in
    /// some bin (i.e. should be re-armed into a future bin).
    pub fn consume_one(&self, src: Node, dst: Node) -> (u32, bool) {
        let cell = &self.cells[self.index(src, dst)];
        let mut current = cell.demand.load(Ordering::Relaxed);
        loop {
            let new_val = current.saturating_sub(1);
            match cell.demand.compare_exchange_weak(current, new_val, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => {
                    if new_val == 0 {
                        cell.in_bin.store(false, Ordering::Release);
                        return (0, false);
                    }
                    return (new_val, true);
                }
                Err(observed) => current = observed,
            }
        }
    }

    /// Bumps `src`'s reset epoch and clears all `(src, *)` backlog.
    /// Entries already sitting in a bin under the old epoch are left
    /// alone — they are dropped lazily, the next time the core visits
    /// them, by `is_stale`, which is the eventually-consistent contract
    /// cancellation relies on.
    pub fn reset_sender(&self, src: Node) {
        self.reset_epoch[src.0 as usize].fetch_add(1, Ordering::AcqRel);
        let w = self.row_width as usize;
        let base = src.0 as usize * w;
        for cell in &self.cells[base..base + w] {
            cell.demand.store(0, Ordering::Release);
            cell.in_bin.store(false, Ordering::Release);
        }
    }
}
