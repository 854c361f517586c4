use crate::invariants::debug_assert_bin_not_over_capacity;
use crate::node::Node;

/// A single pending-demand entry as it flows through the bin cascade:
/// `(src, dst, metric)`. `metric` is the FIFO/SRJF ordering key
/// (see [`crate::metric`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemandEntry {
    pub src: Node,
    pub dst: Node,
    pub metric: u32,
    /// The backlog table's `reset_epoch[src]` value at the time this entry
    /// was placed in a bin. Compared against the live epoch at drain time
    /// to silently drop entries from a sender that has since reset.
    pub epoch_at_insert: u32,
}

/// Size class a [`Bin`] was allocated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinSizeClass {
    /// Capacity `N` — used for the ingress bin (newly non-empty flows).
    Small,
    /// Capacity `2*N*B` — used for the cascade bins.
    Large,
}

/// An append-only ordered multiset of demand entries waiting to be
/// considered in a specific future (timeslot, priority) slot.
///
/// Entries are stored densely in a `Vec` rather than `Box<[MaybeUninit<_>]>`
/// because, unlike `Ring<T>`, a bin's entries are removed from the middle
/// as often as from either end (drop/defer/admit during cascade
/// processing) — the fixed-capacity ring layout doesn't fit that access
/// pattern, so plain `Vec` truncation/retain is the right tool, reserved
/// up front to the size class's capacity so no further allocation happens
/// once the pool is warmed up.
#[derive(Debug, Clone)]
pub struct Bin {
    entries: Vec<DemandEntry>,
    size_class: BinSizeClass,
    capacity: usize,
}

impl Bin {
    /// Creates an empty bin of the given size class, pre-reserving its
    /// full capacity so `push` never triggers a reallocation.
    pub fn new(size_class: BinSizeClass, capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            size_class,
            capacity,
        }
    }

    pub fn size_class(&self) -> BinSizeClass {
        self.size_class
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Appends an entry at the tail without regard to ordering. Used
    /// directly by the pool's arena-initialization path and available for
    /// callers that don't need metric ordering; neither [`crate::metric::Fifo`]
    /// nor [`crate::metric::Srjf`] use this for cascade inserts (see
    /// [`Bin::insert_sorted`]) since two entries signaling in the same
    /// timeslot can tie on metric and still need a deterministic order.
    ///
    /// # Panics
    ///
    /// Panics if the bin is already full — bin overflow is a fatal
    /// sizing-contract violation here, not a recoverable condition.
    pub fn push_back(&mut self, entry: DemandEntry) {
        debug_assert_bin_not_over_capacity!(self.entries.len(), self.capacity);
        assert!(!self.is_full(), "bin overflow: sizing contract violated (capacity {})", self.capacity);
        self.entries.push(entry);
    }

    /// Inserts an entry at the position that keeps `entries` sorted
    /// ascending by `(metric, src, dst)` — both the FIFO and SRJF variants'
    /// ordering policy. Ties on `metric` alone are common (e.g. two flows
    /// signaling in the same timeslot, or two flows reset to zero backlog
    /// and re-requested in the same timeslot of a later batch) and are
    /// broken by `(src, dst)` so bin order is a pure function of bin
    /// contents, never of producer call order or urgent-ring drain order.
    /// O(n) in the worst case but bins are small relative to batch
    /// throughput and this amortizes the cost of a full per-timeslot sort.
    ///
    /// # Panics
    ///
    /// Panics if the bin is already full (see [`Bin::push_back`]).
    pub fn insert_sorted(&mut self, entry: DemandEntry) {
        debug_assert_bin_not_over_capacity!(self.entries.len(), self.capacity);
        assert!(!self.is_full(), "bin overflow: sizing contract violated (capacity {})", self.capacity);
        let key = (entry.metric, entry.src.0, entry.dst.0);
        let pos = self.entries.partition_point(|e| (e.metric, e.src.0, e.dst.0) <= key);
        self.entries.insert(pos, entry);
    }

    /// Iterates entries in storage order: ascending `(metric, src, dst)`
    /// for both policies (see [`Bin::insert_sorted`]).
    pub fn iter(&self) -> impl Iterator<Item = &DemandEntry> {
        self.entries.iter()
    }

    /// Drains all entries out of the bin, leaving it empty but keeping its
    /// allocated capacity — used at batch end, once a bin has been fully
    /// processed and is about to be returned to the pool.
    pub fn drain(&mut self) -> std::vec::Drain<'_, DemandEntry> {
        self.entries.drain(..)
    }

    /// Empties the bin without returning its contents (used once a bin's
    /// entries have all been individually consumed/redistributed).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(src: u32, dst: u32, metric: u32) -> DemandEntry {
        DemandEntry { src: Node(src), dst: Node(dst), metric, epoch_at_insert: 0 }
    }

    #[test]
    fn push_back_preserves_insertion_order() {
        let mut bin = Bin::new(BinSizeClass::Small, 4);
        bin.push_back(entry(0, 1, 5));
        bin.push_back(entry(2, 3, 1));
        let metrics: Vec<_> = bin.iter().map(|e| e.metric).collect();
        assert_eq!(metrics, vec![5, 1]);
    }

    #[test]
    fn insert_sorted_keeps_ascending_metric() {
        let mut bin = Bin::new(BinSizeClass::Small, 8);
        bin.insert_sorted(entry(0, 1, 5));
        bin.insert_sorted(entry(0, 2, 1));
        bin.insert_sorted(entry(0, 3, 3));
        let metrics: Vec<_> = bin.iter().map(|e| e.metric).collect();
        assert_eq!(metrics, vec![1, 3, 5]);
    }

    #[test]
    fn insert_sorted_breaks_metric_ties_by_src_then_dst_regardless_of_insertion_order() {
        let mut bin = Bin::new(BinSizeClass::Small, 8);
        bin.insert_sorted(entry(4, 5, 8));
        bin.insert_sorted(entry(3, 5, 8));
        let order: Vec<_> = bin.iter().map(|e| (e.src.0, e.dst.0)).collect();
        assert_eq!(order, vec![(3, 5), (4, 5)]);
    }

    #[test]
    #[should_panic(expected = "bin overflow")]
    fn overflow_panics() {
        let mut bin = Bin::new(BinSizeClass::Small, 1);
        bin.push_back(entry(0, 1, 0));
        bin.push_back(entry(0, 2, 0));
    }

    #[test]
    fn clear_empties_but_keeps_capacity() {
        let mut bin = Bin::new(BinSizeClass::Small, 4);
        bin.push_back(entry(0, 1, 0));
        bin.clear();
        assert!(bin.is_empty());
        assert_eq!(bin.capacity(), 4);
    }
}
