use crate::admitted::AdmittedRecord;
use crate::bin::DemandEntry;
use crate::config::TopologyConfig;
use crate::metric::MetricPolicy;
use crate::metrics::{CoreMetrics, CoreMetricsSnapshot};
use crate::pool::{BinHandle, BinPool};
use crate::rack::BatchWindow;
use crate::status::AdmissibleStatus;
use tracing::{instrument, trace};

/// One worker's exclusively-owned admission state: the bin cascade, the bin
/// pool backing it, and the per-batch rack/endpoint accounting.
///
/// Multi-worker node-range partitioning (which `Node` range a given core
/// is responsible for) is an integration-layer concern the core's own
/// batch loop never needs to inspect, so it isn't threaded through here.
pub struct AdmissionCore<P: MetricPolicy> {
    cfg: TopologyConfig,
    policy: P,
    pool: BinPool,
    window: BatchWindow,
    /// Bin assigned to each timeslot `t` of the batch currently (or about
    /// to be) processed.
    current_bins: Vec<BinHandle>,
    /// Bins for the batch after this one: receives admissions that leave
    /// backlog behind (re-armed for the same timeslot, next batch) and
    /// deferrals that wrap past the last timeslot.
    next_bins: Vec<BinHandle>,
    initialized: bool,
    metrics: CoreMetrics,
}

impl<P: MetricPolicy> AdmissionCore<P> {
    /// Builds a core for the given topology and metric policy. The bin
    /// pool is allocated and fully populated here; `current_bins`/`next_bins` are lazily taken from
    /// it on the first `get_admissible_traffic` call.
    pub fn new(cfg: TopologyConfig, policy: P) -> Self {
        let pool = BinPool::new(&cfg);
        let window = BatchWindow::new(&cfg);
        Self {
            cfg,
            policy,
            pool,
            window,
            current_bins: Vec::new(),
            next_bins: Vec::new(),
            initialized: false,
            metrics: CoreMetrics::new(),
        }
    }

    pub fn metrics(&self) -> CoreMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Runs one full batch: `B` timeslots, each draining the urgent ring
    /// into that timeslot's bin, then walking the bin's entries in metric
    /// order and admitting/deferring/dropping each one. Pushes
    /// one [`AdmittedRecord`] per timeslot onto `status`'s admitted-out
    /// ring, in timeslot order, and sets `status`'s current timeslot
    /// counter to `first_timeslot` before the batch starts so FIFO's
    /// `metric_init` reflects real progress for any producer racing with
    /// this call.
    ///
    /// # Panics
    ///
    /// Panics if the bin pool is exhausted or a bin overflows — both are
    /// fatal sizing-contract violations, not conditions this
    /// loop can recover from.
    #[instrument(skip(self, status), fields(batch_size = self.cfg.batch_size()))]
    pub fn get_admissible_traffic(&mut self, status: &AdmissibleStatus<P>, first_timeslot: u32) {
        let b = self.cfg.batch_size() as usize;
        self.window.reset();
        status.set_current_timeslot(first_timeslot);

        if !self.initialized {
            self.current_bins = (0..b).map(|_| self.pool.alloc()).collect();
            self.initialized = true;
        }
        self.next_bins = (0..b).map(|_| self.pool.alloc()).collect();

        let rack_capacity = status.rack_capacity();
        let oob_capacity = status.out_of_boundary_capacity();
        let oversubscribed = status.oversubscribed();

        for t in 0..b {
            self.drain_urgent_into(status, t);
            let record = self.process_timeslot(status, t, rack_capacity, oob_capacity, oversubscribed);
            let ok = status.q_admitted_out().enqueue(record);
            assert!(ok, "admitted-out ring undersized: consumer is not keeping up with batch production");
            self.pool.release(self.current_bins[t]);
            status.advance_timeslot();
        }

        self.current_bins = std::mem::take(&mut self.next_bins);
        self.metrics.record_batch_completed();
    }

    /// Drains every entry currently queued on the urgent ring into
    /// timeslot `t`'s bin — on a single-consumer ring that's exactly
    /// "whatever was pushed since the last drain".
    fn drain_urgent_into(&mut self, status: &AdmissibleStatus<P>, t: usize) {
        while let Some(entry) = status.q_urgent().dequeue() {
            self.policy.insert(self.pool.get_mut(self.current_bins[t]), entry);
        }
    }

    /// Walks timeslot `t`'s bin in metric order, admitting, deferring, or
    /// dropping each entry.
    fn process_timeslot(
        &mut self,
        status: &AdmissibleStatus<P>,
        t: usize,
        rack_capacity: u16,
        oob_capacity: u16,
        oversubscribed: bool,
    ) -> AdmittedRecord {
        let b = self.cfg.batch_size() as usize;
        let entries: Vec<DemandEntry> = self.pool.get_mut(self.current_bins[t]).drain().collect();
        let mut record = AdmittedRecord::with_capacity(self.cfg.num_nodes() as usize);
        // Both a deferral and a post-admit re-arm with remaining backlog move
        // an entry to "the next timeslot": `t+1` within this batch, or
        // `next_bins[0]` when `t` is the batch's last timeslot. Computed once
        // since it does not depend on the entry being processed.
        let next_slot_handle = if t + 1 < b { self.current_bins[t + 1] } else { self.next_bins[0] };

        for entry in entries {
            if status.backlog().is_stale(entry.src, entry.epoch_at_insert)
                || !status.backlog().in_bin(entry.src, entry.dst)
                || status.backlog().demand(entry.src, entry.dst) == 0
            {
                self.metrics.record_dropped_stale();
                trace!(src = %entry.src, dst = %entry.dst, "dropping stale entry");
                continue;
            }

            let is_oob = entry.dst.is_out_of_boundary();
            let src_rack = entry.src.rack(&self.cfg);

            let src_blocked = self.window.is_src_used(t, entry.src.0)
                || (rack_capacity > 0 && self.window.src_rack_count(t, src_rack) >= rack_capacity);

            let dst_blocked = if is_oob {
                oversubscribed && self.window.out_of_boundary_count(t) >= oob_capacity
            } else {
                let dst_rack = entry.dst.rack(&self.cfg);
                self.window.is_dst_used(t, entry.dst.0)
                    || (rack_capacity > 0 && self.window.dst_rack_count(t, dst_rack) >= rack_capacity)
            };

            if src_blocked || dst_blocked {
                self.metrics.record_defer();
                self.policy.insert(self.pool.get_mut(next_slot_handle), entry);
                continue;
            }

            record.push(entry.src, entry.dst);
            let dst_rack = if is_oob { None } else { Some(entry.dst.rack(&self.cfg)) };
            self.window.mark_admitted(t, entry.src.0, entry.dst.0, src_rack, dst_rack);
            self.metrics.record_admit();

            let (remaining, still_in_bin) = status.backlog().consume_one(entry.src, entry.dst);
            if still_in_bin {
                let metric = self.policy.metric_after_admit(entry.metric, remaining);
                let rearmed = DemandEntry { metric, ..entry };
                self.policy.insert(self.pool.get_mut(next_slot_handle), rearmed);
            }
        }

        record
    }
}
