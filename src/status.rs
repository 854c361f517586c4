use crate::backlog::BacklogTable;
use crate::bin::DemandEntry;
use crate::config::TopologyConfig;
use crate::error::ArbiterError;
use crate::metric::MetricPolicy;
use crate::node::Node;
use crate::ring::Ring;
use std::sync::atomic::{AtomicU32, Ordering};

/// The state shared between ingress producers and the admission core
///: the backlog table, the urgent ring, and
/// the outbound admitted-traffic ring. Everything the core owns
/// exclusively — the bin cascade, the pool, the per-batch rack window —
/// lives on [`crate::core::AdmissionCore`] instead.
///
/// Generic over `P` purely so `add_backlog` can compute `metric_init`
/// without the core having to reach back into `Status` on every insert;
/// `P` is a zero-sized policy type (`Fifo`/`Srjf`), so this costs nothing
/// at runtime.
pub struct AdmissibleStatus<P: MetricPolicy> {
    cfg: TopologyConfig,
    backlog: BacklogTable,
    q_urgent: Ring<DemandEntry>,
    q_admitted_out: Ring<crate::admitted::AdmittedRecord>,
    current_timeslot: AtomicU32,
    /// Max endpoints of a given rack usable as a source (or destination)
    /// in one timeslot. `0` disables the rack-capacity check entirely,
    /// leaving only the existing per-node uniqueness constraint.
    rack_capacity: u16,
    out_of_boundary_capacity: u16,
    /// Whether `out_of_boundary_capacity` is enforced at all. `false`
    /// (the common default) admits `OUT_OF_BOUNDARY` traffic
    /// unconditionally once both real endpoints clear their own checks;
    /// `true` caps it like a rack.
    oversubscribed: bool,
    policy: P,
}

impl<P: MetricPolicy> AdmissibleStatus<P> {
    /// Builds a fresh status over the given topology, policy, and
    /// pre-sized rings.
    ///
    /// No separate "head token" sentinel circulates on the urgent ring
    /// to mark drain progress: with a single SPSC consumer, a
    /// non-blocking drain of everything currently queued already yields
    /// exactly "whatever was pushed since the last drain."
    pub fn new(
        cfg: TopologyConfig,
        policy: P,
        rack_capacity: u16,
        out_of_boundary_capacity: u16,
        oversubscribed: bool,
        q_urgent: Ring<DemandEntry>,
        q_admitted_out: Ring<crate::admitted::AdmittedRecord>,
    ) -> Self {
        Self {
            backlog: BacklogTable::new(&cfg),
            cfg,
            q_urgent,
            q_admitted_out,
            current_timeslot: AtomicU32::new(0),
            rack_capacity,
            out_of_boundary_capacity,
            oversubscribed,
            policy,
        }
    }

    #[inline]
    pub fn rack_capacity(&self) -> u16 {
        self.rack_capacity
    }

    #[inline]
    pub fn out_of_boundary_capacity(&self) -> u16 {
        self.out_of_boundary_capacity
    }

    #[inline]
    pub fn oversubscribed(&self) -> bool {
        self.oversubscribed
    }

    #[inline]
    pub(crate) fn backlog(&self) -> &BacklogTable {
        &self.backlog
    }

    #[inline]
    pub(crate) fn q_urgent(&self) -> &Ring<DemandEntry> {
        &self.q_urgent
    }

    #[inline]
    pub(crate) fn q_admitted_out(&self) -> &Ring<crate::admitted::AdmittedRecord> {
        &self.q_admitted_out
    }

    #[inline]
    pub(crate) fn set_current_timeslot(&self, t: u32) {
        self.current_timeslot.store(t, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn advance_timeslot(&self) {
        self.current_timeslot.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn current_timeslot(&self) -> u32 {
        self.current_timeslot.load(Ordering::Relaxed)
    }

    /// Adds `extra` units of demand from `src` to `dst`. On a zero-to-non-zero transition, computes
    /// `metric_init` and pushes `(src, dst, metric)` onto the urgent ring
    /// with backoff; if the ring is still full after the
    /// backoff budget, returns [`ArbiterError::Backpressure`] — the
    /// backlog entry itself is unaffected, only the signal delivery failed.
    pub fn add_backlog(&self, src: Node, dst: Node, extra: u32) -> Result<(), ArbiterError> {
        let outcome = self.backlog.add_backlog(src, dst, extra);

        if outcome.signal {
            let metric = self.policy.metric_init(self.current_timeslot(), extra);
            let epoch_at_insert = self.backlog.epoch_of(src);
            let entry = DemandEntry { src, dst, metric, epoch_at_insert };
            if !self.q_urgent.push_with_backoff(entry) {
                return Err(ArbiterError::Backpressure { src, dst });
            }
        }

        if outcome.saturated {
            return Err(ArbiterError::OverRequestSaturated { src, dst });
        }

        Ok(())
    }

    /// Cancels all outstanding demand from `src`. Entries
    /// already in a bin are left to be dropped lazily by the core the next
    /// time it visits them.
    pub fn reset_sender(&self, src: Node) {
        self.backlog.reset_sender(src);
    }

    /// Pops the next completed timeslot's admitted-traffic record, or
    /// `None` if the core hasn't produced one yet.
    pub fn dequeue_admitted_traffic(&self) -> Option<crate::admitted::AdmittedRecord> {
        self.q_admitted_out.dequeue()
    }

    #[inline]
    pub fn topology(&self) -> &TopologyConfig {
        &self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Fifo;

    fn status() -> AdmissibleStatus<Fifo> {
        let cfg = TopologyConfig::default();
        AdmissibleStatus::new(cfg, Fifo, 0, 0, false, Ring::new(64), Ring::new(64))
    }

    #[test]
    fn add_backlog_signals_urgent_ring_on_first_request() {
        let s = status();
        s.add_backlog(Node(0), Node(1), 5).unwrap();
        let e = s.q_urgent().dequeue().expect("expected an entry");
        assert_eq!(e.src, Node(0));
        assert_eq!(e.dst, Node(1));
        assert!(s.q_urgent().is_empty());
    }

    #[test]
    fn second_add_does_not_resignal() {
        let s = status();
        s.add_backlog(Node(0), Node(1), 5).unwrap();
        s.add_backlog(Node(0), Node(1), 5).unwrap();
        assert_eq!(s.q_urgent().count(), 1);
    }

    #[test]
    fn reset_sender_clears_backlog() {
        let s = status();
        s.add_backlog(Node(0), Node(1), 5).unwrap();
        s.reset_sender(Node(0));
        assert_eq!(s.backlog().demand(Node(0), Node(1)), 0);
    }
}
