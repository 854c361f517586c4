use std::sync::atomic::{AtomicU64, Ordering};

/// Ambient observability counters for one [`crate::core::AdmissionCore`].
///
/// Not part of the admission contract itself — purely diagnostic. Splits
/// a live atomic struct from a cheap-to-clone point-in-time snapshot, so
/// callers can read metrics without contending with the hot path.
#[derive(Debug, Default)]
pub struct CoreMetrics {
    admitted: AtomicU64,
    deferred: AtomicU64,
    dropped_stale: AtomicU64,
    batches_completed: AtomicU64,
}

impl CoreMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_admit(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_defer(&self) {
        self.deferred.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped_stale(&self) {
        self.dropped_stale.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_batch_completed(&self) {
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CoreMetricsSnapshot {
        CoreMetricsSnapshot {
            admitted: self.admitted.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            dropped_stale: self.dropped_stale.load(Ordering::Relaxed),
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time, non-atomic copy of [`CoreMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreMetricsSnapshot {
    pub admitted: u64,
    pub deferred: u64,
    pub dropped_stale: u64,
    pub batches_completed: u64,
}
