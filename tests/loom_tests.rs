//! Loom-based concurrency tests.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! The production `Ring<T>` and `BacklogTable` use plain `std::sync::atomic`
//! types so the hot path pays no loom overhead; these tests model their
//! synchronization protocols with `loom`'s atomics in isolation, exploring
//! every interleaving loom's scheduler can produce.

#![cfg(feature = "loom")]

use loom::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use loom::sync::Arc;
use loom::thread;
use std::cell::UnsafeCell;

/// Mirrors `Ring<T>`'s cached-sequence SPSC protocol at a small capacity.
struct LoomRing {
    tail: AtomicU64,
    head: AtomicU64,
    buffer: UnsafeCell<[u64; 4]>,
}

unsafe impl Send for LoomRing {}
unsafe impl Sync for LoomRing {}

impl LoomRing {
    const CAPACITY: usize = 4;

    fn new() -> Self {
        Self { tail: AtomicU64::new(0), head: AtomicU64::new(0), buffer: UnsafeCell::new([0; 4]) }
    }

    fn push(&self, value: u64) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if Self::CAPACITY.saturating_sub((tail - head) as usize) == 0 {
            return false;
        }
        let idx = (tail as usize) & (Self::CAPACITY - 1);
        unsafe {
            (*self.buffer.get())[idx] = value;
        }
        self.tail.store(tail + 1, Ordering::Release);
        true
    }

    fn pop(&self) -> Option<u64> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let idx = (head as usize) & (Self::CAPACITY - 1);
        let value = unsafe { (*self.buffer.get())[idx] };
        self.head.store(head + 1, Ordering::Release);
        Some(value)
    }
}

#[test]
fn loom_ring_spsc_preserves_fifo_order() {
    loom::model(|| {
        let ring = Arc::new(LoomRing::new());
        let ring2 = Arc::clone(&ring);

        let producer = thread::spawn(move || {
            ring2.push(42);
            ring2.push(43);
        });

        let consumer = thread::spawn(move || {
            let mut received = Vec::new();
            for _ in 0..10 {
                if let Some(v) = ring.pop() {
                    received.push(v);
                }
                if received.len() == 2 {
                    break;
                }
                loom::thread::yield_now();
            }
            received
        });

        producer.join().unwrap();
        let received = consumer.join().unwrap();
        if received.len() >= 2 {
            assert_eq!(received[0], 42);
            assert_eq!(received[1], 43);
        }
    });
}

#[test]
fn loom_ring_rejects_push_past_capacity() {
    loom::model(|| {
        let ring = Arc::new(LoomRing::new());
        assert!(ring.push(1));
        assert!(ring.push(2));
        assert!(ring.push(3));
        assert!(ring.push(4));
        assert!(!ring.push(5));

        let ring2 = Arc::clone(&ring);
        let consumer = thread::spawn(move || ring2.pop());
        let value = consumer.join().unwrap();
        assert_eq!(value, Some(1));
        assert!(ring.push(5));
    });
}

/// Mirrors `BacklogTable::add_backlog`'s "exactly one producer wins the
/// signal obligation" compare-exchange on the `in_bin` flag, racing against
/// `consume_one`'s demand decrement.
struct LoomBacklogCell {
    demand: AtomicU32,
    in_bin: AtomicBool,
}

impl LoomBacklogCell {
    fn new() -> Self {
        Self { demand: AtomicU32::new(0), in_bin: AtomicBool::new(false) }
    }

    fn add_backlog(&self, extra: u32) -> bool {
        let mut current = self.demand.load(Ordering::Relaxed);
        loop {
            let new_val = current + extra;
            match self.demand.compare_exchange_weak(current, new_val, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.in_bin.compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed).is_ok()
    }

    fn consume_one(&self) -> u32 {
        let mut current = self.demand.load(Ordering::Relaxed);
        loop {
            let new_val = current.saturating_sub(1);
            match self.demand.compare_exchange_weak(current, new_val, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => {
                    if new_val == 0 {
                        self.in_bin.store(false, Ordering::Release);
                    }
                    return new_val;
                }
                Err(observed) => current = observed,
            }
        }
    }
}

#[test]
fn loom_backlog_cell_signals_exactly_once_across_racing_producers() {
    loom::model(|| {
        let cell = Arc::new(LoomBacklogCell::new());
        let c1 = Arc::clone(&cell);
        let c2 = Arc::clone(&cell);

        let t1 = thread::spawn(move || c1.add_backlog(1));
        let t2 = thread::spawn(move || c2.add_backlog(1));

        let signaled = [t1.join().unwrap(), t2.join().unwrap()];
        assert_eq!(signaled.iter().filter(|&&s| s).count(), 1, "exactly one producer must win the signal obligation");
        assert_eq!(cell.demand.load(Ordering::SeqCst), 2);
    });
}

#[test]
fn loom_backlog_cell_reaching_zero_clears_in_bin() {
    loom::model(|| {
        let cell = Arc::new(LoomBacklogCell::new());
        cell.add_backlog(1);

        let c = Arc::clone(&cell);
        let consumer = thread::spawn(move || c.consume_one());
        let remaining = consumer.join().unwrap();

        assert_eq!(remaining, 0);
        assert!(!cell.in_bin.load(Ordering::SeqCst));
    });
}
