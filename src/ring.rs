use crate::backoff::Backoff;
use crate::invariants::{
    debug_assert_bounded_count, debug_assert_head_not_past_tail, debug_assert_initialized_read,
    debug_assert_monotonic,
};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// This SPSC ring buffer is the single queue primitive used everywhere in the
// admission pipeline (`q_bin`, `q_urgent`, `q_head`, `q_admitted_out`):
//
// **Producer (write path):**
// 1. Load `tail` with Relaxed (only producer writes tail)
// 2. Load `cached_head` with no ordering (UnsafeCell, single-writer)
// 3. If cache insufficient: load `head` with Acquire (synchronizes with consumer)
// 4. Write data to buffer slots (no ordering needed - protected by protocol)
// 5. Store `tail` with Release (publishes writes to consumer)
//
// **Consumer (read path):**
// 1. Load `head` with Relaxed (only consumer writes head)
// 2. Load `cached_tail` with no ordering (UnsafeCell, single-writer)
// 3. If cache insufficient: load `tail` with Acquire (synchronizes with producer)
// 4. Read data from buffer slots (no ordering needed - protected by protocol)
// 5. Store `head` with Release (publishes consumption to producer)
//
// Unbounded `u64` sequence numbers avoid the ABA problem entirely (wrap
// takes ~58 years at 10B ops/sec); the buffer index is `sequence & mask`.
//
// Single-producer / single-consumer is a hard assumption at each endpoint:
// external ingress to `q_urgent` funnels through one producer role.
// =============================================================================

/// SPSC ring buffer - the core building block shared by every queue in the
/// admission pipeline.
///
/// Fixed power-of-two capacity, no heap allocation after construction,
/// 128-byte cache-line padding on the hot atomics to avoid false sharing
/// between the producer and consumer.
#[repr(C)]
pub struct Ring<T> {
    tail: CachePadded<AtomicU64>,
    cached_head: CachePadded<UnsafeCell<u64>>,
    head: CachePadded<AtomicU64>,
    cached_tail: CachePadded<UnsafeCell<u64>>,
    mask: usize,
    capacity: usize,
    buffer: UnsafeCell<Box<[MaybeUninit<T>]>>,
}

// Safety: the release/acquire handoff on `tail`/`head` makes the buffer
// transfer sound as long as T itself is Send.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    /// Creates a new ring with the given power-of-two capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or not a power of two.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0 && capacity.is_power_of_two(), "capacity must be a nonzero power of two");

        let mut buf = Vec::with_capacity(capacity);
        buf.resize_with(capacity, MaybeUninit::uninit);

        Self {
            tail: CachePadded::new(AtomicU64::new(0)),
            cached_head: CachePadded::new(UnsafeCell::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
            cached_tail: CachePadded::new(UnsafeCell::new(0)),
            mask: capacity - 1,
            capacity,
            buffer: UnsafeCell::new(buf.into_boxed_slice()),
        }
    }

    /// Ring buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently queued.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) as usize
    }

    /// True if no items are queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the ring cannot accept another item.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Alias for [`Ring::len`]: number of items currently queued.
    #[inline]
    pub fn count(&self) -> usize {
        self.len()
    }

    // -------------------------------------------------------------------
    // PRODUCER API
    // -------------------------------------------------------------------

    /// `enqueue(ptr) -> ok|full`: push a single item.
    ///
    /// Returns `false` if the ring has no space.
    #[inline]
    pub fn enqueue(&self, item: T) -> bool {
        self.push(item).is_ok()
    }

    /// Push a single item. On failure (ring full), hands the item back to
    /// the caller instead of dropping it — callers on the hot path (e.g.
    /// `push_with_backoff`) need it to retry.
    pub fn push(&self, item: T) -> Result<(), T> {
        let tail = self.tail.load(Ordering::Relaxed);

        // SAFETY: cached_head is only ever written by the producer path.
        let cached_head = unsafe { *self.cached_head.get() };
        let mut space = self.capacity.saturating_sub(tail.wrapping_sub(cached_head) as usize);

        if space == 0 {
            let head = self.head.load(Ordering::Acquire);
            // SAFETY: cached_head is producer-owned; the Acquire load above
            // synchronizes with the consumer's Release store to `head`.
            unsafe {
                *self.cached_head.get() = head;
            }
            space = self.capacity.saturating_sub(tail.wrapping_sub(head) as usize);
            if space == 0 {
                return Err(item);
            }
        }

        let idx = (tail as usize) & self.mask;
        // SAFETY: idx is in bounds; this slot is strictly ahead of the
        // consumer's visible tail, so only the producer touches it.
        unsafe {
            let buffer = &mut *self.buffer.get();
            buffer[idx] = MaybeUninit::new(item);
        }

        let new_tail = tail.wrapping_add(1);
        debug_assert_monotonic!("tail", tail, new_tail);
        debug_assert_bounded_count!(new_tail.wrapping_sub(self.head.load(Ordering::Relaxed)) as usize, self.capacity);
        self.tail.store(new_tail, Ordering::Release);
        Ok(())
    }

    /// Push with adaptive backoff before giving up (used by ingress).
    ///
    /// Returns `false` once the backoff budget is exhausted; the item is
    /// dropped in that case, matching `ArbiterError::Backpressure`'s
    /// contract that the *signal obligation* failed, not that the backlog
    /// entry itself is lost (the backlog table keeps `in_bin` set).
    pub fn push_with_backoff(&self, item: T) -> bool {
        let mut backoff = Backoff::new();
        let mut item = item;
        loop {
            match self.push(item) {
                Ok(()) => return true,
                Err(returned) => {
                    item = returned;
                    if backoff.is_completed() {
                        return false;
                    }
                    backoff.snooze();
                }
            }
        }
    }

    // -------------------------------------------------------------------
    // CONSUMER API
    // -------------------------------------------------------------------

    /// `dequeue() -> ptr|empty`: pop a single item.
    #[inline]
    pub fn dequeue(&self) -> Option<T> {
        self.pop()
    }

    /// Pop a single item, or `None` if empty.
    pub fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);

        // SAFETY: cached_tail is only ever written by the consumer path.
        let mut cached_tail = unsafe { *self.cached_tail.get() };
        if head == cached_tail {
            cached_tail = self.tail.load(Ordering::Acquire);
            // SAFETY: cached_tail is consumer-owned; the Acquire load above
            // synchronizes with the producer's Release store to `tail`.
            unsafe {
                *self.cached_tail.get() = cached_tail;
            }
            if head == cached_tail {
                return None;
            }
        }

        debug_assert_initialized_read!(head, head, cached_tail);
        let idx = (head as usize) & self.mask;
        // SAFETY: items in [head, tail) were fully written by the producer
        // and published via Release; this slot is initialized.
        let value = unsafe {
            let buffer = &mut *self.buffer.get();
            std::mem::replace(&mut buffer[idx], MaybeUninit::uninit()).assume_init()
        };

        let new_head = head.wrapping_add(1);
        debug_assert_head_not_past_tail!(new_head, cached_tail);
        self.head.store(new_head, Ordering::Release);
        Some(value)
    }

    /// Process all currently available items with a single head update
    /// (Disruptor-style batch consumption — amortizes the atomic store).
    pub fn consume_batch<F>(&self, mut handler: F) -> usize
    where
        F: FnMut(T),
    {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let avail = tail.wrapping_sub(head) as usize;
        if avail == 0 {
            return 0;
        }

        let mut pos = head;
        let mut count = 0usize;
        while pos != tail {
            let idx = (pos as usize) & self.mask;
            // SAFETY: [head, tail) is the producer-published, unread range.
            let value = unsafe {
                let buffer = &mut *self.buffer.get();
                std::mem::replace(&mut buffer[idx], MaybeUninit::uninit()).assume_init()
            };
            handler(value);
            pos = pos.wrapping_add(1);
            count += 1;
        }

        self.head.store(tail, Ordering::Release);
        count
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        let count = tail.wrapping_sub(head) as usize;
        if count == 0 {
            return;
        }

        let buffer = self.buffer.get_mut();
        for i in 0..count {
            let idx = (head as usize).wrapping_add(i) & self.mask;
            // SAFETY: these slots are exactly the still-initialized range.
            unsafe {
                ptr::drop_in_place(buffer[idx].as_mut_ptr());
            }
        }
    }
}
