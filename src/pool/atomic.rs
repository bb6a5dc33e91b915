//! Lock-free bounded buffer pool.
//!
//! A fixed ring of `N` ownership slots driven by two monotonically
//! increasing 64-bit counters: pushes reserve a position at `head` with a
//! CAS loop, pops claim the slot at `tail` with an atomic pointer
//! exchange. `N` must be a power of two so a logical position maps to a
//! physical slot with a bitmask.

use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

use bytes::BytesMut;
use crossbeam::utils::{Backoff, CachePadded};

use super::{BufferPool, BUF_SIZE};

/// Lock-free MPMC pool of `N` recyclable `BytesMut` buffers.
///
/// Any number of threads may call [`push`](Self::push), [`pop`](Self::pop)
/// and [`free`](Self::free) concurrently; no operation blocks. Buffers are
/// boxed on push and un-boxed on pop, so claiming a slot transfers
/// ownership in a single atomic exchange and nobody ever dereferences a
/// pointer it did not win.
pub struct AtomicPool<const N: usize> {
    /// Position of the next push. Only ever increases.
    head: CachePadded<AtomicU64>,
    /// Position of the next pop. Only ever increases.
    tail: CachePadded<AtomicU64>,
    /// Slot `p & (N - 1)` holds the buffer pushed at logical position `p`,
    /// or null while the position is outside `[tail, head)`.
    slots: [AtomicPtr<BytesMut>; N],
}

impl<const N: usize> AtomicPool<N> {
    /// Create an empty, unseeded pool. Call [`init`](Self::init) to seed it.
    pub fn new() -> Self {
        const {
            assert!(N > 0 && N.is_power_of_two(), "pool capacity must be a power of two");
        }
        Self {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            slots: std::array::from_fn(|_| AtomicPtr::new(ptr::null_mut())),
        }
    }

    #[inline]
    fn index(pos: u64) -> usize {
        (pos as usize) & (N - 1)
    }

    /// Seed the pool with `N` buffers of `BUF_SIZE` capacity.
    ///
    /// Fails if the pool is not in its zero state (already initialized).
    /// Initialization is not idempotent and must not race with concurrent
    /// use of the pool.
    pub fn init(&self) -> bool {
        if self.head.load(Ordering::Acquire) != 0 || self.tail.load(Ordering::Acquire) != 0 {
            return false;
        }
        for _ in 0..N {
            if self.push(BytesMut::with_capacity(BUF_SIZE)).is_err() {
                return false;
            }
        }
        true
    }

    /// Return a buffer to the pool, transferring ownership into it.
    ///
    /// Rejects with `Err(buf)` when the pool is full; the caller keeps the
    /// buffer and decides what to do with it (typically drop it).
    pub fn push(&self, buf: BytesMut) -> Result<(), BytesMut> {
        let mut h = self.head.load(Ordering::Acquire);
        loop {
            // Fullness must be re-checked on every retry: another pusher
            // may have filled the pool between the read and the CAS.
            let t = self.tail.load(Ordering::Acquire);
            if h.wrapping_sub(t) >= N as u64 {
                return Err(buf);
            }
            match self.head.compare_exchange_weak(
                h,
                h.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(current) => h = current,
            }
        }
        // Position h is now reserved exclusively by this call; a plain
        // store would do, but the exchange lets us verify the slot was
        // empty as the protocol guarantees.
        let raw = Box::into_raw(Box::new(buf));
        let prev = self.slots[Self::index(h)].swap(raw, Ordering::AcqRel);
        if !prev.is_null() {
            panic!(
                "push: non-empty slot at reserved position {} (head {}, tail {})",
                h,
                self.head.load(Ordering::Acquire),
                self.tail.load(Ordering::Acquire),
            );
        }
        Ok(())
    }

    /// Acquire a buffer from the pool, transferring ownership to the caller.
    ///
    /// Returns `None` immediately when the pool is empty; emptiness is an
    /// expected outcome, not a fault, and the caller is expected to
    /// allocate a fresh buffer instead.
    pub fn pop(&self) -> Option<BytesMut> {
        let backoff = Backoff::new();
        loop {
            let h = self.head.load(Ordering::Acquire);
            let t = self.tail.load(Ordering::Acquire);
            if h == t {
                return None;
            }
            // Whoever nulls a still-occupied slot wins the claim; the
            // exchange decides the race in one atomic step.
            let prev = self.slots[Self::index(t)].swap(ptr::null_mut(), Ordering::AcqRel);
            if !prev.is_null() {
                // Sole claimant of position t advances the tail; nobody
                // else reaches this line for the same logical position.
                self.tail.fetch_add(1, Ordering::Release);
                // SAFETY: the exchange captured the only live pointer to
                // this allocation; ownership transfers to the caller.
                let boxed = unsafe { Box::from_raw(prev) };
                return Some(*boxed);
            }
            // A concurrent pop claimed this position first. Back off a
            // little instead of spinning tightly, then retry.
            backoff.snooze();
        }
    }

    /// Best-effort count of buffers currently held by the pool.
    ///
    /// The two counters are read separately, so the result is a momentary
    /// estimate for diagnostics, not a linearizable count. Reading `tail`
    /// first keeps the difference from underflowing.
    pub fn free(&self) -> u64 {
        let t = self.tail.load(Ordering::Acquire);
        let h = self.head.load(Ordering::Acquire);
        h.wrapping_sub(t)
    }
}

impl<const N: usize> Default for AtomicPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BufferPool for AtomicPool<N> {
    fn init(&self) -> bool {
        AtomicPool::init(self)
    }

    fn push(&self, buf: BytesMut) -> Result<(), BytesMut> {
        AtomicPool::push(self, buf)
    }

    fn pop(&self) -> Option<BytesMut> {
        AtomicPool::pop(self)
    }

    fn free(&self) -> u64 {
        AtomicPool::free(self)
    }
}

impl<const N: usize> Drop for AtomicPool<N> {
    fn drop(&mut self) {
        for slot in &self.slots {
            let raw = slot.swap(ptr::null_mut(), Ordering::Relaxed);
            if !raw.is_null() {
                // SAFETY: exclusive access in drop; the slot owned this box.
                drop(unsafe { Box::from_raw(raw) });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Barrier;

    use bytes::BufMut;
    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn test_init_seeds_full_capacity() {
        let pool = AtomicPool::<8>::new();
        assert_eq!(pool.free(), 0);
        assert!(pool.init());
        assert_eq!(pool.free(), 8);
    }

    #[test]
    fn test_init_is_not_idempotent() {
        let pool = AtomicPool::<8>::new();
        assert!(pool.init());
        assert!(!pool.init());
        assert_eq!(pool.free(), 8);

        // A pool that has seen any traffic is no longer in zero state.
        let pool = AtomicPool::<8>::new();
        assert!(pool.push(BytesMut::with_capacity(16)).is_ok());
        assert!(!pool.init());
    }

    #[test]
    fn test_pop_empty_returns_none_without_state_change() {
        let pool = AtomicPool::<4>::new();
        assert!(pool.pop().is_none());
        assert_eq!(pool.free(), 0);
    }

    #[test]
    fn test_push_full_rejects_and_returns_buffer() {
        let pool = AtomicPool::<4>::new();
        assert!(pool.init());
        let mut extra = BytesMut::with_capacity(32);
        extra.put_slice(b"overflow");
        let rejected = pool.push(extra).unwrap_err();
        assert_eq!(&rejected[..], b"overflow");
        assert_eq!(pool.free(), 4);
    }

    #[test]
    fn test_capacity_four_scenario() {
        let pool = AtomicPool::<4>::new();
        assert!(pool.init());

        let held: Vec<BytesMut> = (0..4).map(|_| pool.pop().unwrap()).collect();
        let mut addrs: Vec<usize> = held.iter().map(|b| b.as_ptr() as usize).collect();
        addrs.sort_unstable();
        addrs.dedup();
        assert_eq!(addrs.len(), 4, "pool handed out the same buffer twice");

        // Fifth pop finds the pool drained.
        assert!(pool.pop().is_none());
        assert_eq!(pool.free(), 0);

        let mut held = held;
        assert!(pool.push(held.pop().unwrap()).is_ok());
        assert_eq!(pool.free(), 1);
        // Pushing the same buffer again without popping it back is caller
        // misuse the contract leaves undefined; ownership moves on push,
        // so the borrow checker rules it out here.
    }

    #[test]
    fn test_no_double_hand_out_across_racing_poppers() {
        const CAP: usize = 64;
        const THREADS: usize = 8;

        let pool = AtomicPool::<CAP>::new();
        assert!(pool.init());

        let barrier = Barrier::new(THREADS);
        let claimed: Mutex<Vec<usize>> = Mutex::new(Vec::new());

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    // Hold every claimed buffer so addresses stay live and
                    // distinct for the duration of the check.
                    let mut held = Vec::new();
                    while let Some(buf) = pool.pop() {
                        held.push(buf);
                    }
                    let mut ids = claimed.lock();
                    for buf in &held {
                        ids.push(buf.as_ptr() as usize);
                    }
                });
            }
        });

        let mut ids = claimed.into_inner();
        assert_eq!(ids.len(), CAP);
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), CAP, "two poppers received the same buffer");
        assert_eq!(pool.free(), 0);
    }

    #[test]
    fn test_round_trip_conservation_under_load() {
        const CAP: usize = 16;
        const THREADS: usize = 8;
        const LOOPS: usize = 10_000;

        let pool = AtomicPool::<CAP>::new();
        assert!(pool.init());

        let pop_failed = AtomicU64::new(0);
        let push_failed = AtomicU64::new(0);
        let barrier = Barrier::new(THREADS);

        std::thread::scope(|s| {
            for thread in 0..THREADS {
                let pop_failed = &pop_failed;
                let push_failed = &push_failed;
                let pool = &pool;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    for i in 0..LOOPS {
                        let mut buf = match pool.pop() {
                            Some(buf) => buf,
                            None => {
                                pop_failed.fetch_add(1, Ordering::Relaxed);
                                BytesMut::with_capacity(BUF_SIZE)
                            }
                        };
                        buf.put_u64((thread * LOOPS + i) as u64);
                        buf.clear();
                        if pool.push(buf).is_err() {
                            push_failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        // Every compensating allocation must eventually displace exactly
        // one push, so the failure counts balance and the pool ends full.
        assert_eq!(
            pop_failed.load(Ordering::Relaxed),
            push_failed.load(Ordering::Relaxed)
        );
        assert_eq!(pool.free(), CAP as u64);
    }
}
