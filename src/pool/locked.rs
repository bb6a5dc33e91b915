//! Mutex-guarded baseline pool.
//!
//! Functionally identical contract to [`AtomicPool`](super::AtomicPool),
//! with a single lock serializing every check-and-mutate sequence. It
//! trades throughput under contention for simplicity, and doubles as a
//! correctness oracle for the lock-free variant.

use bytes::BytesMut;
use parking_lot::Mutex;

use super::{BufferPool, BUF_SIZE};

/// Mutex-based MPMC pool of `N` recyclable `BytesMut` buffers.
pub struct LockedPool<const N: usize> {
    inner: Mutex<Inner<N>>,
}

struct Inner<const N: usize> {
    head: u64,
    tail: u64,
    slots: [Option<BytesMut>; N],
}

impl<const N: usize> LockedPool<N> {
    /// Create an empty, unseeded pool. Call [`init`](Self::init) to seed it.
    pub fn new() -> Self {
        const {
            assert!(N > 0 && N.is_power_of_two(), "pool capacity must be a power of two");
        }
        Self {
            inner: Mutex::new(Inner {
                head: 0,
                tail: 0,
                slots: std::array::from_fn(|_| None),
            }),
        }
    }

    #[inline]
    fn index(pos: u64) -> usize {
        (pos as usize) & (N - 1)
    }

    /// Seed the pool with `N` buffers of `BUF_SIZE` capacity.
    ///
    /// Fails if the pool is not in its zero state.
    pub fn init(&self) -> bool {
        {
            let inner = self.inner.lock();
            if inner.head != 0 || inner.tail != 0 {
                return false;
            }
        }
        for _ in 0..N {
            if self.push(BytesMut::with_capacity(BUF_SIZE)).is_err() {
                return false;
            }
        }
        true
    }

    /// Return a buffer to the pool; `Err(buf)` when full.
    pub fn push(&self, buf: BytesMut) -> Result<(), BytesMut> {
        let mut inner = self.inner.lock();
        if inner.head.wrapping_sub(inner.tail) >= N as u64 {
            return Err(buf);
        }
        let h = inner.head;
        let i = Self::index(h);
        if inner.slots[i].is_some() {
            let (head, tail) = (inner.head, inner.tail);
            drop(inner);
            panic!("push: non-empty slot at position {h} (head {head}, tail {tail})");
        }
        inner.slots[i] = Some(buf);
        inner.head = h.wrapping_add(1);
        Ok(())
    }

    /// Acquire a buffer from the pool; `None` when empty.
    pub fn pop(&self) -> Option<BytesMut> {
        let mut inner = self.inner.lock();
        if inner.head == inner.tail {
            return None;
        }
        let t = inner.tail;
        let i = Self::index(t);
        let buf = inner.slots[i].take();
        match buf {
            Some(buf) => {
                inner.tail = t.wrapping_add(1);
                Some(buf)
            }
            None => {
                let (head, tail) = (inner.head, inner.tail);
                drop(inner);
                panic!("pop: empty slot at position {t} (head {head}, tail {tail})");
            }
        }
    }

    /// Number of buffers currently held by the pool.
    pub fn free(&self) -> u64 {
        let inner = self.inner.lock();
        inner.head.wrapping_sub(inner.tail)
    }
}

impl<const N: usize> Default for LockedPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BufferPool for LockedPool<N> {
    fn init(&self) -> bool {
        LockedPool::init(self)
    }

    fn push(&self, buf: BytesMut) -> Result<(), BytesMut> {
        LockedPool::push(self, buf)
    }

    fn pop(&self) -> Option<BytesMut> {
        LockedPool::pop(self)
    }

    fn free(&self) -> u64 {
        LockedPool::free(self)
    }
}
