//! Process-wide scratch pool and the caller-side recycling policy.
//!
//! The core pool only moves buffers in and out; everything a well-behaved
//! caller is supposed to do around it lives here: allocate a fresh buffer
//! on a miss, clear buffers before reuse, and discard buffers that grew
//! past [`MAX_BUF_SIZE`] instead of recycling them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use bytes::BytesMut;

use super::{AtomicPool, BUF_SIZE, MAX_BUF_SIZE, POOL_SIZE};

/// Relaxed ordering for counters (eventual visibility is fine for stats).
const RELAXED: Ordering = Ordering::Relaxed;

/// Global scratch pool shared by the logging hot path.
static SCRATCH: OnceLock<ScratchPool> = OnceLock::new();

/// Get the global scratch pool, seeding it on first use.
pub fn scratch_pool() -> &'static ScratchPool {
    SCRATCH.get_or_init(ScratchPool::new)
}

/// A seeded [`AtomicPool`] plus acquisition/recycling statistics.
pub struct ScratchPool {
    pool: AtomicPool<POOL_SIZE>,
    /// Buffers served from the pool.
    hits: AtomicU64,
    /// Buffers allocated fresh because the pool was empty.
    misses: AtomicU64,
    /// Buffers returned to the pool.
    returns: AtomicU64,
    /// Buffers dropped because the pool was full.
    drops: AtomicU64,
    /// Buffers discarded for growing past `MAX_BUF_SIZE`.
    oversized: AtomicU64,
}

impl ScratchPool {
    /// Create a new scratch pool seeded to full capacity.
    pub fn new() -> Self {
        let pool = AtomicPool::new();
        // A freshly constructed pool is in zero state, so seeding cannot
        // fail; treat anything else as a defect.
        if !pool.init() {
            panic!("scratch pool: seeding a fresh pool failed");
        }
        Self {
            pool,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            returns: AtomicU64::new(0),
            drops: AtomicU64::new(0),
            oversized: AtomicU64::new(0),
        }
    }

    /// Get a cleared buffer: from the pool when possible, freshly
    /// allocated at [`BUF_SIZE`] capacity otherwise.
    #[inline]
    pub fn acquire(&self) -> BytesMut {
        match self.pool.pop() {
            Some(buf) => {
                self.hits.fetch_add(1, RELAXED);
                buf
            }
            None => {
                self.misses.fetch_add(1, RELAXED);
                BytesMut::with_capacity(BUF_SIZE)
            }
        }
    }

    /// Return a buffer for recycling.
    ///
    /// Buffers that grew past [`MAX_BUF_SIZE`] are discarded rather than
    /// recycled; everything else is cleared and pushed back. A full pool
    /// drops the buffer.
    #[inline]
    pub fn release(&self, mut buf: BytesMut) {
        if buf.capacity() > MAX_BUF_SIZE {
            self.oversized.fetch_add(1, RELAXED);
            return;
        }
        buf.clear();
        if self.pool.push(buf).is_ok() {
            self.returns.fetch_add(1, RELAXED);
        } else {
            self.drops.fetch_add(1, RELAXED);
        }
    }

    /// Best-effort count of pooled buffers (diagnostic only).
    #[inline]
    pub fn free(&self) -> u64 {
        self.pool.free()
    }

    /// Snapshot the statistics.
    pub fn stats(&self) -> ScratchStats {
        ScratchStats {
            free: self.pool.free(),
            hits: self.hits.load(RELAXED),
            misses: self.misses.load(RELAXED),
            returns: self.returns.load(RELAXED),
            drops: self.drops.load(RELAXED),
            oversized: self.oversized.load(RELAXED),
        }
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time scratch pool statistics.
#[derive(Debug, Clone, Copy)]
pub struct ScratchStats {
    /// Buffers currently in the pool (best-effort snapshot).
    pub free: u64,
    /// Buffers served from the pool.
    pub hits: u64,
    /// Buffers allocated fresh (pool empty).
    pub misses: u64,
    /// Buffers returned to the pool.
    pub returns: u64,
    /// Buffers dropped (pool full).
    pub drops: u64,
    /// Buffers discarded for exceeding `MAX_BUF_SIZE`.
    pub oversized: u64,
}

impl ScratchStats {
    /// Fraction of acquisitions served from the pool (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
