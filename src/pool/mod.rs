//! Bounded concurrent pools for recycling fixed-capacity scratch buffers.
//!
//! The logging hot path acquires a buffer, formats a line into it, and
//! returns it, so steady-state logging does no allocation. Two variants
//! share one contract: the lock-free [`AtomicPool`] used in production and
//! the mutex-guarded [`LockedPool`] kept as a correctness oracle.

mod atomic;
mod locked;
mod scratch;

pub use atomic::AtomicPool;
pub use locked::LockedPool;
pub use scratch::{scratch_pool, ScratchPool, ScratchStats};

use bytes::BytesMut;

/// Capacity of the process-wide scratch pool. Must be a power of two.
pub const POOL_SIZE: usize = 128;

/// Starting capacity of a pooled buffer, sized for a typical log line.
pub const BUF_SIZE: usize = 1024;

/// Buffers grown past this are discarded instead of recycled.
pub const MAX_BUF_SIZE: usize = 65534;

/// Unified contract of the two pool variants.
///
/// A pool holds at most its capacity of buffers. `pop` hands exclusive
/// ownership of a buffer to the caller; `push` transfers it back (or
/// donates a freshly allocated one). Full and empty are expected,
/// recoverable outcomes; internal protocol violations panic.
pub trait BufferPool: Send + Sync {
    /// Seed the pool to full capacity; fails unless the pool is untouched.
    fn init(&self) -> bool;
    /// Return a buffer; `Err(buf)` hands it back when the pool is full.
    fn push(&self, buf: BytesMut) -> Result<(), BytesMut>;
    /// Acquire a buffer; `None` when the pool is empty.
    fn pop(&self) -> Option<BytesMut>;
    /// Best-effort count of pooled buffers (diagnostic only).
    fn free(&self) -> u64;
}
