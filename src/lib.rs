//! buflog: a fast leveled logger built around a bounded concurrent pool
//! of recyclable scratch buffers.
//!
//! The pool is the core: a fixed power-of-two ring of ownership slots
//! with a lock-free MPMC protocol ([`pool::AtomicPool`]) and a
//! mutex-guarded oracle ([`pool::LockedPool`]). The logging layer rides
//! on it: every line is formatted into a pooled buffer and the buffer is
//! recycled after the write.

pub mod config;
pub mod error;
pub mod log;
pub mod pool;

pub use config::Config;
pub use error::{Error, Result};
pub use log::{default_log, set_default_log, Level, Log, Options, Output};
pub use pool::{AtomicPool, BufferPool, LockedPool, BUF_SIZE, MAX_BUF_SIZE, POOL_SIZE};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
