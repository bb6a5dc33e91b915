use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Barrier;

use bytes::{BufMut, BytesMut};

use buflog::config::Config;
use buflog::pool::{scratch_pool, AtomicPool, BufferPool, LockedPool, BUF_SIZE, POOL_SIZE};
use buflog::{log_err, log_info, set_default_log, Log};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();

    set_default_log(Log::new(config.level()?, config.options()?, config.output()));

    log_info!("buflog v{}\n", buflog::VERSION);
    log_info!(
        "stress: {} threads x {} iterations, {} pool (capacity {})\n",
        config.threads,
        config.iterations,
        if config.locked { "mutex" } else { "lock-free" },
        POOL_SIZE,
    );

    let atomic;
    let locked;
    let pool: &dyn BufferPool = if config.locked {
        locked = LockedPool::<POOL_SIZE>::new();
        &locked
    } else {
        atomic = AtomicPool::<POOL_SIZE>::new();
        &atomic
    };
    if !pool.init() {
        log_err!("pool initialization failed\n");
        return Err("pool initialization failed".into());
    }

    let (pop_failed, push_failed) = stress(pool, config.threads, config.iterations);

    log_info!(
        "done: pop failures {}, push failures {}, free {}\n",
        pop_failed,
        push_failed,
        pool.free(),
    );
    let stats = scratch_pool().stats();
    log_info!(
        "log scratch pool: free {}, hits {}, misses {}, returns {}, drops {}, hit rate {:.2}\n",
        stats.free,
        stats.hits,
        stats.misses,
        stats.returns,
        stats.drops,
        stats.hit_rate(),
    );

    // Conservation check: every compensating allocation must be matched
    // by exactly one rejected push.
    if pop_failed != push_failed || pool.free() != POOL_SIZE as u64 {
        log_err!(
            "conservation violated: pop failures {} != push failures {} or free {} != {}\n",
            pop_failed,
            push_failed,
            pool.free(),
            POOL_SIZE,
        );
        return Err("pool conservation violated".into());
    }

    Ok(())
}

/// Hammer the pool from `threads` workers, each doing `iterations` rounds
/// of pop (or allocate on empty), touch the buffer, push (or drop on
/// full). Returns the total pop and push failure counts.
fn stress(pool: &dyn BufferPool, threads: usize, iterations: usize) -> (u64, u64) {
    let pop_failed = AtomicU64::new(0);
    let push_failed = AtomicU64::new(0);
    let barrier = Barrier::new(threads);

    std::thread::scope(|s| {
        for thread in 0..threads {
            let pop_failed = &pop_failed;
            let push_failed = &push_failed;
            let barrier = &barrier;
            s.spawn(move || {
                barrier.wait();
                for i in 0..iterations {
                    let mut buf = match pool.pop() {
                        Some(buf) => buf,
                        None => {
                            pop_failed.fetch_add(1, Ordering::Relaxed);
                            BytesMut::with_capacity(BUF_SIZE)
                        }
                    };
                    buf.put_u64((thread * iterations + i) as u64);
                    buf.clear();
                    if pool.push(buf).is_err() {
                        push_failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    (
        pop_failed.load(Ordering::Relaxed),
        push_failed.load(Ordering::Relaxed),
    )
}
