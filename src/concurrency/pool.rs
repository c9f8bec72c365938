//! Global, init-once worker pool.
//!
//! The pool size is a process-wide resource: it is read from
//! `TIT_NUM_THREADS` (default 8) the first time a parallel region runs, and
//! reconfiguration after that is rejected (a debug-level log line is
//! emitted, not an error — matching spec.md §5's "attempts to change it
//! after the first parallel region are ignored").

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};

static POOL: OnceCell<rayon::ThreadPool> = OnceCell::new();
static STARTED: AtomicBool = AtomicBool::new(false);

fn build_pool(num_threads: usize) -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("bluetit-worker-{i}"))
        .build()
        .expect("failed to build the global worker pool")
}

/// Get (initializing on first call) the global worker pool.
///
/// The first call determines the pool size for the lifetime of the process:
/// it uses `num_threads` if this is genuinely the first call, otherwise the
/// already-initialized pool is returned unchanged.
pub fn global_pool(num_threads: usize) -> &'static rayon::ThreadPool {
    POOL.get_or_init(|| {
        STARTED.store(true, Ordering::SeqCst);
        build_pool(num_threads)
    })
}

/// Try to resize the pool. Returns `false` (and logs at debug level) if a
/// parallel region has already started, since the pool is init-once.
pub fn try_set_num_threads(num_threads: usize) -> bool {
    if STARTED.load(Ordering::SeqCst) {
        log::debug!(
            "ignoring attempt to resize the worker pool to {num_threads} threads: \
             a parallel region has already run"
        );
        return false;
    }
    global_pool(num_threads);
    true
}

/// Run `f` inside the global pool, returning its result.
pub fn install<R: Send>(num_threads: usize, f: impl FnOnce() -> R + Send) -> R {
    global_pool(num_threads).install(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_reports_requested_thread_count_on_first_use() {
        // This test runs in a process shared with other tests, so we can
        // only assert the pool exists and is usable, not its exact size
        // (another test may have initialized it first).
        let pool = global_pool(4);
        let sum: i32 = pool.install(|| (0..100).sum());
        assert_eq!(sum, 4950);
    }
}
