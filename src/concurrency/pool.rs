//! A fixed-size worker pool, scoped to a single `train()` call.

use rayon::{ThreadPool, ThreadPoolBuilder};

/// Owns a rayon thread pool sized by `threads_num`. Built once per training
/// call, dropped at its end — never a process-global singleton.
pub struct WorkerPool {
    pool: ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// `threads_num == 0` means "use every available core", mirroring a
    /// `PoolSizes::from_cpu_cores()` constructor; any other value is taken
    /// literally.
    pub fn new(threads_num: usize) -> Self {
        let threads = if threads_num == 0 {
            num_cpus::get().max(1)
        } else {
            threads_num
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .expect("failed to build worker pool");
        log::debug!("worker pool built with {threads} thread(s)");
        Self { pool, threads }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Runs `f` inside the pool, blocking the caller until it returns.
    /// Used as the single suspension point between node expansion and the
    /// driver moving to the next stage.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_work_inside_the_pool() {
        let pool = WorkerPool::new(4);
        assert_eq!(pool.threads(), 4);
        let sum: i64 = pool.install(|| (0..100i64).sum());
        assert_eq!(sum, 4950);
    }

    #[test]
    fn zero_threads_means_auto_detected_core_count() {
        let pool = WorkerPool::new(0);
        assert!(pool.threads() >= 1);
    }
}
