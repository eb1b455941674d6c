//! Parallel work distribution for the split finder and the booster driver.
//!
//! [`WorkerPool`] wraps a `rayon::ThreadPoolBuilder` pool sized from
//! `threads_num`, the same pool-sizing shape as a `PoolSizes` trait with
//! `fixed()`/`from_cpu_cores()` constructors. There is deliberately no
//! process-global pool: it is owned by the training call and torn down at
//! its end.

mod pool;

pub use pool::WorkerPool;
