// Slot-Pool: Lock-Free Slot-Based Thread Pool
// A thread pool for parallel tensor kernel execution, built around:
// - One cache-line-padded mailbox slot per worker, handed off through a
//   single atomic stage field (no queues, no locks on the hot path)
// - Cost-model driven range partitioning so chunk overhead never dominates
// - The calling thread participating as one unit of parallelism
// - Fixed capacity: the worker set never resizes after construction
//
// Safety
// Range-parallel closures are published to workers by raw pointer into the
// caller's stack. This is sound because every blocking dispatch barriers on
// completion of all of its published chunks before returning. Kernels
// submitted to the pool must not panic; a panicking task unwinds its worker
// thread and is treated as fatal.
mod config;
mod denormal;
mod error;
mod layout;
mod partition;
mod pool;
mod profiler;
mod slot;
mod stage;
mod task;
mod worker;

use std::num::NonZeroUsize;

pub use config::{IdlePolicy, PoolConfig};
pub use error::PoolError;
pub use layout::SlotLayout;
pub use partition::CostEstimate;
pub use pool::ThreadPool;
pub use stage::Stage;

// convenience function to create a pool sized to the machine
pub fn new() -> ThreadPool {
    let threads = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    with_threads(threads)
}

// create a pool with a specific worker thread count
pub fn with_threads(threads: usize) -> ThreadPool {
    ThreadPool::new(PoolConfig::new(threads)).expect("pool construction failed")
}
