use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_utils::{Backoff, CachePadded};
use log::debug;

use crate::config::{IdlePolicy, PoolConfig};
use crate::error::PoolError;
use crate::layout::SlotLayout;
use crate::partition::{self, CostEstimate};
use crate::profiler::{Profiler, Transition};
use crate::slot::Slot;
use crate::stage::Stage;
use crate::task::{range_trampoline, RangeCall, Task};
use crate::worker;

// state shared between the pool handle and its workers
pub(crate) struct Shared {
    pub(crate) slots: Box<[CachePadded<Slot>]>,
    pub(crate) layout: SlotLayout,
    pub(crate) idle: IdlePolicy,
    pub(crate) denormal_as_zero: bool,
    pub(crate) profiler: Profiler,
    shutdown: AtomicBool,
}

impl Shared {
    #[inline]
    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}

/// Fixed-capacity, lock-free thread pool for range-parallel kernel
/// execution.
///
/// One worker thread per slot, one slot per worker; callers hand work to
/// workers through the slots' atomic stage fields alone. Capacity is fixed
/// at construction and the pool is never resized. Dropping the pool performs
/// the two-phase shutdown: publish the shutdown flag, then join every
/// worker.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        if config.threads == 0 {
            return Err(PoolError::InvalidThreadCount);
        }
        if config.shards == 0 || config.threads % config.shards != 0 {
            return Err(PoolError::InvalidLayout {
                shards: config.shards,
                threads: config.threads,
            });
        }

        let layout = if config.shards == 1 {
            SlotLayout::flat(config.threads)
        } else {
            SlotLayout::sharded(config.shards, config.threads / config.shards)
        };
        let slots: Box<[CachePadded<Slot>]> = (0..config.threads)
            .map(|_| CachePadded::new(Slot::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let shared = Arc::new(Shared {
            slots,
            layout,
            idle: config.idle,
            denormal_as_zero: config.denormal_as_zero,
            profiler: Profiler::new(),
            shutdown: AtomicBool::new(false),
        });

        let mut workers = Vec::with_capacity(config.threads);
        for index in 0..config.threads {
            let name = format!("{}-{}", config.name_prefix, index);
            match worker::spawn_worker(index, shared.clone(), name) {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    // partial startup: tear down what we already spawned
                    shared.shutdown.store(true, Ordering::Release);
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn(err));
                }
            }
        }

        debug!(
            "spawned {} worker threads across {} shard(s)",
            config.threads, config.shards
        );
        Ok(ThreadPool { shared, workers })
    }

    pub fn num_threads(&self) -> usize {
        self.shared.slots.len()
    }

    /// Run `f` over disjoint chunks of `[0, total)` sized by the cost
    /// estimate, blocking until every chunk is done. A pure function of its
    /// inputs: results are identical whether the range runs on one thread or
    /// on many.
    pub fn parallel_for(
        &self,
        total: u64,
        cost: impl Into<CostEstimate>,
        f: impl Fn(u64, u64) + Sync,
    ) -> Result<(), PoolError> {
        if self.shared.is_shutdown() {
            return Err(PoolError::ShuttingDown);
        }
        if total == 0 {
            return Ok(());
        }
        let parts = partition::workers_for(total, cost.into().per_element(), self.degree());
        self.run_chunked(total, parts, &f);
        Ok(())
    }

    /// Uniform-split variant: no per-element weighting, only count-based
    /// chunking, with `f` invoked once per index.
    pub fn simple_parallel_for(
        &self,
        total: u64,
        f: impl Fn(u64) + Sync,
    ) -> Result<(), PoolError> {
        if self.shared.is_shutdown() {
            return Err(PoolError::ShuttingDown);
        }
        if total == 0 {
            return Ok(());
        }
        let parts = (self.degree() as u64).min(total);
        self.run_chunked(total, parts, &|start, end| {
            for index in start..end {
                f(index);
            }
        });
        Ok(())
    }

    /// Publish a single fire-and-forget task and return without waiting.
    /// Guarantees only that the task eventually runs once; if every slot is
    /// busy it runs inline on the caller.
    pub fn schedule(&self, f: impl FnOnce() + Send + 'static) -> Result<(), PoolError> {
        if self.shared.is_shutdown() {
            return Err(PoolError::ShuttingDown);
        }
        let shared = &*self.shared;
        let claimed = shared
            .layout
            .probe_order(caller_token())
            .find(|&i| shared.slots[i].try_claim());
        match claimed {
            Some(i) => {
                shared.profiler.record(i, Transition::Claimed);
                let task = Task::detached(Box::new(f));
                // recorded before the Ready store: the worker may consume
                // the slot the instant publish returns
                shared.profiler.record(i, Transition::Published);
                // we hold the claim from try_claim
                unsafe { shared.slots[i].publish(task) };
            }
            None => f(),
        }
        Ok(())
    }

    pub fn start_profiling(&self) {
        debug!("profiling window opened");
        self.shared.profiler.start();
    }

    pub fn stop_profiling(&self) -> String {
        debug!("profiling window closed");
        self.shared.profiler.stop()
    }

    /// Snapshot of every slot's current stage, for monitoring.
    pub fn slot_stages(&self) -> Vec<Stage> {
        self.shared.slots.iter().map(|slot| slot.stage()).collect()
    }

    // degree of parallelism: worker threads plus the calling thread
    fn degree(&self) -> usize {
        self.shared.slots.len() + 1
    }

    fn run_chunked<F: Fn(u64, u64) + Sync>(&self, total: u64, parts: u64, f: &F) {
        // dispatch overhead would exceed the work: run on the caller alone
        if parts <= 1 {
            f(0, total);
            return;
        }

        let bounds: Vec<(u64, u64)> = partition::chunks(total, parts).collect();
        let Some((&last, to_publish)) = bounds.split_last() else {
            return;
        };

        // chunk descriptors must not move once their addresses are
        // published, so the full vec is built before any slot is touched
        let calls: Vec<RangeCall<F>> = to_publish
            .iter()
            .map(|&(start, end)| RangeCall {
                start,
                end,
                f: f as *const F,
            })
            .collect();

        let shared = &*self.shared;
        let mut published: Vec<usize> = Vec::with_capacity(calls.len());
        let mut overflow: Vec<&RangeCall<F>> = Vec::new();
        let mut probe = shared.layout.probe_order(caller_token());

        for call in &calls {
            let claimed = probe.by_ref().find(|&i| shared.slots[i].try_claim());
            match claimed {
                Some(i) => {
                    shared.profiler.record(i, Transition::Claimed);
                    let task = Task::borrowed(
                        call as *const RangeCall<F> as *const (),
                        range_trampoline::<F>,
                    );
                    shared.profiler.record(i, Transition::Published);
                    // claim held; `call` outlives the barrier below
                    unsafe { shared.slots[i].publish(task) };
                    published.push(i);
                }
                None => overflow.push(call),
            }
        }

        // once chunks are published, a caller-side panic would free the
        // descriptors while workers still hold pointers into them; fatal
        let guard = (!published.is_empty()).then(|| worker::AbortOnUnwind);

        // the caller always takes the final chunk
        f(last.0, last.1);

        // chunks that found no free slot run on the caller too; correctness
        // never depends on slot availability
        for call in overflow {
            f(call.start, call.end);
        }

        // full barrier: return only after observing Done on every published
        // chunk, then hand each slot back
        for &i in &published {
            let slot = &shared.slots[i];
            let backoff = Backoff::new();
            while slot.stage() != Stage::Done {
                backoff.snooze();
            }
            shared.profiler.record(i, Transition::Reclaimed);
            slot.reclaim();
        }

        std::mem::forget(guard);
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // two-phase shutdown: publish the flag, then join. Workers drain a
        // task already published to their slot before exiting.
        self.shared.shutdown.store(true, Ordering::Release);
        let workers = std::mem::take(&mut self.workers);
        for handle in workers {
            // a worker that died with a panic must not be silently absorbed
            if let Err(payload) = handle.join() {
                std::panic::resume_unwind(payload);
            }
        }
        debug!("all workers joined");
    }
}

fn caller_token() -> usize {
    let mut hasher = DefaultHasher::new();
    thread::current().id().hash(&mut hasher);
    hasher.finish() as usize
}
