use std::num::NonZeroUsize;
use std::time::Duration;

/// Idle behaviour of a worker that observes neither work nor shutdown:
/// bounded spin/yield first, then sleeps in `sleep` increments. Tunables,
/// not contracts; the defaults trade a little wake latency for not burning
/// a core under light load.
#[derive(Clone, Copy, Debug)]
pub struct IdlePolicy {
    /// Backoff steps before the worker starts sleeping.
    pub max_spins: u32,
    /// Sleep length once spinning is exhausted.
    pub sleep: Duration,
}

impl Default for IdlePolicy {
    fn default() -> Self {
        IdlePolicy {
            max_spins: 64,
            sleep: Duration::from_micros(100),
        }
    }
}

/// Pool construction parameters. Capacity-affecting fields are fixed for the
/// pool's lifetime; the pool is never resized.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub(crate) threads: usize,
    pub(crate) name_prefix: String,
    pub(crate) denormal_as_zero: bool,
    pub(crate) shards: usize,
    pub(crate) idle: IdlePolicy,
}

impl PoolConfig {
    pub fn new(threads: usize) -> Self {
        PoolConfig {
            threads,
            name_prefix: "slot-pool".to_string(),
            denormal_as_zero: false,
            shards: 1,
            idle: IdlePolicy::default(),
        }
    }

    /// Worker threads are named `{prefix}-{index}`.
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Treat subnormal floats as zero inside kernels. Applied per worker
    /// thread at startup; the flag lives in a per-hardware-thread register,
    /// so it is never set process-wide.
    pub fn denormal_as_zero(mut self, enabled: bool) -> Self {
        self.denormal_as_zero = enabled;
        self
    }

    /// Split the slot array into `shards` sub-pools; callers start probing
    /// at the shard selected by their thread token. Must divide the thread
    /// count evenly.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    pub fn idle(mut self, idle: IdlePolicy) -> Self {
        self.idle = idle;
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        let threads = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        PoolConfig::new(threads)
    }
}
