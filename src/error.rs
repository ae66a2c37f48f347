use thiserror::Error;

/// Errors surfaced by pool construction and dispatch.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Construction with a zero thread count.
    #[error("thread count must be at least one")]
    InvalidThreadCount,

    /// The configured shard count cannot evenly cover the worker slots.
    #[error("{shards} shards cannot evenly cover {threads} worker slots")]
    InvalidLayout { shards: usize, threads: usize },

    /// Dispatch attempted after shutdown began; fails fast instead of
    /// blocking on workers that are draining.
    #[error("pool is shutting down")]
    ShuttingDown,

    /// The operating system refused to spawn a worker thread.
    #[error("failed to spawn worker thread")]
    Spawn(#[from] std::io::Error),
}
