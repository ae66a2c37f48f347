//! Cost model and chunk computation for range-parallel dispatch.

/// Caller-supplied estimate of the work in one element of an iteration
/// range, used to size chunks so that per-task overhead never dominates.
///
/// A plain `f64` converts into a pure compute estimate for callers that do
/// not track memory traffic.
#[derive(Clone, Copy, Debug, Default)]
pub struct CostEstimate {
    pub bytes_loaded: f64,
    pub bytes_stored: f64,
    pub compute_cycles: f64,
}

impl CostEstimate {
    pub fn new(bytes_loaded: f64, bytes_stored: f64, compute_cycles: f64) -> Self {
        CostEstimate {
            bytes_loaded,
            bytes_stored,
            compute_cycles,
        }
    }

    /// Collapse the estimate to a scalar cost per element.
    pub fn per_element(&self) -> f64 {
        self.bytes_loaded + self.bytes_stored + self.compute_cycles
    }
}

impl From<f64> for CostEstimate {
    fn from(compute_cycles: f64) -> Self {
        CostEstimate {
            bytes_loaded: 0.0,
            bytes_stored: 0.0,
            compute_cycles,
        }
    }
}

// cost below which an extra chunk is not worth the publish/consume handoff;
// a tunable calibrated against the dispatch overhead, not a hard contract
pub(crate) const MIN_CHUNK_COST: f64 = 20_000.0;

/// Number of participants a range of `total` elements should be split
/// across, given the per-element cost and the degree of parallelism
/// available (worker threads plus the calling thread).
pub(crate) fn workers_for(total: u64, cost_per_element: f64, degree: usize) -> u64 {
    let degree = degree.max(1) as u64;
    if total == 0 {
        return 0;
    }
    // an unknown or nonsensical estimate means "assume plenty of work"
    if !cost_per_element.is_finite() || cost_per_element < 0.0 {
        return degree.min(total);
    }
    let total_cost = total as f64 * cost_per_element;
    let by_cost = (total_cost / MIN_CHUNK_COST) as u64;
    by_cost.clamp(1, degree.min(total))
}

/// Disjoint contiguous chunks covering exactly `[0, total)`, at most `parts`
/// of them. The final chunk is truncated to the remainder.
pub(crate) fn chunks(total: u64, parts: u64) -> impl Iterator<Item = (u64, u64)> {
    let size = total.div_ceil(parts.max(1));
    (0..parts)
        .map(move |i| (i * size, ((i + 1) * size).min(total)))
        .take_while(|&(start, end)| start < end)
}
