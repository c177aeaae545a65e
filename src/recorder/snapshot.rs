use serde::Serialize;

use super::percentiles::PercentileSet;

/// Finalized statistics of one closed window, handed to the
/// [`RecordProcessor`](crate::processor::RecordProcessor).
///
/// The range is half-open: `[window_start_ms, window_end_ms)`. Windows that
/// saw no calls are never emitted, so consecutive snapshots of one operation
/// are non-overlapping but may leave gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub operation_key: String,
    pub window_start_ms: u64,
    pub window_end_ms: u64,

    // Counters
    pub count: u64,
    pub slow_count: u64,

    // Exact aggregates (ms)
    pub total_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,

    // Distribution (µs, histogram precision)
    pub percentiles: PercentileSet,

    // Operation config, carried for the processor's flagging decision
    pub slow_threshold_ms: u64,
    pub slow_count_limit: u64,
}

impl WindowSnapshot {
    /// True when the window saw more slow calls than the configured limit.
    pub fn is_flagged(&self) -> bool {
        self.slow_count > self.slow_count_limit
    }

    pub fn span_ms(&self) -> u64 {
        self.window_end_ms.saturating_sub(self.window_start_ms)
    }
}
