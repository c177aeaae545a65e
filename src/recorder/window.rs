use hdrhistogram::Histogram;

use super::percentiles::PercentileSet;
use super::snapshot::WindowSnapshot;
use super::RecorderConfig;
use crate::error::RegistryError;

/// HdrHistogram range: 1 µs → 1 h, 2 significant figures.
/// u32 counts keep each slot around a dozen KiB.
const HIST_LOW_US: u64 = 1;
const HIST_HIGH_US: u64 = 3_600_000_000;
const HIST_SIGFIG: u8 = 2;

/// Running totals for one window. A recorder owns a fixed ring of these and
/// resets them in place on rotation.
pub(crate) struct Slot {
    count: u64,
    slow_count: u64,
    total_ms: f64,
    min_ms: f64,
    max_ms: f64,
    hist: Histogram<u32>,
}

impl Slot {
    pub(crate) fn new() -> Result<Self, RegistryError> {
        Ok(Self {
            count: 0,
            slow_count: 0,
            total_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
            hist: Histogram::new_with_bounds(HIST_LOW_US, HIST_HIGH_US, HIST_SIGFIG)?,
        })
    }

    /// Accumulate one already-validated duration.
    pub(crate) fn observe(&mut self, duration_ms: f64, slow: bool) {
        if self.count == 0 {
            self.min_ms = duration_ms;
            self.max_ms = duration_ms;
        } else {
            self.min_ms = self.min_ms.min(duration_ms);
            self.max_ms = self.max_ms.max(duration_ms);
        }
        self.count += 1;
        if slow {
            self.slow_count += 1;
        }
        self.total_ms += duration_ms;

        // Clamp to ≥ 1 µs; out-of-range values saturate at the top bucket
        let us = (duration_ms * 1_000.0).round() as u64;
        self.hist.saturating_record(us.max(HIST_LOW_US));
    }

    pub(crate) fn count(&self) -> u64 {
        self.count
    }

    pub(crate) fn reset(&mut self) {
        self.count = 0;
        self.slow_count = 0;
        self.total_ms = 0.0;
        self.min_ms = 0.0;
        self.max_ms = 0.0;
        self.hist.reset();
    }

    pub(crate) fn summarize(
        &self,
        key: &str,
        window_start_ms: u64,
        window_end_ms: u64,
        config: RecorderConfig,
    ) -> WindowSnapshot {
        let mean_ms = if self.count > 0 {
            self.total_ms / self.count as f64
        } else {
            0.0
        };

        WindowSnapshot {
            operation_key: key.to_owned(),
            window_start_ms,
            window_end_ms,
            count: self.count,
            slow_count: self.slow_count,
            total_ms: self.total_ms,
            min_ms: self.min_ms,
            max_ms: self.max_ms,
            mean_ms,
            percentiles: PercentileSet::from_histogram(&self.hist),
            slow_threshold_ms: config.slow_threshold_ms,
            slow_count_limit: config.slow_count_limit,
        }
    }
}
