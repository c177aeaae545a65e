use hdrhistogram::{Counter, Histogram};
use serde::Serialize;

/// Latency distribution of one window, in microseconds.
/// Values come from the slot's HdrHistogram and carry its precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileSet {
    pub min_us: u64,
    pub max_us: u64,
    pub mean_us: f64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub p999_us: u64,
    pub count: u64,
}

impl PercentileSet {
    /// Extract a percentile set from an HdrHistogram.
    /// Returns zeroed values if the histogram is empty.
    pub fn from_histogram<T: Counter>(hist: &Histogram<T>) -> Self {
        if hist.len() == 0 {
            return Self::empty();
        }

        Self {
            min_us: hist.min(),
            max_us: hist.max(),
            mean_us: hist.mean(),
            p50_us: hist.value_at_percentile(50.0),
            p95_us: hist.value_at_percentile(95.0),
            p99_us: hist.value_at_percentile(99.0),
            p999_us: hist.value_at_percentile(99.9),
            count: hist.len(),
        }
    }

    /// All-zero placeholder for windows without observations.
    pub fn empty() -> Self {
        Self {
            min_us: 0,
            max_us: 0,
            mean_us: 0.0,
            p50_us: 0,
            p95_us: 0,
            p99_us: 0,
            p999_us: 0,
            count: 0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_yields_zeroes() {
        let hist = Histogram::<u32>::new_with_bounds(1, 1_000_000, 2).unwrap();
        let set = PercentileSet::from_histogram(&hist);
        assert!(!set.has_data());
        assert_eq!(set, PercentileSet::empty());
    }

    #[test]
    fn percentiles_follow_recorded_values() {
        let mut hist = Histogram::<u32>::new_with_bounds(1, 1_000_000, 3).unwrap();
        for v in 1..=100u64 {
            hist.record(v * 1_000).unwrap();
        }
        let set = PercentileSet::from_histogram(&hist);
        assert_eq!(set.count, 100);
        assert!(
            set.p50_us >= 49_000 && set.p50_us <= 51_000,
            "p50 = {}",
            set.p50_us
        );
        assert!(set.p99_us >= 98_000, "p99 = {}", set.p99_us);
        assert!(set.max_us >= 99_900);
    }
}
