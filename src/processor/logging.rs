use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use super::RecordProcessor;
use crate::recorder::WindowSnapshot;

/// Writes one structured log line per closed window; flagged windows are
/// logged at WARN.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProcessor;

fn rfc3339(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

impl RecordProcessor for LoggingProcessor {
    fn process(&self, window: WindowSnapshot) {
        let from = rfc3339(window.window_start_ms);
        let to = rfc3339(window.window_end_ms);

        if window.is_flagged() {
            warn!(
                operation = %window.operation_key,
                from = %from,
                to = %to,
                count = window.count,
                slow_count = window.slow_count,
                slow_count_limit = window.slow_count_limit,
                slow_threshold_ms = window.slow_threshold_ms,
                p99_us = window.percentiles.p99_us,
                max_ms = window.max_ms,
                "slow call limit exceeded"
            );
        } else {
            info!(
                operation = %window.operation_key,
                from = %from,
                to = %to,
                count = window.count,
                slow_count = window.slow_count,
                mean_ms = window.mean_ms,
                p50_us = window.percentiles.p50_us,
                p99_us = window.percentiles.p99_us,
                max_ms = window.max_ms,
                "window closed"
            );
        }
    }
}
