use parking_lot::Mutex;

#[derive(Debug)]
struct WindowState {
    window_started_ms: Option<u64>,
    suppressed: u64,
}

/// Rate limiter for repetitive diagnostics, one instance per source.
#[derive(Debug)]
pub(crate) struct LogThrottle {
    interval_ms: u64,
    state: Mutex<WindowState>,
}

impl LogThrottle {
    pub(crate) fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            state: Mutex::new(WindowState {
                window_started_ms: None,
                suppressed: 0,
            }),
        }
    }

    /// Returns `Some(suppressed_count)` when a log should be emitted at
    /// `now_ms`, otherwise `None` and the event is counted as suppressed.
    pub(crate) fn should_emit(&self, now_ms: u64) -> Option<u64> {
        let mut state = self.state.lock();
        match state.window_started_ms {
            Some(started) if now_ms.saturating_sub(started) < self.interval_ms => {
                state.suppressed += 1;
                None
            }
            _ => {
                let suppressed = state.suppressed;
                state.window_started_ms = Some(now_ms);
                state.suppressed = 0;
                Some(suppressed)
            }
        }
    }
}
