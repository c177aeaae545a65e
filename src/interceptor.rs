//! Timing helpers for the code that wraps monitored calls.
//!
//! Monitoring is best effort: an unmonitored key skips timing entirely, and
//! nothing here can change the wrapped call's own result.

use std::sync::Arc;
use std::time::Instant;

use crate::recorder::Recorder;
use crate::registry::RecorderRegistry;

/// Records the elapsed time since creation into its recorder when dropped.
/// Works across `.await` points, unlike [`RecorderRegistry::profile`].
#[must_use = "the call is timed until the timer is dropped"]
pub struct CallTimer<'a> {
    recorder: &'a Arc<Recorder>,
    started: Instant,
}

impl CallTimer<'_> {
    pub fn recorder(&self) -> &Recorder {
        self.recorder
    }
}

impl Drop for CallTimer<'_> {
    fn drop(&mut self) {
        self.recorder.record_elapsed(self.started.elapsed());
    }
}

impl RecorderRegistry {
    /// Run `f`, timing it if `key` is monitored.
    pub fn profile<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        match self.lookup(key) {
            Some(recorder) => {
                let started = Instant::now();
                let out = f();
                recorder.record_elapsed(started.elapsed());
                out
            }
            None => f(),
        }
    }

    /// Start timing a call to `key`; `None` when the key is not monitored.
    pub fn start_timer(&self, key: &str) -> Option<CallTimer<'_>> {
        self.lookup(key).map(|recorder| CallTimer {
            recorder,
            started: Instant::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::processor::RecentWindows;
    use crate::recorder::{RecorderConfig, WindowSettings};
    use crate::registry::RegistryBuilder;

    fn registry() -> RecorderRegistry {
        let builder = RegistryBuilder::new(WindowSettings::default())
            .unwrap()
            .with_clock(Arc::new(ManualClock::new(0)))
            .with_processor(Arc::new(RecentWindows::new(4)));
        builder
            .register(
                "Search.query",
                RecorderConfig {
                    slow_threshold_ms: 100,
                    slow_count_limit: 1,
                },
            )
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn profile_records_monitored_calls_and_passes_results_through() {
        let registry = registry();

        let ok: Result<u32, String> = registry.profile("Search.query", || Ok(7));
        let err: Result<u32, String> = registry.profile("Search.query", || Err("boom".into()));

        assert_eq!(ok, Ok(7));
        assert_eq!(err, Err("boom".to_string()));
        assert_eq!(registry.lookup("Search.query").unwrap().current().count, 2);
    }

    #[test]
    fn unmonitored_calls_still_run() {
        let registry = registry();
        assert_eq!(registry.profile("Other.op", || 42), 42);
        assert!(registry.start_timer("Other.op").is_none());
    }

    #[test]
    fn timer_records_on_drop() {
        let registry = registry();
        {
            let timer = registry.start_timer("Search.query").unwrap();
            assert_eq!(timer.recorder().key(), "Search.query");
        }
        assert_eq!(registry.lookup("Search.query").unwrap().current().count, 1);
    }
}
