//! Per-operation latency recorder with round-robin windows.
//!
//! A [`Recorder`] sits on the hot path of every monitored call. It keeps a
//! fixed ring of window slots; `record` accumulates into the active slot and,
//! when the wall clock has moved past the active window, first closes it into
//! a [`WindowSnapshot`] for the processor and advances to the next slot.

mod percentiles;
mod snapshot;
mod throttle;
mod window;

pub use percentiles::PercentileSet;
pub use snapshot::WindowSnapshot;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::clock::Clock;
use crate::error::{RecordError, RegistryError};
use crate::processor::RecordProcessor;
use throttle::LogThrottle;
use window::Slot;

// ─── Configuration ───────────────────────────────────────────────

/// Minimum spacing between two "invalid observation" warnings per recorder.
const REJECTION_LOG_INTERVAL_MS: u64 = 10_000;

/// Per-operation thresholds, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// A call is slow when its duration is strictly greater than this.
    pub slow_threshold_ms: u64,
    /// Slow calls per window tolerated before the window is flagged.
    pub slow_count_limit: u64,
}

/// Window geometry shared by every recorder of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSettings {
    pub interval: Duration,
    pub slots: usize,
}

impl WindowSettings {
    pub const MIN_SLOTS: usize = 2;

    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.interval_ms() == 0 {
            return Err(RegistryError::InvalidSettings(
                "window interval must be at least 1 ms".into(),
            ));
        }
        if self.slots < Self::MIN_SLOTS {
            return Err(RegistryError::InvalidSettings(format!(
                "at least {} window slots are required, got {}",
                Self::MIN_SLOTS,
                self.slots
            )));
        }
        Ok(())
    }

    pub(crate) fn interval_ms(&self) -> u64 {
        u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            slots: Self::MIN_SLOTS,
        }
    }
}

// ─── Recorder ────────────────────────────────────────────────────

/// Which slot is accumulating, and the half-open range it covers.
struct Cursor {
    active: usize,
    window_start_ms: u64,
    window_end_ms: u64,
}

/// Rolling latency statistics for one monitored operation.
///
/// `record` holds the cursor's read lock plus the active slot's mutex, so
/// concurrent callers only contend on a short accumulate. Rotation takes the
/// cursor's write lock, which makes the hand-off atomic: every observation
/// lands in the window that was open when it acquired the read lock.
pub struct Recorder {
    key: Arc<str>,
    config: RecorderConfig,
    interval_ms: u64,
    clock: Arc<dyn Clock>,
    processor: Arc<dyn RecordProcessor>,
    cursor: RwLock<Cursor>,
    slots: Box<[Mutex<Slot>]>,
    rejected: AtomicU64,
    rejection_log: LogThrottle,
}

impl Recorder {
    pub fn new(
        key: Arc<str>,
        config: RecorderConfig,
        settings: WindowSettings,
        clock: Arc<dyn Clock>,
        processor: Arc<dyn RecordProcessor>,
    ) -> Result<Self, RegistryError> {
        settings.validate()?;
        let interval_ms = settings.interval_ms();

        let slots = (0..settings.slots)
            .map(|_| Slot::new().map(Mutex::new))
            .collect::<Result<Vec<_>, _>>()?
            .into_boxed_slice();

        let window_start_ms = align(clock.now_millis(), interval_ms);

        Ok(Self {
            key,
            config,
            interval_ms,
            clock,
            processor,
            cursor: RwLock::new(Cursor {
                active: 0,
                window_start_ms,
                window_end_ms: window_start_ms.saturating_add(interval_ms),
            }),
            slots,
            rejected: AtomicU64::new(0),
            rejection_log: LogThrottle::new(REJECTION_LOG_INTERVAL_MS),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> RecorderConfig {
        self.config
    }

    /// Number of observations rejected as invalid so far.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Record one call duration into the currently open window.
    ///
    /// Negative or non-finite durations are rejected with
    /// [`RecordError::InvalidObservation`] and leave the window untouched.
    pub fn record(&self, duration_ms: f64) -> Result<(), RecordError> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(RecordError::InvalidObservation {
                key: Arc::clone(&self.key),
                value: duration_ms,
            });
        }

        let now = self.clock.now_millis();
        if let Some(closed) = self.rotate_if_elapsed(now) {
            self.emit(closed);
        }

        let slow = duration_ms > self.config.slow_threshold_ms as f64;
        let cursor = self.cursor.read();
        self.slots[cursor.active].lock().observe(duration_ms, slow);
        Ok(())
    }

    /// Like [`record`](Self::record), but absorbs rejections: they are
    /// counted and reported through a throttled warning instead.
    pub fn observe(&self, duration_ms: f64) {
        if let Err(err) = self.record(duration_ms) {
            if let Some(suppressed) = self.rejection_log.should_emit(self.clock.now_millis()) {
                warn!(
                    operation = %self.key,
                    suppressed,
                    rejected_total = self.rejected(),
                    "{err}"
                );
            }
        }
    }

    pub fn record_elapsed(&self, elapsed: Duration) {
        self.observe(elapsed.as_secs_f64() * 1_000.0);
    }

    /// Close the open window now, even if its interval has not elapsed, and
    /// hand it to the processor. Returns whether a window was emitted.
    ///
    /// A partial window ends at the flush instant; the next window starts
    /// there and keeps the original boundary, so ranges never overlap.
    pub fn flush(&self) -> bool {
        let now = self.clock.now_millis();
        let closed = {
            let mut cursor = self.cursor.write();
            let end = cursor.window_end_ms;
            if now >= end {
                let start = align(now, self.interval_ms);
                self.close(
                    &mut cursor,
                    end,
                    start,
                    start.saturating_add(self.interval_ms),
                )
            } else {
                let flush_at = now.max(cursor.window_start_ms);
                self.close(&mut cursor, flush_at, flush_at, end)
            }
        };

        match closed {
            Some(window) => {
                self.emit(window);
                true
            }
            None => false,
        }
    }

    /// Live view of the open window. Does not close or reset anything.
    pub fn current(&self) -> WindowSnapshot {
        let cursor = self.cursor.read();
        let slot = self.slots[cursor.active].lock();
        slot.summarize(
            &self.key,
            cursor.window_start_ms,
            cursor.window_end_ms,
            self.config,
        )
    }

    fn rotate_if_elapsed(&self, now: u64) -> Option<WindowSnapshot> {
        if now < self.cursor.read().window_end_ms {
            return None;
        }

        let mut cursor = self.cursor.write();
        // Another caller may have rotated while we waited for the write lock
        if now < cursor.window_end_ms {
            return None;
        }
        let end = cursor.window_end_ms;
        let start = align(now, self.interval_ms);
        self.close(
            &mut cursor,
            end,
            start,
            start.saturating_add(self.interval_ms),
        )
    }

    /// Summarize the active slot (if it saw anything), then advance the ring.
    /// Caller must hold the cursor write lock.
    fn close(
        &self,
        cursor: &mut Cursor,
        closed_end_ms: u64,
        next_start_ms: u64,
        next_end_ms: u64,
    ) -> Option<WindowSnapshot> {
        let closed = {
            let slot = self.slots[cursor.active].lock();
            (slot.count() > 0).then(|| {
                slot.summarize(
                    &self.key,
                    cursor.window_start_ms,
                    closed_end_ms,
                    self.config,
                )
            })
        };

        let next = (cursor.active + 1) % self.slots.len();
        self.slots[next].lock().reset();

        cursor.active = next;
        cursor.window_start_ms = next_start_ms;
        cursor.window_end_ms = next_end_ms;
        closed
    }

    /// Deliver a closed window outside any lock. A panicking processor must
    /// not unwind into the monitored call.
    fn emit(&self, window: WindowSnapshot) {
        let processor = &self.processor;
        if panic::catch_unwind(AssertUnwindSafe(|| processor.process(window))).is_err() {
            error!(operation = %self.key, "record processor panicked; window dropped");
        }
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("key", &self.key)
            .field("config", &self.config)
            .field("interval_ms", &self.interval_ms)
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}

fn align(now_ms: u64, interval_ms: u64) -> u64 {
    now_ms - now_ms % interval_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::processor::RecentWindows;
    use proptest::prelude::*;

    const CONFIG: RecorderConfig = RecorderConfig {
        slow_threshold_ms: 100,
        slow_count_limit: 5,
    };

    fn settings(interval_ms: u64) -> WindowSettings {
        WindowSettings {
            interval: Duration::from_millis(interval_ms),
            slots: 2,
        }
    }

    fn recorder_at(
        start_ms: u64,
        interval_ms: u64,
    ) -> (Recorder, Arc<ManualClock>, Arc<RecentWindows>) {
        let clock = Arc::new(ManualClock::new(start_ms));
        let sink = Arc::new(RecentWindows::new(64));
        let recorder = Recorder::new(
            Arc::from("OrderService.placeOrder"),
            CONFIG,
            settings(interval_ms),
            clock.clone(),
            sink.clone(),
        )
        .unwrap();
        (recorder, clock, sink)
    }

    #[test]
    fn end_to_end_window_summary() {
        let (recorder, _clock, sink) = recorder_at(0, 60_000);
        for d in [50.0, 120.0, 90.0, 200.0, 30.0] {
            recorder.record(d).unwrap();
        }

        assert!(recorder.flush());
        let windows = sink.windows();
        assert_eq!(windows.len(), 1);
        let w = &windows[0];
        assert_eq!(w.operation_key, "OrderService.placeOrder");
        assert_eq!(w.count, 5);
        assert_eq!(w.slow_count, 2);
        assert_eq!(w.min_ms, 30.0);
        assert_eq!(w.max_ms, 200.0);
        assert_eq!(w.slow_threshold_ms, 100);
        assert_eq!(w.slow_count_limit, 5);
        assert!(!w.is_flagged());
    }

    #[test]
    fn threshold_boundary_is_strict() {
        let (recorder, _clock, _sink) = recorder_at(0, 1_000);

        recorder.record(100.0).unwrap();
        assert_eq!(recorder.current().slow_count, 0);

        recorder.record(100.001).unwrap();
        assert_eq!(recorder.current().slow_count, 1);
        assert_eq!(recorder.current().count, 2);
    }

    #[test]
    fn invalid_observations_are_rejected_and_leave_window_unchanged() {
        let (recorder, _clock, _sink) = recorder_at(0, 1_000);
        recorder.record(10.0).unwrap();
        let before = recorder.current();

        for bad in [-1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = recorder.record(bad).unwrap_err();
            assert!(matches!(err, RecordError::InvalidObservation { .. }));
        }

        assert_eq!(recorder.current(), before);
        assert_eq!(recorder.rejected(), 4);
    }

    #[test]
    fn observe_absorbs_rejections() {
        let (recorder, _clock, _sink) = recorder_at(0, 1_000);
        recorder.observe(-5.0);
        recorder.observe(-6.0);
        recorder.observe(7.0);

        assert_eq!(recorder.rejected(), 2);
        assert_eq!(recorder.current().count, 1);
    }

    #[test]
    fn rotation_produces_contiguous_aligned_windows() {
        let (recorder, clock, sink) = recorder_at(0, 1_000);

        for (at, d) in [
            (0, 1.0),
            (500, 2.0),
            (1_000, 3.0),
            (1_999, 4.0),
            (2_500, 5.0),
        ] {
            clock.set(at);
            recorder.record(d).unwrap();
        }
        clock.set(2_700);
        assert!(recorder.flush());

        let ranges: Vec<_> = sink
            .windows()
            .iter()
            .map(|w| (w.window_start_ms, w.window_end_ms, w.count))
            .collect();
        assert_eq!(
            ranges,
            vec![(0, 1_000, 2), (1_000, 2_000, 2), (2_000, 2_700, 1)]
        );
    }

    #[test]
    fn windows_wrap_around_the_slot_ring() {
        let (recorder, clock, sink) = recorder_at(0, 100);

        // Five windows through a two-slot ring; every slot must come back clean
        for window in 0..5u64 {
            clock.set(window * 100);
            for _ in 0..=window {
                recorder.record(1.0).unwrap();
            }
        }
        recorder.flush();

        let counts: Vec<_> = sink.windows().iter().map(|w| w.count).collect();
        assert_eq!(counts, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn idle_windows_are_not_emitted() {
        let (recorder, clock, sink) = recorder_at(0, 1_000);
        recorder.record(1.0).unwrap();

        clock.set(5_250);
        recorder.record(2.0).unwrap();

        let windows = sink.windows();
        assert_eq!(windows.len(), 1);
        assert_eq!(
            (windows[0].window_start_ms, windows[0].window_end_ms),
            (0, 1_000)
        );

        let open = recorder.current();
        assert_eq!(
            (open.window_start_ms, open.window_end_ms),
            (5_000, 6_000)
        );
        assert_eq!(open.count, 1);
    }

    #[test]
    fn idle_window_leaves_a_gap_between_emitted_ranges() {
        let (recorder, clock, sink) = recorder_at(0, 1_000);
        for at in [0, 2_500, 3_100] {
            clock.set(at);
            recorder.record(1.0).unwrap();
        }

        let ranges: Vec<_> = sink
            .windows()
            .iter()
            .map(|w| (w.window_start_ms, w.window_end_ms))
            .collect();
        // [1000, 2000) saw nothing and is skipped
        assert_eq!(ranges, vec![(0, 1_000), (2_000, 3_000)]);
        assert!(sink.windows().iter().all(|w| w.span_ms() == 1_000));
    }

    #[test]
    fn flush_of_empty_window_emits_nothing() {
        let (recorder, _clock, sink) = recorder_at(0, 1_000);
        assert!(!recorder.flush());
        assert!(sink.windows().is_empty());
    }

    #[test]
    fn partial_window_keeps_the_original_boundary() {
        let (recorder, clock, sink) = recorder_at(0, 1_000);
        clock.set(200);
        recorder.record(1.0).unwrap();
        clock.set(400);
        recorder.flush();

        clock.set(600);
        recorder.record(1.0).unwrap();
        clock.set(1_100);
        recorder.record(1.0).unwrap();

        let ranges: Vec<_> = sink
            .windows()
            .iter()
            .map(|w| (w.window_start_ms, w.window_end_ms))
            .collect();
        assert_eq!(ranges, vec![(0, 400), (400, 1_000)]);
    }

    #[test]
    fn panicking_processor_does_not_reach_the_caller() {
        let clock = Arc::new(ManualClock::new(0));
        let recorder = Recorder::new(
            Arc::from("Flaky.op"),
            CONFIG,
            settings(10),
            clock.clone(),
            Arc::new(|w: WindowSnapshot| {
                if w.count > 0 {
                    panic!("processor blew up");
                }
            }),
        )
        .unwrap();

        recorder.record(1.0).unwrap();
        clock.set(10);
        assert!(recorder.record(1.0).is_ok());
        assert_eq!(recorder.current().count, 1);
    }

    #[test]
    fn rejects_degenerate_settings() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let sink: Arc<dyn RecordProcessor> = Arc::new(RecentWindows::new(1));
        for bad in [
            WindowSettings {
                interval: Duration::ZERO,
                slots: 2,
            },
            WindowSettings {
                interval: Duration::from_secs(1),
                slots: 1,
            },
        ] {
            let err = Recorder::new(
                Arc::from("k"),
                CONFIG,
                bad,
                clock.clone(),
                sink.clone(),
            )
            .unwrap_err();
            assert!(matches!(err, RegistryError::InvalidSettings(_)));
        }
    }

    proptest! {
        #[test]
        fn slow_count_matches_strictly_greater_durations(
            threshold in 0u64..500,
            durations in prop::collection::vec(0.0f64..1_000.0, 0..64),
        ) {
            let clock = Arc::new(ManualClock::new(0));
            let recorder = Recorder::new(
                Arc::from("Prop.op"),
                RecorderConfig { slow_threshold_ms: threshold, slow_count_limit: 0 },
                settings(1_000),
                clock,
                Arc::new(RecentWindows::new(1)),
            ).unwrap();

            for d in &durations {
                recorder.record(*d).unwrap();
            }

            let expected = durations.iter().filter(|d| **d > threshold as f64).count() as u64;
            let open = recorder.current();
            prop_assert_eq!(open.slow_count, expected);
            prop_assert_eq!(open.count, durations.len() as u64);
        }
    }
}
