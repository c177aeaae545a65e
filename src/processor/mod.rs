//! Downstream consumers of closed windows.
//!
//! The core only promises to call [`RecordProcessor::process`] exactly once
//! per closed window. What happens next (logging, keeping a history for the
//! admin API, alerting) lives here.

mod logging;
mod recent;

pub use logging::LoggingProcessor;
pub use recent::RecentWindows;

use std::sync::Arc;

use crate::recorder::WindowSnapshot;

/// Receives every closed window of every recorder.
///
/// Called synchronously on the thread that triggered the rotation, so
/// implementations should return quickly.
pub trait RecordProcessor: Send + Sync {
    fn process(&self, window: WindowSnapshot);
}

impl<F> RecordProcessor for F
where
    F: Fn(WindowSnapshot) + Send + Sync,
{
    fn process(&self, window: WindowSnapshot) {
        self(window)
    }
}

/// Forwards each window to several processors, in order.
#[derive(Default)]
pub struct Fanout {
    targets: Vec<Arc<dyn RecordProcessor>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: Arc<dyn RecordProcessor>) -> Self {
        self.targets.push(target);
        self
    }
}

impl RecordProcessor for Fanout {
    fn process(&self, window: WindowSnapshot) {
        if let Some((last, rest)) = self.targets.split_last() {
            for target in rest {
                target.process(window.clone());
            }
            last.process(window);
        }
    }
}
