use std::collections::VecDeque;

use parking_lot::Mutex;

use super::RecordProcessor;
use crate::recorder::WindowSnapshot;

/// Bounded history of the most recently closed windows, oldest first.
/// Backs the admin API's window listing.
pub struct RecentWindows {
    capacity: usize,
    inner: Mutex<VecDeque<WindowSnapshot>>,
}

impl RecentWindows {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn windows(&self) -> Vec<WindowSnapshot> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Only the windows whose slow count exceeded their limit.
    pub fn flagged(&self) -> Vec<WindowSnapshot> {
        self.inner
            .lock()
            .iter()
            .filter(|w| w.is_flagged())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordProcessor for RecentWindows {
    fn process(&self, window: WindowSnapshot) {
        let mut inner = self.inner.lock();
        if inner.len() >= self.capacity {
            inner.pop_front();
        }
        inner.push_back(window);
    }
}
