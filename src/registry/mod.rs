//! Operation key → recorder mapping.
//!
//! The registry has two phases. During startup a [`RegistryBuilder`] accepts
//! (possibly concurrent, possibly repeated) registrations. [`build`] then
//! freezes the mapping into a [`RecorderRegistry`], which only serves reads
//! for the rest of the process.
//!
//! [`build`]: RegistryBuilder::build

mod factory;

pub use factory::RecorderFactory;

use std::collections::HashMap;
use std::sync::Arc;

use rustc_hash::{FxBuildHasher, FxHashMap};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::RegistryError;
use crate::processor::RecordProcessor;
use crate::recorder::{Recorder, RecorderConfig, WindowSettings};

/// Floor for the frozen map's capacity; it is otherwise 2.5x the key count.
const MIN_CAPACITY: usize = 1024;

// ─── Build phase ─────────────────────────────────────────────────

pub struct RegistryBuilder {
    factory: RecorderFactory,
    processor: Option<Arc<dyn RecordProcessor>>,
}

impl RegistryBuilder {
    pub fn new(settings: WindowSettings) -> Result<Self, RegistryError> {
        settings.validate()?;
        Ok(Self {
            factory: RecorderFactory::new(settings, Arc::new(SystemClock)),
            processor: None,
        })
    }

    /// Replace the wall clock used by recorders registered from now on.
    /// Recorders already registered keep their clock and their config.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.factory.set_clock(clock);
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn RecordProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Register `key` with `config`, or return the recorder already
    /// registered under `key`. The first registration's config wins.
    pub fn register(
        &self,
        key: &str,
        config: RecorderConfig,
    ) -> Result<Arc<Recorder>, RegistryError> {
        let processor = self.require_processor()?;
        let recorder = self.factory.get_or_create(key, config, processor)?;
        if recorder.config() != config {
            debug!(
                operation = key,
                kept = ?recorder.config(),
                ignored = ?config,
                "duplicate registration; keeping first config"
            );
        }
        Ok(recorder)
    }

    pub fn len(&self) -> usize {
        self.factory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factory.is_empty()
    }

    /// Freeze the registrations into a read-only registry.
    pub fn build(self) -> Result<RecorderRegistry, RegistryError> {
        self.require_processor()?;

        let settings = self.factory.settings();
        let capacity = (self.factory.len() * 5 / 2).max(MIN_CAPACITY);
        let mut recorders = FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher);
        recorders.extend(self.factory.into_entries());

        info!(
            recorders = recorders.len(),
            window_ms = settings.interval_ms(),
            slots = settings.slots,
            "recorder registry ready"
        );

        Ok(RecorderRegistry {
            settings,
            recorders,
        })
    }

    fn require_processor(&self) -> Result<&Arc<dyn RecordProcessor>, RegistryError> {
        self.processor
            .as_ref()
            .ok_or(RegistryError::Uninitialized("record processor"))
    }
}

// ─── Serve phase ─────────────────────────────────────────────────

/// Frozen, lock-free registry queried on every monitored call.
pub struct RecorderRegistry {
    settings: WindowSettings,
    recorders: FxHashMap<Arc<str>, Arc<Recorder>>,
}

impl RecorderRegistry {
    /// Recorder for `key`, or `None` when the operation is not monitored.
    #[inline]
    pub fn lookup(&self, key: &str) -> Option<&Arc<Recorder>> {
        self.recorders.get(key)
    }

    /// Point-in-time copy of the whole mapping, for diagnostics.
    pub fn snapshot_all(&self) -> HashMap<Arc<str>, Arc<Recorder>> {
        self.recorders
            .iter()
            .map(|(k, v)| (Arc::clone(k), Arc::clone(v)))
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.recorders.keys().map(|k| &**k)
    }

    pub fn len(&self) -> usize {
        self.recorders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorders.is_empty()
    }

    pub fn settings(&self) -> WindowSettings {
        self.settings
    }

    /// Close every open window. Returns how many windows were emitted.
    pub fn flush_all(&self) -> usize {
        self.recorders.values().filter(|r| r.flush()).count()
    }
}

impl std::fmt::Debug for RecorderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecorderRegistry")
            .field("settings", &self.settings)
            .field("recorders", &self.recorders.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::processor::RecentWindows;

    const FAST: RecorderConfig = RecorderConfig {
        slow_threshold_ms: 50,
        slow_count_limit: 3,
    };
    const LAX: RecorderConfig = RecorderConfig {
        slow_threshold_ms: 500,
        slow_count_limit: 30,
    };

    fn builder() -> RegistryBuilder {
        RegistryBuilder::new(WindowSettings::default())
            .unwrap()
            .with_clock(Arc::new(ManualClock::new(0)))
            .with_processor(Arc::new(RecentWindows::new(16)))
    }

    #[test]
    fn first_registration_wins() {
        let builder = builder();
        let first = builder.register("Foo.bar", FAST).unwrap();
        let second = builder.register("Foo.bar", LAX).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.config(), FAST);
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn swapping_the_clock_keeps_existing_registrations() {
        let builder = builder();
        let first = builder.register("Foo.bar", FAST).unwrap();

        let builder = builder.with_clock(Arc::new(ManualClock::new(5_000)));
        assert_eq!(builder.len(), 1);

        let again = builder.register("Foo.bar", LAX).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.config(), FAST);

        let registry = builder.build().unwrap();
        assert!(Arc::ptr_eq(&first, registry.lookup("Foo.bar").unwrap()));
    }

    #[test]
    fn distinct_keys_get_distinct_stable_recorders() {
        let builder = builder();
        builder.register("Foo.bar", FAST).unwrap();
        builder.register("Foo.baz", FAST).unwrap();
        let registry = builder.build().unwrap();

        let bar = registry.lookup("Foo.bar").unwrap();
        let baz = registry.lookup("Foo.baz").unwrap();
        assert!(!Arc::ptr_eq(bar, baz));
        assert!(Arc::ptr_eq(bar, registry.lookup("Foo.bar").unwrap()));
        assert_eq!(bar.key(), "Foo.bar");
    }

    #[test]
    fn unknown_key_is_a_silent_miss() {
        let registry = builder().build().unwrap();
        assert!(registry.lookup("Nobody.home").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn missing_processor_fails_fast() {
        let builder = RegistryBuilder::new(WindowSettings::default()).unwrap();
        assert!(matches!(
            builder.register("Foo.bar", FAST),
            Err(RegistryError::Uninitialized(_))
        ));
        assert!(matches!(builder.build(), Err(RegistryError::Uninitialized(_))));
    }

    #[test]
    fn snapshot_is_detached_from_the_registry() {
        let builder = builder();
        builder.register("Foo.bar", FAST).unwrap();
        let registry = builder.build().unwrap();

        let mut copy = registry.snapshot_all();
        copy.clear();

        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("Foo.bar").is_some());
    }

    #[test]
    fn flush_all_counts_emitted_windows() {
        let sink = Arc::new(RecentWindows::new(16));
        let builder = RegistryBuilder::new(WindowSettings::default())
            .unwrap()
            .with_clock(Arc::new(ManualClock::new(0)))
            .with_processor(sink.clone());
        builder.register("A.a", FAST).unwrap();
        builder.register("B.b", FAST).unwrap();
        let registry = builder.build().unwrap();

        registry.lookup("A.a").unwrap().record(1.0).unwrap();

        assert_eq!(registry.flush_all(), 1);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.windows()[0].operation_key, "A.a");
    }
}
