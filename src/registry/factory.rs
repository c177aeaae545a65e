use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::clock::Clock;
use crate::error::RegistryError;
use crate::processor::RecordProcessor;
use crate::recorder::{Recorder, RecorderConfig, WindowSettings};

/// Guarantees a single [`Recorder`] per operation key.
///
/// `get_or_create` holds the key's shard lock while the recorder is built,
/// so racing callers for the same key all receive the one instance that was
/// constructed first.
pub struct RecorderFactory {
    settings: WindowSettings,
    clock: Arc<dyn Clock>,
    recorders: DashMap<Arc<str>, Arc<Recorder>>,
}

impl RecorderFactory {
    pub fn new(settings: WindowSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            recorders: DashMap::new(),
        }
    }

    /// Return the recorder for `key`, creating it with `config` if absent.
    /// `config` is ignored when the recorder already exists.
    pub fn get_or_create(
        &self,
        key: &str,
        config: RecorderConfig,
        processor: &Arc<dyn RecordProcessor>,
    ) -> Result<Arc<Recorder>, RegistryError> {
        if key.is_empty() {
            return Err(RegistryError::EmptyKey);
        }

        // Fast path: revisits during discovery are common
        if let Some(existing) = self.recorders.get(key) {
            return Ok(Arc::clone(existing.value()));
        }

        match self.recorders.entry(Arc::from(key)) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(vacant) => {
                let recorder = Arc::new(Recorder::new(
                    Arc::clone(vacant.key()),
                    config,
                    self.settings,
                    Arc::clone(&self.clock),
                    Arc::clone(processor),
                )?);
                vacant.insert(Arc::clone(&recorder));
                Ok(recorder)
            }
        }
    }

    /// Clock handed to recorders created after this call.
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    pub fn settings(&self) -> WindowSettings {
        self.settings
    }

    pub fn len(&self) -> usize {
        self.recorders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorders.is_empty()
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (Arc<str>, Arc<Recorder>)> {
        self.recorders.into_iter()
    }
}
