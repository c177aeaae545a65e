use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::load_generator::LoadRun;
use crate::middleware::timing::RouteRecorders;
use crate::processor::RecentWindows;
use crate::registry::RecorderRegistry;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Frozen recorder registry.
    pub registry: Arc<RecorderRegistry>,

    /// Admin route recorders, resolved once from the registry.
    pub routes: RouteRecorders,

    /// History of closed windows fed by the record processor.
    pub windows: Arc<RecentWindows>,

    /// Flag checked by every load-generator worker on each iteration.
    pub load_running: Arc<AtomicBool>,

    /// Most recent load run, kept after it finishes so status can report it.
    pub load_run: tokio::sync::Mutex<Option<LoadRun>>,
}

impl AppState {
    pub fn new(registry: Arc<RecorderRegistry>, windows: Arc<RecentWindows>) -> Self {
        Self {
            routes: RouteRecorders::from_registry(&registry),
            registry,
            windows,
            load_running: Arc::new(AtomicBool::new(false)),
            load_run: tokio::sync::Mutex::new(None),
        }
    }
}
