use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::recorder::{Recorder, RecorderConfig, WindowSnapshot};
use crate::state::AppState;

use super::AppError;

// ─── Response types ──────────────────────────────────────────────

/// One registry entry as seen by the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct RecorderOverview {
    pub key: String,
    pub config: RecorderConfig,
    pub rejected: u64,
    /// The window still accumulating (not yet handed to the processor)
    pub open_window: WindowSnapshot,
}

impl RecorderOverview {
    pub fn of(recorder: &Recorder) -> Self {
        Self {
            key: recorder.key().to_owned(),
            config: recorder.config(),
            rejected: recorder.rejected(),
            open_window: recorder.current(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WindowFilter {
    #[serde(default)]
    pub flagged: bool,
}

/// Overview of every recorder, sorted by key.
pub fn overview(state: &AppState) -> Vec<RecorderOverview> {
    let mut all: Vec<_> = state
        .registry
        .snapshot_all()
        .values()
        .map(|r| RecorderOverview::of(r))
        .collect();
    all.sort_by(|a, b| a.key.cmp(&b.key));
    all
}

// ─── GET /api/recorders ──────────────────────────────────────────

pub async fn list_recorders(State(state): State<Arc<AppState>>) -> Json<Vec<RecorderOverview>> {
    Json(overview(&state))
}

// ─── GET /api/recorders/:key ─────────────────────────────────────

pub async fn get_recorder(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<RecorderOverview>, AppError> {
    state
        .registry
        .lookup(&key)
        .map(|r| Json(RecorderOverview::of(r)))
        .ok_or_else(|| AppError::NotFound(format!("{key} is not monitored")))
}

// ─── GET /api/windows ────────────────────────────────────────────

pub async fn list_windows(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<WindowFilter>,
) -> Json<Vec<WindowSnapshot>> {
    if filter.flagged {
        Json(state.windows.flagged())
    } else {
        Json(state.windows.windows())
    }
}
