//! Control of the synthetic load generator.
//!
//! The `load_run` mutex serializes start and stop, so a stop never waits on
//! a run started after it.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

use crate::load_generator::{LoadParams, LoadRun, RunInfo};
use crate::state::AppState;

use super::AppError;

#[derive(Debug, Serialize)]
pub struct LoadStatus {
    pub running: bool,
    /// Latest run, if any has been started since boot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunInfo>,
}

/// `POST /api/load/start`
pub async fn start_load(
    State(state): State<Arc<AppState>>,
    Json(params): Json<LoadParams>,
) -> Result<Json<LoadStatus>, AppError> {
    params.validate().map_err(AppError::BadRequest)?;

    let mut slot = state.load_run.lock().await;
    if state
        .load_running
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(AppError::AlreadyRunning);
    }

    let run = LoadRun::spawn(state.load_running.clone(), state.registry.clone(), params);
    let info = run.info();
    info!(
        concurrency = params.concurrency,
        duration_secs = params.duration_secs,
        "load run started"
    );
    *slot = Some(run);

    Ok(Json(LoadStatus {
        running: true,
        run: Some(info),
    }))
}

/// `POST /api/load/stop`: idempotent; returns once every worker has exited.
pub async fn stop_load(State(state): State<Arc<AppState>>) -> Json<LoadStatus> {
    let mut slot = state.load_run.lock().await;
    let was_running = state.load_running.swap(false, Ordering::SeqCst);

    if let Some(run) = slot.as_mut() {
        run.join().await;
        if was_running {
            info!("load run stopped");
        }
    }

    Json(LoadStatus {
        running: false,
        run: slot.as_ref().map(LoadRun::info),
    })
}

/// `GET /api/load/status`
pub async fn load_status(State(state): State<Arc<AppState>>) -> Json<LoadStatus> {
    let slot = state.load_run.lock().await;
    Json(LoadStatus {
        running: state.load_running.load(Ordering::SeqCst),
        run: slot.as_ref().map(LoadRun::info),
    })
}
