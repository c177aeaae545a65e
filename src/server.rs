use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::timing;
use crate::state::AppState;

/// Builds the admin `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Registry introspection ──────────────────────────────
        .route("/api/recorders", get(handlers::admin::list_recorders))
        .route(
            "/api/recorders/stream",
            get(handlers::stream::recorders_stream),
        )
        .route("/api/recorders/:key", get(handlers::admin::get_recorder))
        .route("/api/windows", get(handlers::admin::list_windows))
        // ── Load generator control ──────────────────────────────
        .route("/api/load/start", post(handlers::load::start_load))
        .route("/api/load/stop", post(handlers::load::stop_load))
        .route("/api/load/status", get(handlers::load::load_status))
        .route("/health", get(|| async { "OK" }))
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            timing::timing_middleware,
        ))
        .layer(CorsLayer::permissive())
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
}
