use axum::{
    extract::{MatchedPath, Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::catalog::ADMIN_TYPE;
use crate::recorder::Recorder;
use crate::registry::RecorderRegistry;
use crate::state::AppState;

/// Admin route recorders indexed by method and matched route, so a request
/// finds its recorder without building the `AdminApi.{METHOD} {route}` key.
#[derive(Default)]
pub struct RouteRecorders {
    by_method: FxHashMap<Method, FxHashMap<Box<str>, Arc<Recorder>>>,
}

impl RouteRecorders {
    /// Collect every registered `AdminApi.{METHOD} {route}` recorder.
    pub fn from_registry(registry: &RecorderRegistry) -> Self {
        let mut routes = Self::default();

        for key in registry.keys() {
            let Some((method, route)) = key
                .strip_prefix(ADMIN_TYPE)
                .and_then(|rest| rest.strip_prefix('.'))
                .and_then(|op| op.split_once(' '))
            else {
                continue;
            };
            let Ok(method) = Method::from_bytes(method.as_bytes()) else {
                continue;
            };
            if let Some(recorder) = registry.lookup(key) {
                routes
                    .by_method
                    .entry(method)
                    .or_default()
                    .insert(route.into(), Arc::clone(recorder));
            }
        }
        routes
    }

    pub fn get(&self, method: &Method, route: &str) -> Option<&Arc<Recorder>> {
        self.by_method.get(method)?.get(route)
    }

    pub fn len(&self) -> usize {
        self.by_method.values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Times every request and
///
///   - records it into the registry under `AdminApi.{METHOD} {route}`
///     when that key is monitored,
///   - adds `X-Response-Time-Us` and `Server-Timing` response headers.
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let route = req.extensions().get::<MatchedPath>().cloned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = elapsed.as_micros();

    // ── Record into the registry ────────────────────────────────
    // SSE connections live for minutes; their duration is meaningless
    if let Some(route) = route.as_ref().map(MatchedPath::as_str) {
        if !route.ends_with("/stream") {
            if let Some(recorder) = state.routes.get(&method, route) {
                recorder.record_elapsed(elapsed);
            }
        }
    }

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }

    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    debug!(
        status = response.status().as_u16(),
        %method,
        route = route.as_ref().map_or("-", MatchedPath::as_str),
        us = us as u64,
        "request"
    );

    response
}
