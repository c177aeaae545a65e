use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::catalog::{SimulatedOperation, SIMULATED};
use crate::registry::RecorderRegistry;

pub const MAX_CONCURRENCY: u32 = 500;
pub const MAX_DURATION_SECS: u64 = 3_600;

// ─── Run parameters ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadParams {
    /// Concurrent workers, each calling one simulated operation at a time
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    #[serde(default = "default_duration")]
    pub duration_secs: u64,
}

fn default_concurrency() -> u32 {
    10
}

fn default_duration() -> u64 {
    30
}

impl Default for LoadParams {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            duration_secs: default_duration(),
        }
    }
}

impl LoadParams {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(format!(
                "concurrency must be in 1..={MAX_CONCURRENCY}, got {}",
                self.concurrency
            ));
        }
        if !(1..=MAX_DURATION_SECS).contains(&self.duration_secs) {
            return Err(format!(
                "duration_secs must be in 1..={MAX_DURATION_SECS}, got {}",
                self.duration_secs
            ));
        }
        Ok(())
    }
}

// ─── A spawned run ───────────────────────────────────────────────

/// A load run, in flight or finished. Dropping it detaches the task;
/// [`LoadRun::join`] waits for every worker to return.
pub struct LoadRun {
    params: LoadParams,
    started_at: DateTime<Utc>,
    handle: JoinHandle<()>,
    joined: bool,
}

/// What the admin API reports about a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    #[serde(flatten)]
    pub params: LoadParams,
    pub started_at: String,
    pub finished: bool,
}

impl LoadRun {
    /// Start `params.concurrency` workers. `running` must already be set.
    pub fn spawn(
        running: Arc<AtomicBool>,
        registry: Arc<RecorderRegistry>,
        params: LoadParams,
    ) -> Self {
        let handle = tokio::spawn(run(
            running,
            registry,
            params.concurrency,
            params.duration_secs,
        ));
        Self {
            params,
            started_at: Utc::now(),
            handle,
            joined: false,
        }
    }

    pub fn info(&self) -> RunInfo {
        RunInfo {
            params: self.params,
            started_at: self.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            finished: self.joined || self.handle.is_finished(),
        }
    }

    /// Wait for the run to end. Later calls return immediately.
    pub async fn join(&mut self) {
        if self.joined {
            return;
        }
        // A panicked run has already stopped recording; nothing to recover
        let _ = (&mut self.handle).await;
        self.joined = true;
    }
}

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that invoke simulated monitored
/// operations until the deadline or the `running` flag is set to false.
pub async fn run(
    running: Arc<AtomicBool>,
    registry: Arc<RecorderRegistry>,
    concurrency: u32,
    duration_secs: u64,
) {
    let deadline = Instant::now() + Duration::from_secs(duration_secs);
    info!(concurrency, duration_secs, "load generator started");

    let mut handles = Vec::with_capacity(concurrency as usize);

    for worker_id in 0..concurrency {
        let running = running.clone();
        let registry = registry.clone();

        handles.push(tokio::spawn(async move {
            worker(worker_id, running, registry, deadline).await
        }));
    }

    let mut calls = 0u64;
    for h in handles {
        calls += h.await.unwrap_or(0);
    }

    // Mark the run as finished
    running.store(false, Ordering::SeqCst);
    info!(calls, "load generator finished");
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(
    id: u32,
    running: Arc<AtomicBool>,
    registry: Arc<RecorderRegistry>,
    deadline: Instant,
) -> u64 {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);
    let ops: Vec<(String, SimulatedOperation)> =
        SIMULATED.iter().map(|op| (op.key(), *op)).collect();
    let mut calls = 0u64;

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        let (key, op) = &ops[rng.gen_range(0..ops.len())];
        let latency = op.sample_latency(&mut rng);

        // Unmonitored keys simply run untimed
        let timer = registry.start_timer(key);
        tokio::time::sleep(latency).await;
        drop(timer);

        calls += 1;
    }

    debug!(worker = id, calls, "worker stopped");
    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_monitored;
    use crate::discovery::{discover, register_all};
    use crate::processor::RecentWindows;
    use crate::recorder::WindowSettings;
    use crate::registry::RegistryBuilder;

    #[tokio::test]
    async fn stops_when_flag_is_cleared() {
        let sink = Arc::new(RecentWindows::new(64));
        let builder = RegistryBuilder::new(WindowSettings::default())
            .unwrap()
            .with_processor(sink.clone());
        register_all(&builder, &discover(&default_monitored())).unwrap();
        let registry = Arc::new(builder.build().unwrap());

        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(run(running.clone(), registry.clone(), 4, 30));

        tokio::time::sleep(Duration::from_millis(300)).await;
        running.store(false, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("load generator did not stop")
            .unwrap();

        registry.flush_all();
        let recorded: u64 = sink.windows().iter().map(|w| w.count).sum();
        assert!(recorded > 0);
    }

    #[test]
    fn params_are_bounded() {
        assert!(LoadParams::default().validate().is_ok());

        let zero = LoadParams {
            concurrency: 0,
            ..LoadParams::default()
        };
        assert!(zero.validate().unwrap_err().contains("concurrency"));

        let too_long = LoadParams {
            duration_secs: MAX_DURATION_SECS + 1,
            ..LoadParams::default()
        };
        assert!(too_long.validate().unwrap_err().contains("duration_secs"));
    }

    #[test]
    fn params_fill_missing_fields_with_defaults() {
        let params: LoadParams = serde_json::from_str(r#"{"concurrency": 3}"#).unwrap();
        assert_eq!(params.concurrency, 3);
        assert_eq!(params.duration_secs, 30);
    }

    #[tokio::test]
    async fn spawned_run_reports_and_joins() {
        let builder = RegistryBuilder::new(WindowSettings::default())
            .unwrap()
            .with_processor(Arc::new(RecentWindows::new(8)));
        let registry = Arc::new(builder.build().unwrap());

        let running = Arc::new(AtomicBool::new(true));
        let params = LoadParams {
            concurrency: 2,
            duration_secs: 60,
        };
        let mut run = LoadRun::spawn(running.clone(), registry, params);

        let info = run.info();
        assert_eq!(info.params, params);
        assert!(info.started_at.ends_with('Z'));

        running.store(false, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(5), run.join())
            .await
            .expect("run did not stop");
        assert!(run.info().finished);

        // Joining twice is a no-op
        run.join().await;
    }
}
