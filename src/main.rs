use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use perf_recorder::catalog;
use perf_recorder::config::load_config;
use perf_recorder::discovery::{discover, register_all};
use perf_recorder::logging::init_logging;
use perf_recorder::processor::{Fanout, LoggingProcessor, RecentWindows};
use perf_recorder::registry::RegistryBuilder;
use perf_recorder::server;
use perf_recorder::state::AppState;

/// Latency recorder with an admin API and a synthetic load generator.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// YAML configuration file (optional; defaults apply when missing)
    #[arg(short, long, default_value = "perf-recorder.yaml")]
    config: PathBuf,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── 1. Configuration & logging ──────────────────────────────
    let mut config = load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }
    init_logging(&config.logging)?;

    // ── 2. Processors ───────────────────────────────────────────
    let windows = Arc::new(RecentWindows::new(config.recording.recent_windows));
    let processor = Fanout::new()
        .with(Arc::new(LoggingProcessor))
        .with(windows.clone());

    // ── 3. Discover monitored operations & build the registry ───
    let monitored = if config.monitored.is_empty() {
        info!("no monitored operations configured; using the built-in catalog");
        catalog::default_monitored()
    } else {
        config.monitored.clone()
    };

    let builder = RegistryBuilder::new(config.recording.window_settings())?
        .with_processor(Arc::new(processor));
    let discovery = discover(&monitored);
    register_all(&builder, &discovery)?;
    let registry = Arc::new(builder.build()?);

    // ── 4. Shared state & router ────────────────────────────────
    let state = Arc::new(AppState::new(registry.clone(), windows));
    let app = server::create_router(state);

    // ── 5. Bind & serve ─────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;

    info!(
        address = %config.bind_address,
        recorders = registry.len(),
        skipped = discovery.failures.len(),
        "admin API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server exited with error")?;

    // ── 6. Emit whatever is still open ──────────────────────────
    let flushed = registry.flush_all();
    info!(flushed, "shutdown complete");
    Ok(())
}
