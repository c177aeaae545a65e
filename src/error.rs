//! Error types shared across the crate.

use std::sync::Arc;

use thiserror::Error;

/// Rejections raised by [`Recorder::record`](crate::recorder::Recorder::record).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// The duration was negative, NaN or infinite. This is a measurement bug
    /// in the caller; the observation is dropped, never coerced.
    #[error("invalid observation for {key}: {value} ms (must be finite and non-negative)")]
    InvalidObservation { key: Arc<str>, value: f64 },
}

/// Failures while wiring or populating the recorder registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A required collaborator was never supplied.
    #[error("recorder registry is not initialized: {0} is required")]
    Uninitialized(&'static str),

    #[error("invalid window settings: {0}")]
    InvalidSettings(String),

    #[error("operation key must not be empty")]
    EmptyKey,

    #[error("failed to allocate latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

/// Startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid logging.level '{0}'; expected one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}
