//! Runtime configuration: built-in defaults, then a YAML file, then
//! `PERF_RECORDER_*` environment variables (`__` separates nesting levels).

use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::discovery::MonitoredType;
use crate::error::ConfigError;
use crate::recorder::WindowSettings;

pub const ENV_PREFIX: &str = "PERF_RECORDER_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub bind_address: String,
    pub logging: LoggingConfig,
    pub recording: RecordingConfig,
    /// Operations to monitor. Empty means the built-in demo catalog.
    #[serde(default)]
    pub monitored: Vec<MonitoredType>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".into(),
            logging: LoggingConfig::default(),
            recording: RecordingConfig::default(),
            monitored: Vec::new(),
        }
    }
}

/// Controls how tracing output is initialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,  // trace, debug, info, warn, error
    pub format: String, // json or console
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "console".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    pub window_secs: u64,
    pub slots: usize,
    /// Closed windows kept in memory for the admin API.
    pub recent_windows: usize,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            slots: WindowSettings::MIN_SLOTS,
            recent_windows: 256,
        }
    }
}

impl RecordingConfig {
    pub fn window_settings(&self) -> WindowSettings {
        WindowSettings {
            interval: Duration::from_secs(self.window_secs),
            slots: self.slots,
        }
    }
}

impl AppConfig {
    /// Provider chain used by [`load_config`]; exposed so callers can merge
    /// extra providers on top.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

/// Load the configuration. A missing file is fine; a malformed one is not.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    Ok(AppConfig::figment(path).extract()?)
}
