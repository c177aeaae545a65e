//! In-process latency recording for monitored operations.
//!
//! Operations are identified by a stable key (`"Type.operation"`). At startup
//! a [`RegistryBuilder`] registers one [`Recorder`] per key; the frozen
//! [`RecorderRegistry`] is then consulted on every monitored call. Each
//! recorder rolls its statistics over fixed windows and hands every closed
//! window to a [`RecordProcessor`].

pub mod catalog;
pub mod clock;
pub mod config;
pub mod discovery;
pub mod error;
pub mod handlers;
pub mod interceptor;
pub mod load_generator;
pub mod logging;
pub mod middleware;
pub mod processor;
pub mod recorder;
pub mod registry;
pub mod server;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, RecordError, RegistryError};
pub use interceptor::CallTimer;
pub use processor::RecordProcessor;
pub use recorder::{Recorder, RecorderConfig, WindowSettings, WindowSnapshot};
pub use registry::{RecorderRegistry, RegistryBuilder};
