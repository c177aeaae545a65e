//! Turns monitored-type descriptors into registrations.
//!
//! Descriptors are plain data (usually from the config file). Each type may
//! carry default thresholds; an operation's own thresholds replace the type
//! defaults entirely. A bad candidate is reported and skipped, never fatal.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::RegistryError;
use crate::recorder::RecorderConfig;
use crate::registry::RegistryBuilder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredType {
    pub type_name: String,
    #[serde(default)]
    pub defaults: Option<RecorderConfig>,
    #[serde(default)]
    pub operations: Vec<MonitoredOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredOperation {
    pub name: String,
    #[serde(default)]
    pub profiler: Option<RecorderConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredOperation {
    pub key: String,
    pub config: RecorderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryFailure {
    #[error("monitored type #{index} has an empty type_name")]
    EmptyTypeName { index: usize },

    #[error("type {type_name} declares an operation with an empty name")]
    EmptyOperationName { type_name: String },

    #[error("{key} has no profiler settings and its type declares no defaults")]
    MissingSettings { key: String },
}

/// Outcome of one discovery pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub operations: Vec<DiscoveredOperation>,
    pub failures: Vec<DiscoveryFailure>,
}

/// Key of a monitored operation: type name and operation name, no signature.
pub fn operation_key(type_name: &str, operation: &str) -> String {
    format!("{type_name}.{operation}")
}

pub fn discover(types: &[MonitoredType]) -> Discovery {
    let mut discovery = Discovery::default();

    for (index, ty) in types.iter().enumerate() {
        let type_name = ty.type_name.trim();
        if type_name.is_empty() {
            let failure = DiscoveryFailure::EmptyTypeName { index };
            discovery.failures.push(failure);
            continue;
        }

        for op in &ty.operations {
            let name = op.name.trim();
            if name.is_empty() {
                let failure = DiscoveryFailure::EmptyOperationName {
                    type_name: type_name.to_owned(),
                };
                discovery.failures.push(failure);
                continue;
            }

            let key = operation_key(type_name, name);
            let Some(config) = op.profiler.or(ty.defaults) else {
                let failure = DiscoveryFailure::MissingSettings { key };
                discovery.failures.push(failure);
                continue;
            };
            let found = DiscoveredOperation { key, config };
            discovery.operations.push(found);
        }
    }

    discovery
}

/// Register every discovered operation, logging the failed candidates.
/// Returns the number of distinct recorders held by the builder afterwards.
pub fn register_all(
    builder: &RegistryBuilder,
    discovery: &Discovery,
) -> Result<usize, RegistryError> {
    for failure in &discovery.failures {
        warn!(%failure, "skipping monitored operation");
    }
    for op in &discovery.operations {
        builder.register(&op.key, op.config)?;
    }
    Ok(builder.len())
}
