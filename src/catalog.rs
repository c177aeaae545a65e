use rand::Rng;
use std::time::Duration;

use crate::discovery::{operation_key, MonitoredOperation, MonitoredType};
use crate::recorder::RecorderConfig;

// ─── Simulated services ──────────────────────────────────────────

/// Latency profile of one fake operation driven by the load generator.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedOperation {
    pub type_name: &'static str,
    pub operation: &'static str,
    /// Typical latency (ms)
    pub base_ms: u64,
    /// Uniform jitter added on top of the base (ms)
    pub jitter_ms: u64,
    /// Chance (0–100) that a call hits a latency spike
    pub spike_pct: u8,
    /// Extra latency of a spike (ms)
    pub spike_ms: u64,
}

impl SimulatedOperation {
    pub fn key(&self) -> String {
        operation_key(self.type_name, self.operation)
    }

    pub fn sample_latency<R: Rng>(&self, rng: &mut R) -> Duration {
        let mut ms = self.base_ms + rng.gen_range(0..=self.jitter_ms);
        if rng.gen_range(0u8..100) < self.spike_pct {
            ms += self.spike_ms;
        }
        Duration::from_millis(ms)
    }
}

pub static SIMULATED: &[SimulatedOperation] = &[
    SimulatedOperation {
        type_name: "OrderService",
        operation: "placeOrder",
        base_ms: 40,
        jitter_ms: 40,
        spike_pct: 8,
        spike_ms: 120,
    },
    SimulatedOperation {
        type_name: "OrderService",
        operation: "cancelOrder",
        base_ms: 15,
        jitter_ms: 10,
        spike_pct: 2,
        spike_ms: 80,
    },
    SimulatedOperation {
        type_name: "InventoryService",
        operation: "reserve",
        base_ms: 5,
        jitter_ms: 20,
        spike_pct: 5,
        spike_ms: 60,
    },
    SimulatedOperation {
        type_name: "PaymentGateway",
        operation: "charge",
        base_ms: 80,
        jitter_ms: 60,
        spike_pct: 10,
        spike_ms: 400,
    },
    SimulatedOperation {
        type_name: "UserService",
        operation: "lookup",
        base_ms: 2,
        jitter_ms: 4,
        spike_pct: 1,
        spike_ms: 30,
    },
];

/// Admin HTTP routes recorded by the timing middleware.
static ADMIN_ROUTES: &[&str] = &[
    "GET /api/recorders",
    "GET /api/recorders/:key",
    "GET /api/windows",
    "POST /api/load/start",
    "POST /api/load/stop",
    "GET /api/load/status",
];

pub const ADMIN_TYPE: &str = "AdminApi";

// ─── Default monitored set ───────────────────────────────────────

/// Monitored types used when the configuration lists none.
pub fn default_monitored() -> Vec<MonitoredType> {
    let mut types: Vec<MonitoredType> = Vec::new();

    for sim in SIMULATED {
        let op = MonitoredOperation {
            name: sim.operation.into(),
            profiler: None,
        };
        match types.iter_mut().find(|t| t.type_name == sim.type_name) {
            Some(ty) => ty.operations.push(op),
            None => types.push(MonitoredType {
                type_name: sim.type_name.into(),
                defaults: Some(default_profile(sim.type_name)),
                operations: vec![op],
            }),
        }
    }

    // Payment calls get a looser budget than the rest of their type would
    if let Some(payments) = types.iter_mut().find(|t| t.type_name == "PaymentGateway") {
        for op in &mut payments.operations {
            op.profiler = Some(RecorderConfig {
                slow_threshold_ms: 300,
                slow_count_limit: 3,
            });
        }
    }

    types.push(MonitoredType {
        type_name: ADMIN_TYPE.into(),
        defaults: Some(RecorderConfig {
            slow_threshold_ms: 50,
            slow_count_limit: 10,
        }),
        operations: ADMIN_ROUTES
            .iter()
            .map(|route| MonitoredOperation {
                name: (*route).into(),
                profiler: None,
            })
            .collect(),
    });

    types
}

fn default_profile(type_name: &str) -> RecorderConfig {
    match type_name {
        "OrderService" => RecorderConfig {
            slow_threshold_ms: 100,
            slow_count_limit: 5,
        },
        _ => RecorderConfig {
            slow_threshold_ms: 50,
            slow_count_limit: 5,
        },
    }
}
