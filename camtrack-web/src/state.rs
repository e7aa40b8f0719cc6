use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use camtrack_observability::Metrics;

/// Shared state for the healthcheck/metrics router: the two flags the
/// Supervisor owns, plus the metrics sink operators can snapshot.
#[derive(Clone)]
pub struct HealthState {
    pub liveness: Arc<AtomicBool>,
    pub readiness: Arc<AtomicBool>,
    pub metrics: Arc<Metrics>,
}

impl HealthState {
    pub fn new(liveness: Arc<AtomicBool>, readiness: Arc<AtomicBool>, metrics: Arc<Metrics>) -> Self {
        Self { liveness, readiness, metrics }
    }
}
