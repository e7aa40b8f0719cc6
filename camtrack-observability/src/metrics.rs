use std::collections::HashMap;
use std::time::Duration;

use hdrhistogram::Histogram;
use parking_lot::Mutex;

use crate::drop_reason::DropReason;
use crate::stage::Stage;

/// A single point-in-time view of the counters/histograms held by
/// [`Metrics`]. Cheap to clone; intended for the healthcheck/metrics HTTP
/// surface to serialize.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub drops_by_reason: HashMap<&'static str, u64>,
    pub drops_total: u64,
    pub finalized_total: u64,
    pub latency_mean_ms: f64,
    pub latency_p99_ms: f64,
}

/// In-process metrics sink: drop counters keyed by `(scene, category, reason,
/// stage)` plus an end-to-end latency histogram and per-scope latency
/// histograms.
///
/// The metrics *backend* is intentionally left swappable: a counter table
/// behind a mutex, with a `snapshot()` seam for whatever exporter a
/// deployment wants to bolt on.
pub struct Metrics {
    drops: Mutex<HashMap<(String, String, DropReason, Stage), u64>>,
    finalized: Mutex<u64>,
    end_to_end: Mutex<Histogram<u64>>,
    per_scope: Mutex<HashMap<(String, String), Histogram<u64>>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            drops: Mutex::new(HashMap::new()),
            finalized: Mutex::new(0),
            // 1 us to 60 s, 3 significant digits.
            end_to_end: Mutex::new(Histogram::new_with_bounds(1, 60_000_000, 3).unwrap()),
            per_scope: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_drop(&self, scene_id: &str, category: &str, reason: DropReason, stage: Stage) {
        let key = (scene_id.to_string(), category.to_string(), reason, stage);
        *self.drops.lock().entry(key).or_insert(0) += 1;
    }

    pub fn record_finalize(&self, scene_id: &str, category: &str, end_to_end: Duration) {
        *self.finalized.lock() += 1;
        let micros = end_to_end.as_micros().min(u128::from(u64::MAX)) as u64;
        let _ = self.end_to_end.lock().record(micros.max(1));
        let mut per_scope = self.per_scope.lock();
        let hist = per_scope
            .entry((scene_id.to_string(), category.to_string()))
            .or_insert_with(|| Histogram::new_with_bounds(1, 60_000_000, 3).unwrap());
        let _ = hist.record(micros.max(1));
    }

    pub fn drop_count(&self, scene_id: &str, category: &str, reason: DropReason, stage: Stage) -> u64 {
        let key = (scene_id.to_string(), category.to_string(), reason, stage);
        self.drops.lock().get(&key).copied().unwrap_or(0)
    }

    pub fn finalized_count(&self) -> u64 {
        *self.finalized.lock()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let drops = self.drops.lock();
        let mut drops_by_reason: HashMap<&'static str, u64> = HashMap::new();
        let mut drops_total = 0u64;
        for ((_, _, reason, _), count) in drops.iter() {
            *drops_by_reason.entry(reason.as_str()).or_insert(0) += count;
            drops_total += count;
        }
        let hist = self.end_to_end.lock();
        MetricsSnapshot {
            drops_by_reason,
            drops_total,
            finalized_total: *self.finalized.lock(),
            latency_mean_ms: hist.mean() / 1000.0,
            latency_p99_ms: hist.value_at_quantile(0.99) as f64 / 1000.0,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
