use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use camtrack_core::{DetectionBatch, Scope};
use camtrack_observability::{DropReason, Metrics, Stage};

/// Per-scope, per-camera keep-latest aggregator. `add` and `pop_all` are
/// the only two operations; both take a single internal mutex whose
/// critical section is limited to map pointer manipulation — no parsing,
/// publishing, or tracking work happens while it is held.
pub struct TimeChunkBuffer {
    inner: Mutex<HashMap<Scope, HashMap<String, DetectionBatch>>>,
    max_lag: Duration,
    metrics: Arc<Metrics>,
}

impl TimeChunkBuffer {
    pub fn new(max_lag: Duration, metrics: Arc<Metrics>) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max_lag,
            metrics,
        }
    }

    /// Inserts `batch` under `(scope, batch.camera_id)`. Lag is measured
    /// relative to ingest time (now), not scheduler tick time, so it
    /// reflects how stale the message already was when it arrived rather
    /// than how long it waited in the buffer.
    pub fn add(&self, scope: Scope, mut batch: DetectionBatch) {
        batch.obs_ctx.enter_stage(Stage::Buffer);

        let lag = Instant::now().saturating_duration_since(batch.timestamp);
        if lag > self.max_lag {
            batch.obs_ctx.abort(DropReason::FellBehind, &self.metrics);
            return;
        }

        let replaced = {
            let mut guard = self.inner.lock();
            guard
                .entry(scope)
                .or_default()
                .insert(batch.camera_id.clone(), batch)
        };

        if let Some(previous) = replaced {
            previous.obs_ctx.abort(DropReason::Superseded, &self.metrics);
        }
    }

    /// Atomically swaps the internal map with an empty one and returns the
    /// old contents. Called once per scheduler tick.
    pub fn pop_all(&self) -> HashMap<Scope, HashMap<String, DetectionBatch>> {
        std::mem::take(&mut *self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    use camtrack_observability::ObservabilityContext;
    use camtrack_core::{BoundingBoxPx, Detection};

    fn batch(camera_id: &str, timestamp: Instant) -> DetectionBatch {
        let obs_ctx = ObservabilityContext::new("scene1", "person", &StdHashMap::new());
        DetectionBatch::new(
            camera_id,
            timestamp,
            "2026-01-01T00:00:00.000Z",
            vec![Detection {
                detection_id: None,
                bbox_px: BoundingBoxPx { x: 0.0, y: 0.0, width: 1.0, height: 1.0 },
            }],
            obs_ctx,
        )
    }

    #[test]
    fn keep_latest_replaces_same_camera_entry() {
        let metrics = Arc::new(Metrics::new());
        let buffer = TimeChunkBuffer::new(Duration::from_secs(1), metrics.clone());
        let scope = Scope::new("scene1", "person");

        buffer.add(scope.clone(), batch("cam1", Instant::now()));
        buffer.add(scope.clone(), batch("cam1", Instant::now()));

        let snapshot = buffer.pop_all();
        assert_eq!(snapshot.get(&scope).unwrap().len(), 1);
        assert_eq!(
            metrics.drop_count("scene1", "person", DropReason::Superseded, Stage::Buffer),
            1
        );
    }

    #[test]
    fn distinct_cameras_coexist() {
        let metrics = Arc::new(Metrics::new());
        let buffer = TimeChunkBuffer::new(Duration::from_secs(1), metrics);
        let scope = Scope::new("scene1", "person");

        buffer.add(scope.clone(), batch("cam1", Instant::now()));
        buffer.add(scope.clone(), batch("cam2", Instant::now()));

        let snapshot = buffer.pop_all();
        assert_eq!(snapshot.get(&scope).unwrap().len(), 2);
    }

    #[test]
    fn pop_all_empties_the_buffer() {
        let metrics = Arc::new(Metrics::new());
        let buffer = TimeChunkBuffer::new(Duration::from_secs(1), metrics);
        let scope = Scope::new("scene1", "person");
        buffer.add(scope.clone(), batch("cam1", Instant::now()));

        let _ = buffer.pop_all();
        let second = buffer.pop_all();
        assert!(second.is_empty());
    }

    #[test]
    fn stale_batch_is_dropped_with_fell_behind() {
        let metrics = Arc::new(Metrics::new());
        let buffer = TimeChunkBuffer::new(Duration::from_millis(10), metrics.clone());
        let scope = Scope::new("scene1", "person");

        let stale_timestamp = Instant::now() - Duration::from_secs(2);
        buffer.add(scope.clone(), batch("cam1", stale_timestamp));

        let snapshot = buffer.pop_all();
        assert!(snapshot.is_empty());
        assert_eq!(
            metrics.drop_count("scene1", "person", DropReason::FellBehind, Stage::Buffer),
            1
        );
    }
}
