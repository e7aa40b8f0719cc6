use std::sync::Arc;

use crossbeam_channel::Receiver;

use camtrack_broker::BrokerClient;
use camtrack_core::{Chunk, Scope, Track, TrackSet};
use camtrack_observability::{DropReason, Metrics, Stage};
use camtrack_schema::SchemaValidator;
use camtrack_tracking::{PerCameraInput, TrackingEngine};

use crate::camera_registry::CameraRegistry;
use crate::publish::publish_track_set;

/// Spawns a `TrackingEngine` for a newly-created scope. One instance per
/// worker, created lazily on the scheduler thread at first dispatch.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn TrackingEngine> + Send + Sync>;

/// Serializes tracking work for one `Scope`. Owns its `TrackingEngine`
/// instance outright — no locks around it, since exactly one worker thread
/// ever touches it (each worker owns its tracking engine exclusively).
pub struct Worker {
    scope: Scope,
    receiver: Receiver<Chunk>,
    engine: Box<dyn TrackingEngine>,
    broker: Arc<dyn BrokerClient>,
    metrics: Arc<Metrics>,
    camera_registry: Arc<CameraRegistry>,
    schema_validator: Option<Arc<dyn SchemaValidator>>,
    scene_id: String,
    scene_name: String,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scope: Scope,
        receiver: Receiver<Chunk>,
        engine: Box<dyn TrackingEngine>,
        broker: Arc<dyn BrokerClient>,
        metrics: Arc<Metrics>,
        camera_registry: Arc<CameraRegistry>,
        schema_validator: Option<Arc<dyn SchemaValidator>>,
        scene_id: String,
        scene_name: String,
    ) -> Self {
        Self {
            scope,
            receiver,
            engine,
            broker,
            metrics,
            camera_registry,
            schema_validator,
            scene_id,
            scene_name,
        }
    }

    /// Dequeues `Chunk`s until it sees a sentinel, then returns. Distinct
    /// scopes run in parallel (separate threads, separate queues); within
    /// this scope, chunks are processed strictly in dispatch order because
    /// a single thread drains a single queue.
    pub fn run(mut self) {
        while let Ok(chunk) = self.receiver.recv() {
            if chunk.is_sentinel() {
                break;
            }
            self.process_chunk(chunk);
        }
    }

    fn process_chunk(&mut self, mut chunk: Chunk) {
        debug_assert!(
            !chunk.batches.is_empty(),
            "scheduler must never dispatch a non-sentinel chunk with no batches"
        );
        if chunk.batches.is_empty() {
            return;
        }

        for batch in &mut chunk.batches {
            batch.obs_ctx.enter_stage(Stage::Track);
        }

        // Sorted ascending by timestamp (scheduler's contract); the
        // earliest batch's wall-clock timestamp is what the published
        // TrackSet echoes.
        let echoed_timestamp = chunk.batches[0].wall_clock_timestamp.clone();

        let mut per_camera_inputs = Vec::new();
        for batch in &chunk.batches {
            let camera_params = self.camera_registry.get_or_identity(&batch.camera_id);
            for detection in &batch.detections {
                let world_rect = self
                    .engine
                    .project_pixel_bbox_to_world(detection.bbox_px, &camera_params);
                per_camera_inputs.push(PerCameraInput {
                    camera_id: batch.camera_id.clone(),
                    detection_id: detection.detection_id,
                    world_rect,
                });
            }
        }

        self.engine.track(per_camera_inputs, chunk.chunk_time);

        let tracks: Vec<Track> = self
            .engine
            .reliable_tracks()
            .into_iter()
            .map(|engine_track| Track {
                id: engine_track.id,
                category: self.scope.category.clone(),
                translation: engine_track.translation,
                velocity: engine_track.velocity,
                size: engine_track.size,
                rotation: engine_track.rotation,
            })
            .collect();

        let track_set = TrackSet {
            scene_id: self.scene_id.clone(),
            scene_name: self.scene_name.clone(),
            thing_type: self.scope.category.clone(),
            timestamp: echoed_timestamp,
            tracks,
        };

        let publish_result = publish_track_set(
            self.broker.as_ref(),
            &track_set,
            self.schema_validator.as_deref(),
        );

        match publish_result {
            Ok(()) => {
                for mut batch in chunk.batches {
                    batch.obs_ctx.enter_stage(Stage::Publish);
                    batch.obs_ctx.finalize(&self.metrics);
                }
            }
            Err(err) => {
                tracing::warn!(scope = %self.scope, error = %err, "publish failed, aborting chunk's batches");
                for batch in chunk.batches {
                    batch.obs_ctx.abort(DropReason::BrokerUnavailable, &self.metrics);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as StdHashMap;
    use std::time::Instant;

    use crossbeam_channel::bounded;

    use camtrack_broker::BrokerError;
    use camtrack_core::{BoundingBoxPx, Detection, DetectionBatch};
    use camtrack_observability::ObservabilityContext;
    use camtrack_tracking::ReferenceTrackingEngine;

    use super::*;

    struct FakeBroker {
        published: Mutex<Vec<(String, Vec<u8>)>>,
        fail: bool,
    }

    use parking_lot::Mutex;

    impl FakeBroker {
        fn new(fail: bool) -> Self {
            Self { published: Mutex::new(Vec::new()), fail }
        }
    }

    impl BrokerClient for FakeBroker {
        fn connect(&self) -> Result<(), BrokerError> {
            Ok(())
        }
        fn disconnect(&self, _drain_timeout: std::time::Duration) {}
        fn subscribe(&self, _topic: &str) -> Result<(), BrokerError> {
            Ok(())
        }
        fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
            if self.fail {
                return Err(BrokerError::Publish("simulated failure".to_string()));
            }
            self.published.lock().push((topic.to_string(), payload));
            Ok(())
        }
        fn set_on_message(&self, _callback: camtrack_broker::OnMessage) {}
        fn is_connected(&self) -> bool {
            true
        }
        fn is_subscribed(&self, _topic: &str) -> bool {
            true
        }
    }

    fn sample_batch(camera_id: &str, timestamp: Instant, wall_clock: &str) -> DetectionBatch {
        let obs_ctx = ObservabilityContext::new("scene1", "person", &StdHashMap::new());
        DetectionBatch::new(
            camera_id,
            timestamp,
            wall_clock,
            vec![Detection {
                detection_id: None,
                bbox_px: BoundingBoxPx { x: 0.0, y: 0.0, width: 10.0, height: 20.0 },
            }],
            obs_ctx,
        )
    }

    #[test]
    fn successful_publish_finalizes_every_batch_and_echoes_earliest_timestamp() {
        let metrics = Arc::new(Metrics::new());
        let broker = Arc::new(FakeBroker::new(false));
        let (tx, rx) = bounded(2);

        let worker = Worker::new(
            Scope::new("scene1", "person"),
            rx,
            Box::new(ReferenceTrackingEngine::new()),
            broker.clone(),
            metrics.clone(),
            Arc::new(CameraRegistry::empty()),
            None,
            "scene1".to_string(),
            "Main scene".to_string(),
        );

        let t0 = Instant::now();
        let batches = vec![
            sample_batch("cam1", t0, "2026-01-01T00:00:00.020Z"),
            sample_batch("cam2", t0 + std::time::Duration::from_millis(1), "2026-01-01T00:00:00.030Z"),
        ];
        let chunk = Chunk::new(Scope::new("scene1", "person"), t0, batches);
        tx.send(chunk).unwrap();
        tx.send(Chunk::sentinel(t0)).unwrap();

        worker.run();

        assert_eq!(metrics.finalized_count(), 2);
        let published = broker.published.lock();
        assert_eq!(published.len(), 1);
        let value: serde_json::Value = serde_json::from_slice(&published[0].1).unwrap();
        assert_eq!(value["timestamp"], "2026-01-01T00:00:00.020Z");
    }

    #[test]
    fn publish_failure_aborts_every_batch_with_broker_unavailable() {
        let metrics = Arc::new(Metrics::new());
        let broker = Arc::new(FakeBroker::new(true));
        let (tx, rx) = bounded(2);

        let worker = Worker::new(
            Scope::new("scene1", "person"),
            rx,
            Box::new(ReferenceTrackingEngine::new()),
            broker,
            metrics.clone(),
            Arc::new(CameraRegistry::empty()),
            None,
            "scene1".to_string(),
            "Main scene".to_string(),
        );

        let t0 = Instant::now();
        let chunk = Chunk::new(
            Scope::new("scene1", "person"),
            t0,
            vec![sample_batch("cam1", t0, "2026-01-01T00:00:00.000Z")],
        );
        tx.send(chunk).unwrap();
        tx.send(Chunk::sentinel(t0)).unwrap();

        worker.run();

        assert_eq!(metrics.finalized_count(), 0);
        assert_eq!(
            metrics.drop_count("scene1", "person", DropReason::BrokerUnavailable, Stage::Publish),
            1
        );
    }

    #[test]
    fn sentinel_chunk_ends_the_loop_without_processing() {
        let metrics = Arc::new(Metrics::new());
        let broker = Arc::new(FakeBroker::new(false));
        let (tx, rx) = bounded(2);
        let worker = Worker::new(
            Scope::new("scene1", "person"),
            rx,
            Box::new(ReferenceTrackingEngine::new()),
            broker,
            metrics.clone(),
            Arc::new(CameraRegistry::empty()),
            None,
            "scene1".to_string(),
            "Main scene".to_string(),
        );
        tx.send(Chunk::sentinel(Instant::now())).unwrap();
        worker.run();
        assert_eq!(metrics.finalized_count(), 0);
    }
}
