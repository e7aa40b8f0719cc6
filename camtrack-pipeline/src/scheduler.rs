use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};

use camtrack_broker::BrokerClient;
use camtrack_core::{Chunk, DetectionBatch, Scope};
use camtrack_observability::{DropReason, Metrics, Stage};
use camtrack_schema::SchemaValidator;

use crate::buffer::TimeChunkBuffer;
use crate::camera_registry::CameraRegistry;
use crate::config::PipelineConfig;
use crate::worker::{EngineFactory, Worker};

struct WorkerHandle {
    sender: Sender<Chunk>,
    join_handle: thread::JoinHandle<()>,
}

/// Handle to a running scheduler: a cancellation primitive (`stop_requested`
/// + condvar notify) plus the join point that yields every worker's
/// `JoinHandle` once the scheduler itself has finished its shutdown
/// sequence (final tick, dispatch, sentinels).
pub struct SchedulerHandle {
    stop_requested: Arc<AtomicBool>,
    wait: Arc<(Mutex<()>, Condvar)>,
    join_handle: thread::JoinHandle<Vec<thread::JoinHandle<()>>>,
}

impl SchedulerHandle {
    /// Unblocks the scheduler's condvar wait and sets the stop flag. Idempotent.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        let _guard = self.wait.0.lock();
        self.wait.1.notify_all();
    }

    /// Blocks until the scheduler thread has run its final tick and
    /// dispatched sentinel chunks to every live worker, returning their
    /// join handles so the caller (the Supervisor) can bound how long it
    /// waits for them.
    pub fn join(self) -> Vec<thread::JoinHandle<()>> {
        self.join_handle.join().unwrap_or_default()
    }
}

/// Drives the fixed-cadence dispatch loop: wait up to `chunk_interval`, pop
/// the buffer, sort and dispatch one `Chunk` per scope, creating workers
/// lazily. The worker-registry map is touched only by this thread, so no
/// lock is needed on it.
pub struct Scheduler {
    buffer: Arc<TimeChunkBuffer>,
    config: PipelineConfig,
    metrics: Arc<Metrics>,
    broker: Arc<dyn BrokerClient>,
    camera_registry: Arc<CameraRegistry>,
    schema_validator: Option<Arc<dyn SchemaValidator>>,
    engine_factory: EngineFactory,
    workers: HashMap<Scope, WorkerHandle>,
    stop_requested: Arc<AtomicBool>,
    wait: Arc<(Mutex<()>, Condvar)>,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        buffer: Arc<TimeChunkBuffer>,
        config: PipelineConfig,
        metrics: Arc<Metrics>,
        broker: Arc<dyn BrokerClient>,
        camera_registry: Arc<CameraRegistry>,
        schema_validator: Option<Arc<dyn SchemaValidator>>,
        engine_factory: EngineFactory,
    ) -> Self {
        Self {
            buffer,
            config,
            metrics,
            broker,
            camera_registry,
            schema_validator,
            engine_factory,
            workers: HashMap::new(),
            stop_requested: Arc::new(AtomicBool::new(false)),
            wait: Arc::new((Mutex::new(()), Condvar::new())),
        }
    }

    /// Spawns the scheduler loop on a dedicated thread and returns a handle
    /// to it. Consumes `self`: the loop owns the worker registry for its
    /// entire lifetime.
    pub fn spawn(self) -> SchedulerHandle {
        let stop_requested = self.stop_requested.clone();
        let wait = self.wait.clone();
        let join_handle = thread::Builder::new()
            .name("camtrack-scheduler".to_string())
            .spawn(move || self.run())
            .expect("failed to spawn scheduler thread");
        SchedulerHandle { stop_requested, wait, join_handle }
    }

    /// The loop itself. Returns the join handles of every worker thread it
    /// ever created, after dispatching sentinel chunks to all of them.
    fn run(mut self) -> Vec<thread::JoinHandle<()>> {
        // Absolute-deadline scheduling: the next tick is anchored to the
        // last tick's target time, not to "now + interval", so jitter in
        // any one iteration doesn't accumulate drift across the run.
        let mut next_deadline = Instant::now() + self.config.chunk_interval;

        loop {
            if self.stop_requested.load(Ordering::SeqCst) {
                break;
            }

            let now = Instant::now();
            let wait_for = next_deadline.saturating_duration_since(now);
            {
                let mut guard = self.wait.0.lock();
                // Spurious wakeups and early `notify_all` (shutdown) are
                // both fine here: either way we re-check `stop_requested`
                // and recompute the next deadline below.
                self.wait.1.wait_for(&mut guard, wait_for);
            }

            next_deadline += self.config.chunk_interval;
            if next_deadline < Instant::now() {
                // Fell far enough behind (extreme load) that catching up
                // would mean a burst of immediate ticks; skip ahead to the
                // next aligned deadline instead.
                next_deadline = Instant::now() + self.config.chunk_interval;
            }

            if self.stop_requested.load(Ordering::SeqCst) {
                break;
            }

            self.dispatch_tick();
        }

        // One last tick to drain whatever arrived just before shutdown,
        // then sentinels for every worker that exists.
        self.dispatch_tick();

        let mut join_handles = Vec::with_capacity(self.workers.len());
        for (scope, handle) in self.workers.drain() {
            // Sentinels bypass the bounded-queue check: a blocking send
            // guarantees delivery even if the queue happens to be full.
            if handle.sender.send(Chunk::sentinel(Instant::now())).is_err() {
                tracing::warn!(%scope, "worker channel closed before sentinel could be delivered");
            }
            join_handles.push(handle.join_handle);
        }
        join_handles
    }

    fn dispatch_tick(&mut self) {
        let snapshot = self.buffer.pop_all();
        for (scope, cameras) in snapshot {
            if cameras.is_empty() {
                continue;
            }

            if !self.workers.contains_key(&scope) {
                let handle = self.spawn_worker(&scope);
                self.workers.insert(scope.clone(), handle);
            }

            let mut batches: Vec<DetectionBatch> = cameras.into_values().collect();
            batches.sort_by_key(|b| b.timestamp);
            for batch in &mut batches {
                batch.obs_ctx.enter_stage(Stage::Dispatch);
            }

            let chunk = Chunk::new(scope.clone(), Instant::now(), batches);
            let handle = self.workers.get(&scope).expect("worker was just created if missing");

            match handle.sender.try_send(chunk) {
                Ok(()) => {}
                Err(TrySendError::Full(chunk)) => {
                    tracing::warn!(%scope, "worker queue full, dropping chunk");
                    for batch in chunk.batches {
                        batch.obs_ctx.abort(DropReason::TrackerBusy, &self.metrics);
                    }
                }
                Err(TrySendError::Disconnected(chunk)) => {
                    tracing::error!(%scope, "worker channel disconnected unexpectedly, dropping chunk");
                    for batch in chunk.batches {
                        batch.obs_ctx.abort(DropReason::TrackerBusy, &self.metrics);
                    }
                }
            }
        }
    }

    fn spawn_worker(&self, scope: &Scope) -> WorkerHandle {
        let (sender, receiver) = bounded(self.config.worker_queue_capacity);
        let engine = (self.engine_factory)();
        let worker = Worker::new(
            scope.clone(),
            receiver,
            engine,
            self.broker.clone(),
            self.metrics.clone(),
            self.camera_registry.clone(),
            self.schema_validator.clone(),
            self.config.scene_id.clone(),
            self.config.scene_name.clone(),
        );

        let thread_name = format!("camtrack-worker-{scope}");
        let join_handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || worker.run())
            .expect("failed to spawn worker thread");

        WorkerHandle { sender, join_handle }
    }
}
