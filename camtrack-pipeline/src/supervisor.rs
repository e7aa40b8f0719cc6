use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use camtrack_broker::{BrokerClient, BrokerError};

use crate::scheduler::{Scheduler, SchedulerHandle};

/// The supervisor's lifecycle states. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Starting,
    Running,
    Draining,
    Stopped,
}

/// Orchestrates startup (broker connect -> subscribe -> scheduler start),
/// shutdown (stop ingest -> drain buffer -> sentinel chunks -> wait for
/// workers -> disconnect), and exposes the liveness/readiness flags the
/// healthcheck surface reads.
pub struct Supervisor {
    state: Mutex<SupervisorState>,
    liveness: Arc<AtomicBool>,
    readiness: Arc<AtomicBool>,
    broker: Arc<dyn BrokerClient>,
    scheduler_handle: Mutex<Option<SchedulerHandle>>,
    readiness_poll: Mutex<Option<thread::JoinHandle<()>>>,
    readiness_stop: Arc<AtomicBool>,
    worker_grace_period: Duration,
    broker_drain_timeout: Duration,
}

impl Supervisor {
    pub fn new(broker: Arc<dyn BrokerClient>, worker_grace_period: Duration, broker_drain_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(SupervisorState::Starting),
            liveness: Arc::new(AtomicBool::new(false)),
            readiness: Arc::new(AtomicBool::new(false)),
            broker,
            scheduler_handle: Mutex::new(None),
            readiness_poll: Mutex::new(None),
            readiness_stop: Arc::new(AtomicBool::new(false)),
            worker_grace_period,
            broker_drain_timeout,
        }
    }

    pub fn liveness_flag(&self) -> Arc<AtomicBool> {
        self.liveness.clone()
    }

    pub fn readiness_flag(&self) -> Arc<AtomicBool> {
        self.readiness.clone()
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.lock()
    }

    /// Connects the broker, subscribes to `subscribe_topic`, and starts the
    /// scheduler. Liveness flips true immediately; readiness is driven by a
    /// background poller and only becomes true once the broker reports both
    /// connected and subscribed. A broker that never connects is not fatal:
    /// the supervisor stays `Running` with readiness false, and the poller
    /// keeps retrying the connected/subscribed check on its own cadence.
    pub fn start(&self, scheduler: Scheduler, subscribe_topic: &str) {
        *self.state.lock() = SupervisorState::Starting;
        self.liveness.store(true, Ordering::SeqCst);

        if let Err(err) = self.broker.connect() {
            tracing::warn!(error = %err, "broker connect failed at startup, will keep retrying");
        } else if let Err(err) = self.broker.subscribe(subscribe_topic) {
            tracing::warn!(error = %err, "broker subscribe failed at startup, will keep retrying");
        }

        let handle = scheduler.spawn();
        *self.scheduler_handle.lock() = Some(handle);

        self.spawn_readiness_poll(subscribe_topic.to_string());

        *self.state.lock() = SupervisorState::Running;
    }

    fn spawn_readiness_poll(&self, subscribe_topic: String) {
        let broker = self.broker.clone();
        let readiness = self.readiness.clone();
        let stop = self.readiness_stop.clone();

        let handle = thread::Builder::new()
            .name("camtrack-readiness-poll".to_string())
            .spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    let ready = broker.is_connected() && broker.is_subscribed(&subscribe_topic);
                    readiness.store(ready, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(200));
                }
            })
            .expect("failed to spawn readiness-poll thread");

        *self.readiness_poll.lock() = Some(handle);
    }

    /// Enters `draining`, stops the scheduler (final tick + sentinels),
    /// joins workers within `worker_grace_period` (abandoning any still
    /// running past it — logged as `shutdown_timeout`), then disconnects
    /// the broker. Liveness stays true until this returns.
    pub fn shutdown(&self) {
        *self.state.lock() = SupervisorState::Draining;
        self.readiness.store(false, Ordering::SeqCst);

        self.readiness_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.readiness_poll.lock().take() {
            let _ = handle.join();
        }

        if let Some(handle) = self.scheduler_handle.lock().take() {
            handle.request_stop();
            let worker_handles = handle.join();

            let deadline = Instant::now() + self.worker_grace_period;
            for worker_handle in worker_handles {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if !join_with_timeout(worker_handle, remaining) {
                    tracing::warn!("shutdown_timeout: worker thread did not exit within the grace period, abandoning it");
                }
            }
        }

        self.broker.disconnect(self.broker_drain_timeout);

        *self.state.lock() = SupervisorState::Stopped;
        self.liveness.store(false, Ordering::SeqCst);
    }
}

/// Polls `handle.is_finished()` until it's true or `timeout` elapses.
/// `JoinHandle` has no native bounded-join; this mirrors the same polling
/// pattern `RumqttcBrokerClient::disconnect` uses to bound its own wait.
/// On timeout the handle is dropped, which detaches the thread — it keeps
/// running but is no longer tracked.
fn join_with_timeout(handle: thread::JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(20));
    }
    let _ = handle.join();
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use camtrack_broker::OnMessage;
    use camtrack_tracking::{ReferenceTrackingEngine, TrackingEngine};

    use super::*;
    use crate::buffer::TimeChunkBuffer;
    use crate::camera_registry::CameraRegistry;
    use crate::config::PipelineConfig;
    use camtrack_observability::Metrics;

    struct FakeBroker {
        connected: AtomicBool,
        subscribed: StdMutex<Vec<String>>,
    }
    impl FakeBroker {
        fn new() -> Self {
            Self { connected: AtomicBool::new(false), subscribed: StdMutex::new(Vec::new()) }
        }
    }
    impl BrokerClient for FakeBroker {
        fn connect(&self) -> Result<(), BrokerError> {
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn disconnect(&self, _drain_timeout: Duration) {
            self.connected.store(false, Ordering::SeqCst);
        }
        fn subscribe(&self, topic: &str) -> Result<(), BrokerError> {
            self.subscribed.lock().unwrap().push(topic.to_string());
            Ok(())
        }
        fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<(), BrokerError> {
            Ok(())
        }
        fn set_on_message(&self, _callback: OnMessage) {}
        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
        fn is_subscribed(&self, topic: &str) -> bool {
            self.subscribed.lock().unwrap().iter().any(|t| t == topic)
        }
    }

    fn test_scheduler() -> Scheduler {
        let metrics = Arc::new(Metrics::new());
        let config = PipelineConfig::default();
        let buffer = Arc::new(TimeChunkBuffer::new(config.max_lag, metrics.clone()));
        Scheduler::new(
            buffer,
            config,
            metrics,
            Arc::new(FakeBroker::new()),
            Arc::new(CameraRegistry::empty()),
            None,
            Arc::new(|| Box::new(ReferenceTrackingEngine::new()) as Box<dyn TrackingEngine>),
        )
    }

    #[test]
    fn start_sets_liveness_and_running_state() {
        let broker = Arc::new(FakeBroker::new());
        let supervisor = Supervisor::new(broker, Duration::from_millis(200), Duration::from_millis(200));
        supervisor.start(test_scheduler(), "scenescape/data/camera/+");

        assert!(supervisor.liveness_flag().load(Ordering::SeqCst));
        assert_eq!(supervisor.state(), SupervisorState::Running);

        supervisor.shutdown();
    }

    #[test]
    fn readiness_becomes_true_after_connect_and_subscribe() {
        let broker = Arc::new(FakeBroker::new());
        let supervisor = Supervisor::new(broker, Duration::from_millis(200), Duration::from_millis(200));
        supervisor.start(test_scheduler(), "scenescape/data/camera/+");

        let deadline = Instant::now() + Duration::from_secs(1);
        while !supervisor.readiness_flag().load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(supervisor.readiness_flag().load(Ordering::SeqCst));

        supervisor.shutdown();
    }

    #[test]
    fn shutdown_flips_readiness_false_and_reaches_stopped() {
        let broker = Arc::new(FakeBroker::new());
        let supervisor = Supervisor::new(broker, Duration::from_millis(200), Duration::from_millis(200));
        supervisor.start(test_scheduler(), "scenescape/data/camera/+");
        supervisor.shutdown();

        assert!(!supervisor.readiness_flag().load(Ordering::SeqCst));
        assert_eq!(supervisor.state(), SupervisorState::Stopped);
    }
}
