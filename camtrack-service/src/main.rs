mod cli;
mod config;
mod logging;
mod signals;

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use camtrack_broker::{BrokerClient, BrokerConfig, RumqttcBrokerClient};
use camtrack_codec::CAMERA_SUBSCRIBE_PATTERN;
use camtrack_observability::{Metrics, Stage};
use camtrack_pipeline::{CameraRegistry, PipelineConfig, Scheduler, Supervisor, TimeChunkBuffer};
use camtrack_schema::{SchemaValidator, StrictSchemaValidator};
use camtrack_tracking::{CameraParams, ReferenceTrackingEngine, TrackingEngine};
use camtrack_web::{spawn_healthcheck_server, HealthState};

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();

    let config = match config::load(&cli.config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration from {}: {err}", cli.config_path.display());
            std::process::exit(1);
        }
    };

    logging::init(&config.observability.logging.level);
    tracing::info!(config_path = %cli.config_path.display(), "starting camtrack");

    // A panic anywhere (worker thread, scheduler thread, healthcheck server)
    // signals a programming error the pipeline has no recovery path for.
    // The default hook only unwinds the thread it happened on; chain a
    // process exit so these surface as a fatal non-zero exit rather than a
    // silently half-dead service.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        std::process::exit(1);
    }));

    let metrics = Arc::new(Metrics::new());

    let camera_registry = Arc::new(CameraRegistry::new(config.cameras.iter().map(|c| CameraParams {
        camera_id: c.id.clone(),
        homography: c.homography,
    })));

    let schema_validator: Option<Arc<dyn SchemaValidator>> =
        if config.tracker.schema_validation { Some(Arc::new(StrictSchemaValidator)) } else { None };

    let drain_timeout = Duration::from_millis(config.tracker.drain_timeout_ms);
    let broker_config = BrokerConfig {
        host: config.mqtt.host.clone(),
        port: config.mqtt.port,
        client_id: config.mqtt.client_id.clone(),
        ca_cert_path: config.mqtt.tls.ca_cert_path.clone(),
        client_cert_path: config.mqtt.tls.client_cert_path.clone(),
        client_key_path: config.mqtt.tls.client_key_path.clone(),
        verify_server: config.mqtt.tls.verify_server,
        initial_backoff: Duration::from_secs(1),
        max_backoff: Duration::from_secs(config.mqtt.max_reconnect_delay_s),
        drain_timeout,
    };

    let broker: Arc<dyn BrokerClient> = match RumqttcBrokerClient::new(broker_config) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            tracing::error!(error = %err, "failed to construct broker client");
            std::process::exit(1);
        }
    };

    let pipeline_config = PipelineConfig {
        chunk_interval: Duration::from_secs_f64(config.tracker.chunk_interval_ms / 1000.0),
        max_lag: Duration::from_millis(config.tracker.max_lag_ms),
        worker_queue_capacity: config.tracker.worker_queue_capacity,
        drain_timeout,
        scene_id: config.scene.id.clone(),
        scene_name: config.scene.name.clone(),
    };

    let buffer = Arc::new(TimeChunkBuffer::new(pipeline_config.max_lag, metrics.clone()));

    let scene_id = config.scene.id.clone();
    let buffer_for_callback = buffer.clone();
    let metrics_for_callback = metrics.clone();
    let validator_for_callback = schema_validator.clone();
    broker.set_on_message(Arc::new(move |topic: &str, payload: &[u8], user_properties: &HashMap<String, String>| {
        let validator_ref = validator_for_callback.as_deref();
        match camtrack_codec::decode(topic, payload, user_properties, &scene_id, std::time::Instant::now(), validator_ref) {
            Ok(batches) => {
                for (scope, batch) in batches {
                    buffer_for_callback.add(scope, batch);
                }
            }
            Err(err) => {
                tracing::warn!(topic, error = %err, "failed to decode inbound message");
                metrics_for_callback.record_drop(&scene_id, "unknown", err.as_drop_reason(), Stage::Parse);
            }
        }
    }));

    let engine_factory: camtrack_pipeline::EngineFactory =
        Arc::new(|| Box::new(ReferenceTrackingEngine::new()) as Box<dyn TrackingEngine>);

    let scheduler = Scheduler::new(
        buffer,
        pipeline_config,
        metrics.clone(),
        broker.clone(),
        camera_registry,
        schema_validator,
        engine_factory,
    );

    let supervisor = Arc::new(Supervisor::new(broker.clone(), drain_timeout, drain_timeout));
    supervisor.start(scheduler, CAMERA_SUBSCRIBE_PATTERN);

    let health_state = HealthState::new(supervisor.liveness_flag(), supervisor.readiness_flag(), metrics.clone());
    let _health_handle = spawn_healthcheck_server(config.tracker.healthcheck.port, health_state);

    let stop_requested = signals::install_shutdown_handler();
    while !stop_requested.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }

    tracing::info!("shutdown requested, draining");
    supervisor.shutdown();
    tracing::info!("shutdown complete");
}
