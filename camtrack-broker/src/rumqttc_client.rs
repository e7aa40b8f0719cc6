use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::{Client, Connection, Event, Incoming, MqttOptions, QoS, TlsConfiguration, Transport};

use crate::client::{BrokerClient, OnMessage};
use crate::config::BrokerConfig;
use crate::error::BrokerError;

/// `BrokerClient` backed by `rumqttc`'s synchronous client, matching the
/// pipeline's OS-thread concurrency model (no tokio runtime required).
/// The event loop runs on a single dedicated thread; `publish`/`subscribe`
/// hand work to it over `rumqttc`'s internal channel and return without
/// waiting on broker acknowledgment.
pub struct RumqttcBrokerClient {
    config: BrokerConfig,
    client: Client,
    connection: Mutex<Option<Connection>>,
    connected: Arc<AtomicBool>,
    desired_subscriptions: Arc<Mutex<HashSet<String>>>,
    confirmed_subscriptions: Arc<Mutex<HashSet<String>>>,
    on_message: Arc<Mutex<Option<OnMessage>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl RumqttcBrokerClient {
    pub fn new(config: BrokerConfig) -> Result<Self, BrokerError> {
        let mqtt_options = build_mqtt_options(&config)?;
        let (client, connection) = Client::new(mqtt_options, 64);
        Ok(Self {
            config,
            client,
            connection: Mutex::new(Some(connection)),
            connected: Arc::new(AtomicBool::new(false)),
            desired_subscriptions: Arc::new(Mutex::new(HashSet::new())),
            confirmed_subscriptions: Arc::new(Mutex::new(HashSet::new())),
            on_message: Arc::new(Mutex::new(None)),
            worker: Mutex::new(None),
        })
    }
}

fn build_mqtt_options(config: &BrokerConfig) -> Result<MqttOptions, BrokerError> {
    let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(30));

    if let (Some(ca_path), Some(cert_path), Some(key_path)) = (
        &config.ca_cert_path,
        &config.client_cert_path,
        &config.client_key_path,
    ) {
        let ca = std::fs::read(ca_path).map_err(|e| BrokerError::Connect(e.to_string()))?;
        let client_cert = std::fs::read(cert_path).map_err(|e| BrokerError::Connect(e.to_string()))?;
        let client_key = std::fs::read(key_path).map_err(|e| BrokerError::Connect(e.to_string()))?;
        options.set_transport(Transport::Tls(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: Some((client_cert, client_key)),
        }));
    }

    if !config.verify_server {
        // `TlsConfiguration::Simple` always verifies the chain and hostname;
        // skipping that requires handing rumqttc a custom rustls
        // `ClientConfig` with a no-op certificate verifier, which this
        // client does not build (see DESIGN.md's Open Questions). Consult
        // the flag enough to tell the operator their setting has no effect
        // rather than silently ignoring it.
        tracing::warn!(
            "mqtt.tls.verify_server=false is set but this broker client cannot skip server \
             certificate verification; the connection will still verify the full chain and hostname"
        );
    }

    Ok(options)
}

impl BrokerClient for RumqttcBrokerClient {
    fn connect(&self) -> Result<(), BrokerError> {
        let connection = self
            .connection
            .lock()
            .take()
            .ok_or(BrokerError::AlreadyConnected)?;

        let client = self.client.clone();
        let connected = self.connected.clone();
        let desired = self.desired_subscriptions.clone();
        let confirmed = self.confirmed_subscriptions.clone();
        let on_message = self.on_message.clone();
        let initial_backoff = self.config.initial_backoff;
        let max_backoff = self.config.max_backoff;

        let handle = thread::Builder::new()
            .name("camtrack-broker-eventloop".to_string())
            .spawn(move || {
                run_event_loop(
                    connection,
                    client,
                    connected,
                    desired,
                    confirmed,
                    on_message,
                    initial_backoff,
                    max_backoff,
                )
            })
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        *self.worker.lock() = Some(handle);
        Ok(())
    }

    fn disconnect(&self, drain_timeout: Duration) {
        // rumqttc flushes queued outbound packets before sending the
        // disconnect packet; `drain_timeout` bounds how long we wait for
        // the event loop thread to notice and exit below.
        let _ = self.client.disconnect();
        self.connected.store(false, Ordering::SeqCst);

        if let Some(handle) = self.worker.lock().take() {
            let deadline = std::time::Instant::now() + drain_timeout;
            while !handle.is_finished() && std::time::Instant::now() < deadline {
                thread::sleep(Duration::from_millis(20));
            }
        }
    }

    fn subscribe(&self, topic: &str) -> Result<(), BrokerError> {
        self.desired_subscriptions.lock().insert(topic.to_string());
        if self.connected.load(Ordering::SeqCst) {
            self.client
                .subscribe(topic, QoS::AtLeastOnce)
                .map_err(|e| BrokerError::Subscribe(e.to_string()))?;
            self.confirmed_subscriptions.lock().insert(topic.to_string());
        }
        Ok(())
    }

    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish("not connected".to_string()));
        }
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| BrokerError::Publish(e.to_string()))
    }

    fn set_on_message(&self, callback: OnMessage) {
        *self.on_message.lock() = Some(callback);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn is_subscribed(&self, topic: &str) -> bool {
        self.confirmed_subscriptions.lock().contains(topic)
    }
}

#[allow(clippy::too_many_arguments)]
fn run_event_loop(
    connection: Connection,
    client: Client,
    connected: Arc<AtomicBool>,
    desired_subscriptions: Arc<Mutex<HashSet<String>>>,
    confirmed_subscriptions: Arc<Mutex<HashSet<String>>>,
    on_message: Arc<Mutex<Option<OnMessage>>>,
    initial_backoff: Duration,
    max_backoff: Duration,
) {
    let mut backoff = initial_backoff;
    let mut connection = connection;

    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                connected.store(true, Ordering::SeqCst);
                backoff = initial_backoff;
                let topics: Vec<String> = desired_subscriptions.lock().iter().cloned().collect();
                for topic in topics {
                    match client.subscribe(&topic, QoS::AtLeastOnce) {
                        Ok(()) => {
                            confirmed_subscriptions.lock().insert(topic);
                        }
                        Err(e) => {
                            tracing::warn!(topic = %topic, error = %e, "resubscribe failed, will retry next backoff cycle");
                        }
                    }
                }
                tracing::info!("broker connected");
            }
            Ok(Event::Incoming(Incoming::Publish(publish))) => {
                if let Some(cb) = on_message.lock().as_ref() {
                    // Plain MQTT v3.1.1 (what `rumqttc::Client` speaks here)
                    // has no user-properties, so there is no trace context
                    // to extract; the empty map tells the codec to
                    // generate a fresh one.
                    cb(&publish.topic, &publish.payload, &HashMap::new());
                }
            }
            Ok(Event::Incoming(Incoming::Disconnect)) => {
                connected.store(false, Ordering::SeqCst);
                confirmed_subscriptions.lock().clear();
            }
            Ok(_) => {}
            Err(e) => {
                connected.store(false, Ordering::SeqCst);
                confirmed_subscriptions.lock().clear();
                tracing::warn!(error = %e, backoff_ms = backoff.as_millis(), "broker connection error, backing off");
                thread::sleep(backoff);
                backoff = std::cmp::min(backoff * 2, max_backoff);
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    tracing::info!("broker event loop exited");
}
