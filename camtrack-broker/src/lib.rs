//! MQTT `BrokerClient`: a single long-lived connection with remembered
//! subscriptions, non-blocking publish, and exponential-backoff reconnect.
//! Runs its event loop on a dedicated OS thread rather than a tokio
//! runtime, matching the pipeline's thread-per-role concurrency model.

mod client;
mod config;
mod error;
mod rumqttc_client;

pub use client::{BrokerClient, OnMessage};
pub use config::BrokerConfig;
pub use error::BrokerError;
pub use rumqttc_client::RumqttcBrokerClient;
