use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::BrokerError;

/// Callback invoked on every inbound message, on an arbitrary
/// client-internal thread. Implementations MUST be reentrant and cheap:
/// parse and buffer-insert only, no tracking work on this thread.
///
/// The third argument carries W3C Trace Context user-properties
/// (`traceparent`, `tracestate`) when the underlying transport surfaces
/// them; implementations that cannot (plain MQTT v3.1.1 has no
/// user-properties) pass an empty map, and callers fall back to
/// generating a fresh trace context.
pub type OnMessage = Arc<dyn Fn(&str, &[u8], &HashMap<String, String>) + Send + Sync>;

/// A long-lived broker connection: connect once, subscribe to topics,
/// publish outbound messages, and recover from disconnects transparently.
/// One implementation (`RumqttcBrokerClient`) ships in this crate; the
/// trait exists so the pipeline crate and its tests can swap in a fake.
pub trait BrokerClient: Send + Sync {
    /// Initiates connection. Non-blocking; success is observed later via
    /// `is_connected()`.
    fn connect(&self) -> Result<(), BrokerError>;

    /// Stops accepting inbound messages, gives pending publishes up to
    /// `drain_timeout` to flush, then closes the connection.
    fn disconnect(&self, drain_timeout: Duration);

    /// Topic patterns with a single-level wildcard (`+`) are supported.
    /// The subscription is remembered and re-applied on every reconnect,
    /// regardless of whether it succeeds immediately.
    fn subscribe(&self, topic: &str) -> Result<(), BrokerError>;

    /// Fire-and-forget at QoS "at-least-once". Never blocks the caller:
    /// either the message is handed to the client's outbound queue, or
    /// this returns `Err` immediately (in particular when not connected).
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError>;

    /// Registers the inbound message callback. Replaces any previously
    /// registered callback.
    fn set_on_message(&self, callback: OnMessage);

    fn is_connected(&self) -> bool;

    fn is_subscribed(&self, topic: &str) -> bool;
}
