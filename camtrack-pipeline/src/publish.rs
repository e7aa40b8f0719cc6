use camtrack_broker::{BrokerClient, BrokerError};
use camtrack_codec::build_scene_topic;
use camtrack_core::TrackSet;
use camtrack_schema::SchemaValidator;

/// `encode` + `BrokerClient::publish`, kept as its own boundary so that
/// publish failures have a clear attribution and the worker's tracking
/// loop doesn't get conflated with wire-format concerns.
///
/// A failure to encode our own `TrackSet` (a non-conforming output payload)
/// is a programming error, not a recoverable drop — it panics rather than
/// returning a `BrokerError`, matching `camtrack_codec::encode`'s own
/// self-validation policy.
pub fn publish_track_set(
    broker: &dyn BrokerClient,
    track_set: &TrackSet,
    validator: Option<&dyn SchemaValidator>,
) -> Result<(), BrokerError> {
    let topic = build_scene_topic(&track_set.scene_id, &track_set.thing_type);
    let payload = camtrack_codec::encode(track_set, validator)
        .unwrap_or_else(|err| panic!("failed to encode outbound track set: {err}"));
    broker.publish(&topic, payload)
}
