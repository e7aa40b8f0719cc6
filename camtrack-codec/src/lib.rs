//! Translates between MQTT `(topic, payload)` pairs and `camtrack-core`
//! types. `decode` turns one inbound camera-data message into one
//! `DetectionBatch` per object category; `encode` turns one `TrackSet` into
//! an outbound scene-data payload.

mod decode;
mod encode;
mod error;
mod topic;

pub use decode::decode;
pub use encode::encode;
pub use error::CodecError;
pub use topic::{build_scene_topic, parse_camera_topic, CAMERA_SUBSCRIBE_PATTERN};
