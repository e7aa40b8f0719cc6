//! Wire DTOs for camera-data / scene-data MQTT payloads and the schema
//! validation layer sitting in front of `camtrack-codec`. Field-level
//! errors are flattened to dotted/indexed paths so `schema_invalid` drop
//! reasons carry a specific, loggable cause rather than a bare "bad JSON".

mod errors;
mod validate;
mod wire;

pub use errors::{SchemaError, SchemaErrors};
pub use validate::{
    validate_camera_payload, validate_scene_payload, NoopSchemaValidator, SchemaValidator,
    StrictSchemaValidator,
};
pub use wire::{BoundingBoxDto, CameraDataMessage, DetectionDto, SceneDataMessage, TrackDto};
