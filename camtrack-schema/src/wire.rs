use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Wire shape of one detection inside a camera-data payload's `objects` map.
/// Unknown fields are ignored by `serde`'s default (non-`deny_unknown_fields`)
/// behavior; known fields with the wrong type fail deserialization, which
/// the codec maps to `schema_invalid`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DetectionDto {
    #[validate(nested)]
    pub bounding_box_px: BoundingBoxDto,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BoundingBoxDto {
    pub x: f64,
    pub y: f64,
    #[validate(range(min = 0.0, message = "width must be non-negative"))]
    pub width: f64,
    #[validate(range(min = 0.0, message = "height must be non-negative"))]
    pub height: f64,
}

/// Wire shape of an inbound camera-data message:
/// `scenescape/data/camera/<camera_id>`.
/// `objects` is validated by hand in `validate::validate_camera_payload`:
/// the `validator` crate's `#[validate(nested)]` only reaches into a single
/// level of `Vec`/`Option`/struct, not a `HashMap<String, Vec<_>>`, and the
/// per-category field path (`objects.person[2].bounding_box_px.width`)
/// needs to be built explicitly either way.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CameraDataMessage {
    #[validate(length(min = 1, message = "id must not be empty"))]
    pub id: String,
    pub timestamp: String,
    pub objects: HashMap<String, Vec<DetectionDto>>,
}

/// Wire shape of one track inside an outbound scene-data payload's
/// `objects` list.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrackDto {
    pub id: String,
    pub category: String,
    pub translation: [f64; 3],
    pub velocity: [f64; 3],
    pub size: [f64; 3],
    #[validate(custom(function = "validate_quaternion"))]
    pub rotation: [f64; 4],
}

fn validate_quaternion(value: &[f64; 4]) -> Result<(), validator::ValidationError> {
    let norm_sq: f64 = value.iter().map(|v| v * v).sum();
    if (norm_sq - 1.0).abs() > 0.05 {
        return Err(validator::ValidationError::new("rotation must be a unit quaternion"));
    }
    Ok(())
}

/// Wire shape of an outbound scene-data message:
/// `scenescape/data/scene/{scene_id}/{thing_type}`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SceneDataMessage {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub thing_type: String,
    pub timestamp: String,
    #[validate(nested)]
    pub objects: Vec<TrackDto>,
}
