use std::collections::HashMap;
use std::time::Instant;

use camtrack_core::{BoundingBoxPx, Detection, DetectionBatch, Scope};
use camtrack_observability::ObservabilityContext;
use camtrack_schema::{CameraDataMessage, DetectionDto, SchemaError, SchemaValidator};

use crate::error::CodecError;
use crate::topic::parse_camera_topic;

impl From<DetectionDto> for Detection {
    fn from(dto: DetectionDto) -> Self {
        Detection {
            detection_id: dto.id,
            bbox_px: BoundingBoxPx {
                x: dto.bounding_box_px.x,
                y: dto.bounding_box_px.y,
                width: dto.bounding_box_px.width,
                height: dto.bounding_box_px.height,
            },
        }
    }
}

impl From<SchemaError> for CodecError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Malformed { .. } => CodecError::ParseError(err.to_string()),
            SchemaError::Invalid { .. } => CodecError::SchemaInvalid(err.to_string()),
        }
    }
}

/// Decodes one inbound camera-data message into one [`DetectionBatch`] per
/// object category present in the payload, each paired with the [`Scope`]
/// it routes to. `scene_id` comes from service configuration (single-scene
/// deployment); `received_at` is the monotonic instant the broker callback
/// observed the message, used for chunking and lag checks downstream.
///
/// A `camera_id` mismatch between the topic segment and the payload's `id`
/// field is logged but is not an error — the topic segment is authoritative
/// for routing.
pub fn decode(
    topic: &str,
    payload: &[u8],
    user_properties: &HashMap<String, String>,
    scene_id: &str,
    received_at: Instant,
    validator: Option<&dyn SchemaValidator>,
) -> Result<Vec<(Scope, DetectionBatch)>, CodecError> {
    let camera_id = parse_camera_topic(topic)?;

    let value: serde_json::Value =
        serde_json::from_slice(payload).map_err(|e| CodecError::ParseError(e.to_string()))?;

    let msg: CameraDataMessage = match validator {
        Some(v) => v.validate_camera(&value)?,
        None => serde_json::from_value(value).map_err(|e| CodecError::ParseError(e.to_string()))?,
    };

    if msg.id != camera_id {
        tracing::warn!(
            topic_camera_id = %camera_id,
            payload_camera_id = %msg.id,
            "camera id in payload does not match topic segment",
        );
    }

    let mut batches = Vec::with_capacity(msg.objects.len());
    for (category, detections) in msg.objects {
        let obs_ctx = ObservabilityContext::new(scene_id, category.as_str(), user_properties);
        let detections = detections.into_iter().map(Detection::from).collect();
        let batch = DetectionBatch::new(
            camera_id,
            received_at,
            msg.timestamp.clone(),
            detections,
            obs_ctx,
        );
        batches.push((Scope::new(scene_id, category), batch));
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camtrack_schema::StrictSchemaValidator;

    fn sample_payload() -> Vec<u8> {
        br#"{"id":"cam1","timestamp":"2026-01-01T00:00:00.000Z","objects":{"person":[{"bounding_box_px":{"x":0,"y":0,"width":10,"height":20}}],"vehicle":[{"bounding_box_px":{"x":1,"y":1,"width":5,"height":5},"id":3}]}}"#.to_vec()
    }

    #[test]
    fn decodes_one_batch_per_category() {
        let batches = decode(
            "scenescape/data/camera/cam1",
            &sample_payload(),
            &HashMap::new(),
            "scene1",
            Instant::now(),
            None,
        )
        .expect("should decode");
        assert_eq!(batches.len(), 2);
        let categories: Vec<&str> = batches.iter().map(|(s, _)| s.category.as_str()).collect();
        assert!(categories.contains(&"person"));
        assert!(categories.contains(&"vehicle"));
    }

    #[test]
    fn bad_topic_is_rejected() {
        let result = decode(
            "wrong/topic",
            &sample_payload(),
            &HashMap::new(),
            "scene1",
            Instant::now(),
            None,
        );
        assert!(matches!(result, Err(CodecError::BadTopic(_))));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let result = decode(
            "scenescape/data/camera/cam1",
            b"not json",
            &HashMap::new(),
            "scene1",
            Instant::now(),
            None,
        );
        assert!(matches!(result, Err(CodecError::ParseError(_))));
    }

    #[test]
    fn payload_missing_required_field_is_schema_invalid_not_parse_error() {
        let payload = br#"{"id":"cam1","timestamp":"2026-01-01T00:00:00.000Z"}"#;
        let validator = StrictSchemaValidator;
        let result = decode(
            "scenescape/data/camera/cam1",
            payload,
            &HashMap::new(),
            "scene1",
            Instant::now(),
            Some(&validator),
        );
        assert!(matches!(result, Err(CodecError::SchemaInvalid(_))));
    }

    #[test]
    fn schema_invalid_payload_rejected_when_validation_enabled() {
        let payload = br#"{"id":"cam1","timestamp":"t","objects":{"person":[{"bounding_box_px":{"x":0,"y":0,"width":-1,"height":20}}]}}"#;
        let validator = StrictSchemaValidator;
        let result = decode(
            "scenescape/data/camera/cam1",
            payload,
            &HashMap::new(),
            "scene1",
            Instant::now(),
            Some(&validator),
        );
        assert!(matches!(result, Err(CodecError::SchemaInvalid(_))));
    }
}
