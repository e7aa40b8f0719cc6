use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::errors::{SchemaError, SchemaErrors};
use crate::wire::{CameraDataMessage, SceneDataMessage};

/// Deserializes `data` (already-parsed JSON) into `T`, classifying the
/// failure the way `serde_json::Error::classify()` does: `Syntax`/`Eof`/`Io`
/// mean the input was never well-formed JSON to begin with and stays
/// `Malformed`, while `Data` means the JSON parsed fine but doesn't conform
/// to `T`'s shape (missing required field, wrong type on a known field) —
/// that is a schema violation, not a parse failure, so it is reported as
/// `Invalid` with a field path pointing at the offending key.
fn deserialize_typed<T>(payload_kind: &'static str, data: &Value) -> Result<T, SchemaError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(data.clone()).map_err(|e| match e.classify() {
        serde_json::error::Category::Data => {
            let mut out = SchemaErrors::new();
            out.push("<deserialize>", e.to_string());
            out.into_error(payload_kind)
        }
        serde_json::error::Category::Syntax
        | serde_json::error::Category::Eof
        | serde_json::error::Category::Io => SchemaError::malformed(payload_kind, &e),
    })
}

/// Deserializes `data` into `T` and runs its `validator::Validate` impl,
/// flattening both failure modes into a single field-path -> message map.
/// Mirrors the shape of a generic `validate<T>` helper, specialized per
/// payload kind so field paths can be rooted at `objects.<category>[i]`
/// instead of `objects[i]` for the camera payload's map-of-lists shape.
fn deserialize_and_validate<T>(payload_kind: &'static str, data: &Value) -> Result<T, SchemaError>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = deserialize_typed(payload_kind, data)?;
    if let Err(errs) = parsed.validate() {
        let mut out = SchemaErrors::new();
        push_validation_errors(&mut out, String::new(), &errs);
        return Err(out.into_error(payload_kind));
    }
    Ok(parsed)
}

/// Recursively flattens `validator::ValidationErrors` into dotted/indexed
/// field paths. Adapted from the field/struct/list distinction the
/// `validator` crate exposes via `ValidationErrorsKind`.
fn push_validation_errors(out: &mut SchemaErrors, prefix: String, errors: &ValidationErrors) {
    for (field, kind) in errors.errors() {
        let path = join_path(&prefix, field);
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed validation: {}", err.code));
                    out.push(path.clone(), message);
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                push_validation_errors(out, path, nested);
            }
            ValidationErrorsKind::List(list) => {
                for (index, nested) in list {
                    push_validation_errors(out, join_index(&path, *index), nested);
                }
            }
        }
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn join_index(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

/// Validates every detection inside a camera-data payload's per-category
/// `objects` map, producing field paths like `objects.person[2].id` rather
/// than delegating to `validator`'s derive (which cannot express a map of
/// lists in one nested attribute).
fn validate_objects_map(out: &mut SchemaErrors, msg: &CameraDataMessage) {
    for (category, detections) in &msg.objects {
        for (index, detection) in detections.iter().enumerate() {
            if let Err(errs) = detection.validate() {
                push_validation_errors(out, format!("objects.{category}[{index}]"), &errs);
            }
        }
    }
}

/// Deserializes and validates an inbound camera-data payload.
pub fn validate_camera_payload(data: &Value) -> Result<CameraDataMessage, SchemaError> {
    let msg: CameraDataMessage = deserialize_typed("camera-data", data)?;

    let mut out = SchemaErrors::new();
    if let Err(errs) = msg.validate() {
        push_validation_errors(&mut out, String::new(), &errs);
    }
    validate_objects_map(&mut out, &msg);

    if out.is_empty() {
        Ok(msg)
    } else {
        Err(out.into_error("camera-data"))
    }
}

/// Deserializes and validates an outbound scene-data payload. Used both to
/// reject malformed inbound replays in tests and, per the codec's
/// self-validation requirement, to check the encoder's own output before it
/// reaches the broker.
pub fn validate_scene_payload(data: &Value) -> Result<SceneDataMessage, SchemaError> {
    deserialize_and_validate("scene-data", data)
}

/// Toggle point for `tracker.schema_validation`: when disabled, the codec
/// skips straight to a best-effort `serde_json::from_value` with no field
/// level diagnostics, matching the config knob described for deployments
/// that trust their camera fleet's payload shape.
pub trait SchemaValidator: Send + Sync {
    fn validate_camera(&self, data: &Value) -> Result<CameraDataMessage, SchemaError>;
    fn validate_scene(&self, data: &Value) -> Result<SceneDataMessage, SchemaError>;
}

pub struct StrictSchemaValidator;

impl SchemaValidator for StrictSchemaValidator {
    fn validate_camera(&self, data: &Value) -> Result<CameraDataMessage, SchemaError> {
        validate_camera_payload(data)
    }

    fn validate_scene(&self, data: &Value) -> Result<SceneDataMessage, SchemaError> {
        validate_scene_payload(data)
    }
}

/// Skips field-level validation; deserialization failures still surface as
/// `SchemaError::Malformed`.
pub struct NoopSchemaValidator;

impl SchemaValidator for NoopSchemaValidator {
    fn validate_camera(&self, data: &Value) -> Result<CameraDataMessage, SchemaError> {
        serde_json::from_value(data.clone()).map_err(|e| SchemaError::malformed("camera-data", &e))
    }

    fn validate_scene(&self, data: &Value) -> Result<SceneDataMessage, SchemaError> {
        serde_json::from_value(data.clone()).map_err(|e| SchemaError::malformed("scene-data", &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_camera_payload_parses() {
        let data = json!({
            "id": "cam1",
            "timestamp": "2026-01-01T00:00:00.000Z",
            "objects": {
                "person": [
                    { "bounding_box_px": { "x": 1.0, "y": 2.0, "width": 10.0, "height": 20.0 }, "id": 7 }
                ]
            }
        });
        let parsed = validate_camera_payload(&data).expect("should validate");
        assert_eq!(parsed.id, "cam1");
    }

    #[test]
    fn negative_bbox_width_is_rejected_with_field_path() {
        let data = json!({
            "id": "cam1",
            "timestamp": "2026-01-01T00:00:00.000Z",
            "objects": {
                "person": [
                    { "bounding_box_px": { "x": 1.0, "y": 2.0, "width": -1.0, "height": 20.0 }, "id": null }
                ]
            }
        });
        let err = validate_camera_payload(&data).expect_err("should reject negative width");
        match err {
            SchemaError::Invalid { fields, .. } => {
                assert!(fields.fields().keys().any(|k| k.contains("bounding_box_px.width")));
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn empty_id_is_rejected() {
        let data = json!({
            "id": "",
            "timestamp": "2026-01-01T00:00:00.000Z",
            "objects": {}
        });
        assert!(validate_camera_payload(&data).is_err());
    }

    #[test]
    fn non_unit_quaternion_rejected_in_scene_payload() {
        let data = json!({
            "id": "scene1",
            "name": "Main scene",
            "type": "person",
            "timestamp": "2026-01-01T00:00:00.000Z",
            "objects": [
                {
                    "id": "track1",
                    "category": "person",
                    "translation": [0.0, 0.0, 0.0],
                    "velocity": [0.0, 0.0, 0.0],
                    "size": [1.0, 1.0, 1.0],
                    "rotation": [0.0, 0.0, 0.0, 0.0]
                }
            ]
        });
        assert!(validate_scene_payload(&data).is_err());
    }

    #[test]
    fn missing_objects_field_is_invalid_not_malformed() {
        let data = json!({
            "id": "cam1",
            "timestamp": "2026-01-01T00:00:00.000Z"
        });
        let err = validate_camera_payload(&data).expect_err("missing objects should be rejected");
        assert!(matches!(err, SchemaError::Invalid { .. }));
    }

    #[test]
    fn wrong_type_on_known_field_is_invalid_not_malformed() {
        let data = json!({
            "id": "cam1",
            "timestamp": "2026-01-01T00:00:00.000Z",
            "objects": "not-a-map"
        });
        let err = validate_camera_payload(&data).expect_err("wrong-typed objects should be rejected");
        assert!(matches!(err, SchemaError::Invalid { .. }));
    }

    #[test]
    fn noop_validator_skips_field_checks() {
        let data = json!({
            "id": "cam1",
            "timestamp": "2026-01-01T00:00:00.000Z",
            "objects": {
                "person": [
                    { "bounding_box_px": { "x": 0.0, "y": 0.0, "width": -5.0, "height": 1.0 }, "id": null }
                ]
            }
        });
        let validator = NoopSchemaValidator;
        assert!(validator.validate_camera(&data).is_ok());
    }
}
