use camtrack_core::{Track, TrackSet};
use camtrack_schema::{SceneDataMessage, SchemaValidator, TrackDto};

use crate::error::CodecError;

impl From<&Track> for TrackDto {
    fn from(track: &Track) -> Self {
        TrackDto {
            id: track.id.clone(),
            category: track.category.clone(),
            translation: track.translation,
            velocity: track.velocity,
            size: track.size,
            rotation: track.rotation,
        }
    }
}

/// Encodes a [`TrackSet`] into a scene-data wire payload. When `validator`
/// is present, the encoder validates its own output before returning it:
/// an invalid output here means the tracking engine produced a
/// non-conforming track (e.g. a non-unit quaternion), which is a bug in
/// this service rather than a condition the pipeline can recover from —
/// so this panics instead of returning a recoverable [`CodecError`].
pub fn encode(track_set: &TrackSet, validator: Option<&dyn SchemaValidator>) -> Result<Vec<u8>, CodecError> {
    let msg = SceneDataMessage {
        id: track_set.scene_id.clone(),
        name: track_set.scene_name.clone(),
        thing_type: track_set.thing_type.clone(),
        timestamp: track_set.timestamp.clone(),
        objects: track_set.tracks.iter().map(TrackDto::from).collect(),
    };

    let value = serde_json::to_value(&msg).map_err(|e| CodecError::ParseError(e.to_string()))?;

    if let Some(v) = validator {
        if let Err(err) = v.validate_scene(&value) {
            panic!("tracking engine produced a non-conforming scene-data payload: {err}");
        }
    }

    serde_json::to_vec(&msg).map_err(|e| CodecError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camtrack_schema::StrictSchemaValidator;

    fn sample_track_set() -> TrackSet {
        TrackSet {
            scene_id: "scene1".to_string(),
            scene_name: "Main scene".to_string(),
            thing_type: "person".to_string(),
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            tracks: vec![Track {
                id: "track1".to_string(),
                category: "person".to_string(),
                translation: [1.0, 2.0, 0.0],
                velocity: [0.0, 0.0, 0.0],
                size: [0.5, 0.5, 1.8],
                rotation: [0.0, 0.0, 0.0, 1.0],
            }],
        }
    }

    #[test]
    fn encodes_valid_track_set() {
        let payload = encode(&sample_track_set(), None).expect("should encode");
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["id"], "scene1");
        assert_eq!(value["type"], "person");
        assert_eq!(value["objects"][0]["id"], "track1");
    }

    #[test]
    fn self_validates_against_scene_schema() {
        let validator = StrictSchemaValidator;
        let payload = encode(&sample_track_set(), Some(&validator)).expect("should encode");
        assert!(!payload.is_empty());
    }

    #[test]
    #[should_panic(expected = "non-conforming")]
    fn panics_on_non_unit_quaternion_output() {
        let mut track_set = sample_track_set();
        track_set.tracks[0].rotation = [0.0, 0.0, 0.0, 0.0];
        let validator = StrictSchemaValidator;
        let _ = encode(&track_set, Some(&validator));
    }
}
