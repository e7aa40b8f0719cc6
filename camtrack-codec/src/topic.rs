use crate::error::CodecError;

const CAMERA_TOPIC_PREFIX: &str = "scenescape/data/camera/";

/// Extracts `camera_id` from an inbound topic of the form
/// `scenescape/data/camera/<camera_id>`. `camera_id` is a single path
/// segment; a topic carrying `/` after the prefix is rejected rather than
/// silently truncated.
pub fn parse_camera_topic(topic: &str) -> Result<&str, CodecError> {
    let camera_id = topic
        .strip_prefix(CAMERA_TOPIC_PREFIX)
        .ok_or_else(|| CodecError::BadTopic(topic.to_string()))?;
    if camera_id.is_empty() || camera_id.contains('/') {
        return Err(CodecError::BadTopic(topic.to_string()));
    }
    Ok(camera_id)
}

/// Builds the outbound topic `scenescape/data/scene/{scene_id}/{thing_type}`.
pub fn build_scene_topic(scene_id: &str, thing_type: &str) -> String {
    format!("scenescape/data/scene/{scene_id}/{thing_type}")
}

/// The broker subscription pattern for inbound camera data, using a
/// single-level wildcard.
pub const CAMERA_SUBSCRIBE_PATTERN: &str = "scenescape/data/camera/+";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_camera_id() {
        assert_eq!(parse_camera_topic("scenescape/data/camera/cam1").unwrap(), "cam1");
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(parse_camera_topic("other/topic/cam1").is_err());
    }

    #[test]
    fn rejects_multi_segment_camera_id() {
        assert!(parse_camera_topic("scenescape/data/camera/cam1/extra").is_err());
    }

    #[test]
    fn builds_scene_topic() {
        assert_eq!(build_scene_topic("scene1", "person"), "scenescape/data/scene/scene1/person");
    }
}
