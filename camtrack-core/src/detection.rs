use std::time::Instant;

use camtrack_observability::ObservabilityContext;

/// Axis-aligned bounding box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBoxPx {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One object observation from inference, in pixel coordinates.
/// `detection_id`, when present, is frame-local only and carries no
/// cross-frame meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub detection_id: Option<i64>,
    pub bbox_px: BoundingBoxPx,
}

/// All detections from a single camera's single frame, for a single object
/// category. `timestamp` is the monotonic time the message was received
/// (used for chunking and lag checks); `wall_clock_timestamp` is the
/// upstream payload's own timestamp, preserved verbatim and echoed into the
/// output.
pub struct DetectionBatch {
    pub camera_id: String,
    pub timestamp: Instant,
    pub wall_clock_timestamp: String,
    pub detections: Vec<Detection>,
    pub obs_ctx: ObservabilityContext,
}

impl DetectionBatch {
    pub fn new(
        camera_id: impl Into<String>,
        timestamp: Instant,
        wall_clock_timestamp: impl Into<String>,
        detections: Vec<Detection>,
        obs_ctx: ObservabilityContext,
    ) -> Self {
        Self {
            camera_id: camera_id.into(),
            timestamp,
            wall_clock_timestamp: wall_clock_timestamp.into(),
            detections,
            obs_ctx,
        }
    }
}
