use std::time::Instant;

use camtrack_core::BoundingBoxPx;

/// Camera calibration sufficient for a ground-plane homography projection:
/// pixel coordinates to world-plane meters. Full intrinsics/extrinsics
/// modeling is a `TrackingEngine` implementation detail; this is the
/// minimal shape the reference engine and the Worker's conversion step
/// need to agree on.
#[derive(Debug, Clone)]
pub struct CameraParams {
    pub camera_id: String,
    /// Row-major 3x3 homography mapping `[x_px, y_px, 1]` to
    /// `[x_world * w, y_world * w, w]` in homogeneous coordinates.
    pub homography: [[f64; 3]; 3],
}

impl CameraParams {
    /// Identity homography: pixel coordinates pass through unchanged,
    /// scaled by `scale`. Useful for tests and as a development default.
    pub fn identity(camera_id: impl Into<String>, scale: f64) -> Self {
        Self {
            camera_id: camera_id.into(),
            homography: [[scale, 0.0, 0.0], [0.0, scale, 0.0], [0.0, 0.0, 1.0]],
        }
    }
}

/// A pixel-space bounding box projected onto the world plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl WorldRect {
    pub fn center(&self) -> [f64; 2] {
        [self.x + self.width / 2.0, self.y + self.height / 2.0]
    }
}

/// One detection's engine-ready input: a projected world rectangle plus
/// enough provenance to attribute an output track back to its source
/// camera, if the engine wants to use it.
#[derive(Debug, Clone)]
pub struct PerCameraInput {
    pub camera_id: String,
    pub detection_id: Option<i64>,
    pub world_rect: WorldRect,
}

/// One track as produced by `TrackingEngine::reliable_tracks`. `category`
/// is deliberately absent: the Worker fills it in from the `Scope` the
/// engine instance belongs to, since a single engine instance only ever
/// tracks one category.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineTrack {
    pub id: String,
    pub translation: [f64; 3],
    pub velocity: [f64; 3],
    pub size: [f64; 3],
    pub rotation: [f64; 4],
}

/// `TrackingEngine` is the abstraction boundary the pipeline pushes
/// detections through and pulls tracks back out of. Kalman filtering,
/// data association, and re-identification are engine-internal concerns;
/// the core pipeline only depends on this interface. Exactly one instance
/// lives per `Scope`, owned by that scope's Worker thread — `track` is
/// CPU-bound and MUST NOT perform network I/O, since it runs on the same
/// thread that must keep up with the scheduler's dispatch cadence.
pub trait TrackingEngine: Send {
    fn track(&mut self, inputs: Vec<PerCameraInput>, chunk_time: Instant);

    fn reliable_tracks(&self) -> Vec<EngineTrack>;

    fn project_pixel_bbox_to_world(&self, bbox: BoundingBoxPx, camera_params: &CameraParams) -> WorldRect;
}
