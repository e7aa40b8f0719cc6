use std::collections::HashMap;

use camtrack_tracking::CameraParams;

/// Known camera calibrations, keyed by `camera_id`. Populated once at
/// startup from service configuration and shared read-only across every
/// worker thread — calibration does not change while the service runs
/// (camera calibration is fixed at startup; it is not reloaded while running).
pub struct CameraRegistry {
    cameras: HashMap<String, CameraParams>,
}

impl CameraRegistry {
    pub fn new(cameras: impl IntoIterator<Item = CameraParams>) -> Self {
        Self {
            cameras: cameras.into_iter().map(|c| (c.camera_id.clone(), c)).collect(),
        }
    }

    pub fn empty() -> Self {
        Self { cameras: HashMap::new() }
    }

    /// Looks up a camera's calibration. A camera with no known calibration
    /// still gets an identity projection rather than blocking the pipeline
    /// — an uncalibrated camera is an operator misconfiguration, not a
    /// reason to drop detections that have otherwise made it this far.
    pub fn get_or_identity(&self, camera_id: &str) -> CameraParams {
        match self.cameras.get(camera_id) {
            Some(params) => params.clone(),
            None => {
                tracing::warn!(camera_id, "no calibration known for camera; using identity projection");
                CameraParams::identity(camera_id, 1.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_known_calibration() {
        let registry = CameraRegistry::new(vec![CameraParams::identity("cam1", 2.0)]);
        let params = registry.get_or_identity("cam1");
        assert_eq!(params.homography[0][0], 2.0);
    }

    #[test]
    fn falls_back_to_identity_for_unknown_camera() {
        let registry = CameraRegistry::empty();
        let params = registry.get_or_identity("cam-unknown");
        assert_eq!(params.camera_id, "cam-unknown");
        assert_eq!(params.homography[0][0], 1.0);
    }
}
