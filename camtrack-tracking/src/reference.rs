use std::collections::HashMap;
use std::time::{Duration, Instant};

use camtrack_core::BoundingBoxPx;

use crate::types::{CameraParams, EngineTrack, PerCameraInput, TrackingEngine, WorldRect};

struct TrackState {
    translation: [f64; 3],
    velocity: [f64; 3],
    last_seen: Instant,
    last_tick: Instant,
}

/// A greedy nearest-centroid `TrackingEngine`: every tick, each input is
/// matched to the closest existing track within `match_radius_m`, else
/// starts a new track. Tracks not updated for `max_age` are dropped. There
/// is no re-identification, occlusion handling, or smoothing beyond a
/// single-step velocity estimate — this exists so the pipeline has a
/// working default and so tests don't need a real tracking backend, not
/// as a production tracking algorithm.
pub struct ReferenceTrackingEngine {
    tracks: HashMap<String, TrackState>,
    next_id: u64,
    match_radius_m: f64,
    max_age: Duration,
    default_size: [f64; 3],
}

impl ReferenceTrackingEngine {
    pub fn new() -> Self {
        Self {
            tracks: HashMap::new(),
            next_id: 0,
            match_radius_m: 1.0,
            max_age: Duration::from_secs(5),
            default_size: [0.5, 0.5, 1.8],
        }
    }

    pub fn with_match_radius_m(mut self, radius: f64) -> Self {
        self.match_radius_m = radius;
        self
    }

    fn next_track_id(&mut self) -> String {
        let id = format!("t{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn nearest_track(&self, center: [f64; 2]) -> Option<(String, f64)> {
        self.tracks
            .iter()
            .map(|(id, state)| {
                let dx = state.translation[0] - center[0];
                let dy = state.translation[1] - center[1];
                (id.clone(), (dx * dx + dy * dy).sqrt())
            })
            .filter(|(_, dist)| *dist <= self.match_radius_m)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
    }
}

impl Default for ReferenceTrackingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingEngine for ReferenceTrackingEngine {
    fn track(&mut self, inputs: Vec<PerCameraInput>, chunk_time: Instant) {
        for input in inputs {
            let center = input.world_rect.center();
            let matched_id = self.nearest_track(center);

            let id = match matched_id {
                Some((id, _)) => id,
                None => self.next_track_id(),
            };

            let previous = self.tracks.get(&id);
            let velocity = match previous {
                Some(state) => {
                    let dt = chunk_time.saturating_duration_since(state.last_tick).as_secs_f64();
                    if dt > 0.0 {
                        [
                            (center[0] - state.translation[0]) / dt,
                            (center[1] - state.translation[1]) / dt,
                            0.0,
                        ]
                    } else {
                        state.velocity
                    }
                }
                None => [0.0, 0.0, 0.0],
            };

            self.tracks.insert(
                id,
                TrackState {
                    translation: [center[0], center[1], 0.0],
                    velocity,
                    last_seen: chunk_time,
                    last_tick: chunk_time,
                },
            );
        }

        self.tracks.retain(|_, state| {
            chunk_time.saturating_duration_since(state.last_seen) <= self.max_age
        });
    }

    fn reliable_tracks(&self) -> Vec<EngineTrack> {
        self.tracks
            .iter()
            .map(|(id, state)| EngineTrack {
                id: id.clone(),
                translation: state.translation,
                velocity: state.velocity,
                size: self.default_size,
                rotation: [0.0, 0.0, 0.0, 1.0],
            })
            .collect()
    }

    fn project_pixel_bbox_to_world(&self, bbox: BoundingBoxPx, camera_params: &CameraParams) -> WorldRect {
        let cx = bbox.x + bbox.width / 2.0;
        let cy = bbox.y + bbox.height;
        let h = &camera_params.homography;

        let wx = h[0][0] * cx + h[0][1] * cy + h[0][2];
        let wy = h[1][0] * cx + h[1][1] * cy + h[1][2];
        let w = h[2][0] * cx + h[2][1] * cy + h[2][2];
        let w = if w.abs() < f64::EPSILON { 1.0 } else { w };

        let scale = (h[0][0] * h[0][0] + h[1][1] * h[1][1]).sqrt().max(f64::EPSILON);
        WorldRect {
            x: wx / w,
            y: wy / w,
            width: bbox.width * scale,
            height: bbox.height * scale,
        }
    }
}
