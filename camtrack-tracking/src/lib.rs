//! The `TrackingEngine` interface Workers call through, plus a reference
//! implementation. Kalman filtering, data association, and re-ID are
//! explicitly out of scope for the pipeline core — any conforming engine
//! can be dropped in behind this trait.

mod reference;
mod types;

pub use reference::ReferenceTrackingEngine;
pub use types::{CameraParams, EngineTrack, PerCameraInput, TrackingEngine, WorldRect};
