//! Shared data model for the camtrack multi-camera tracking pipeline:
//! detections in pixel coordinates flowing in, tracks in world coordinates
//! flowing out, and the `Scope`/`Chunk` types that route and batch them.

mod chunk;
mod detection;
mod error;
mod scope;
mod track;

pub use chunk::Chunk;
pub use detection::{BoundingBoxPx, Detection, DetectionBatch};
pub use error::CoreError;
pub use scope::Scope;
pub use track::{Track, TrackSet};
