use std::time::Instant;

use crate::detection::DetectionBatch;
use crate::scope::Scope;

/// Dispatch unit produced by the Scheduler: one [`Scope`] plus an ordered
/// (ascending by `timestamp`) list of [`DetectionBatch`]. A `Chunk` with
/// empty `batches` must never be dispatched, except the sentinel shutdown
/// chunk which always has empty batches by construction.
pub struct Chunk {
    pub scope: Scope,
    pub chunk_time: Instant,
    pub batches: Vec<DetectionBatch>,
}

impl Chunk {
    pub fn new(scope: Scope, chunk_time: Instant, batches: Vec<DetectionBatch>) -> Self {
        Self {
            scope,
            chunk_time,
            batches,
        }
    }

    /// An in-band shutdown signal: true iff `scope.scene_id` is empty.
    pub fn is_sentinel(&self) -> bool {
        self.scope.is_sentinel()
    }

    pub fn sentinel(chunk_time: Instant) -> Self {
        Self {
            scope: Scope::sentinel(),
            chunk_time,
            batches: Vec::new(),
        }
    }
}
