/// One output object in world coordinates, with a persistent identity
/// assigned and maintained by the `TrackingEngine` across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: String,
    pub category: String,
    pub translation: [f64; 3],
    pub velocity: [f64; 3],
    pub size: [f64; 3],
    /// Unit quaternion, scalar-last: `[x, y, z, w]`.
    pub rotation: [f64; 4],
}

/// The published unit: one scene's worth of tracks for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSet {
    pub scene_id: String,
    pub scene_name: String,
    pub thing_type: String,
    /// ISO-8601 string echoed from the input batch.
    pub timestamp: String,
    pub tracks: Vec<Track>,
}
