use std::time::Duration;

/// Tunables for buffer lag, scheduler cadence, worker queue depth, and
/// shutdown grace. Defaults match the values used when no external
/// configuration overrides them.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunk_interval: Duration,
    pub max_lag: Duration,
    pub worker_queue_capacity: usize,
    pub drain_timeout: Duration,
    pub scene_id: String,
    pub scene_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_interval: Duration::from_micros(66_667),
            max_lag: Duration::from_secs(1),
            worker_queue_capacity: 2,
            drain_timeout: Duration::from_secs(2),
            scene_id: "scene1".to_string(),
            scene_name: "Main scene".to_string(),
        }
    }
}
