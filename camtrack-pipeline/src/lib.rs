//! The time-chunked aggregation and dispatch pipeline: `TimeChunkBuffer`,
//! `Scheduler`, `Worker`, the thin `Publisher` boundary, and the
//! `Supervisor` that orchestrates all of it through startup and shutdown.

mod buffer;
mod camera_registry;
mod config;
mod publish;
mod scheduler;
mod supervisor;
mod worker;

pub use buffer::TimeChunkBuffer;
pub use camera_registry::CameraRegistry;
pub use config::PipelineConfig;
pub use publish::publish_track_set;
pub use scheduler::{Scheduler, SchedulerHandle};
pub use supervisor::{Supervisor, SupervisorState};
pub use worker::{EngineFactory, Worker};
