//! Per-message observability for the camtrack pipeline.
//!
//! An [`ObservabilityContext`] is created once per ingested
//! `DetectionBatch` and carries trace identifiers and per-stage timestamps
//! through every pipeline component. It must end in exactly one terminal
//! transition: [`ObservabilityContext::finalize`] on success or
//! [`ObservabilityContext::abort`] on drop. No other call site may emit
//! metrics or end spans for a given message — this is the single-emission
//! invariant the rest of the pipeline is built around.

mod context;
mod drop_reason;
mod metrics;
mod stage;

pub use context::{format_traceparent, parse_traceparent, ObservabilityContext, SpanId, TraceId};
pub use drop_reason::DropReason;
pub use metrics::{Metrics, MetricsSnapshot};
pub use stage::Stage;
