use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::RngCore;

use crate::drop_reason::DropReason;
use crate::metrics::Metrics;
use crate::stage::Stage;

/// 16-byte trace id, rendered as 32 lowercase hex characters in logs and on
/// the wire (W3C Trace Context format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(pub [u8; 16]);

/// 8-byte span id, rendered as 16 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(pub [u8; 8]);

impl TraceId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 16];
        hex_decode(s, &mut bytes)?;
        Some(Self(bytes))
    }
}

impl SpanId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; 8];
        hex_decode(s, &mut bytes)?;
        Some(Self(bytes))
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

fn hex_decode(s: &str, out: &mut [u8]) -> Option<()> {
    if s.len() != out.len() * 2 {
        return None;
    }
    for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
        let hi = (chunk[0] as char).to_digit(16)?;
        let lo = (chunk[1] as char).to_digit(16)?;
        out[i] = ((hi << 4) | lo) as u8;
    }
    Some(())
}

/// Parses a W3C `traceparent` header value
/// (`00-<32 hex trace id>-<16 hex span id>-<2 hex flags>`) into a
/// `(TraceId, SpanId)` pair. Returns `None` on any malformed input, in which
/// case the caller should fall back to generating a fresh context.
pub fn parse_traceparent(value: &str) -> Option<(TraceId, SpanId)> {
    let mut parts = value.split('-');
    let _version = parts.next()?;
    let trace_id = TraceId::from_hex(parts.next()?)?;
    let span_id = SpanId::from_hex(parts.next()?)?;
    let _flags = parts.next()?;
    Some((trace_id, span_id))
}

pub fn format_traceparent(trace_id: &TraceId, span_id: &SpanId) -> String {
    format!("00-{}-{}-01", trace_id.to_hex(), span_id.to_hex())
}

/// Terminal transition an [`ObservabilityContext`] has undergone. A context
/// not yet in a terminal state is still in flight somewhere in the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Terminal {
    Pending,
    Finalized,
    Aborted(DropReason),
}

/// Per-message telemetry state. Carries trace identifiers, a timestamp per
/// pipeline stage, and the currently active stage (used as the `stage`
/// label if the message is dropped). `finalize` or `abort` must be called
/// exactly once over the lifetime of a context; every drop path in every
/// component routes through `abort` so that no code path emits metrics for
/// the same message twice.
pub struct ObservabilityContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub tracestate: String,
    stage_times: HashMap<Stage, Instant>,
    current_stage: Stage,
    terminal: Terminal,
    scene_id: String,
    category: String,
}

impl ObservabilityContext {
    /// Starts a new context at the `receive` stage, extracting trace
    /// context from broker user-properties if present (W3C format), else
    /// generating a fresh trace/span id pair.
    pub fn new(scene_id: impl Into<String>, category: impl Into<String>, user_properties: &HashMap<String, String>) -> Self {
        let (trace_id, span_id) = user_properties
            .get("traceparent")
            .and_then(|tp| parse_traceparent(tp))
            .unwrap_or_else(|| (TraceId::generate(), SpanId::generate()));
        let tracestate = user_properties.get("tracestate").cloned().unwrap_or_default();

        let mut stage_times = HashMap::with_capacity(6);
        stage_times.insert(Stage::Receive, Instant::now());

        Self {
            trace_id,
            span_id,
            tracestate,
            stage_times,
            current_stage: Stage::Receive,
            terminal: Terminal::Pending,
            scene_id: scene_id.into(),
            category: category.into(),
        }
    }

    /// Records entry into `stage` and updates the "currently active stage"
    /// label used if this message is later aborted.
    pub fn enter_stage(&mut self, stage: Stage) {
        self.stage_times.insert(stage, Instant::now());
        self.current_stage = stage;
    }

    pub fn current_stage(&self) -> Stage {
        self.current_stage
    }

    fn stage_deltas(&self) -> Vec<(Stage, Duration)> {
        let mut deltas = Vec::new();
        let mut prev: Option<Instant> = None;
        for stage in Stage::ALL {
            if let Some(&t) = self.stage_times.get(&stage) {
                if let Some(p) = prev {
                    deltas.push((stage, t.saturating_duration_since(p)));
                }
                prev = Some(t);
            }
        }
        deltas
    }

    /// Pipeline completed successfully: records the end-to-end latency
    /// observation, logs one INFO record, and consumes the context.
    pub fn finalize(mut self, metrics: &Metrics) {
        self.terminal = Terminal::Finalized;
        let receive = self.stage_times.get(&Stage::Receive).copied();
        let publish = self.stage_times.get(&Stage::Publish).copied();
        let elapsed = match (receive, publish) {
            (Some(r), Some(p)) => p.saturating_duration_since(r),
            _ => Duration::ZERO,
        };
        metrics.record_finalize(&self.scene_id, &self.category, elapsed);

        tracing::info!(
            trace_id = %self.trace_id.to_hex(),
            span_id = %self.span_id.to_hex(),
            scene_id = %self.scene_id,
            category = %self.category,
            latency_ms = elapsed.as_secs_f64() * 1000.0,
            stage_deltas = ?self.stage_deltas().iter().map(|(s, d)| (s.as_str(), d.as_secs_f64() * 1000.0)).collect::<Vec<_>>(),
            "pipeline finalized",
        );
    }

    /// Pipeline dropped: increments the drop counter labeled by
    /// `{scene, category, reason, stage}` (stage = the currently active
    /// stage at the time of the drop), logs one WARN record, and consumes
    /// the context.
    pub fn abort(mut self, reason: DropReason, metrics: &Metrics) {
        let stage = self.current_stage;
        self.terminal = Terminal::Aborted(reason);
        metrics.record_drop(&self.scene_id, &self.category, reason, stage);

        tracing::warn!(
            trace_id = %self.trace_id.to_hex(),
            span_id = %self.span_id.to_hex(),
            scene_id = %self.scene_id,
            category = %self.category,
            reason = %reason,
            stage = %stage,
            "pipeline dropped",
        );
    }
}

impl Drop for ObservabilityContext {
    fn drop(&mut self) {
        if self.terminal == Terminal::Pending {
            tracing::error!(
                trace_id = %self.trace_id.to_hex(),
                scene_id = %self.scene_id,
                category = %self.category,
                stage = %self.current_stage,
                "observability context dropped without finalize/abort",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traceparent_roundtrip() {
        let trace_id = TraceId::generate();
        let span_id = SpanId::generate();
        let header = format_traceparent(&trace_id, &span_id);
        let (parsed_trace, parsed_span) = parse_traceparent(&header).unwrap();
        assert_eq!(trace_id, parsed_trace);
        assert_eq!(span_id, parsed_span);
    }

    #[test]
    fn extracts_trace_context_from_user_properties() {
        let trace_id = TraceId::generate();
        let span_id = SpanId::generate();
        let mut props = HashMap::new();
        props.insert("traceparent".to_string(), format_traceparent(&trace_id, &span_id));

        let ctx = ObservabilityContext::new("scene1", "person", &props);
        assert_eq!(ctx.trace_id, trace_id);
        assert_eq!(ctx.span_id, span_id);
    }

    #[test]
    fn generates_trace_context_when_absent() {
        let ctx = ObservabilityContext::new("scene1", "person", &HashMap::new());
        assert_eq!(ctx.current_stage(), Stage::Receive);
    }

    #[test]
    fn finalize_increments_finalized_counter_exactly_once() {
        let metrics = Metrics::new();
        let mut ctx = ObservabilityContext::new("scene1", "person", &HashMap::new());
        ctx.enter_stage(Stage::Publish);
        ctx.finalize(&metrics);
        assert_eq!(metrics.finalized_count(), 1);
    }

    #[test]
    fn abort_records_current_stage_as_drop_stage() {
        let metrics = Metrics::new();
        let mut ctx = ObservabilityContext::new("scene1", "person", &HashMap::new());
        ctx.enter_stage(Stage::Buffer);
        ctx.abort(DropReason::Superseded, &metrics);
        assert_eq!(
            metrics.drop_count("scene1", "person", DropReason::Superseded, Stage::Buffer),
            1
        );
    }
}
