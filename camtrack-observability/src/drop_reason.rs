use std::fmt;

/// The closed set of reasons a message can be dropped from the pipeline.
///
/// Every recoverable failure in every component maps to exactly one of
/// these at the point it is detected, and the mapping happens nowhere else
/// (see [`crate::ObservabilityContext::abort`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// `MessageCodec::decode` failed to parse the payload.
    ParseError,
    /// Schema validation rejected the input payload.
    SchemaInvalid,
    /// `now - batch.timestamp` exceeded `max_lag` at `TimeChunkBuffer::add`.
    FellBehind,
    /// Keep-latest replaced an older batch for the same `(scope, camera_id)`.
    Superseded,
    /// The scope's worker queue was full at dispatch time.
    TrackerBusy,
    /// A publish attempt failed because the broker was unreachable.
    BrokerUnavailable,
    /// The message was still in flight when the service was asked to stop.
    Shutdown,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::ParseError => "parse_error",
            DropReason::SchemaInvalid => "schema_invalid",
            DropReason::FellBehind => "fell_behind",
            DropReason::Superseded => "superseded",
            DropReason::TrackerBusy => "tracker_busy",
            DropReason::BrokerUnavailable => "broker_unavailable",
            DropReason::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
