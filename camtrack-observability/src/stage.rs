use std::fmt;

/// The six pipeline stages an [`crate::ObservabilityContext`] tracks a
/// timestamp for. The order here is the order messages move through the
/// pipeline; it is also the order used when computing per-stage deltas in
/// `finalize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Receive,
    Parse,
    Buffer,
    Dispatch,
    Track,
    Publish,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Receive,
        Stage::Parse,
        Stage::Buffer,
        Stage::Dispatch,
        Stage::Track,
        Stage::Publish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Receive => "receive",
            Stage::Parse => "parse",
            Stage::Buffer => "buffer",
            Stage::Dispatch => "dispatch",
            Stage::Track => "track",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
