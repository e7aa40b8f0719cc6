use thiserror::Error;

use camtrack_observability::DropReason;

/// Errors `decode`/`encode` can return. Both variants that matter for the
/// ingest path have a direct [`DropReason`] counterpart; `encode` failures
/// are a developer error (see [`crate::encode`]) and are not expected to
/// reach a `DropReason` at all.
#[derive(Error, Debug, Clone)]
pub enum CodecError {
    #[error("malformed topic: {0}")]
    BadTopic(String),

    #[error("payload parse error: {0}")]
    ParseError(String),

    #[error("schema validation failed: {0}")]
    SchemaInvalid(String),
}

impl CodecError {
    /// Maps a decode-path error onto the closed set of recoverable drop
    /// reasons the observability layer accounts for.
    pub fn as_drop_reason(&self) -> DropReason {
        match self {
            CodecError::BadTopic(_) | CodecError::ParseError(_) => DropReason::ParseError,
            CodecError::SchemaInvalid(_) => DropReason::SchemaInvalid,
        }
    }
}
