use thiserror::Error;

/// Leaf errors shared across crate boundaries. Component-local errors
/// (`BrokerError`, `CodecError`, `SchemaError`) wrap or convert into these
/// where a shared vocabulary is useful; they do not replace the
/// component-local taxonomies.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
