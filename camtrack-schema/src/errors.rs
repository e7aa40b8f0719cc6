use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Field-path -> human-readable message accumulator, flattened from either
/// `serde_json` deserialization failures or `validator::ValidationErrors`.
/// Kept in a `BTreeMap` so error output is deterministic (useful in tests
/// and log lines alike).
#[derive(Debug, Default, Clone)]
pub struct SchemaErrors {
    fields: BTreeMap<String, String>,
}

impl SchemaErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field_path: impl Into<String>, message: impl Into<String>) {
        self.fields.insert(field_path.into(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_error(self, payload_kind: &'static str) -> SchemaError {
        SchemaError::Invalid {
            payload_kind,
            fields: self,
        }
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = self.fields.iter();
        if let Some((path, msg)) = parts.next() {
            write!(f, "{path}: {msg}")?;
        }
        for (path, msg) in parts {
            write!(f, "; {path}: {msg}")?;
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone)]
pub enum SchemaError {
    #[error("{payload_kind} payload is not valid JSON: {source}")]
    Malformed {
        payload_kind: &'static str,
        source: String,
    },

    #[error("{payload_kind} payload failed schema validation: {fields}")]
    Invalid {
        payload_kind: &'static str,
        fields: SchemaErrors,
    },
}

impl SchemaError {
    pub fn malformed(payload_kind: &'static str, source: &serde_json::Error) -> Self {
        Self::Malformed {
            payload_kind,
            source: source.to_string(),
        }
    }

    /// Renders the accumulated field errors as a JSON object, suitable for
    /// inclusion in a structured log line without re-deriving the path map.
    pub fn fields_json(&self) -> Value {
        match self {
            SchemaError::Malformed { source, .. } => {
                serde_json::json!({ "_malformed": source })
            }
            SchemaError::Invalid { fields, .. } => {
                serde_json::Value::Object(
                    fields
                        .fields()
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                )
            }
        }
    }
}
