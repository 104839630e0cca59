//! Planned field mutations against a remote record

use serde::{Deserialize, Serialize};

/// Type hint used only when a field is first created; the remote API
/// treats field type as immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    SingleLine,
    MultiLine,
}

impl FieldKind {
    /// Wire name of the field type on the remote API.
    pub fn api_type(&self) -> &'static str {
        match self {
            FieldKind::SingleLine => "single_line_text_field",
            FieldKind::MultiLine => "multi_line_text_field",
        }
    }
}

/// One planned mutation. Ops on different keys are commutative; the
/// compiler never emits two ops for the same key in one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldOp {
    Upsert {
        namespace: String,
        key: String,
        value: String,
        kind: FieldKind,
    },
    Delete {
        namespace: String,
        key: String,
    },
}

impl FieldOp {
    pub fn upsert(namespace: &str, key: &str, value: impl Into<String>, kind: FieldKind) -> Self {
        FieldOp::Upsert {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: value.into(),
            kind,
        }
    }

    pub fn delete(namespace: &str, key: &str) -> Self {
        FieldOp::Delete {
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }

    /// Composite `namespace.key` this op targets.
    pub fn target(&self) -> String {
        match self {
            FieldOp::Upsert { namespace, key, .. } => format!("{}.{}", namespace, key),
            FieldOp::Delete { namespace, key } => format!("{}.{}", namespace, key),
        }
    }
}
