//! Batch reconciliation inputs and per-record outcomes

use crate::models::Classification;
use serde::{Deserialize, Serialize};

/// One unit of batch work: an order code plus the classification to
/// reconcile it against. Lookup by code happens inside the per-record
/// failure boundary, so an unknown code fails only its own record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileJob {
    pub code: String,
    pub classification: Classification,
}

/// Per-record outcome of a batch run.
///
/// Created fresh per run, never persisted by the core; the full list is
/// the normal outcome shape (partial failure is not an exception).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub ok: bool,
    pub code: String,
    /// Remote record ID, present on success so the snapshot
    /// collaborator can key its write without a second lookup.
    pub record_id: Option<u64>,
    /// Human-readable failure reason, present when `ok` is false.
    pub reason: Option<String>,
}

impl BatchResult {
    pub fn succeeded(code: &str, record_id: u64) -> Self {
        Self {
            ok: true,
            code: code.to_string(),
            record_id: Some(record_id),
            reason: None,
        }
    }

    pub fn failed(code: &str, reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            code: code.to_string(),
            record_id: None,
            reason: Some(reason.into()),
        }
    }
}
