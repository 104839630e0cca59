//! Local classification snapshots
//!
//! After each successful per-record reconciliation the caller persists
//! what was written, keyed by record code. Write-then-rename keeps a
//! crash from leaving a torn file behind.

use crate::models::Classification;
use chrono::{DateTime, Utc};
use partsdesk_common::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub saved_at: DateTime<Utc>,
    pub record_id: u64,
    pub record_code: String,
    pub classification: Classification,
}

/// Persist one snapshot; returns the final path.
pub fn write_snapshot(
    dir: &Path,
    record_id: u64,
    record_code: &str,
    classification: &Classification,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let snapshot = Snapshot {
        saved_at: Utc::now(),
        record_id,
        record_code: record_code.to_string(),
        classification: classification.clone(),
    };

    let name = sanitize_code(record_code);
    let final_path = dir.join(format!("{}.json", name));
    let tmp_path = dir.join(format!("{}.json.tmp", name));

    let json = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, &final_path)?;

    tracing::debug!(path = %final_path.display(), "Snapshot written");
    Ok(final_path)
}

/// Record codes contain `#`, which has no business in a file name.
fn sanitize_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}
