//! Batch reconciliation runner
//!
//! Applies compiled field ops (plus the tag/marker/log/note follow-ups)
//! for a whole batch of records. For one record every mutating call is
//! strictly sequential, in compiler-emitted order; the list-then-act
//! upsert in the field store depends on that invariant. Across records
//! a fixed set of workers claim the next unclaimed job index, bounded
//! by the configured concurrency (default 1).

use crate::models::{BatchResult, Classification, InvoiceContext, ReconcileJob, RemoteRecord};
use chrono::{NaiveDate, Utc};
use partsdesk_common::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::compiler::{compile, validate, NAMESPACE};
use super::extractor::classification_from_fields;
use super::field_store::{RecordStoreClient, RemoteField};

/// Tag prefix of an existing supplier arrangement, `&`-joined when the
/// arrangement spans several suppliers, e.g. `arranged:Simtech & Grip Co`.
pub const TAG_ARRANGED_PREFIX: &str = "arranged:";

/// Fixed tag ensured present on every reconciled record.
pub const TAG_PARTS_CHECKED: &str = "parts-checked";

/// Canonical incoming-invoice marker field.
pub const KEY_INCOMING: &str = "incoming";
pub const INCOMING_VALUE: &str = "Invoice incoming";

/// Running log of incoming invoices, `"; "`-joined.
pub const KEY_INVOICE_LOG: &str = "invoice_log";

const NOTE_SEPARATOR: &str = "----------------------------------------";

/// Batch reconciliation over one record store.
///
/// The two operations exposed to trigger collaborators are
/// [`classify_from_existing_fields`](Self::classify_from_existing_fields)
/// for form pre-population and [`run`](Self::run) for write-back.
pub struct Reconciler {
    store: Arc<RecordStoreClient>,
    concurrency: usize,
}

impl Reconciler {
    pub fn new(store: RecordStoreClient, concurrency: usize) -> Self {
        Self {
            store: Arc::new(store),
            concurrency: concurrency.max(1),
        }
    }

    /// Reconstruct the classification a form should show for a record.
    pub async fn classify_from_existing_fields(&self, record_id: u64) -> Result<Classification> {
        let fields = self.store.list_fields(record_id).await?;
        Ok(classification_from_fields(&fields))
    }

    /// Reconcile a batch. The result list matches the input order so
    /// callers can zip results back to jobs by index; failures never
    /// abort sibling records.
    pub async fn run(&self, jobs: Vec<ReconcileJob>) -> Vec<BatchResult> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let jobs = Arc::new(jobs);
        let next = Arc::new(AtomicUsize::new(0));
        let workers = self.concurrency.min(jobs.len());

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let jobs = Arc::clone(&jobs);
            let next = Arc::clone(&next);
            let store = Arc::clone(&self.store);

            handles.push(tokio::spawn(async move {
                let mut results = Vec::new();
                loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= jobs.len() {
                        break;
                    }
                    let job = &jobs[index];
                    let result = match reconcile_one(&store, job).await {
                        Ok(record) => {
                            tracing::info!(code = %job.code, record_id = record.id, "Record reconciled");
                            BatchResult::succeeded(&job.code, record.id)
                        }
                        Err(e) => {
                            tracing::warn!(code = %job.code, worker, error = %e, "Record reconciliation failed");
                            BatchResult::failed(&job.code, e.to_string())
                        }
                    };
                    results.push((index, result));
                }
                results
            }));
        }

        let mut slots: Vec<Option<BatchResult>> = vec![None; jobs.len()];
        for handle in handles {
            match handle.await {
                Ok(results) => {
                    for (index, result) in results {
                        slots[index] = Some(result);
                    }
                }
                Err(e) => tracing::error!(error = %e, "Reconciliation worker aborted"),
            }
        }

        slots
            .into_iter()
            .zip(jobs.iter())
            .map(|(slot, job)| {
                slot.unwrap_or_else(|| BatchResult::failed(&job.code, "worker task aborted"))
            })
            .collect()
    }
}

/// Full reconciliation of one record. Every error inside is caught at
/// the call site and becomes a failed [`BatchResult`].
async fn reconcile_one(store: &RecordStoreClient, job: &ReconcileJob) -> Result<RemoteRecord> {
    // Validation precedes every remote call: an invalid classification
    // or a malformed code must not touch the record at all.
    validate(&job.classification).map_err(|e| Error::InvalidInput(e.to_string()))?;
    if !RemoteRecord::is_valid_code(&job.code) {
        return Err(Error::InvalidInput(format!(
            "Malformed order code: {}",
            job.code
        )));
    }

    let record = store.find_record_by_code(&job.code).await?;
    let tags = store.get_tags(record.id).await?;

    let ops = compile(&job.classification, &tags);
    for op in &ops {
        store.apply(record.id, op).await?;
    }

    // Tag follow-ups: narrow the arrangement for the incoming supplier,
    // then make sure the fixed tag is present. One write covers both.
    let mut new_tags = match &job.classification.invoice {
        Some(invoice) => narrow_arranged_tags(&tags, &invoice.supplier),
        None => tags.clone(),
    };
    new_tags = ensure_tag(new_tags, TAG_PARTS_CHECKED);
    if new_tags != tags {
        store.replace_tags(record.id, &new_tags).await?;
    }

    if let Some(invoice) = &job.classification.invoice {
        let existing = store.list_fields_raw(record.id).await?;

        // The marker constant goes onto the canonical key and every
        // legacy variant key still carrying the old naming.
        for key in incoming_field_keys(&existing) {
            store
                .upsert_field(record.id, NAMESPACE, &key, INCOMING_VALUE, None)
                .await?;
        }

        let current_log = existing
            .iter()
            .find(|f| f.namespace.trim() == NAMESPACE && f.key.trim() == KEY_INVOICE_LOG)
            .map(|f| f.value.as_str())
            .unwrap_or("");
        let log = append_log_entry(current_log, &incoming_log_entry(invoice));
        store
            .upsert_field(
                record.id,
                NAMESPACE,
                KEY_INVOICE_LOG,
                &log,
                Some(crate::models::FieldKind::MultiLine),
            )
            .await?;
    }

    // The note has no append primitive upstream: read, prepend the
    // dated header block, write the whole blob back.
    let note = store.get_note(record.id).await?;
    let updated = prepend_note(Utc::now().date_naive(), &job.classification, &note);
    store.replace_note(record.id, &updated).await?;

    Ok(record)
}

/// Narrow or remove an `arranged:` tag for an incoming supplier.
///
/// Single-supplier arrangement: the tag is removed. Multi-supplier: the
/// supplier is dropped from the `&`-joined list and the tag rewritten.
/// The narrowed value may not be a pre-registered allowed value on the
/// remote side, in which case the tags write fails for that record; the
/// coupling is upstream's and is surfaced, not worked around.
pub fn narrow_arranged_tags(tags: &[String], supplier: &str) -> Vec<String> {
    let mut result = Vec::with_capacity(tags.len());
    for tag in tags {
        let rest = match tag.strip_prefix(TAG_ARRANGED_PREFIX) {
            Some(rest) => rest,
            None => {
                result.push(tag.clone());
                continue;
            }
        };

        let names: Vec<&str> = rest
            .split('&')
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .collect();
        let remaining: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| !n.eq_ignore_ascii_case(supplier))
            .collect();

        if remaining.len() == names.len() {
            // Supplier not part of this arrangement; leave it alone.
            result.push(tag.clone());
        } else if !remaining.is_empty() {
            result.push(format!("{}{}", TAG_ARRANGED_PREFIX, remaining.join(" & ")));
        }
        // Fully satisfied arrangement: tag dropped.
    }
    result
}

/// Append a tag unless it is already present.
pub fn ensure_tag(mut tags: Vec<String>, tag: &str) -> Vec<String> {
    if !tags.iter().any(|t| t == tag) {
        tags.push(tag.to_string());
    }
    tags
}

/// Keys that must carry the incoming marker: the canonical key plus any
/// legacy variant key in our namespace containing `incoming`.
pub fn incoming_field_keys(existing: &[RemoteField]) -> Vec<String> {
    let mut keys = vec![KEY_INCOMING.to_string()];
    for field in existing {
        if field.namespace.trim() != NAMESPACE {
            continue;
        }
        let key = field.key.trim();
        if key != KEY_INCOMING && key.to_ascii_lowercase().contains(KEY_INCOMING) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// One incoming-invoice log entry.
pub fn incoming_log_entry(invoice: &InvoiceContext) -> String {
    format!("{} ({}) incoming", invoice.supplier, invoice.date_label)
}

/// Append to the running log, `"; "`-joined when non-empty.
pub fn append_log_entry(current: &str, entry: &str) -> String {
    let current = current.trim();
    if current.is_empty() {
        entry.to_string()
    } else {
        format!("{}; {}", current, entry)
    }
}

/// New note contents: dated templated header plus separator above the
/// previous full contents.
pub fn prepend_note(date: NaiveDate, c: &Classification, current: &str) -> String {
    let mut header = format!(
        "[{}] Classified: {} — {}",
        date.format("%Y-%m-%d"),
        c.fulfillment.label().to_uppercase(),
        c.payment.label().to_uppercase()
    );
    if let Some(invoice) = &c.invoice {
        header.push_str(&format!(
            " | Invoice {} ({})",
            invoice.supplier, invoice.date_label
        ));
    }

    if current.trim().is_empty() {
        format!("{}\n{}", header, NOTE_SEPARATOR)
    } else {
        format!("{}\n{}\n\n{}", header, NOTE_SEPARATOR, current)
    }
}
