//! Initial-state extractor
//!
//! Inverse of the compiler: reconstructs the classification a form
//! should pre-populate with from a record's existing fields. Total
//! function over weakly-typed remote strings with explicit defaulting,
//! so it is unit-testable without any transport.

use crate::models::classification::PartSelection;
use crate::models::{Classification, Fulfillment, Payment};
use std::collections::HashMap;

use super::compiler::{
    CLASSIFIED_VALUE, KEY_CLASSIFIED, KEY_OTHER_PARTS, KEY_SET_ASIDE, KEY_SUMMARY, NAMESPACE,
    PART_NEEDED,
};

/// Reconstruct a classification from a `namespace.key → value` field map.
///
/// Without the completion marker the record has never been classified
/// and the fixed default wins, regardless of any stray field values.
pub fn classification_from_fields(fields: &HashMap<String, String>) -> Classification {
    let get = |key: &str| fields.get(&format!("{}.{}", NAMESPACE, key)).map(String::as_str);

    if get(KEY_CLASSIFIED) != Some(CLASSIFIED_VALUE) {
        return Classification::default();
    }

    // Keys come from the same table the compiler emits from, so the
    // two sides cannot drift apart.
    let mut parts = PartSelection::default();
    for (key, flag) in parts.flags_mut() {
        *flag = get(key) == Some(PART_NEEDED);
    }

    let other_note = get(KEY_OTHER_PARTS).unwrap_or("").trim().to_string();
    let set_aside_note = get(KEY_SET_ASIDE).unwrap_or("").trim().to_string();

    let (fulfillment, payment) = parse_summary_header(get(KEY_SUMMARY).unwrap_or(""));

    Classification {
        parts,
        other: !other_note.is_empty(),
        other_note,
        set_aside: !set_aside_note.is_empty(),
        set_aside_note,
        fulfillment,
        payment,
        // Invoice context is never written as a field, so it cannot be
        // reconstructed; pre-populated forms start without one.
        invoice: None,
    }
}

/// Decode fulfillment/payment from the summary's uppercased header
/// line, e.g. `"PICKUP — DEPOSIT"`. Falls back to the defaults when the
/// line is missing or unparseable.
fn parse_summary_header(summary: &str) -> (Fulfillment, Payment) {
    let header = summary.lines().next().unwrap_or("");
    if let Some((left, right)) = header.split_once('—') {
        let fulfillment = Fulfillment::from_label(left).unwrap_or(Fulfillment::Ship);
        let payment = Payment::from_label(right).unwrap_or(Payment::Pif);
        (fulfillment, payment)
    } else {
        (Fulfillment::Ship, Payment::Pif)
    }
}
