//! Selection-to-fields compiler
//!
//! Pure mapping from an operator classification (plus the record's
//! current tags) to the full set of field writes/deletes that make the
//! remote record consistent with it. No transport access here; every
//! rule is a deterministic function of its inputs.

use crate::models::{Classification, FieldKind, FieldOp};
use thiserror::Error;

/// Namespace all classification fields live under.
pub const NAMESPACE: &str = "workshop";

/// Value written for a selected part flag.
pub const PART_NEEDED: &str = "Needed";
/// Value written for an unselected part flag (never deleted).
pub const PART_NOT_NEEDED: &str = "Not needed";

pub const KEY_OTHER_PARTS: &str = "other_parts";
pub const KEY_SET_ASIDE: &str = "set_aside";
pub const KEY_SUPPLIERS: &str = "suppliers";
pub const KEY_SUMMARY: &str = "build_summary";
pub const KEY_HANDLED_BY: &str = "handled_by";
pub const KEY_CLASSIFIED: &str = "classified";

pub const HANDLED_BY_VALUE: &str = "Workshop team";
/// Completion marker; its presence tells the extractor to trust the
/// remote fields over the defaults.
pub const CLASSIFIED_VALUE: &str = "yes";

/// Tag prefix carrying supplier context, e.g. `supplier:Simtech`.
pub const SUPPLIER_TAG_PREFIX: &str = "supplier:";

/// One invalid form input, keyed so the form collaborator can highlight
/// the exact field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

/// Field-keyed validation failure. Raised before compilation; a record
/// failing validation makes zero remote calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed: {}", self.summary())]
pub struct ValidationErrors {
    pub issues: Vec<FieldIssue>,
}

impl ValidationErrors {
    fn summary(&self) -> String {
        self.issues
            .iter()
            .map(|i| format!("{}: {}", i.field, i.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Check that every selected annotated flag carries its annotation.
///
/// Must pass before [`compile`] is invoked.
pub fn validate(c: &Classification) -> Result<(), ValidationErrors> {
    let mut issues = Vec::new();

    if c.other && c.other_note.trim().is_empty() {
        issues.push(FieldIssue {
            field: "other_note".to_string(),
            message: "Other parts is selected but no parts are listed".to_string(),
        });
    }
    if c.set_aside && c.set_aside_note.trim().is_empty() {
        issues.push(FieldIssue {
            field: "set_aside_note".to_string(),
            message: "Set aside is selected but the note is empty".to_string(),
        });
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { issues })
    }
}

/// Compile a classification into the ordered op list for one record.
///
/// Exactly one op is emitted per field key: optional fields get a delete
/// precisely when their upsert condition is false, so applying the list
/// twice to a clean record is idempotent. The completion marker is the
/// terminal op.
pub fn compile(c: &Classification, tags: &[String]) -> Vec<FieldOp> {
    debug_assert!(validate(c).is_ok(), "compile called on unvalidated input");

    let mut ops = Vec::new();

    // Part flags are always written, both ways, so a re-classification
    // that drops a part overwrites the old positive value.
    for (key, _, selected) in c.parts.flags() {
        let value = if selected { PART_NEEDED } else { PART_NOT_NEEDED };
        ops.push(FieldOp::upsert(NAMESPACE, key, value, FieldKind::SingleLine));
    }

    let other_note = c.other_note.trim();
    if c.other_selected() && !other_note.is_empty() {
        ops.push(FieldOp::upsert(
            NAMESPACE,
            KEY_OTHER_PARTS,
            other_note,
            FieldKind::SingleLine,
        ));
    } else {
        ops.push(FieldOp::delete(NAMESPACE, KEY_OTHER_PARTS));
    }

    let set_aside_note = c.set_aside_note.trim();
    if c.set_aside_selected() && !set_aside_note.is_empty() {
        ops.push(FieldOp::upsert(
            NAMESPACE,
            KEY_SET_ASIDE,
            set_aside_note,
            FieldKind::SingleLine,
        ));
    } else {
        ops.push(FieldOp::delete(NAMESPACE, KEY_SET_ASIDE));
    }

    let suppliers = suppliers_from_tags(tags);
    if suppliers.is_empty() {
        ops.push(FieldOp::delete(NAMESPACE, KEY_SUPPLIERS));
    } else {
        ops.push(FieldOp::upsert(
            NAMESPACE,
            KEY_SUPPLIERS,
            suppliers.join(", "),
            FieldKind::SingleLine,
        ));
    }

    ops.push(FieldOp::upsert(
        NAMESPACE,
        KEY_SUMMARY,
        build_summary(c),
        FieldKind::MultiLine,
    ));

    ops.push(FieldOp::upsert(
        NAMESPACE,
        KEY_HANDLED_BY,
        HANDLED_BY_VALUE,
        FieldKind::SingleLine,
    ));

    // Terminal op: only a fully written record carries the marker.
    ops.push(FieldOp::upsert(
        NAMESPACE,
        KEY_CLASSIFIED,
        CLASSIFIED_VALUE,
        FieldKind::SingleLine,
    ));

    debug_assert!(targets_unique(&ops), "duplicate op target in batch");
    ops
}

/// Supplier names from `supplier:` tags: prefix stripped, trimmed,
/// de-duplicated, input order preserved.
pub fn suppliers_from_tags(tags: &[String]) -> Vec<String> {
    let mut suppliers: Vec<String> = Vec::new();
    for tag in tags {
        if let Some(name) = tag.trim().strip_prefix(SUPPLIER_TAG_PREFIX) {
            let name = name.trim();
            if !name.is_empty() && !suppliers.iter().any(|s| s == name) {
                suppliers.push(name.to_string());
            }
        }
    }
    suppliers
}

/// The multi-line summary shown on the remote record.
pub fn build_summary(c: &Classification) -> String {
    let header = format!(
        "{} — {}",
        c.fulfillment.label().to_uppercase(),
        c.payment.label().to_uppercase()
    );

    let labels = c.parts.selected_labels();
    let parts_line = match labels.len() {
        0 => "None".to_string(),
        1 => format!("{} only", labels[0]),
        _ => labels.join(", "),
    };

    let mut summary = format!("{}\n\n{}", header, parts_line);

    let set_aside_note = c.set_aside_note.trim();
    if c.set_aside_selected() && !set_aside_note.is_empty() {
        summary.push_str(&format!("\n\nSet aside: {}", set_aside_note));
    }

    summary
}

fn targets_unique(ops: &[FieldOp]) -> bool {
    let mut targets: Vec<String> = ops.iter().map(|op| op.target()).collect();
    targets.sort();
    targets.windows(2).all(|w| w[0] != w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classification::PartSelection;
    use crate::models::{Fulfillment, Payment};

    fn base() -> Classification {
        Classification::default()
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_one_op_per_key() {
        let ops = compile(&base(), &[]);
        assert!(targets_unique(&ops));
        // 6 parts + other + set_aside + suppliers + summary + handled_by + marker
        assert_eq!(ops.len(), 12);
    }

    #[test]
    fn test_marker_is_terminal_op() {
        let ops = compile(&base(), &[]);
        match ops.last().unwrap() {
            FieldOp::Upsert { key, value, .. } => {
                assert_eq!(key, KEY_CLASSIFIED);
                assert_eq!(value, CLASSIFIED_VALUE);
            }
            op => panic!("unexpected terminal op: {:?}", op),
        }
    }

    #[test]
    fn test_part_flags_always_written() {
        let ops = compile(&base(), &[]);
        let wheel = ops.iter().find(|op| op.target() == "workshop.steering_wheel");
        let pedals = ops.iter().find(|op| op.target() == "workshop.pedals");
        assert!(matches!(
            wheel,
            Some(FieldOp::Upsert { value, .. }) if value == PART_NEEDED
        ));
        assert!(matches!(
            pedals,
            Some(FieldOp::Upsert { value, .. }) if value == PART_NOT_NEEDED
        ));
    }

    #[test]
    fn test_annotation_upsert_is_trimmed() {
        let c = Classification {
            other: true,
            other_note: "  spare rim bolts  ".to_string(),
            ..base()
        };
        let ops = compile(&c, &[]);
        let op = ops
            .iter()
            .find(|op| op.target() == "workshop.other_parts")
            .unwrap();
        assert!(matches!(
            op,
            FieldOp::Upsert { value, .. } if value == "spare rim bolts"
        ));
    }

    #[test]
    fn test_unselected_annotation_becomes_delete() {
        let ops = compile(&base(), &[]);
        assert!(ops
            .iter()
            .any(|op| matches!(op, FieldOp::Delete { key, .. } if key == KEY_OTHER_PARTS)));
        assert!(ops
            .iter()
            .any(|op| matches!(op, FieldOp::Delete { key, .. } if key == KEY_SET_ASIDE)));
    }

    #[test]
    fn test_note_without_checkbox_still_upserts() {
        // Annotation presence implies selection
        let c = Classification {
            set_aside: false,
            set_aside_note: "awaiting pedal plate".to_string(),
            ..base()
        };
        let ops = compile(&c, &[]);
        let op = ops
            .iter()
            .find(|op| op.target() == "workshop.set_aside")
            .unwrap();
        assert!(matches!(op, FieldOp::Upsert { .. }));
    }

    #[test]
    fn test_suppliers_from_tags() {
        let tags = tags(&[
            "vip",
            "supplier:Simtech",
            "supplier: Grip Co ",
            "supplier:Simtech",
        ]);
        assert_eq!(
            suppliers_from_tags(&tags),
            vec!["Simtech".to_string(), "Grip Co".to_string()]
        );

        let ops = compile(&base(), &tags);
        let op = ops
            .iter()
            .find(|op| op.target() == "workshop.suppliers")
            .unwrap();
        assert!(matches!(
            op,
            FieldOp::Upsert { value, .. } if value == "Simtech, Grip Co"
        ));
    }

    #[test]
    fn test_no_supplier_tags_deletes_field() {
        let ops = compile(&base(), &tags(&["vip", "rush"]));
        assert!(ops
            .iter()
            .any(|op| matches!(op, FieldOp::Delete { key, .. } if key == KEY_SUPPLIERS)));
    }

    #[test]
    fn test_summary_single_part_renders_only() {
        let summary = build_summary(&base());
        assert_eq!(summary, "SHIP — PIF\n\nSteering wheel only");
    }

    #[test]
    fn test_summary_two_parts_comma_joined() {
        let c = Classification {
            parts: PartSelection {
                steering_wheel: true,
                pedals: true,
                ..PartSelection::default()
            },
            fulfillment: Fulfillment::Pickup,
            payment: Payment::Deposit,
            ..base()
        };
        assert_eq!(
            build_summary(&c),
            "PICKUP — DEPOSIT\n\nSteering wheel, Pedals"
        );
    }

    #[test]
    fn test_summary_set_aside_line() {
        let c = Classification {
            set_aside: true,
            set_aside_note: "hold for August build slot".to_string(),
            ..base()
        };
        assert_eq!(
            build_summary(&c),
            "SHIP — PIF\n\nSteering wheel only\n\nSet aside: hold for August build slot"
        );
    }

    #[test]
    fn test_validate_rejects_blank_annotations() {
        let c = Classification {
            other: true,
            set_aside: true,
            set_aside_note: "  ".to_string(),
            ..base()
        };
        let errors = validate(&c).unwrap_err();
        let fields: Vec<&str> = errors.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["other_note", "set_aside_note"]);
    }

    #[test]
    fn test_validate_accepts_annotated_flags() {
        let c = Classification {
            other: true,
            other_note: "boost gauge".to_string(),
            ..base()
        };
        assert!(validate(&c).is_ok());
    }
}
