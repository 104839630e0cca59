//! Operator classification of one order
//!
//! Constructed either from a form submission (authoritative) or
//! reconstructed from existing remote fields (best-effort, used only
//! to pre-populate forms).

use serde::{Deserialize, Serialize};

/// How the finished order leaves the workshop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fulfillment {
    Ship,
    Pickup,
    Install,
}

impl Fulfillment {
    pub fn label(&self) -> &'static str {
        match self {
            Fulfillment::Ship => "Ship",
            Fulfillment::Pickup => "Pickup",
            Fulfillment::Install => "Install",
        }
    }

    /// Case-insensitive label match, used when decoding remote fields.
    pub fn from_label(label: &str) -> Option<Self> {
        [Fulfillment::Ship, Fulfillment::Pickup, Fulfillment::Install]
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// Payment state at classification time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Payment {
    /// Paid in full
    Pif,
    Deposit,
    Unpaid,
}

impl Payment {
    pub fn label(&self) -> &'static str {
        match self {
            Payment::Pif => "PIF",
            Payment::Deposit => "Deposit",
            Payment::Unpaid => "Unpaid",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [Payment::Pif, Payment::Deposit, Payment::Unpaid]
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// Which parts of the rig the order still needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSelection {
    pub steering_wheel: bool,
    pub wheel_base: bool,
    pub pedals: bool,
    pub shifter: bool,
    pub handbrake: bool,
    pub cockpit: bool,
}

impl PartSelection {
    /// (field key, display label, selected) for each of the six parts,
    /// in stable emission order.
    pub fn flags(&self) -> [(&'static str, &'static str, bool); 6] {
        [
            ("steering_wheel", "Steering wheel", self.steering_wheel),
            ("wheel_base", "Wheel base", self.wheel_base),
            ("pedals", "Pedals", self.pedals),
            ("shifter", "Shifter", self.shifter),
            ("handbrake", "Handbrake", self.handbrake),
            ("cockpit", "Cockpit", self.cockpit),
        ]
    }

    /// Mutable view over the same six flags, keyed identically to
    /// [`flags`](Self::flags), so decoders can stay in sync with the
    /// field keys by construction.
    pub fn flags_mut(&mut self) -> [(&'static str, &mut bool); 6] {
        [
            ("steering_wheel", &mut self.steering_wheel),
            ("wheel_base", &mut self.wheel_base),
            ("pedals", &mut self.pedals),
            ("shifter", &mut self.shifter),
            ("handbrake", &mut self.handbrake),
            ("cockpit", &mut self.cockpit),
        ]
    }

    /// Labels of all selected parts, in emission order.
    pub fn selected_labels(&self) -> Vec<&'static str> {
        self.flags()
            .into_iter()
            .filter(|(_, _, on)| *on)
            .map(|(_, label, _)| label)
            .collect()
    }
}

/// Supplier/invoice context attached to a classification when the
/// trigger was an incoming supplier invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceContext {
    pub supplier: String,
    /// Free-form date label as shown on the invoice, e.g. "W34" or "Aug 12"
    pub date_label: String,
}

/// One order's desired state, as chosen by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub parts: PartSelection,

    /// "Other parts" flag and its required annotation
    #[serde(default)]
    pub other: bool,
    #[serde(default)]
    pub other_note: String,

    /// "Set aside" flag and its required annotation
    #[serde(default)]
    pub set_aside: bool,
    #[serde(default)]
    pub set_aside_note: String,

    pub fulfillment: Fulfillment,
    pub payment: Payment,

    #[serde(default)]
    pub invoice: Option<InvoiceContext>,
}

impl Default for Classification {
    /// The fixed default shown for a never-classified order:
    /// steering wheel only, ship, paid in full.
    fn default() -> Self {
        Self {
            parts: PartSelection {
                steering_wheel: true,
                ..PartSelection::default()
            },
            other: false,
            other_note: String::new(),
            set_aside: false,
            set_aside_note: String::new(),
            fulfillment: Fulfillment::Ship,
            payment: Payment::Pif,
            invoice: None,
        }
    }
}

impl Classification {
    /// A non-empty annotation implies the flag even when the checkbox
    /// was not explicitly ticked.
    pub fn other_selected(&self) -> bool {
        self.other || !self.other_note.trim().is_empty()
    }

    pub fn set_aside_selected(&self) -> bool {
        self.set_aside || !self.set_aside_note.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_wheel_only_ship_pif() {
        let c = Classification::default();
        assert_eq!(c.parts.selected_labels(), vec!["Steering wheel"]);
        assert_eq!(c.fulfillment, Fulfillment::Ship);
        assert_eq!(c.payment, Payment::Pif);
        assert!(!c.other_selected());
        assert!(!c.set_aside_selected());
    }

    #[test]
    fn test_annotation_implies_selection() {
        let c = Classification {
            other: false,
            other_note: "  custom rim  ".to_string(),
            ..Classification::default()
        };
        assert!(c.other_selected());
    }

    #[test]
    fn test_flag_views_agree_on_keys() {
        let mut parts = PartSelection::default();
        let keys: Vec<&str> = parts.flags().into_iter().map(|(key, _, _)| key).collect();
        let mut_keys: Vec<&str> = parts.flags_mut().into_iter().map(|(key, _)| key).collect();
        assert_eq!(keys, mut_keys);
    }

    #[test]
    fn test_flags_mut_writes_through() {
        let mut parts = PartSelection::default();
        for (key, flag) in parts.flags_mut() {
            *flag = key == "pedals";
        }
        assert_eq!(parts.selected_labels(), vec!["Pedals"]);
    }

    #[test]
    fn test_label_round_trip() {
        for f in [Fulfillment::Ship, Fulfillment::Pickup, Fulfillment::Install] {
            assert_eq!(Fulfillment::from_label(f.label()), Some(f));
        }
        for p in [Payment::Pif, Payment::Deposit, Payment::Unpaid] {
            assert_eq!(Payment::from_label(p.label()), Some(p));
        }
        assert_eq!(Payment::from_label("pif"), Some(Payment::Pif));
        assert_eq!(Fulfillment::from_label("nope"), None);
    }
}
