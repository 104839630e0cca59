//! Remote order record identity

use serde::{Deserialize, Serialize};

/// An order in the remote commerce system.
///
/// Owned entirely by the remote system; the core only reads and
/// annotates it, never creates or deletes one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Numeric ID used on all API paths
    pub id: u64,
    /// Human-readable code, `"C#"` followed by four digits
    pub code: String,
}

impl RemoteRecord {
    /// True when `code` matches the `C#NNNN` order-code shape.
    pub fn is_valid_code(code: &str) -> bool {
        let rest = match code.strip_prefix("C#") {
            Some(rest) => rest,
            None => return false,
        };
        rest.len() == 4 && rest.chars().all(|c| c.is_ascii_digit())
    }
}
