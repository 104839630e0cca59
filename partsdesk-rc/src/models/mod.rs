//! Data models for the reconciliation core

pub mod batch;
pub mod classification;
pub mod ops;
pub mod record;

pub use batch::{BatchResult, ReconcileJob};
pub use classification::{Classification, Fulfillment, InvoiceContext, Payment};
pub use ops::{FieldKind, FieldOp};
pub use record::RemoteRecord;
