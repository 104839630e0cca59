//! partsdesk-rc library interface
//!
//! Remote-record reconciliation core: throttled transport, field-store
//! client, selection-to-fields compiler, batch runner, and the
//! initial-state extractor used to pre-populate operator forms.
//!
//! The two entry points exposed to trigger collaborators (chat
//! transport, form glue) are [`Reconciler::classify_from_existing_fields`]
//! and [`Reconciler::run`].

pub mod models;
pub mod services;

pub use models::batch::{BatchResult, ReconcileJob};
pub use models::classification::{Classification, Fulfillment, InvoiceContext, Payment};
pub use models::ops::{FieldKind, FieldOp};
pub use models::record::RemoteRecord;
pub use services::compiler::{compile, validate, ValidationErrors};
pub use services::extractor::classification_from_fields;
pub use services::field_store::RecordStoreClient;
pub use services::runner::Reconciler;
pub use services::transport::{HttpTransport, ThrottleGate, Transport};
