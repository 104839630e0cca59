//! Reconciliation core services

pub mod compiler;
pub mod extractor;
pub mod field_store;
pub mod runner;
pub mod snapshot;
pub mod transport;
