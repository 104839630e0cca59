//! # Partsdesk Common Library
//!
//! Shared code for the partsdesk services:
//! - Error types
//! - Configuration loading

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
