//! TallyHost Shared Types
//!
//! This crate contains the catalog, service and change-request records shared
//! across the TallyHost billing platform.

pub mod types;

pub use types::*;
