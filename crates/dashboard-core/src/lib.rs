//! Shared types for the site capacity dashboard.
//!
//! Holds the record and filter data model, the error taxonomy, CLI settings,
//! number formatting and the small descriptive-statistics helpers used by the
//! aggregation layer.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod stats;
