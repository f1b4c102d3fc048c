//! Runtime layer for the site capacity dashboard.
//!
//! Owns the interactive session state and turns it into immutable
//! snapshots for the UI and the headless report.

pub mod session;
pub mod snapshot;

pub use dashboard_core as core;
pub use dashboard_data as data;
