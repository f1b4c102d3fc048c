//! Data layer for the site capacity dashboard.
//!
//! Responsible for discovering and loading the site metrics CSV, resolving
//! filter selections, and computing every grouped summary, ranking and pivot
//! the dashboard renders, plus CSV export of the results.

pub mod aggregator;
pub mod discovery;
pub mod export;
pub mod filter;
pub mod insights;
pub mod loader;
pub mod pivot;
pub mod ranking;
pub mod summary;

pub use dashboard_core as core;
