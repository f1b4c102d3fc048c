//! Reusable building blocks shared by the tab views.

pub mod bar;
pub mod header;
pub mod heatmap;
pub mod kpi;
