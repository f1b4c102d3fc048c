//! Terminal UI layer for the site capacity dashboard.
//!
//! Provides themes, the header, KPI, bar and heatmap components, one view per
//! dashboard tab, and the main application event loop built on top of
//! [`ratatui`].

pub mod app;
pub mod components;
pub mod themes;
pub mod views;

pub use dashboard_runtime as runtime;

#[cfg(test)]
pub(crate) mod test_support {
    use dashboard_runtime::core::models::{Dataset, FilterMode, Record};
    use dashboard_runtime::snapshot::{build_snapshot, Controls, DashboardSnapshot, SourceInfo};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn rec(p: &str, s: &str, hour: u8, tph: f64, ct: f64, delay: f64) -> Record {
        Record {
            provider_code: p.to_string(),
            site_code: s.to_string(),
            hour,
            tph_median: tph,
            ct_sum: ct,
            avg_first_resp_delay_minute: delay,
            last_updated: Some("2025-06-23 17:45".to_string()),
        }
    }

    /// Two hours of P1 at S1 and a single row of P2 at S2.
    pub fn sample_dataset() -> Dataset {
        Dataset::new(vec![
            rec("P1", "S1", 0, 100.0, 10.0, 2.0),
            rec("P1", "S1", 1, 200.0, 20.0, 3.0),
            rec("P2", "S2", 0, 50.0, 5.0, 1.0),
        ])
    }

    fn source() -> SourceInfo {
        SourceInfo {
            path: "data/site_metrics_final_20250610_to_20250623.csv".to_string(),
            coverage: Some("2025-06-10 → 2025-06-23".to_string()),
            last_updated: Some("2025-06-23 17:45".to_string()),
            total_records: 3,
            load_report: None,
        }
    }

    /// Default controls: Provider Focus on P1, so only S1 rows survive.
    pub fn sample_snapshot() -> DashboardSnapshot {
        build_snapshot(&sample_dataset(), &Controls::default(), source())
    }

    /// Custom mode over every row, giving two combinations.
    pub fn custom_snapshot() -> DashboardSnapshot {
        let controls = Controls {
            mode: FilterMode::Custom,
            ..Controls::default()
        };
        build_snapshot(&sample_dataset(), &controls, source())
    }

    /// Every cell symbol of the last drawn frame, row after row.
    pub fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }
}
