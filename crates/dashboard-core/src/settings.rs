use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use crate::error::Result;
use crate::models::{CombinationSort, FilterMode, HourRange, Metric, RawSelection};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Interactive dashboard for hourly provider/site capacity metrics
#[derive(Parser, Debug, Clone)]
#[command(
    name = "site-dashboard",
    about = "Interactive dashboard for hourly provider/site capacity metrics",
    version
)]
pub struct Settings {
    /// Path to the site metrics CSV (discovered under ./data when omitted)
    #[arg(long, env = "SITE_DASHBOARD_DATA")]
    pub data: Option<PathBuf>,

    /// Filter mode
    #[arg(long, value_enum, default_value_t = FilterMode::ProviderFocus)]
    pub mode: FilterMode,

    /// Provider codes to select (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub providers: Option<Vec<String>>,

    /// Site codes to select (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub sites: Option<Vec<String>>,

    /// First hour of day to include (0-23)
    #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=23))]
    pub hour_min: u8,

    /// Last hour of day to include (0-23)
    #[arg(long, default_value = "23", value_parser = clap::value_parser!(u8).range(0..=23))]
    pub hour_max: u8,

    /// Primary metric for analysis
    #[arg(long, value_enum, default_value_t = Metric::TphMedian)]
    pub metric: Metric,

    /// Sort column for the provider-site combination table
    #[arg(long, value_enum, default_value_t = CombinationSort::TphAvg)]
    pub sort_by: CombinationSort,

    /// Sort the combination table ascending
    #[arg(long)]
    pub ascending: bool,

    /// Number of entries in top/bottom rankings
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u16).range(1..=100))]
    pub top: u16,

    /// Output mode
    #[arg(long, default_value = "tui", value_parser = ["tui", "report"])]
    pub view: String,

    /// Write the filtered rows to this CSV file
    #[arg(long)]
    pub export_filtered: Option<PathBuf>,

    /// Write the provider-site combination table to this CSV file
    #[arg(long)]
    pub export_combinations: Option<PathBuf>,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path (logs go to stderr when omitted)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and apply derived overrides.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Parse an explicit argument list, enabling unit-testing without
    /// spawning subprocesses.
    pub fn try_load_from(args: Vec<OsString>) -> std::result::Result<Self, clap::Error> {
        Settings::try_parse_from(args).map(Self::resolve)
    }

    fn resolve(mut settings: Settings) -> Settings {
        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// The validated hour window.
    pub fn hour_range(&self) -> Result<HourRange> {
        HourRange::new(self.hour_min, self.hour_max)
    }

    /// Provider/site choices from the command line; absent flags defer to
    /// the mode's defaults.
    pub fn raw_selection(&self) -> Result<RawSelection> {
        Ok(RawSelection {
            providers: self.providers.clone(),
            sites: self.sites.clone(),
            hour_range: self.hour_range()?,
        })
    }

    /// Ranking length as a `usize`.
    pub fn top_n(&self) -> usize {
        usize::from(self.top)
    }

    /// Reject option combinations clap cannot express.
    pub fn validate(&self) -> Result<()> {
        self.hour_range()?;
        if self.view == "report" && self.theme != "auto" {
            tracing::debug!("--theme has no effect in the report view");
        }
        Ok(())
    }

    /// `true` when the interactive terminal UI should run.
    pub fn is_tui(&self) -> bool {
        self.view == "tui"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;

    fn args(list: &[&str]) -> Vec<OsString> {
        std::iter::once("site-dashboard")
            .chain(list.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_defaults() {
        let s = Settings::try_load_from(args(&[])).expect("parse");
        assert_eq!(s.mode, FilterMode::ProviderFocus);
        assert_eq!(s.metric, Metric::TphMedian);
        assert_eq!(s.sort_by, CombinationSort::TphAvg);
        assert!(!s.ascending);
        assert_eq!(s.hour_range().unwrap(), HourRange::full_day());
        assert_eq!(s.top_n(), 10);
        assert_eq!(s.view, "tui");
        assert_eq!(s.raw_selection().unwrap(), RawSelection::default());
    }

    #[test]
    fn test_mode_and_selection_parsing() {
        let s = Settings::try_load_from(args(&[
            "--mode",
            "custom",
            "--providers",
            "P1,P2",
            "--sites",
            "S9",
        ]))
        .expect("parse");
        assert_eq!(s.mode, FilterMode::Custom);
        let raw = s.raw_selection().expect("valid range");
        assert_eq!(raw.providers, Some(vec!["P1".to_string(), "P2".to_string()]));
        assert_eq!(raw.sites, Some(vec!["S9".to_string()]));
    }

    #[test]
    fn test_metric_value_names() {
        let s = Settings::try_load_from(args(&["--metric", "avg-delay"])).expect("parse");
        assert_eq!(s.metric, Metric::AvgFirstRespDelay);
        let s = Settings::try_load_from(args(&["--sort-by", "count-total"])).expect("parse");
        assert_eq!(s.sort_by, CombinationSort::CountTotal);
    }

    #[test]
    fn test_hour_out_of_range_rejected_by_parser() {
        assert!(Settings::try_load_from(args(&["--hour-max", "24"])).is_err());
    }

    #[test]
    fn test_inverted_hour_range_fails_validation() {
        let s = Settings::try_load_from(args(&["--hour-min", "18", "--hour-max", "6"]))
            .expect("parse");
        assert!(matches!(
            s.validate(),
            Err(DashboardError::InvalidHourRange { lo: 18, hi: 6 })
        ));
    }

    #[test]
    fn test_debug_flag_overrides_log_level() {
        let s = Settings::try_load_from(args(&["--debug", "--view", "report"])).expect("parse");
        assert_eq!(s.log_level, "DEBUG");
        assert!(!s.is_tui());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_unknown_view_rejected() {
        assert!(Settings::try_load_from(args(&["--view", "html"])).is_err());
    }
}
