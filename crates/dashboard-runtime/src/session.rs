//! Interactive session state.
//!
//! A [`Session`] owns the load-once [`DataLoader`] and the current
//! [`Controls`]. Every interaction mutates the controls and asks for a new
//! [`DashboardSnapshot`]; the dataset itself is read once and never changes.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use dashboard_core::error::Result;
use dashboard_core::models::{Dataset, FilterMode, HourRange, MAX_HOUR};
use dashboard_core::settings::Settings;
use dashboard_data::aggregator::combination_table;
use dashboard_data::discovery::coverage_label;
use dashboard_data::export::{
    default_export_name, export_dataset, export_summary, COMBINATIONS_PREFIX, FILTERED_PREFIX,
};
use dashboard_data::filter::{apply, resolve_selection};
use dashboard_data::loader::DataLoader;
use dashboard_data::summary::SummaryTable;
use serde::Serialize;
use tracing::{debug, info};

use crate::snapshot::{build_snapshot, Controls, DashboardSnapshot, SourceInfo};

impl Controls {
    /// Initial controls from the command line.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            mode: settings.mode,
            selection: settings.raw_selection()?,
            metric: settings.metric,
            sort_by: settings.sort_by,
            ascending: settings.ascending,
            top_n: settings.top_n(),
            ..Controls::default()
        })
    }
}

/// Paths written by [`Session::export`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPaths {
    pub filtered: PathBuf,
    pub combinations: PathBuf,
}

/// Which side of the hour window a key adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourBound {
    Start,
    End,
}

pub struct Session {
    loader: DataLoader,
    controls: Controls,
    coverage: Option<String>,
}

impl Session {
    pub fn new(loader: DataLoader, controls: Controls) -> Self {
        let coverage = coverage_label(loader.path());
        Self {
            loader,
            controls,
            coverage,
        }
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// The session dataset, loading it on first use.
    pub fn dataset(&mut self) -> Result<&Dataset> {
        self.loader.load()
    }

    /// Recompute everything for the current controls.
    ///
    /// Fails only when the dataset cannot be loaded.
    pub fn snapshot(&mut self) -> Result<DashboardSnapshot> {
        let coverage = self.coverage.clone();
        let path = self.loader.path().display().to_string();
        let dataset = self.loader.load()?;
        let source = SourceInfo {
            path,
            coverage,
            last_updated: dataset.latest_update().map(str::to_string),
            total_records: dataset.len(),
            load_report: None,
        };
        let mut snapshot = build_snapshot(dataset, &self.controls, source);
        snapshot.source.load_report = self.loader.report();
        Ok(snapshot)
    }

    // ── Filter controls ───────────────────────────────────────────────────────

    /// Switch mode and drop provider/site choices so the new mode's
    /// defaults apply. The hour window is kept.
    pub fn set_mode(&mut self, mode: FilterMode) {
        self.controls.mode = mode;
        self.controls.selection.providers = None;
        self.controls.selection.sites = None;
        self.controls.analysis_site = None;
        debug!(mode = %mode, "filter mode changed");
    }

    pub fn cycle_mode(&mut self) {
        self.set_mode(self.controls.mode.next());
    }

    /// Return to the current mode's default selection.
    pub fn reset_selection(&mut self) {
        self.set_mode(self.controls.mode);
    }

    /// Choose providers. In Custom mode any explicit sites are dropped so the
    /// new providers' default sites apply.
    pub fn set_providers(&mut self, providers: Vec<String>) {
        self.controls.selection.providers = Some(providers);
        if self.controls.mode == FilterMode::Custom {
            self.controls.selection.sites = None;
        }
        self.controls.analysis_site = None;
    }

    pub fn set_sites(&mut self, sites: Vec<String>) {
        self.controls.selection.sites = Some(sites);
        self.controls.analysis_site = None;
    }

    /// Focus the provider after the currently focused one, wrapping around.
    ///
    /// No effect in Site Focus, where providers are derived.
    pub fn cycle_provider(&mut self) -> Result<()> {
        if self.controls.mode == FilterMode::SiteFocus {
            return Ok(());
        }
        let mode = self.controls.mode;
        let dataset = self.loader.load()?;
        let providers = dataset.providers();
        // In Provider Focus the default already focuses a provider; step past it.
        let current = match (&self.controls.selection.providers, mode) {
            (Some(list), _) => list.first().cloned(),
            (None, FilterMode::ProviderFocus) => {
                resolve_selection(dataset, mode, &self.controls.selection)
                    .selected_providers
                    .into_iter()
                    .next()
            }
            (None, _) => None,
        };
        if let Some(next) = next_after(&providers, current.as_ref()) {
            self.set_providers(vec![next]);
        }
        Ok(())
    }

    /// Focus the site after the currently focused one, wrapping around.
    ///
    /// No effect in Provider Focus, where sites are derived. In Custom mode
    /// only sites of the selected providers are offered.
    pub fn cycle_site(&mut self) -> Result<()> {
        let mode = self.controls.mode;
        if mode == FilterMode::ProviderFocus {
            return Ok(());
        }
        let dataset = self.loader.load()?;
        let sites: Vec<String> = match mode {
            FilterMode::Custom => {
                let spec = resolve_selection(dataset, FilterMode::Custom, &self.controls.selection);
                dataset
                    .sites_for_providers(&spec.selected_providers)
                    .into_iter()
                    .collect()
            }
            _ => dataset.sites(),
        };
        let current = match (&self.controls.selection.sites, mode) {
            (Some(list), _) => list.first().cloned(),
            (None, FilterMode::SiteFocus) => {
                resolve_selection(dataset, mode, &self.controls.selection)
                    .selected_sites
                    .into_iter()
                    .next()
            }
            (None, _) => None,
        };
        if let Some(next) = next_after(&sites, current.as_ref()) {
            self.set_sites(vec![next]);
        }
        Ok(())
    }

    /// Step the site-analysis view to the next selected site.
    pub fn cycle_analysis_site(&mut self) -> Result<()> {
        let dataset = self.loader.load()?;
        let spec = resolve_selection(dataset, self.controls.mode, &self.controls.selection);
        let sites: Vec<String> = spec.selected_sites.into_iter().collect();
        let current = self
            .controls
            .analysis_site
            .as_ref()
            .or_else(|| sites.first());
        self.controls.analysis_site = next_after(&sites, current);
        Ok(())
    }

    /// Move one end of the hour window by `delta`, keeping `lo <= hi` and
    /// both inside `0..=23`. Returns `false` when the move was refused.
    pub fn shift_hours(&mut self, bound: HourBound, delta: i8) -> bool {
        let range = self.controls.selection.hour_range;
        let shift = |h: u8| -> Option<u8> {
            let v = i16::from(h) + i16::from(delta);
            u8::try_from(v).ok().filter(|v| *v <= MAX_HOUR)
        };
        let candidate = match bound {
            HourBound::Start => shift(range.lo()).map(|lo| (lo, range.hi())),
            HourBound::End => shift(range.hi()).map(|hi| (range.lo(), hi)),
        };
        match candidate.and_then(|(lo, hi)| HourRange::new(lo, hi).ok()) {
            Some(next) => {
                self.controls.selection.hour_range = next;
                true
            }
            None => false,
        }
    }

    // ── View controls ─────────────────────────────────────────────────────────

    pub fn cycle_metric(&mut self) {
        self.controls.metric = self.controls.metric.next();
    }

    pub fn cycle_sort(&mut self) {
        self.controls.sort_by = self.controls.sort_by.next();
    }

    pub fn toggle_ascending(&mut self) {
        self.controls.ascending = !self.controls.ascending;
    }

    /// Order the data table by the next column.
    pub fn cycle_data_sort(&mut self) {
        let columns = Dataset::COLUMNS;
        let idx = columns
            .iter()
            .position(|c| *c == self.controls.data_sort)
            .map_or(0, |i| (i + 1) % columns.len());
        self.controls.data_sort = columns[idx].to_string();
    }

    pub fn toggle_data_ascending(&mut self) {
        self.controls.data_ascending = !self.controls.data_ascending;
    }

    // ── Export ────────────────────────────────────────────────────────────────

    /// The filtered rows and the sorted combination table for the current
    /// controls.
    pub fn export_tables(&mut self) -> Result<(Dataset, SummaryTable)> {
        let dataset = self.loader.load()?;
        let spec = resolve_selection(dataset, self.controls.mode, &self.controls.selection);
        let filtered = apply(dataset, &spec);
        let combos = combination_table(&filtered)
            .table
            .sorted_by(self.controls.sort_by.column(), self.controls.ascending)?;
        Ok((filtered, combos))
    }

    /// Write both exports into `dir` under timestamped default names.
    pub fn export(&mut self, dir: &Path, now: NaiveDateTime) -> Result<ExportPaths> {
        let (filtered, combos) = self.export_tables()?;
        let paths = ExportPaths {
            filtered: export_dataset(&dir.join(default_export_name(FILTERED_PREFIX, now)), &filtered)?,
            combinations: export_summary(
                &dir.join(default_export_name(COMBINATIONS_PREFIX, now)),
                &combos,
            )?,
        };
        info!(
            "Exported {} and {}",
            paths.filtered.display(),
            paths.combinations.display()
        );
        Ok(paths)
    }
}

/// The element after `current` in `items`, wrapping; the first element when
/// `current` is absent or unknown.
fn next_after(items: &[String], current: Option<&String>) -> Option<String> {
    let idx = current
        .and_then(|c| items.iter().position(|i| i == c))
        .map_or(0, |i| (i + 1) % items.len());
    items.get(idx).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::models::{CombinationSort, Metric, Record};
    use dashboard_data::export::read_summary;
    use std::collections::BTreeSet;
    use std::ffi::OsString;
    use std::fs::File;
    use tempfile::TempDir;

    fn rec(p: &str, s: &str, hour: u8, tph: f64) -> Record {
        Record {
            provider_code: p.to_string(),
            site_code: s.to_string(),
            hour,
            tph_median: tph,
            ct_sum: 1.0,
            avg_first_resp_delay_minute: 1.0,
            last_updated: Some("2025-06-23 17:45".to_string()),
        }
    }

    fn session(mode: FilterMode) -> Session {
        let ds = Dataset::new(vec![
            rec("P1", "S1", 0, 100.0),
            rec("P1", "S2", 5, 200.0),
            rec("P2", "S2", 9, 50.0),
            rec("P3", "S3", 23, 75.0),
        ]);
        let loader = DataLoader::preloaded("data/site_metrics_final_20250610_to_20250623.csv", ds);
        Session::new(
            loader,
            Controls {
                mode,
                ..Controls::default()
            },
        )
    }

    #[test]
    fn test_snapshot_carries_source_info() {
        let mut s = session(FilterMode::ProviderFocus);
        let snap = s.snapshot().unwrap();
        assert_eq!(snap.source.total_records, 4);
        assert_eq!(snap.source.coverage.as_deref(), Some("2025-06-10 → 2025-06-23"));
        assert_eq!(snap.source.last_updated.as_deref(), Some("2025-06-23 17:45"));
        assert_eq!(snap.source.load_report.map(|r| r.rows_kept), Some(4));
    }

    #[test]
    fn test_cycle_provider_wraps() {
        let mut s = session(FilterMode::ProviderFocus);
        s.cycle_provider().unwrap();
        assert_eq!(s.controls().selection.providers, Some(vec!["P2".to_string()]));
        s.cycle_provider().unwrap();
        assert_eq!(s.controls().selection.providers, Some(vec!["P3".to_string()]));
        s.cycle_provider().unwrap();
        assert_eq!(s.controls().selection.providers, Some(vec!["P1".to_string()]));
    }

    #[test]
    fn test_first_cycle_moves_off_default_focus() {
        let mut s = session(FilterMode::ProviderFocus);
        let before = s.snapshot().unwrap().filter;
        s.cycle_provider().unwrap();
        let after = s.snapshot().unwrap().filter;
        assert_ne!(before.selected_providers, after.selected_providers);
        assert_eq!(after.selected_sites, BTreeSet::from(["S2".to_string()]));

        let mut s = session(FilterMode::SiteFocus);
        let before = s.snapshot().unwrap().filter;
        s.cycle_site().unwrap();
        let after = s.snapshot().unwrap().filter;
        assert_ne!(before.selected_sites, after.selected_sites);
        assert_eq!(after.selected_sites, BTreeSet::from(["S2".to_string()]));
    }

    #[test]
    fn test_custom_provider_change_drops_explicit_sites() {
        let mut s = session(FilterMode::Custom);
        s.set_sites(vec!["S1".to_string()]);
        s.set_providers(vec!["P3".to_string()]);
        assert_eq!(s.controls().selection.sites, None);
        let snap = s.snapshot().unwrap();
        assert!(snap.has_data());
        assert_eq!(snap.filter.selected_sites, BTreeSet::from(["S3".to_string()]));
    }

    #[test]
    fn test_cycle_site_ignored_in_provider_focus() {
        let mut s = session(FilterMode::ProviderFocus);
        s.cycle_site().unwrap();
        assert_eq!(s.controls().selection.sites, None);
    }

    #[test]
    fn test_set_mode_resets_selection_keeps_hours() {
        let mut s = session(FilterMode::SiteFocus);
        s.cycle_site().unwrap();
        assert!(s.shift_hours(HourBound::Start, 3));
        s.cycle_mode();
        assert_eq!(s.controls().mode, FilterMode::Custom);
        assert_eq!(s.controls().selection.sites, None);
        assert_eq!(s.controls().selection.hour_range.lo(), 3);
    }

    #[test]
    fn test_shift_hours_keeps_range_valid() {
        let mut s = session(FilterMode::Custom);
        assert!(!s.shift_hours(HourBound::Start, -1));
        assert!(!s.shift_hours(HourBound::End, 1));
        assert!(s.shift_hours(HourBound::End, -20));
        assert_eq!(s.controls().selection.hour_range.hi(), 3);
        assert!(s.shift_hours(HourBound::Start, 3));
        assert!(!s.shift_hours(HourBound::Start, 1));
        let snap = s.snapshot().unwrap();
        assert_eq!(snap.filter.hour_range.to_string(), "03:00-03:59");
        assert!(!snap.has_data());
    }

    #[test]
    fn test_cycle_analysis_site() {
        let mut s = session(FilterMode::Custom);
        s.cycle_analysis_site().unwrap();
        assert_eq!(s.controls().analysis_site.as_deref(), Some("S2"));
        s.cycle_analysis_site().unwrap();
        assert_eq!(s.controls().analysis_site.as_deref(), Some("S3"));
        let snap = s.snapshot().unwrap();
        let analysis = snap.views.unwrap().site_analysis.analysis.unwrap();
        assert_eq!(analysis.site, "S3");
        assert_eq!(analysis.provider, "P3");
    }

    #[test]
    fn test_view_control_cycles() {
        let mut s = session(FilterMode::Custom);
        s.cycle_metric();
        assert_eq!(s.controls().metric, Metric::CtSum);
        s.cycle_sort();
        assert_eq!(s.controls().sort_by, CombinationSort::TphMax);
        s.toggle_ascending();
        assert!(s.controls().ascending);
        s.cycle_data_sort();
        assert_eq!(s.controls().data_sort, "sitecode");
        s.toggle_data_ascending();
        assert!(!s.controls().data_ascending);
    }

    #[test]
    fn test_export_writes_both_files() {
        let dir = TempDir::new().unwrap();
        let mut s = session(FilterMode::Custom);
        let now = chrono::NaiveDate::from_ymd_opt(2025, 6, 23)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let paths = s.export(dir.path(), now).unwrap();
        assert!(paths
            .filtered
            .ends_with("filtered_site_metrics_20250623_120000.csv"));
        let combos = read_summary(File::open(&paths.combinations).unwrap(), 2).unwrap();
        assert_eq!(combos.len(), 4);
        // default sort is TPH_Avg descending
        assert_eq!(combos.get(0, "TPH_Avg").and_then(|v| v.as_f64()), Some(200.0));
    }

    #[test]
    fn test_controls_from_settings() {
        let args: Vec<OsString> = ["site-dashboard", "--mode", "site-focus", "--sites", "S2", "--top", "3"]
            .iter()
            .map(OsString::from)
            .collect();
        let settings = Settings::try_load_from(args).unwrap();
        let controls = Controls::from_settings(&settings).unwrap();
        assert_eq!(controls.mode, FilterMode::SiteFocus);
        assert_eq!(controls.selection.sites, Some(vec!["S2".to_string()]));
        assert_eq!(controls.top_n, 3);
    }

    #[test]
    fn test_load_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut s = Session::new(DataLoader::new(dir.path().join("missing.csv")), Controls::default());
        let err = s.snapshot().unwrap_err();
        assert!(err.is_load_error());
    }
}
