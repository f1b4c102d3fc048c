//! Immutable per-interaction view model.
//!
//! [`build_snapshot`] is a pure function of the dataset and the current
//! [`Controls`]: it resolves the filter, applies it, and computes every table
//! and chart series the presentation layer draws. Nothing here knows about
//! terminals.

use std::collections::BTreeSet;

use dashboard_core::error::{DashboardError, Result};
use dashboard_core::formatting::format_hour;
use dashboard_core::models::{CombinationSort, Dataset, FilterMode, FilterSpec, Metric, RawSelection, Record};
use dashboard_data::aggregator::{
    combination_table, hourly_metrics, hourly_tph_by_site, provider_summary, site_tph_means,
    AggregationWarning, GroupKey, COMBINATION_LABEL,
};
use dashboard_data::filter::{apply, resolve_selection, selection_info, sort_dataset};
use dashboard_data::insights::{
    describe_columns, distribution_by_provider, ColumnStats, CombinationSummary, KeyMetrics,
    ProviderDistribution, SiteAnalysis,
};
use dashboard_data::loader::LoadReport;
use dashboard_data::pivot::{pivot, pivot_mean, PivotTable};
use dashboard_data::ranking::{bottom_n, top_codes, top_n};
use dashboard_data::summary::SummaryTable;
use serde::Serialize;
use tracing::{debug, warn};

/// Sites drawn in the Provider-Focus secondary chart before switching to a
/// top-N view.
pub const SITE_CHART_LIMIT: usize = 10;
/// Sites drawn in the Custom-mode secondary chart.
pub const CUSTOM_TOP_SITES: usize = 5;
/// Sites included in the delay heatmap.
pub const HEATMAP_TOP_SITES: usize = 10;

// ── Controls ──────────────────────────────────────────────────────────────────

/// Every user-adjustable input of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Controls {
    pub mode: FilterMode,
    pub selection: RawSelection,
    pub metric: Metric,
    pub sort_by: CombinationSort,
    pub ascending: bool,
    pub top_n: usize,
    /// Site shown in the site analysis view; the first selected site when
    /// unset or no longer selected.
    pub analysis_site: Option<String>,
    /// Column of [`Dataset::COLUMNS`] the data table is ordered by.
    pub data_sort: String,
    pub data_ascending: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            mode: FilterMode::ProviderFocus,
            selection: RawSelection::default(),
            metric: Metric::TphMedian,
            sort_by: CombinationSort::TphAvg,
            ascending: false,
            top_n: 10,
            analysis_site: None,
            data_sort: Dataset::COLUMNS[0].to_string(),
            data_ascending: true,
        }
    }
}

// ── Snapshot types ────────────────────────────────────────────────────────────

/// Where the data came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceInfo {
    pub path: String,
    /// Date window parsed from the file name, when present.
    pub coverage: Option<String>,
    pub last_updated: Option<String>,
    pub total_records: usize,
    pub load_report: Option<LoadReport>,
}

/// One line of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    /// `(hour, value)` pairs, ascending by hour.
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

impl Chart {
    /// `(min, max)` over every plotted value.
    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        let mut values = self.series.iter().flat_map(|s| s.points.iter().map(|p| p.1));
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesView {
    pub primary: Chart,
    pub secondary: Chart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapView {
    /// Provider × hour mean TPH.
    pub provider_hour_tph: PivotTable,
    /// Site × hour mean delay for the top sites by mean TPH.
    pub site_hour_delay: PivotTable,
}

/// A single observation of the TPH-versus-delay scatter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub provider: String,
    pub site: String,
    pub hour: u8,
    pub tph: f64,
    pub delay: f64,
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonView {
    /// Per provider: mean TPH, total count, mean delay.
    pub providers: SummaryTable,
    pub tph_distribution: Vec<ProviderDistribution>,
    pub delay_distribution: Vec<ProviderDistribution>,
    pub scatter: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteAnalysisView {
    /// Sites the analysis can switch between.
    pub sites: Vec<String>,
    pub analysis: Option<SiteAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinationView {
    /// Full combination table in the requested order.
    pub table: SummaryTable,
    pub summary: CombinationSummary,
    /// `Provider_Site` and `TPH_Avg` of the best combinations.
    pub top: SummaryTable,
    pub bottom: SummaryTable,
    /// Provider × site `TPH_Avg`.
    pub matrix: PivotTable,
    pub warnings: Vec<AggregationWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTableView {
    pub describe: Vec<ColumnStats>,
    pub rows: Vec<Record>,
}

/// Everything drawn when the filter selects at least one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Views {
    pub key_metrics: KeyMetrics,
    pub time_series: TimeSeriesView,
    pub heatmaps: HeatmapView,
    pub comparisons: ComparisonView,
    pub site_analysis: SiteAnalysisView,
    pub combinations: CombinationView,
    pub data_table: DataTableView,
}

/// The complete, render-ready state of one interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub source: SourceInfo,
    pub controls: Controls,
    pub filter: FilterSpec,
    pub selection_info: Option<String>,
    pub providers: Vec<String>,
    pub sites: Vec<String>,
    /// Set instead of `views` when nothing can be drawn.
    pub notice: Option<String>,
    pub views: Option<Views>,
}

impl DashboardSnapshot {
    pub fn has_data(&self) -> bool {
        self.views.is_some()
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Resolve, filter and aggregate `dataset` under `controls`.
pub fn build_snapshot(dataset: &Dataset, controls: &Controls, source: SourceInfo) -> DashboardSnapshot {
    let filter = resolve_selection(dataset, controls.mode, &controls.selection);
    let filtered = apply(dataset, &filter);

    let (notice, views) = if filtered.is_empty() {
        (Some(DashboardError::EmptySelection.to_string()), None)
    } else {
        match build_views(&filtered, &filter, controls) {
            Ok(v) => (None, Some(v)),
            Err(e) => {
                warn!(error = %e, "could not build dashboard views");
                (Some(e.to_string()), None)
            }
        }
    };

    debug!(rows = filtered.len(), has_data = views.is_some(), "snapshot built");

    DashboardSnapshot {
        source,
        controls: controls.clone(),
        selection_info: selection_info(&filter),
        providers: dataset.providers(),
        sites: dataset.sites(),
        filter,
        notice,
        views,
    }
}

fn build_views(filtered: &Dataset, filter: &FilterSpec, controls: &Controls) -> Result<Views> {
    Ok(Views {
        key_metrics: KeyMetrics::compute(filtered, filter),
        time_series: time_series(filtered, filter, controls.metric)?,
        heatmaps: heatmaps(filtered)?,
        comparisons: comparisons(filtered),
        site_analysis: site_analysis(filtered, filter, controls.analysis_site.as_deref()),
        combinations: combinations(filtered, controls)?,
        data_table: DataTableView {
            describe: describe_columns(filtered),
            rows: sort_dataset(filtered, &controls.data_sort, controls.data_ascending)?
                .records()
                .to_vec(),
        },
    })
}

// ── Time series ───────────────────────────────────────────────────────────────

/// Turn an `(hour, key, ...)` table into one series per key.
fn series_from(table: &SummaryTable, value_column: &str, keep: Option<&BTreeSet<String>>) -> Result<Vec<Series>> {
    let vi = table.column_index(value_column)?;
    let mut series: Vec<Series> = Vec::new();
    for row in table.rows() {
        let (Some(hour), Some(value)) = (row[0].as_f64(), row[vi].as_f64()) else {
            continue;
        };
        let name = row[1].to_field();
        if keep.is_some_and(|k| !k.contains(&name)) {
            continue;
        }
        match series.iter_mut().find(|s| s.name == name) {
            Some(s) => s.points.push((hour, value)),
            None => series.push(Series {
                name,
                points: vec![(hour, value)],
            }),
        }
    }
    series.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(series)
}

fn time_series(filtered: &Dataset, filter: &FilterSpec, metric: Metric) -> Result<TimeSeriesView> {
    let primary = match filter.mode {
        FilterMode::SiteFocus => Chart {
            title: format!("All Providers at Selected Site(s) - {}", metric),
            y_label: metric.label().to_string(),
            series: series_from(&hourly_metrics(filtered, GroupKey::Provider), metric.column(), None)?,
        },
        FilterMode::ProviderFocus => Chart {
            title: format!("All Sites for Selected Provider(s) - {}", metric),
            y_label: metric.label().to_string(),
            series: series_from(&hourly_metrics(filtered, GroupKey::Site), metric.column(), None)?,
        },
        FilterMode::Custom => Chart {
            title: format!("Hourly {} by Provider", metric),
            y_label: metric.label().to_string(),
            series: series_from(&hourly_metrics(filtered, GroupKey::Provider), metric.column(), None)?,
        },
    };

    let tph = Metric::TphMedian;
    let secondary = match filter.mode {
        FilterMode::ProviderFocus => {
            let selected = filter.selected_sites.len();
            let (sites, title): (BTreeSet<String>, String) = if selected <= SITE_CHART_LIMIT {
                (
                    filter.selected_sites.clone(),
                    format!("All {} Sites - TPH Performance", selected),
                )
            } else {
                (
                    top_site_codes(filtered, SITE_CHART_LIMIT)?,
                    format!("Top {} Sites - TPH Performance", SITE_CHART_LIMIT),
                )
            };
            Chart {
                title,
                y_label: tph.label().to_string(),
                series: series_from(&hourly_tph_by_site(filtered), tph.column(), Some(&sites))?,
            }
        }
        FilterMode::SiteFocus => {
            let delay = Metric::AvgFirstRespDelay;
            Chart {
                title: "Provider Response Delay at Selected Site(s)".to_string(),
                y_label: "Avg Response Delay (min)".to_string(),
                series: series_from(&hourly_metrics(filtered, GroupKey::Provider), delay.column(), None)?,
            }
        }
        FilterMode::Custom => {
            let sites = top_site_codes(filtered, CUSTOM_TOP_SITES)?;
            Chart {
                title: format!("Top {} Sites - TPH Performance Throughout the Day", CUSTOM_TOP_SITES),
                y_label: tph.label().to_string(),
                series: series_from(&hourly_tph_by_site(filtered), tph.column(), Some(&sites))?,
            }
        }
    };

    Ok(TimeSeriesView { primary, secondary })
}

fn top_site_codes(filtered: &Dataset, n: usize) -> Result<BTreeSet<String>> {
    Ok(top_codes(&site_tph_means(filtered), Metric::TphMedian.column(), n)?
        .into_iter()
        .collect())
}

// ── Other views ───────────────────────────────────────────────────────────────

fn heatmaps(filtered: &Dataset) -> Result<HeatmapView> {
    let top = top_site_codes(filtered, HEATMAP_TOP_SITES)?;
    let top_rows = filtered.subset(|r| top.contains(&r.site_code));
    Ok(HeatmapView {
        provider_hour_tph: pivot_mean(filtered, GroupKey::Provider, GroupKey::Hour, Metric::TphMedian),
        site_hour_delay: pivot_mean(&top_rows, GroupKey::Site, GroupKey::Hour, Metric::AvgFirstRespDelay),
    })
}

fn comparisons(filtered: &Dataset) -> ComparisonView {
    ComparisonView {
        providers: provider_summary(filtered),
        tph_distribution: distribution_by_provider(filtered, Metric::TphMedian),
        delay_distribution: distribution_by_provider(filtered, Metric::AvgFirstRespDelay),
        scatter: filtered
            .iter()
            .map(|r| ScatterPoint {
                provider: r.provider_code.clone(),
                site: r.site_code.clone(),
                hour: r.hour,
                tph: r.tph_median,
                delay: r.avg_first_resp_delay_minute,
                count: r.ct_sum,
            })
            .collect(),
    }
}

fn site_analysis(filtered: &Dataset, filter: &FilterSpec, requested: Option<&str>) -> SiteAnalysisView {
    let sites: Vec<String> = filter.selected_sites.iter().cloned().collect();
    let site = requested
        .filter(|s| filter.selected_sites.contains(*s))
        .or_else(|| sites.first().map(String::as_str));
    SiteAnalysisView {
        analysis: site.and_then(|s| SiteAnalysis::of(filtered, s)),
        sites,
    }
}

fn combinations(filtered: &Dataset, controls: &Controls) -> Result<CombinationView> {
    let combos = combination_table(filtered);
    let table = combos.table.sorted_by(controls.sort_by.column(), controls.ascending)?;
    let label_cols = [COMBINATION_LABEL, "TPH_Avg"];
    Ok(CombinationView {
        summary: CombinationSummary::of(&combos.table),
        top: top_n(&combos.table, "TPH_Avg", controls.top_n)?.select(&label_cols)?,
        bottom: bottom_n(&combos.table, "TPH_Avg", controls.top_n)?.select(&label_cols)?,
        matrix: pivot(&combos.table, "providercode", "sitecode", "TPH_Avg")?,
        warnings: combos.warnings,
        table,
    })
}

/// Hour axis labels for charts, e.g. `"00:00"`.
pub fn hour_labels(hours: impl IntoIterator<Item = u8>) -> Vec<String> {
    hours.into_iter().map(format_hour).collect()
}
