//! Headline figures and descriptive statistics for the dashboard views.

use std::collections::{BTreeMap, BTreeSet};

use dashboard_core::error::Result;
use dashboard_core::models::{Dataset, FilterSpec, Metric};
use dashboard_core::stats::{self, Describe, FiveNumber, HistogramBin};
use serde::Serialize;

use crate::aggregator::{aggregate, standard_metrics, GroupKey, COMBINATION_LABEL};
use crate::ranking::{bottom_n, top_n};
use crate::summary::{SummaryTable, Value};

/// Equal-width bins used for the combination TPH histogram.
pub const HISTOGRAM_BINS: usize = 20;

// ── Key metrics ───────────────────────────────────────────────────────────────

/// The KPI row shown above every view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMetrics {
    /// Distinct sites in the filtered rows.
    pub total_sites: usize,
    /// Providers in the resolved selection, whether or not they have rows.
    pub selected_providers: usize,
    pub avg_tph: Option<f64>,
    pub max_tph: Option<f64>,
    pub avg_delay: Option<f64>,
    pub min_delay: Option<f64>,
    pub total_count: f64,
    pub avg_count: Option<f64>,
    pub data_points: usize,
    pub distinct_hours: usize,
}

impl KeyMetrics {
    pub fn compute(filtered: &Dataset, spec: &FilterSpec) -> Self {
        let tph = column(filtered, Metric::TphMedian);
        let delay = column(filtered, Metric::AvgFirstRespDelay);
        let count = column(filtered, Metric::CtSum);
        let sites: BTreeSet<&str> = filtered.iter().map(|r| r.site_code.as_str()).collect();

        Self {
            total_sites: sites.len(),
            selected_providers: spec.selected_providers.len(),
            avg_tph: stats::mean(&tph),
            max_tph: stats::max(&tph),
            avg_delay: stats::mean(&delay),
            min_delay: stats::min(&delay),
            total_count: stats::sum(&count),
            avg_count: stats::mean(&count),
            data_points: filtered.len(),
            distinct_hours: filtered.distinct_hours().len(),
        }
    }
}

fn column(dataset: &Dataset, metric: Metric) -> Vec<f64> {
    dataset.iter().map(|r| metric.value(r)).collect()
}

// ── Describe ──────────────────────────────────────────────────────────────────

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub stats: Describe,
}

/// `describe()` over hour and the three metrics, in source column order.
pub fn describe_columns(dataset: &Dataset) -> Vec<ColumnStats> {
    let hours: Vec<f64> = dataset.iter().map(|r| f64::from(r.hour)).collect();
    let mut out = vec![ColumnStats {
        column: "hour".to_string(),
        stats: Describe::of(&hours),
    }];
    for metric in Metric::ALL {
        out.push(ColumnStats {
            column: metric.column().to_string(),
            stats: Describe::of(&column(dataset, metric)),
        });
    }
    out
}

// ── Distributions ─────────────────────────────────────────────────────────────

/// Box-plot summary of one metric for one provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDistribution {
    pub provider: String,
    pub count: usize,
    pub summary: FiveNumber,
}

/// Five-number summary of `metric` per provider, ordered by provider code.
pub fn distribution_by_provider(dataset: &Dataset, metric: Metric) -> Vec<ProviderDistribution> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in dataset {
        groups
            .entry(r.provider_code.as_str())
            .or_default()
            .push(metric.value(r));
    }
    groups
        .into_iter()
        .filter_map(|(provider, values)| {
            Some(ProviderDistribution {
                provider: provider.to_string(),
                count: values.len(),
                summary: FiveNumber::of(&values)?,
            })
        })
        .collect()
}

// ── Combination summary ───────────────────────────────────────────────────────

/// A labelled value, e.g. the best combination and its average TPH.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Labelled {
    pub label: String,
    pub value: f64,
}

/// Headline figures over the combination table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinationSummary {
    pub total: usize,
    pub providers: usize,
    pub best: Option<Labelled>,
    pub worst: Option<Labelled>,
    pub mean_tph_avg: Option<f64>,
    pub std_tph_avg: Option<f64>,
    pub histogram: Vec<HistogramBin>,
}

impl CombinationSummary {
    /// Summarise a table produced by
    /// [`combination_table`](crate::aggregator::combination_table).
    pub fn of(table: &SummaryTable) -> Self {
        let tph_avg = table.numeric_column("TPH_Avg").unwrap_or_default();
        let providers: BTreeSet<String> = table
            .column("providercode")
            .map(|col| col.into_iter().map(Value::to_field).collect())
            .unwrap_or_default();

        Self {
            total: table.len(),
            providers: providers.len(),
            best: extreme(top_n(table, "TPH_Avg", 1)),
            worst: extreme(bottom_n(table, "TPH_Avg", 1)),
            mean_tph_avg: stats::mean(&tph_avg),
            std_tph_avg: stats::sample_std(&tph_avg),
            histogram: stats::histogram(&tph_avg, HISTOGRAM_BINS),
        }
    }
}

fn extreme(ranked: Result<SummaryTable>) -> Option<Labelled> {
    let ranked = ranked.ok()?;
    Some(Labelled {
        label: ranked.get(0, COMBINATION_LABEL)?.to_field(),
        value: ranked.get(0, "TPH_Avg")?.as_f64()?,
    })
}

// ── Site analysis ─────────────────────────────────────────────────────────────

/// One hour of a single site's series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteHour {
    pub hour: u8,
    pub tph: f64,
    pub delay: f64,
    pub count: f64,
}

/// Deep dive into one site of the filtered rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteAnalysis {
    pub site: String,
    /// Provider of the first matching row.
    pub provider: String,
    pub avg_tph: f64,
    pub min_tph: f64,
    pub max_tph: f64,
    pub avg_delay: f64,
    /// Sample std of delay; `None` for a single row.
    pub std_delay: Option<f64>,
    /// Mean TPH, mean delay and total count per hour, ascending.
    pub hourly: Vec<SiteHour>,
}

impl SiteAnalysis {
    /// `None` when `site` has no rows in `filtered`.
    pub fn of(filtered: &Dataset, site: &str) -> Option<Self> {
        let rows = filtered.subset(|r| r.site_code == site);
        let first = rows.records().first()?;
        let tph = column(&rows, Metric::TphMedian);
        let delay = column(&rows, Metric::AvgFirstRespDelay);

        let by_hour = aggregate(&rows, &[GroupKey::Hour], &standard_metrics());
        let hourly = by_hour
            .rows()
            .iter()
            .filter_map(|row| {
                Some(SiteHour {
                    hour: u8::try_from(row[0].as_f64()? as i64).ok()?,
                    tph: row[1].as_f64()?,
                    count: row[2].as_f64()?,
                    delay: row[3].as_f64()?,
                })
            })
            .collect();

        Some(Self {
            site: site.to_string(),
            provider: first.provider_code.clone(),
            avg_tph: stats::mean(&tph)?,
            min_tph: stats::min(&tph)?,
            max_tph: stats::max(&tph)?,
            avg_delay: stats::mean(&delay)?,
            std_delay: stats::sample_std(&delay),
            hourly,
        })
    }
}
