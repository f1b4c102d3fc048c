use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

/// Highest hour-of-day bucket present in the source data.
pub const MAX_HOUR: u8 = 23;

/// One row of the source table: a (provider, site, hour) bucket with its
/// three capacity metrics.
///
/// Field order is the column order used when the record is written back out
/// as CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "providercode")]
    pub provider_code: String,
    #[serde(rename = "sitecode")]
    pub site_code: String,
    /// Local hour-of-day bucket, `0..=23`.
    pub hour: u8,
    /// Median transactions-per-hour for the bucket.
    pub tph_median: f64,
    /// Transaction count for the bucket.
    pub ct_sum: f64,
    /// Average first-response delay in minutes.
    pub avg_first_resp_delay_minute: f64,
    /// Minute-precision display string (`%Y-%m-%d %H:%M`), `None` when the
    /// source value could not be parsed.
    pub last_updated: Option<String>,
}

// ── Metric ────────────────────────────────────────────────────────────────────

/// The three numeric metric columns carried by every [`Record`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// `tph_median`
    TphMedian,
    /// `ct_sum`
    CtSum,
    /// `avg_first_resp_delay_minute`
    #[value(name = "avg-delay")]
    AvgFirstRespDelay,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::TphMedian, Metric::CtSum, Metric::AvgFirstRespDelay];

    /// Source column name.
    pub fn column(self) -> &'static str {
        match self {
            Metric::TphMedian => "tph_median",
            Metric::CtSum => "ct_sum",
            Metric::AvgFirstRespDelay => "avg_first_resp_delay_minute",
        }
    }

    /// Human-readable label shown in the metric selector.
    pub fn label(self) -> &'static str {
        match self {
            Metric::TphMedian => "TPH Median",
            Metric::CtSum => "Count Sum",
            Metric::AvgFirstRespDelay => "Avg Response Delay",
        }
    }

    /// Read this metric from `record`.
    pub fn value(self, record: &Record) -> f64 {
        match self {
            Metric::TphMedian => record.tph_median,
            Metric::CtSum => record.ct_sum,
            Metric::AvgFirstRespDelay => record.avg_first_resp_delay_minute,
        }
    }

    /// The next metric in selector order, wrapping around.
    pub fn next(self) -> Metric {
        match self {
            Metric::TphMedian => Metric::CtSum,
            Metric::CtSum => Metric::AvgFirstRespDelay,
            Metric::AvgFirstRespDelay => Metric::TphMedian,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── FilterMode ────────────────────────────────────────────────────────────────

/// Selection strategy applied before filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Pick providers; every site they operate is included.
    ProviderFocus,
    /// Pick sites; every provider operating there is included.
    SiteFocus,
    /// Pick providers and sites independently.
    Custom,
}

impl FilterMode {
    pub fn label(self) -> &'static str {
        match self {
            FilterMode::ProviderFocus => "Provider Focus",
            FilterMode::SiteFocus => "Site Focus",
            FilterMode::Custom => "Custom",
        }
    }

    pub fn next(self) -> FilterMode {
        match self {
            FilterMode::ProviderFocus => FilterMode::SiteFocus,
            FilterMode::SiteFocus => FilterMode::Custom,
            FilterMode::Custom => FilterMode::ProviderFocus,
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── CombinationSort ───────────────────────────────────────────────────────────

/// Column used to order the provider-site combination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CombinationSort {
    TphAvg,
    TphMax,
    CountTotal,
    DelayAvg,
}

impl CombinationSort {
    /// Name of the combination-table column this key sorts on.
    pub fn column(self) -> &'static str {
        match self {
            CombinationSort::TphAvg => "TPH_Avg",
            CombinationSort::TphMax => "TPH_Max",
            CombinationSort::CountTotal => "Count_Total",
            CombinationSort::DelayAvg => "Delay_Avg",
        }
    }

    pub fn next(self) -> CombinationSort {
        match self {
            CombinationSort::TphAvg => CombinationSort::TphMax,
            CombinationSort::TphMax => CombinationSort::CountTotal,
            CombinationSort::CountTotal => CombinationSort::DelayAvg,
            CombinationSort::DelayAvg => CombinationSort::TphAvg,
        }
    }
}

// ── HourRange ─────────────────────────────────────────────────────────────────

/// Inclusive hour-of-day window, always `0 <= lo <= hi <= 23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    lo: u8,
    hi: u8,
}

impl HourRange {
    /// Validate and build a range.
    pub fn new(lo: u8, hi: u8) -> Result<Self> {
        if lo > hi || hi > MAX_HOUR {
            return Err(DashboardError::InvalidHourRange { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    /// The whole day, `0..=23`.
    pub fn full_day() -> Self {
        Self { lo: 0, hi: MAX_HOUR }
    }

    pub fn lo(&self) -> u8 {
        self.lo
    }

    pub fn hi(&self) -> u8 {
        self.hi
    }

    pub fn contains(&self, hour: u8) -> bool {
        self.lo <= hour && hour <= self.hi
    }
}

impl Default for HourRange {
    fn default() -> Self {
        Self::full_day()
    }
}

impl fmt::Display for HourRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:59", self.lo, self.hi)
    }
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// Raw, user-supplied selections before mode-specific resolution.
///
/// `None` means "use the mode's default"; `Some(vec![])` is an explicit empty
/// choice and yields an empty result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSelection {
    pub providers: Option<Vec<String>>,
    pub sites: Option<Vec<String>>,
    pub hour_range: HourRange,
}

/// Fully resolved filter for one render pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub mode: FilterMode,
    pub selected_providers: BTreeSet<String>,
    pub selected_sites: BTreeSet<String>,
    pub hour_range: HourRange,
}

impl FilterSpec {
    /// `true` when `record` satisfies all three predicates.
    pub fn matches(&self, record: &Record) -> bool {
        self.selected_providers.contains(&record.provider_code)
            && self.selected_sites.contains(&record.site_code)
            && self.hour_range.contains(record.hour)
    }
}

// ── Dataset ───────────────────────────────────────────────────────────────────

/// An in-memory collection of [`Record`]s.
///
/// Never mutated once built; filtering produces a new `Dataset`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    /// Source column names, in record field order.
    pub const COLUMNS: [&'static str; 7] = [
        "providercode",
        "sitecode",
        "hour",
        "tph_median",
        "ct_sum",
        "avg_first_resp_delay_minute",
        "last_updated",
    ];

    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy out the records for which `keep` returns `true`.
    pub fn subset(&self, keep: impl Fn(&Record) -> bool) -> Dataset {
        Dataset::new(self.records.iter().filter(|r| keep(r)).cloned().collect())
    }

    /// Distinct provider codes in first-appearance order.
    pub fn providers(&self) -> Vec<String> {
        distinct_in_order(self.records.iter().map(|r| r.provider_code.as_str()))
    }

    /// Distinct site codes in first-appearance order.
    pub fn sites(&self) -> Vec<String> {
        distinct_in_order(self.records.iter().map(|r| r.site_code.as_str()))
    }

    /// Every site appearing in a record of one of `providers`.
    pub fn sites_for_providers(&self, providers: &BTreeSet<String>) -> BTreeSet<String> {
        self.records
            .iter()
            .filter(|r| providers.contains(&r.provider_code))
            .map(|r| r.site_code.clone())
            .collect()
    }

    /// Every provider appearing in a record at one of `sites`.
    pub fn providers_for_sites(&self, sites: &BTreeSet<String>) -> BTreeSet<String> {
        self.records
            .iter()
            .filter(|r| sites.contains(&r.site_code))
            .map(|r| r.provider_code.clone())
            .collect()
    }

    /// Distinct hours, ascending.
    pub fn distinct_hours(&self) -> BTreeSet<u8> {
        self.records.iter().map(|r| r.hour).collect()
    }

    /// Most recent `last_updated` value.
    ///
    /// The display format sorts chronologically, so a string max suffices.
    pub fn latest_update(&self) -> Option<&str> {
        self.records
            .iter()
            .filter_map(|r| r.last_updated.as_deref())
            .max()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn distinct_in_order<'a>(codes: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for code in codes {
        if seen.insert(code) {
            out.push(code.to_string());
        }
    }
    out
}
