//! Group-by aggregation over a filtered [`Dataset`].
//!
//! Every function here is pure: the same dataset always yields the same
//! table, groups come out in ascending key order, and an empty dataset
//! produces an empty table rather than an error.

use std::collections::BTreeMap;
use std::fmt;

use dashboard_core::models::{Dataset, Metric, Record};
use dashboard_core::stats;
use serde::Serialize;
use tracing::debug;

use crate::summary::{SummaryTable, Value};

// ── GroupKey ──────────────────────────────────────────────────────────────────

/// A column records can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GroupKey {
    Hour,
    Provider,
    Site,
}

impl GroupKey {
    pub fn column(self) -> &'static str {
        match self {
            GroupKey::Hour => "hour",
            GroupKey::Provider => "providercode",
            GroupKey::Site => "sitecode",
        }
    }

    fn part(self, record: &Record) -> KeyPart {
        match self {
            GroupKey::Hour => KeyPart::Hour(record.hour),
            GroupKey::Provider => KeyPart::Code(record.provider_code.clone()),
            GroupKey::Site => KeyPart::Code(record.site_code.clone()),
        }
    }
}

/// Orderable key component; hours sort numerically, codes lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPart {
    Hour(u8),
    Code(String),
}

impl From<KeyPart> for Value {
    fn from(part: KeyPart) -> Self {
        match part {
            KeyPart::Hour(h) => Value::Int(i64::from(h)),
            KeyPart::Code(c) => Value::Text(c),
        }
    }
}

// ── Reduction ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reduction {
    Mean,
    Sum,
    Min,
    Max,
    /// Sample standard deviation; null for single-record groups.
    Std,
    Count,
}

impl Reduction {
    fn apply(self, values: &[f64]) -> Value {
        match self {
            Reduction::Mean => Value::from_option(stats::mean(values)),
            Reduction::Sum => Value::Float(stats::sum(values)),
            Reduction::Min => Value::from_option(stats::min(values)),
            Reduction::Max => Value::from_option(stats::max(values)),
            Reduction::Std => Value::from_option(stats::sample_std(values)),
            Reduction::Count => Value::Int(values.len() as i64),
        }
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reduction::Mean => "mean",
            Reduction::Sum => "sum",
            Reduction::Min => "min",
            Reduction::Max => "max",
            Reduction::Std => "std",
            Reduction::Count => "count",
        };
        f.write_str(s)
    }
}

/// One output column: `reduction(metric)` named `column`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub metric: Metric,
    pub reduction: Reduction,
    pub column: String,
}

impl Aggregation {
    pub fn new(metric: Metric, reduction: Reduction, column: impl Into<String>) -> Self {
        Self {
            metric,
            reduction,
            column: column.into(),
        }
    }

    /// Output column named after the source metric column.
    pub fn keep_name(metric: Metric, reduction: Reduction) -> Self {
        Self::new(metric, reduction, metric.column())
    }
}

// ── Generic engine ────────────────────────────────────────────────────────────

/// Group `dataset` by `keys` and reduce each group with `aggregations`.
///
/// Output columns are the key columns followed by one column per
/// aggregation, in the order given.
pub fn aggregate(dataset: &Dataset, keys: &[GroupKey], aggregations: &[Aggregation]) -> SummaryTable {
    let columns: Vec<String> = keys
        .iter()
        .map(|k| k.column().to_string())
        .chain(aggregations.iter().map(|a| a.column.clone()))
        .collect();
    let mut table = SummaryTable::new(columns, keys.len());

    let mut groups: BTreeMap<Vec<KeyPart>, Vec<&Record>> = BTreeMap::new();
    for record in dataset {
        let key: Vec<KeyPart> = keys.iter().map(|k| k.part(record)).collect();
        groups.entry(key).or_default().push(record);
    }

    for (key, records) in groups {
        let mut row: Vec<Value> = key.into_iter().map(Value::from).collect();
        for agg in aggregations {
            let values: Vec<f64> = records.iter().map(|r| agg.metric.value(r)).collect();
            row.push(agg.reduction.apply(&values));
        }
        table.push_row(row);
    }

    debug!(
        keys = ?keys,
        groups = table.len(),
        "aggregated {} records",
        dataset.len()
    );
    table
}

/// The standard three-metric reduction: mean TPH, total count, mean delay.
pub fn standard_metrics() -> Vec<Aggregation> {
    vec![
        Aggregation::keep_name(Metric::TphMedian, Reduction::Mean),
        Aggregation::keep_name(Metric::CtSum, Reduction::Sum),
        Aggregation::keep_name(Metric::AvgFirstRespDelay, Reduction::Mean),
    ]
}

// ── Named aggregations ────────────────────────────────────────────────────────

/// Per (hour, `series`) standard metrics, used for the hourly trend charts.
pub fn hourly_metrics(dataset: &Dataset, series: GroupKey) -> SummaryTable {
    aggregate(dataset, &[GroupKey::Hour, series], &standard_metrics())
}

/// Per (hour, provider): mean TPH, total count, mean delay.
pub fn hourly_by_provider(dataset: &Dataset) -> SummaryTable {
    hourly_metrics(dataset, GroupKey::Provider)
}

/// Per (hour, site): mean TPH.
pub fn hourly_tph_by_site(dataset: &Dataset) -> SummaryTable {
    aggregate(
        dataset,
        &[GroupKey::Hour, GroupKey::Site],
        &[Aggregation::keep_name(Metric::TphMedian, Reduction::Mean)],
    )
}

/// Per provider: mean TPH, total count, mean delay. Drives provider ranking.
pub fn provider_summary(dataset: &Dataset) -> SummaryTable {
    aggregate(dataset, &[GroupKey::Provider], &standard_metrics())
}

/// Per site: mean TPH. Drives "top sites" selections.
pub fn site_tph_means(dataset: &Dataset) -> SummaryTable {
    aggregate(
        dataset,
        &[GroupKey::Site],
        &[Aggregation::keep_name(Metric::TphMedian, Reduction::Mean)],
    )
}

// ── Combination table ─────────────────────────────────────────────────────────

/// Label column joining provider and site, e.g. `"P1-S1"`.
pub const COMBINATION_LABEL: &str = "Provider_Site";

/// A reduction that was undefined for a group and left null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationWarning {
    /// Group label, e.g. `"P1-S1"`.
    pub group: String,
    /// Column left null.
    pub column: String,
    pub reduction: Reduction,
}

impl fmt::Display for AggregationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} undefined for {} (single record)",
            self.column, self.group
        )
    }
}

/// The per (provider, site) statistics table plus any undefined reductions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinationTable {
    pub table: SummaryTable,
    pub warnings: Vec<AggregationWarning>,
}

fn combination_aggregations() -> Vec<Aggregation> {
    use Metric::*;
    use Reduction::*;
    vec![
        Aggregation::new(TphMedian, Mean, "TPH_Avg"),
        Aggregation::new(TphMedian, Min, "TPH_Min"),
        Aggregation::new(TphMedian, Max, "TPH_Max"),
        Aggregation::new(TphMedian, Std, "TPH_StdDev"),
        Aggregation::new(CtSum, Mean, "Count_Avg"),
        Aggregation::new(CtSum, Sum, "Count_Total"),
        Aggregation::new(AvgFirstRespDelay, Mean, "Delay_Avg"),
        Aggregation::new(AvgFirstRespDelay, Min, "Delay_Min"),
        Aggregation::new(AvgFirstRespDelay, Max, "Delay_Max"),
    ]
}

/// Per (provider, site) mean/min/max/std of TPH, mean/sum of count and
/// mean/min/max of delay, rounded to two decimals, with a trailing
/// [`COMBINATION_LABEL`] column.
///
/// The standard deviation of a single-record combination stays null and is
/// reported in [`CombinationTable::warnings`].
pub fn combination_table(dataset: &Dataset) -> CombinationTable {
    let aggregations = combination_aggregations();
    let grouped = aggregate(dataset, &[GroupKey::Provider, GroupKey::Site], &aggregations);

    let mut columns = grouped.columns().to_vec();
    columns.push(COMBINATION_LABEL.to_string());
    let mut table = SummaryTable::new(columns, grouped.key_columns());
    let mut warnings = Vec::new();

    for row in grouped.rows() {
        let label = format!("{}-{}", row[0], row[1]);
        let mut out: Vec<Value> = Vec::with_capacity(row.len() + 1);
        out.push(row[0].clone());
        out.push(row[1].clone());
        for (value, agg) in row[2..].iter().zip(&aggregations) {
            match value {
                Value::Float(f) => out.push(Value::Float(stats::round2(*f))),
                Value::Null => {
                    warnings.push(AggregationWarning {
                        group: label.clone(),
                        column: agg.column.clone(),
                        reduction: agg.reduction,
                    });
                    out.push(Value::Null);
                }
                other => out.push(other.clone()),
            }
        }
        out.push(Value::Text(label));
        table.push_row(out);
    }

    if !warnings.is_empty() {
        debug!(
            count = warnings.len(),
            "combination table has undefined reductions"
        );
    }

    CombinationTable { table, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(p: &str, s: &str, hour: u8, tph: f64, ct: f64, delay: f64) -> Record {
        Record {
            provider_code: p.to_string(),
            site_code: s.to_string(),
            hour,
            tph_median: tph,
            ct_sum: ct,
            avg_first_resp_delay_minute: delay,
            last_updated: None,
        }
    }

    fn example() -> Dataset {
        Dataset::new(vec![
            rec("P1", "S1", 0, 100.0, 10.0, 2.0),
            rec("P1", "S1", 1, 200.0, 20.0, 3.0),
            rec("P2", "S2", 0, 50.0, 5.0, 1.0),
        ])
    }

    fn f(v: Option<&Value>) -> f64 {
        v.and_then(Value::as_f64).expect("numeric cell")
    }

    #[test]
    fn test_provider_summary_values() {
        let t = provider_summary(&example());
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(0, "providercode"), Some(&Value::Text("P1".into())));
        assert_eq!(f(t.get(0, "tph_median")), 150.0);
        assert_eq!(f(t.get(0, "ct_sum")), 30.0);
        assert_eq!(f(t.get(0, "avg_first_resp_delay_minute")), 2.5);
    }

    #[test]
    fn test_hourly_by_provider_groups_sorted() {
        let t = hourly_by_provider(&example());
        let keys: Vec<(String, String)> = t
            .rows()
            .iter()
            .map(|r| (r[0].to_field(), r[1].to_field()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("0".to_string(), "P1".to_string()),
                ("0".to_string(), "P2".to_string()),
                ("1".to_string(), "P1".to_string()),
            ]
        );
    }

    #[test]
    fn test_hour_keys_sort_numerically() {
        let ds = Dataset::new(vec![
            rec("P1", "S1", 10, 1.0, 1.0, 1.0),
            rec("P1", "S1", 2, 1.0, 1.0, 1.0),
        ]);
        let t = hourly_tph_by_site(&ds);
        assert_eq!(t.get(0, "hour"), Some(&Value::Int(2)));
        assert_eq!(t.get(1, "hour"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_duplicates_are_aggregated_not_deduplicated() {
        let ds = Dataset::new(vec![
            rec("P1", "S1", 3, 10.0, 1.0, 1.0),
            rec("P1", "S1", 3, 30.0, 2.0, 1.0),
        ]);
        let t = hourly_tph_by_site(&ds);
        assert_eq!(t.len(), 1);
        assert_eq!(f(t.get(0, "tph_median")), 20.0);
    }

    #[test]
    fn test_empty_dataset_yields_empty_table() {
        let t = provider_summary(&Dataset::default());
        assert!(t.is_empty());
        assert_eq!(t.columns().len(), 4);
        let combos = combination_table(&Dataset::default());
        assert!(combos.table.is_empty());
        assert!(combos.warnings.is_empty());
    }

    #[test]
    fn test_combination_std_null_iff_single_record() {
        let combos = combination_table(&example());
        let t = &combos.table;
        // P1-S1 has two records, P2-S2 has one.
        assert!((f(t.get(0, "TPH_StdDev")) - 70.71).abs() < 1e-9);
        assert_eq!(t.get(1, "TPH_StdDev"), Some(&Value::Null));
        assert_eq!(combos.warnings.len(), 1);
        assert_eq!(combos.warnings[0].group, "P2-S2");
        assert_eq!(combos.warnings[0].reduction, Reduction::Std);
    }

    #[test]
    fn test_combination_columns_and_label() {
        let combos = combination_table(&example());
        let t = &combos.table;
        assert_eq!(
            t.columns(),
            &[
                "providercode",
                "sitecode",
                "TPH_Avg",
                "TPH_Min",
                "TPH_Max",
                "TPH_StdDev",
                "Count_Avg",
                "Count_Total",
                "Delay_Avg",
                "Delay_Min",
                "Delay_Max",
                "Provider_Site",
            ]
        );
        assert_eq!(t.get(0, COMBINATION_LABEL), Some(&Value::Text("P1-S1".into())));
        assert_eq!(f(t.get(0, "TPH_Min")), 100.0);
        assert_eq!(f(t.get(0, "TPH_Max")), 200.0);
        assert_eq!(f(t.get(0, "Count_Avg")), 15.0);
        assert_eq!(f(t.get(0, "Count_Total")), 30.0);
        assert_eq!(f(t.get(0, "Delay_Max")), 3.0);
    }

    #[test]
    fn test_combination_values_rounded() {
        let ds = Dataset::new(vec![
            rec("P1", "S1", 0, 1.0, 1.0, 1.0),
            rec("P1", "S1", 1, 2.0, 1.0, 1.0),
            rec("P1", "S1", 2, 2.0, 1.0, 1.0),
        ]);
        let t = combination_table(&ds).table;
        assert_eq!(f(t.get(0, "TPH_Avg")), 1.67);
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let a = combination_table(&example());
        let b = combination_table(&example());
        assert_eq!(a, b);
    }

    #[test]
    fn test_count_reduction() {
        let t = aggregate(
            &example(),
            &[GroupKey::Provider],
            &[Aggregation::new(Metric::TphMedian, Reduction::Count, "n")],
        );
        assert_eq!(t.get(0, "n"), Some(&Value::Int(2)));
        assert_eq!(t.get(1, "n"), Some(&Value::Int(1)));
    }
}
