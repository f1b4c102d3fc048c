//! Two-dimensional reshaping of summary tables for heatmaps.

use std::collections::{BTreeMap, BTreeSet};

use dashboard_core::error::Result;
use dashboard_core::models::{Dataset, Metric};
use serde::Serialize;

use crate::aggregator::{aggregate, Aggregation, GroupKey, Reduction};
use crate::summary::{SummaryTable, Value};

/// Row labels × column labels grid. `None` cells mark pairs absent from the
/// source, which is different from a present value of zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
    pub value_column: String,
}

impl PivotTable {
    pub fn is_empty(&self) -> bool {
        self.row_labels.is_empty() || self.column_labels.is_empty()
    }

    /// Cell for the given labels; `None` when absent or unknown.
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.row_labels.iter().position(|l| l == row)?;
        let c = self.column_labels.iter().position(|l| l == column)?;
        self.cells[r][c]
    }

    fn present(&self) -> impl Iterator<Item = f64> + '_ {
        self.cells.iter().flatten().filter_map(|c| *c)
    }

    /// Smallest present value, used as the low end of a colour scale.
    pub fn min(&self) -> Option<f64> {
        self.present().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.present().reduce(f64::max)
    }

    /// Number of present cells.
    pub fn filled(&self) -> usize {
        self.present().count()
    }
}

/// Label used on a pivot axis. Integers (hours) keep their numeric order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Label {
    Int(i64),
    Text(String),
}

impl Label {
    fn of(value: &Value) -> Option<Label> {
        match value {
            Value::Int(i) => Some(Label::Int(*i)),
            Value::Text(s) => Some(Label::Text(s.clone())),
            Value::Float(f) => Some(Label::Text(f.to_string())),
            Value::Null => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Label::Int(i) => i.to_string(),
            Label::Text(s) => s.clone(),
        }
    }
}

/// Reshape `table` so each distinct `row_col` value is a row and each
/// distinct `col_col` value is a column, filled from `value_col`.
///
/// Both axes are sorted ascending. When several rows map to the same cell
/// the last one wins; callers pivot tables that are already unique on the
/// two keys.
pub fn pivot(table: &SummaryTable, row_col: &str, col_col: &str, value_col: &str) -> Result<PivotTable> {
    let ri = table.column_index(row_col)?;
    let ci = table.column_index(col_col)?;
    let vi = table.column_index(value_col)?;

    let mut rows: BTreeSet<Label> = BTreeSet::new();
    let mut cols: BTreeSet<Label> = BTreeSet::new();
    let mut values: BTreeMap<(Label, Label), Option<f64>> = BTreeMap::new();

    for row in table.rows() {
        let (Some(r), Some(c)) = (Label::of(&row[ri]), Label::of(&row[ci])) else {
            continue;
        };
        rows.insert(r.clone());
        cols.insert(c.clone());
        values.insert((r, c), row[vi].as_f64());
    }

    let cells = rows
        .iter()
        .map(|r| {
            cols.iter()
                .map(|c| values.get(&(r.clone(), c.clone())).copied().flatten())
                .collect()
        })
        .collect();

    Ok(PivotTable {
        row_labels: rows.iter().map(Label::render).collect(),
        column_labels: cols.iter().map(Label::render).collect(),
        cells,
        value_column: value_col.to_string(),
    })
}

/// Mean of `metric` grouped by (`row_key`, `col_key`), pivoted.
pub fn pivot_mean(dataset: &Dataset, row_key: GroupKey, col_key: GroupKey, metric: Metric) -> PivotTable {
    let table = aggregate(
        dataset,
        &[row_key, col_key],
        &[Aggregation::keep_name(metric, Reduction::Mean)],
    );
    match pivot(&table, row_key.column(), col_key.column(), metric.column()) {
        Ok(p) => p,
        // Columns come from the aggregation above and always exist.
        Err(_) => PivotTable {
            row_labels: Vec::new(),
            column_labels: Vec::new(),
            cells: Vec::new(),
            value_column: metric.column().to_string(),
        },
    }
}
