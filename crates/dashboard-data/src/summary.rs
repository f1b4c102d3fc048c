//! Row-oriented result tables handed to the presentation layer.

use std::cmp::Ordering;
use std::fmt;

use dashboard_core::error::{DashboardError, Result};
use serde::Serialize;

// ── Value ─────────────────────────────────────────────────────────────────────

/// One cell of a [`SummaryTable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    /// Undefined reduction or absent value.
    Null,
}

impl Value {
    /// Wrap an optional float, mapping `None` and non-finite values to `Null`.
    pub fn from_option(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Value::Float(v),
            _ => Value::Null,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text used for a CSV field; `Null` becomes the empty string.
    pub fn to_field(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Null => String::new(),
        }
    }

    /// Inverse of [`Value::to_field`]: integers, then floats, then text.
    pub fn parse_field(field: &str) -> Self {
        if field.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = field.parse::<i64>() {
            return Value::Int(i);
        }
        match field.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Float(f),
            _ => Value::Text(field.to_string()),
        }
    }

    /// Equality that ignores the integer/float distinction.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0),
            _ => self == other,
        }
    }

    /// Total order used for group keys and sorting: numbers ascending, then
    /// text lexicographically, then nulls.
    pub fn compare(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Int(_) | Value::Float(_) => 0,
                Value::Text(_) => 1,
                Value::Null => 2,
            }
        }
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => rank(self).cmp(&rank(other)),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_field())
    }
}

// ── SummaryTable ──────────────────────────────────────────────────────────────

/// A named-column table whose first `key_columns` columns identify the row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    columns: Vec<String>,
    key_columns: usize,
    rows: Vec<Vec<Value>>,
}

impl SummaryTable {
    pub fn new(columns: Vec<String>, key_columns: usize) -> Self {
        Self {
            columns,
            key_columns,
            rows: Vec::new(),
        }
    }

    /// Append a row; its width must match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn key_columns(&self) -> usize {
        self.key_columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DashboardError::UnknownColumn(name.to_string()))
    }

    /// Cell at (`row`, `column`), `None` when either is out of range.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Non-null numeric values of one column, in row order.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self
            .column(name)?
            .into_iter()
            .filter_map(Value::as_f64)
            .collect())
    }

    /// Compare two rows by their key columns.
    pub fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        a[..self.key_columns]
            .iter()
            .zip(&b[..self.key_columns])
            .map(|(x, y)| x.compare(y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    /// A copy ordered by `column`. Nulls sort last in both directions and
    /// ties fall back to ascending key order.
    pub fn sorted_by(&self, column: &str, ascending: bool) -> Result<SummaryTable> {
        let idx = self.column_index(column)?;
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            let primary = match (a[idx].is_null(), b[idx].is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => {
                    let o = a[idx].compare(&b[idx]);
                    if ascending {
                        o
                    } else {
                        o.reverse()
                    }
                }
            };
            primary.then_with(|| self.compare_keys(a, b))
        });
        Ok(SummaryTable {
            columns: self.columns.clone(),
            key_columns: self.key_columns,
            rows,
        })
    }

    /// Project onto `names`, in the given order.
    ///
    /// Key columns retained by the projection stay keys.
    pub fn select(&self, names: &[&str]) -> Result<SummaryTable> {
        let indices: Vec<usize> = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Result<_>>()?;
        let key_columns = indices
            .iter()
            .take_while(|&&i| i < self.key_columns)
            .count();
        Ok(SummaryTable {
            columns: names.iter().map(|n| n.to_string()).collect(),
            key_columns,
            rows: self
                .rows
                .iter()
                .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        })
    }

    /// Keep only rows for which `keep` returns `true`.
    pub fn filter_rows(&self, keep: impl Fn(&[Value]) -> bool) -> SummaryTable {
        SummaryTable {
            columns: self.columns.clone(),
            key_columns: self.key_columns,
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Cell-wise equality that ignores integer/float representation.
    pub fn same_contents(&self, other: &SummaryTable) -> bool {
        self.columns == other.columns
            && self.rows.len() == other.rows.len()
            && self
                .rows
                .iter()
                .zip(&other.rows)
                .all(|(a, b)| a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_value(y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SummaryTable {
        let mut t = SummaryTable::new(vec!["providercode".into(), "tph".into()], 1);
        t.push_row(vec![Value::Text("P2".into()), Value::Float(5.0)]);
        t.push_row(vec![Value::Text("P1".into()), Value::Float(5.0)]);
        t.push_row(vec![Value::Text("P3".into()), Value::Null]);
        t.push_row(vec![Value::Text("P4".into()), Value::Float(9.0)]);
        t
    }

    fn keys(t: &SummaryTable) -> Vec<String> {
        t.rows().iter().map(|r| r[0].to_field()).collect()
    }

    #[test]
    fn test_parse_field_kinds() {
        assert_eq!(Value::parse_field(""), Value::Null);
        assert_eq!(Value::parse_field("12"), Value::Int(12));
        assert_eq!(Value::parse_field("1.5"), Value::Float(1.5));
        assert_eq!(Value::parse_field("P1"), Value::Text("P1".into()));
        assert_eq!(Value::parse_field("NaN"), Value::Text("NaN".into()));
    }

    #[test]
    fn test_same_value_ignores_representation() {
        assert!(Value::Int(150).same_value(&Value::Float(150.0)));
        assert!(!Value::Int(150).same_value(&Value::Null));
        assert!(Value::Null.same_value(&Value::Null));
    }

    #[test]
    fn test_from_option_maps_nan_to_null() {
        assert_eq!(Value::from_option(Some(f64::NAN)), Value::Null);
        assert_eq!(Value::from_option(None), Value::Null);
        assert_eq!(Value::from_option(Some(2.0)), Value::Float(2.0));
    }

    #[test]
    fn test_sorted_by_descending_ties_by_key_nulls_last() {
        let sorted = table().sorted_by("tph", false).unwrap();
        assert_eq!(keys(&sorted), vec!["P4", "P1", "P2", "P3"]);
    }

    #[test]
    fn test_sorted_by_ascending_nulls_still_last() {
        let sorted = table().sorted_by("tph", true).unwrap();
        assert_eq!(keys(&sorted), vec!["P1", "P2", "P4", "P3"]);
    }

    #[test]
    fn test_sorted_by_unknown_column() {
        assert!(matches!(
            table().sorted_by("nope", true),
            Err(DashboardError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_select_reorders_and_tracks_keys() {
        let t = table().select(&["tph", "providercode"]).unwrap();
        assert_eq!(t.columns(), &["tph".to_string(), "providercode".to_string()]);
        assert_eq!(t.key_columns(), 0);
        let t = table().select(&["providercode"]).unwrap();
        assert_eq!(t.key_columns(), 1);
    }

    #[test]
    fn test_numeric_column_skips_nulls() {
        assert_eq!(table().numeric_column("tph").unwrap(), vec![5.0, 5.0, 9.0]);
    }
}
