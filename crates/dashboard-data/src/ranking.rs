//! Top-N / bottom-N selection over summary tables.

use dashboard_core::error::Result;

use crate::summary::SummaryTable;

/// The `n` rows with the largest `column` values.
///
/// Rows whose value is null are excluded. Equal values keep ascending key
/// order, so the result is deterministic.
pub fn top_n(table: &SummaryTable, column: &str, n: usize) -> Result<SummaryTable> {
    ranked(table, column, n, false)
}

/// The `n` rows with the smallest `column` values; same rules as [`top_n`].
pub fn bottom_n(table: &SummaryTable, column: &str, n: usize) -> Result<SummaryTable> {
    ranked(table, column, n, true)
}

fn ranked(table: &SummaryTable, column: &str, n: usize, ascending: bool) -> Result<SummaryTable> {
    let idx = table.column_index(column)?;
    let present = table.filter_rows(|row| !row[idx].is_null());
    let sorted = present.sorted_by(column, ascending)?;
    let mut out = SummaryTable::new(sorted.columns().to_vec(), sorted.key_columns());
    for row in sorted.rows().iter().take(n) {
        out.push_row(row.clone());
    }
    Ok(out)
}

/// First key column of the top `n` rows by `column`, e.g. the best site codes.
pub fn top_codes(table: &SummaryTable, column: &str, n: usize) -> Result<Vec<String>> {
    Ok(top_n(table, column, n)?
        .rows()
        .iter()
        .map(|row| row[0].to_field())
        .collect())
}
