//! One module per dashboard tab, plus the table and chart helpers they share.

pub mod combinations;
pub mod comparisons;
pub mod data_table;
pub mod heatmaps;
pub mod site_analysis;
pub mod time_series;

use dashboard_runtime::core::formatting::{format_number, MISSING};
use dashboard_runtime::data::summary::{SummaryTable, Value};
use dashboard_runtime::snapshot::{hour_labels, Chart};
use ratatui::{
    layout::Constraint,
    style::Style,
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Cell, Chart as ChartWidget, Dataset, GraphType, Row, Table},
};
use unicode_width::UnicodeWidthStr;

use crate::themes::Theme;

/// Display text of a summary cell: floats with two decimals, nulls as `n/a`.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format_number(*f, 2),
        Value::Null => MISSING.to_string(),
    }
}

pub(crate) fn titled_block<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme.table_border)
        .title(Span::styled(format!(" {} ", title), theme.header))
}

/// Marker appended to the header of the sort column.
pub(crate) fn sort_marker(ascending: bool) -> &'static str {
    if ascending {
        " ▲"
    } else {
        " ▼"
    }
}

/// A header row plus striped body rows with widths fitted to the content.
pub(crate) fn striped_table<'a>(
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    theme: &Theme,
) -> Table<'a> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.width());
        }
    }

    let header = Row::new(
        headers
            .into_iter()
            .map(|h| Cell::from(h).style(theme.table_header)),
    )
    .height(1);

    let body: Vec<Row> = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if i % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            Row::new(row).style(style)
        })
        .collect();

    let widths: Vec<Constraint> = widths
        .into_iter()
        .map(|w| Constraint::Length(w.min(40) as u16))
        .collect();

    Table::new(body, widths).header(header).style(theme.text)
}

/// Render up to `max_rows` rows of `table`, optionally marking the sort
/// column.
pub(crate) fn summary_table<'a>(
    table: &SummaryTable,
    headers: Option<&[&str]>,
    sorted: Option<(&str, bool)>,
    max_rows: usize,
    theme: &Theme,
) -> Table<'a> {
    let headers: Vec<String> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let shown = headers
                .and_then(|h| h.get(i).copied())
                .unwrap_or(name.as_str());
            match sorted {
                Some((col, asc)) if col == name.as_str() => {
                    format!("{}{}", shown, sort_marker(asc))
                }
                _ => shown.to_string(),
            }
        })
        .collect();
    let rows = table
        .rows()
        .iter()
        .take(max_rows)
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    striped_table(headers, rows, theme)
}

/// `(min, max)` widened by 5 % so lines do not touch the frame.
pub(crate) fn padded_bounds(bounds: Option<(f64, f64)>) -> (f64, f64) {
    match bounds {
        None => (0.0, 1.0),
        Some((lo, hi)) if hi <= lo => (lo - 1.0, hi + 1.0),
        Some((lo, hi)) => {
            let pad = (hi - lo) * 0.05;
            let floor = if lo >= 0.0 { (lo - pad).max(0.0) } else { lo - pad };
            (floor, hi + pad)
        }
    }
}

fn hour_axis<'a>(theme: &Theme) -> Axis<'a> {
    Axis::default()
        .title(Span::styled("Hour of Day", theme.dim))
        .style(theme.dim)
        .bounds([0.0, 23.0])
        .labels(hour_labels([0, 6, 12, 18, 23]))
}

fn value_axis<'a>(title: &str, bounds: (f64, f64), theme: &Theme) -> Axis<'a> {
    let (lo, hi) = bounds;
    Axis::default()
        .title(Span::styled(title.to_string(), theme.dim))
        .style(theme.dim)
        .bounds([lo, hi])
        .labels(vec![
            format_number(lo, 1),
            format_number((lo + hi) / 2.0, 1),
            format_number(hi, 1),
        ])
}

/// One coloured line per series over the hour axis.
pub(crate) fn line_chart<'a>(chart: &'a Chart, theme: &Theme) -> ChartWidget<'a> {
    let datasets: Vec<Dataset<'a>> = chart
        .series
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Dataset::default()
                .name(s.name.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.series_color(i)))
                .data(&s.points)
        })
        .collect();

    ChartWidget::new(datasets)
        .block(titled_block(&chart.title, theme))
        .x_axis(hour_axis(theme))
        .y_axis(value_axis(&chart.y_label, padded_bounds(chart.y_bounds()), theme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Value::Float(1234.5)), "1,234.50");
        assert_eq!(cell_text(&Value::Int(7)), "7");
        assert_eq!(cell_text(&Value::Text("P1".into())), "P1");
        assert_eq!(cell_text(&Value::Null), "n/a");
    }

    #[test]
    fn test_padded_bounds() {
        assert_eq!(padded_bounds(None), (0.0, 1.0));
        assert_eq!(padded_bounds(Some((5.0, 5.0))), (4.0, 6.0));
        assert_eq!(padded_bounds(Some((0.0, 100.0))), (0.0, 105.0));
        assert_eq!(padded_bounds(Some((-10.0, 10.0))), (-11.0, 11.0));
    }

    #[test]
    fn test_summary_table_marks_sort_column() {
        let mut table = SummaryTable::new(vec!["providercode".into(), "TPH_Avg".into()], 1);
        table.push_row(vec![Value::Text("P1".into()), Value::Float(150.0)]);
        // builds without panicking for a column subset of headers
        let headers: &[&str] = &["Provider"];
        let _ = summary_table(
            &table,
            Some(headers),
            Some(("TPH_Avg", false)),
            10,
            &Theme::dark(),
        );
        assert_eq!(sort_marker(true), " ▲");
        assert_eq!(sort_marker(false), " ▼");
    }
}
