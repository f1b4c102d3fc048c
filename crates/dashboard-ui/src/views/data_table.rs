//! Raw data tab: descriptive statistics above the sorted filtered records.
//!
//! Also hosts [`render_no_data`], the placeholder drawn in place of every tab
//! body when the current filter selects nothing.

use dashboard_runtime::core::formatting::{format_number, format_optional, MISSING};
use dashboard_runtime::core::models::{Dataset, Record};
use dashboard_runtime::data::insights::ColumnStats;
use dashboard_runtime::core::stats::Describe;
use dashboard_runtime::snapshot::{Controls, DataTableView};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span, Text},
    widgets::Paragraph,
    Frame,
};

use crate::themes::Theme;
use crate::views::{sort_marker, striped_table, titled_block};

/// Render the describe table and as many records as fit below it.
pub fn render_data_table(
    frame: &mut Frame,
    area: Rect,
    view: &DataTableView,
    controls: &Controls,
    theme: &Theme,
) {
    let describe_height = Describe::LABELS.len() as u16 + 3;
    let chunks =
        Layout::vertical([Constraint::Length(describe_height), Constraint::Min(0)]).split(area);

    let (headers, rows) = describe_rows(&view.describe);
    frame.render_widget(
        striped_table(headers, rows, theme).block(titled_block("Statistical Summary", theme)),
        chunks[0],
    );

    let visible = usize::from(chunks[1].height.saturating_sub(3));
    let headers = Dataset::COLUMNS
        .iter()
        .map(|c| {
            if *c == controls.data_sort {
                format!("{}{}", c, sort_marker(controls.data_ascending))
            } else {
                c.to_string()
            }
        })
        .collect();
    let rows = view.rows.iter().take(visible).map(record_cells).collect();
    let title = format!(
        "Filtered Data ({} rows, d: sort column, D: direction)",
        view.rows.len()
    );
    frame.render_widget(
        striped_table(headers, rows, theme).block(titled_block(&title, theme)),
        chunks[1],
    );
}

/// One row per statistic, one column per described column.
fn describe_rows(describe: &[ColumnStats]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut headers = vec![String::new()];
    headers.extend(describe.iter().map(|c| c.column.clone()));

    let values: Vec<[Option<f64>; 8]> = describe.iter().map(|c| c.stats.values()).collect();
    let rows = Describe::LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let mut row = vec![label.to_string()];
            // count is integral
            let decimals = if i == 0 { 0 } else { 2 };
            row.extend(values.iter().map(|v| format_optional(v[i], decimals)));
            row
        })
        .collect();
    (headers, rows)
}

fn record_cells(record: &Record) -> Vec<String> {
    vec![
        record.provider_code.clone(),
        record.site_code.clone(),
        record.hour.to_string(),
        format_number(record.tph_median, 2),
        format_number(record.ct_sum, 0),
        format_number(record.avg_first_resp_delay_minute, 2),
        record
            .last_updated
            .clone()
            .unwrap_or_else(|| MISSING.to_string()),
    ]
}

/// Render the placeholder shown when the filter selects no rows.
pub fn render_no_data(frame: &mut Frame, area: Rect, notice: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(notice.to_string(), theme.warning)),
        Line::from(""),
        Line::from(Span::styled(
            "Adjust the mode, selection or hour range to see charts.",
            theme.dim,
        )),
        Line::from(Span::styled("Press 'c' to reset the selection", theme.dim)),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(text)).block(titled_block("No Data", theme)),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────
