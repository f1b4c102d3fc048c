use dashboard_runtime::core::formatting::{format_number, format_optional};
use dashboard_runtime::data::aggregator::COMBINATION_LABEL;
use dashboard_runtime::data::insights::Labelled;
use dashboard_runtime::data::summary::SummaryTable;
use dashboard_runtime::snapshot::{CombinationView, Controls};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span, Text},
    widgets::Paragraph,
    Frame,
};

use crate::components::bar::bar_lines;
use crate::components::heatmap::Heatmap;
use crate::themes::Theme;
use crate::views::{sort_marker, summary_table, titled_block};

/// Headline figures, the sorted combination table, top/bottom rankings with
/// the TPH histogram, then the provider × site matrix.
pub fn render(frame: &mut Frame, area: Rect, view: &CombinationView, controls: &Controls, theme: &Theme) {
    let ranking_height = (controls.top_n.min(view.table.len()) as u16).clamp(1, 12) + 2;
    let matrix_height = (view.matrix.row_labels.len() as u16).min(10) + 4;
    let chunks = Layout::vertical([
        Constraint::Length(5),
        Constraint::Min(6),
        Constraint::Length(ranking_height),
        Constraint::Max(matrix_height),
    ])
    .split(area);

    frame.render_widget(
        Paragraph::new(Text::from(summary_lines(view, controls, theme)))
            .block(titled_block("Provider-Site Combinations", theme)),
        chunks[0],
    );

    let sort_column = controls.sort_by.column();
    let table = summary_table(
        &view.table,
        None,
        Some((sort_column, controls.ascending)),
        usize::from(chunks[1].height.saturating_sub(3)),
        theme,
    )
    .block(titled_block(
        &format!("All Combinations (sorted by {})", sort_column),
        theme,
    ));
    frame.render_widget(table, chunks[1]);

    let columns = Layout::horizontal([
        Constraint::Percentage(35),
        Constraint::Percentage(35),
        Constraint::Percentage(30),
    ])
    .split(chunks[2]);
    render_ranking(
        frame,
        columns[0],
        &format!("Top {} by Avg TPH", controls.top_n),
        &view.top,
        theme,
    );
    render_ranking(
        frame,
        columns[1],
        &format!("Bottom {} by Avg TPH", controls.top_n),
        &view.bottom,
        theme,
    );
    render_histogram(frame, columns[2], view, theme);

    let matrix = if view.matrix.is_empty() {
        Text::from(Span::styled("No data", theme.dim))
    } else {
        Text::from(Heatmap::new(&view.matrix, theme).to_lines())
    };
    frame.render_widget(
        Paragraph::new(matrix).block(titled_block("Avg TPH Matrix (Provider × Site)", theme)),
        chunks[3],
    );
}

fn summary_lines<'a>(view: &CombinationView, controls: &Controls, theme: &Theme) -> Vec<Line<'a>> {
    let s = &view.summary;
    let labelled = |l: &Option<Labelled>| match l {
        Some(l) => format!("{} ({})", l.label, format_number(l.value, 2)),
        None => "n/a".to_string(),
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Total Combinations: ", theme.label),
            Span::styled(s.total.to_string(), theme.value),
            Span::styled("  Providers: ", theme.label),
            Span::styled(s.providers.to_string(), theme.value),
            Span::styled("  Mean Avg TPH: ", theme.label),
            Span::styled(
                format!(
                    "{} ± {}",
                    format_optional(s.mean_tph_avg, 2),
                    format_optional(s.std_tph_avg, 2)
                ),
                theme.value,
            ),
        ]),
        Line::from(vec![
            Span::styled("Best: ", theme.label),
            Span::styled(labelled(&s.best), theme.success),
            Span::styled("  Worst: ", theme.label),
            Span::styled(labelled(&s.worst), theme.error),
        ]),
        Line::from(vec![
            Span::styled("Sorted by ", theme.dim),
            Span::styled(controls.sort_by.column(), theme.info),
            Span::styled(sort_marker(controls.ascending), theme.info),
            Span::styled("  (o: column, a: direction)", theme.dim),
        ]),
    ];

    if let Some(first) = view.warnings.first() {
        lines.push(Line::from(Span::styled(
            format!(
                "{} undefined aggregation(s) left empty, e.g. {}",
                view.warnings.len(),
                first
            ),
            theme.warning,
        )));
    }
    lines
}

fn render_ranking(frame: &mut Frame, area: Rect, title: &str, table: &SummaryTable, theme: &Theme) {
    let items: Vec<(String, f64)> = (0..table.len())
        .filter_map(|i| {
            Some((
                table.get(i, COMBINATION_LABEL)?.to_field(),
                table.get(i, "TPH_Avg")?.as_f64()?,
            ))
        })
        .collect();
    let width = area.width.saturating_sub(28).clamp(5, 30);
    frame.render_widget(
        Paragraph::new(Text::from(bar_lines(&items, width, 1, theme))).block(titled_block(title, theme)),
        area,
    );
}

fn render_histogram(frame: &mut Frame, area: Rect, view: &CombinationView, theme: &Theme) {
    let items: Vec<(String, f64)> = view
        .summary
        .histogram
        .iter()
        .map(|b| {
            (
                format!("{}-{}", format_number(b.lower, 0), format_number(b.upper, 0)),
                b.count as f64,
            )
        })
        .collect();
    let width = area.width.saturating_sub(26).clamp(5, 30);
    frame.render_widget(
        Paragraph::new(Text::from(bar_lines(&items, width, 0, theme)))
            .block(titled_block("Avg TPH Distribution", theme)),
        area,
    );
}
