use dashboard_runtime::core::formatting::format_number;
use dashboard_runtime::core::models::Metric;
use dashboard_runtime::data::insights::ProviderDistribution;
use dashboard_runtime::snapshot::{ComparisonView, ScatterPoint};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    symbols,
    text::{Span, Text},
    widgets::{Axis, Chart as ChartWidget, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::components::bar::bar_lines;
use crate::themes::Theme;
use crate::views::{padded_bounds, striped_table, summary_table, titled_block};

const PROVIDER_HEADERS: [&str; 4] = ["Provider", "Avg TPH", "Total Count", "Avg Delay"];

/// Provider summary and TPH bars on top; distributions and the TPH/delay
/// scatter below.
pub fn render(frame: &mut Frame, area: Rect, view: &ComparisonView, theme: &Theme) {
    let rows =
        Layout::vertical([Constraint::Percentage(45), Constraint::Percentage(55)]).split(area);
    let top =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).split(rows[0]);
    let bottom = Layout::horizontal([
        Constraint::Percentage(30),
        Constraint::Percentage(30),
        Constraint::Percentage(40),
    ])
    .split(rows[1]);

    let table = summary_table(
        &view.providers,
        Some(&PROVIDER_HEADERS[..]),
        None,
        usize::from(top[0].height),
        theme,
    )
    .block(titled_block("Provider Performance Summary", theme));
    frame.render_widget(table, top[0]);

    let bar_width = top[1].width.saturating_sub(30).clamp(5, 40);
    let bars = bar_lines(&provider_tph(view), bar_width, 1, theme);
    frame.render_widget(
        Paragraph::new(Text::from(bars)).block(titled_block("Average TPH by Provider", theme)),
        top[1],
    );

    render_distribution(
        frame,
        bottom[0],
        "TPH Distribution by Provider",
        &view.tph_distribution,
        theme,
    );
    render_distribution(
        frame,
        bottom[1],
        "Delay Distribution by Provider",
        &view.delay_distribution,
        theme,
    );
    render_scatter(frame, bottom[2], &view.scatter, theme);
}

/// `(provider, mean TPH)` pairs from the provider summary.
fn provider_tph(view: &ComparisonView) -> Vec<(String, f64)> {
    let tph = Metric::TphMedian.column();
    (0..view.providers.len())
        .filter_map(|i| {
            let provider = view.providers.get(i, "providercode")?.to_field();
            let value = view.providers.get(i, tph)?.as_f64()?;
            Some((provider, value))
        })
        .collect()
}

fn render_distribution(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    distribution: &[ProviderDistribution],
    theme: &Theme,
) {
    let headers = ["Provider", "n", "Min", "Q1", "Median", "Q3", "Max"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = distribution
        .iter()
        .map(|d| {
            let s = &d.summary;
            vec![
                d.provider.clone(),
                d.count.to_string(),
                format_number(s.min, 1),
                format_number(s.q1, 1),
                format_number(s.median, 1),
                format_number(s.q3, 1),
                format_number(s.max, 1),
            ]
        })
        .collect();
    frame.render_widget(
        striped_table(headers, rows, theme).block(titled_block(title, theme)),
        area,
    );
}

/// Points grouped per provider, in provider order.
fn scatter_groups(points: &[ScatterPoint]) -> Vec<(String, Vec<(f64, f64)>)> {
    let mut groups: Vec<(String, Vec<(f64, f64)>)> = Vec::new();
    for p in points {
        match groups.iter_mut().find(|(name, _)| *name == p.provider) {
            Some((_, pts)) => pts.push((p.tph, p.delay)),
            None => groups.push((p.provider.clone(), vec![(p.tph, p.delay)])),
        }
    }
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    groups
}

fn render_scatter(frame: &mut Frame, area: Rect, points: &[ScatterPoint], theme: &Theme) {
    let groups = scatter_groups(points);
    let x = padded_bounds(bounds(points.iter().map(|p| p.tph)));
    let y = padded_bounds(bounds(points.iter().map(|p| p.delay)));

    let datasets: Vec<Dataset> = groups
        .iter()
        .enumerate()
        .map(|(i, (name, pts))| {
            Dataset::default()
                .name(name.clone())
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(theme.series_color(i)))
                .data(pts)
        })
        .collect();

    let chart = ChartWidget::new(datasets)
        .block(titled_block("TPH vs Response Delay", theme))
        .x_axis(
            Axis::default()
                .title(Span::styled("TPH Median", theme.dim))
                .style(theme.dim)
                .bounds([x.0, x.1])
                .labels(vec![format_number(x.0, 0), format_number(x.1, 0)]),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled("Delay (min)", theme.dim))
                .style(theme.dim)
                .bounds([y.0, y.1])
                .labels(vec![format_number(y.0, 1), format_number(y.1, 1)]),
        );
    frame.render_widget(chart, area);
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
