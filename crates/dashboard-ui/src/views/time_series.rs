use dashboard_runtime::snapshot::{Chart, TimeSeriesView};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::themes::Theme;
use crate::views::{line_chart, titled_block};

/// Primary metric chart above the secondary chart, each taking half the area.
pub fn render(frame: &mut Frame, area: Rect, view: &TimeSeriesView, theme: &Theme) {
    let chunks =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).split(area);
    render_chart(frame, chunks[0], &view.primary, theme);
    render_chart(frame, chunks[1], &view.secondary, theme);
}

fn render_chart(frame: &mut Frame, area: Rect, chart: &Chart, theme: &Theme) {
    if chart.series.is_empty() {
        let body = Paragraph::new(Line::from(Span::styled("No series to plot", theme.dim)))
            .block(titled_block(&chart.title, theme));
        frame.render_widget(body, area);
        return;
    }
    frame.render_widget(line_chart(chart, theme), area);
}
