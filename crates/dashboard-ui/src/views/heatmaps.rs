use dashboard_runtime::data::pivot::PivotTable;
use dashboard_runtime::snapshot::{HeatmapView, HEATMAP_TOP_SITES};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span, Text},
    widgets::Paragraph,
    Frame,
};

use crate::components::heatmap::Heatmap;
use crate::themes::Theme;
use crate::views::titled_block;

/// Provider × hour TPH above site × hour delay.
pub fn render(frame: &mut Frame, area: Rect, view: &HeatmapView, theme: &Theme) {
    let top = (view.provider_hour_tph.row_labels.len() as u16).saturating_add(4);
    let chunks = Layout::vertical([Constraint::Max(top), Constraint::Min(0)]).split(area);
    render_pivot(
        frame,
        chunks[0],
        "Average TPH by Provider and Hour",
        &view.provider_hour_tph,
        theme,
    );
    render_pivot(
        frame,
        chunks[1],
        &format!(
            "Response Delay (min) by Site and Hour, Top {} Sites by TPH",
            HEATMAP_TOP_SITES
        ),
        &view.site_hour_delay,
        theme,
    );
}

fn render_pivot(frame: &mut Frame, area: Rect, title: &str, pivot: &PivotTable, theme: &Theme) {
    let text = if pivot.is_empty() {
        Text::from(Line::from(Span::styled("No data", theme.dim)))
    } else {
        Text::from(Heatmap::new(pivot, theme).to_lines())
    };
    frame.render_widget(Paragraph::new(text).block(titled_block(title, theme)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{buffer_text, sample_snapshot};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn test_render_heatmaps() {
        let snap = sample_snapshot();
        let view = &snap.views.as_ref().unwrap().heatmaps;
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let theme = Theme::dark();
        terminal
            .draw(|frame| render(frame, frame.area(), view, &theme))
            .unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Average TPH by Provider and Hour"));
        assert!(text.contains("Top 10 Sites by TPH"));
        assert!(text.contains("no data"));
    }

    #[test]
    fn test_render_empty_pivot() {
        let empty = PivotTable {
            row_labels: vec![],
            column_labels: vec![],
            cells: vec![],
            value_column: "tph_median".to_string(),
        };
        let view = HeatmapView {
            provider_hour_tph: empty.clone(),
            site_hour_delay: empty,
        };
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        let theme = Theme::dark();
        terminal
            .draw(|frame| render(frame, frame.area(), &view, &theme))
            .unwrap();
        assert!(buffer_text(&terminal).contains("No data"));
    }
}
