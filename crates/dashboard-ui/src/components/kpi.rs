use dashboard_runtime::core::formatting::{format_number, format_optional};
use dashboard_runtime::data::insights::KeyMetrics;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::themes::Theme;

/// One headline figure with an optional secondary detail.
#[derive(Debug, Clone, PartialEq)]
pub struct Kpi {
    pub label: &'static str,
    pub value: String,
    pub detail: Option<String>,
}

/// The six headline figures in display order.
pub fn kpi_items(metrics: &KeyMetrics) -> Vec<Kpi> {
    vec![
        Kpi {
            label: "Total Sites",
            value: metrics.total_sites.to_string(),
            detail: None,
        },
        Kpi {
            label: "Providers Selected",
            value: metrics.selected_providers.to_string(),
            detail: None,
        },
        Kpi {
            label: "Avg TPH",
            value: format_optional(metrics.avg_tph, 1),
            detail: Some(format!("max {}", format_optional(metrics.max_tph, 1))),
        },
        Kpi {
            label: "Avg Response Delay",
            value: format!("{} min", format_optional(metrics.avg_delay, 1)),
            detail: Some(format!("min {}", format_optional(metrics.min_delay, 1))),
        },
        Kpi {
            label: "Total Count",
            value: format_number(metrics.total_count, 0),
            detail: Some(format!("avg {}", format_optional(metrics.avg_count, 1))),
        },
        Kpi {
            label: "Data Points",
            value: format_number(metrics.data_points as f64, 0),
            detail: Some(format!("{} hours", metrics.distinct_hours)),
        },
    ]
}

impl Kpi {
    fn to_text<'a>(&self, theme: &Theme) -> Text<'a> {
        let mut value = vec![Span::styled(self.value.clone(), theme.value)];
        if let Some(detail) = &self.detail {
            value.push(Span::styled(format!("  {}", detail), theme.dim));
        }
        Text::from(vec![
            Line::from(Span::styled(self.label, theme.label)),
            Line::from(value),
        ])
    }
}

/// Render the KPI row as equally sized bordered boxes.
pub fn render_kpis(frame: &mut Frame, area: Rect, metrics: &KeyMetrics, theme: &Theme) {
    let items = kpi_items(metrics);
    let chunks = Layout::horizontal(vec![Constraint::Ratio(1, items.len() as u32); items.len()])
        .split(area);
    for (kpi, chunk) in items.iter().zip(chunks.iter()) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.table_border);
        frame.render_widget(Paragraph::new(kpi.to_text(theme)).block(block), *chunk);
    }
}
