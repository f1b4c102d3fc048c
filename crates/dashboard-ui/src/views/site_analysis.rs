use dashboard_runtime::core::formatting::{format_minutes, format_number, format_optional};
use dashboard_runtime::data::insights::{SiteAnalysis, SiteHour};
use dashboard_runtime::snapshot::{Chart, Series, SiteAnalysisView};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::themes::Theme;
use crate::views::{line_chart, titled_block};

/// Facts about the analysed site above its hourly TPH and delay charts.
pub fn render(frame: &mut Frame, area: Rect, view: &SiteAnalysisView, theme: &Theme) {
    let Some(analysis) = &view.analysis else {
        let text = Text::from(vec![
            Line::from(Span::styled("No site to analyse", theme.warning)),
            Line::from(Span::styled(
                "Select at least one site with data in the current filter.",
                theme.dim,
            )),
        ]);
        frame.render_widget(
            Paragraph::new(text).block(titled_block("Site Analysis", theme)),
            area,
        );
        return;
    };

    let chunks = Layout::vertical([Constraint::Length(7), Constraint::Min(0)]).split(area);
    frame.render_widget(
        Paragraph::new(Text::from(summary_lines(analysis, &view.sites, theme)))
            .wrap(Wrap { trim: true })
            .block(titled_block(&format!("Site Analysis: {}", analysis.site), theme)),
        chunks[0],
    );

    let charts = hourly_charts(analysis);
    let halves = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    frame.render_widget(line_chart(&charts[0], theme), halves[0]);
    frame.render_widget(line_chart(&charts[1], theme), halves[1]);
}

fn summary_lines<'a>(analysis: &SiteAnalysis, sites: &[String], theme: &Theme) -> Vec<Line<'a>> {
    let mut selector = vec![Span::styled("Sites (n to cycle): ", theme.label)];
    for site in sites {
        let style = if *site == analysis.site {
            theme.tab_active
        } else {
            theme.dim
        };
        selector.push(Span::styled(format!(" {} ", site), style));
    }

    vec![
        Line::from(vec![
            Span::styled("Provider: ", theme.label),
            Span::styled(analysis.provider.clone(), theme.value),
        ]),
        Line::from(vec![
            Span::styled("Avg TPH: ", theme.label),
            Span::styled(format_number(analysis.avg_tph, 1), theme.value),
            Span::styled("  Min: ", theme.label),
            Span::styled(format_number(analysis.min_tph, 1), theme.value),
            Span::styled("  Max: ", theme.label),
            Span::styled(format_number(analysis.max_tph, 1), theme.value),
        ]),
        Line::from(vec![
            Span::styled("Avg Delay: ", theme.label),
            Span::styled(format_minutes(analysis.avg_delay), theme.value),
            Span::styled("  Std: ", theme.label),
            Span::styled(format_optional(analysis.std_delay, 2), theme.value),
        ]),
        Line::from(""),
        Line::from(selector),
    ]
}

/// TPH and delay per hour as single-series charts.
fn hourly_charts(analysis: &SiteAnalysis) -> [Chart; 2] {
    let series = |f: fn(&SiteHour) -> f64| Series {
        name: analysis.site.clone(),
        points: analysis
            .hourly
            .iter()
            .map(|h| (f64::from(h.hour), f(h)))
            .collect(),
    };
    [
        Chart {
            title: format!("{} - TPH by Hour", analysis.site),
            y_label: "TPH Median".to_string(),
            series: vec![series(|h| h.tph)],
        },
        Chart {
            title: format!("{} - Response Delay by Hour", analysis.site),
            y_label: "Avg Response Delay (min)".to_string(),
            series: vec![series(|h| h.delay)],
        },
    ]
}
