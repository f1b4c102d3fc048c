use dashboard_runtime::snapshot::DashboardSnapshot;
use ratatui::text::{Line, Span};

use crate::themes::Theme;

/// Decorative marks placed either side of the application title.
pub const ACCENT: &str = "▪ ▫ ▪";

/// Dashboard header rendering four lines:
///
/// 1. Application title with accents (ALL CAPS).
/// 2. A 60-column `=` separator.
/// 3. Data source facts: `[ coverage | last update | N records ]`.
/// 4. The active filter: mode, hour window and selection sizes.
pub struct Header<'a> {
    pub snapshot: &'a DashboardSnapshot,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(snapshot: &'a DashboardSnapshot, theme: &'a Theme) -> Self {
        Self { snapshot, theme }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let theme = self.theme;
        let source = &self.snapshot.source;
        let filter = &self.snapshot.filter;

        let coverage = source
            .coverage
            .clone()
            .unwrap_or_else(|| "unknown coverage".to_string());
        let updated = source
            .last_updated
            .clone()
            .unwrap_or_else(|| "n/a".to_string());

        vec![
            Line::from(vec![
                Span::styled(ACCENT, theme.header_accent),
                Span::styled(" SITE CAPACITY DASHBOARD ", theme.header),
                Span::styled(ACCENT, theme.header_accent),
            ]),
            Line::from(Span::styled("=".repeat(60), theme.separator)),
            Line::from(vec![
                Span::styled("[ ", theme.label),
                Span::styled(coverage, theme.value),
                Span::styled(" | last update ", theme.label),
                Span::styled(updated, theme.value),
                Span::styled(" | ", theme.label),
                Span::styled(format!("{} records", source.total_records), theme.value),
                Span::styled(" ]", theme.label),
            ]),
            Line::from(vec![
                Span::styled("Mode: ", theme.label),
                Span::styled(filter.mode.label(), theme.info),
                Span::styled("  Hours: ", theme.label),
                Span::styled(filter.hour_range.to_string(), theme.value),
                Span::styled("  Providers: ", theme.label),
                Span::styled(selection_summary(&filter.selected_providers), theme.value),
                Span::styled("  Sites: ", theme.label),
                Span::styled(selection_summary(&filter.selected_sites), theme.value),
            ]),
        ]
    }
}

/// Up to three codes, then a count of the rest.
fn selection_summary<'s>(codes: impl IntoIterator<Item = &'s String>) -> String {
    let codes: Vec<&String> = codes.into_iter().collect();
    match codes.len() {
        0 => "none".to_string(),
        n if n <= 3 => codes
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        n => format!(
            "{}, … (+{})",
            codes[..3]
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            n - 3
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_runtime::core::models::{Dataset, Record};
    use dashboard_runtime::snapshot::{build_snapshot, Controls, SourceInfo};

    fn rec(p: &str, s: &str) -> Record {
        Record {
            provider_code: p.to_string(),
            site_code: s.to_string(),
            hour: 0,
            tph_median: 1.0,
            ct_sum: 1.0,
            avg_first_resp_delay_minute: 1.0,
            last_updated: None,
        }
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn snapshot() -> DashboardSnapshot {
        let ds = Dataset::new(vec![
            rec("P1", "S1"),
            rec("P1", "S2"),
            rec("P1", "S3"),
            rec("P1", "S4"),
            rec("P1", "S5"),
        ]);
        let source = SourceInfo {
            coverage: Some("2025-06-10 → 2025-06-23".to_string()),
            last_updated: Some("2025-06-23 17:45".to_string()),
            total_records: 5,
            ..SourceInfo::default()
        };
        build_snapshot(&ds, &Controls::default(), source)
    }

    #[test]
    fn test_header_line_count_and_title() {
        let theme = Theme::dark();
        let snap = snapshot();
        let lines = Header::new(&snap, &theme).to_lines();
        assert_eq!(lines.len(), 4);
        let title = line_text(&lines[0]);
        assert!(title.contains("SITE CAPACITY DASHBOARD"), "got: {title}");
        assert!(title.starts_with(ACCENT));
    }

    #[test]
    fn test_header_separator_line() {
        let theme = Theme::dark();
        let snap = snapshot();
        let lines = Header::new(&snap, &theme).to_lines();
        let sep = line_text(&lines[1]);
        assert_eq!(sep.chars().count(), 60);
        assert!(sep.chars().all(|c| c == '='));
    }

    #[test]
    fn test_header_source_line() {
        let theme = Theme::dark();
        let snap = snapshot();
        let lines = Header::new(&snap, &theme).to_lines();
        let info = line_text(&lines[2]);
        assert_eq!(
            info,
            "[ 2025-06-10 → 2025-06-23 | last update 2025-06-23 17:45 | 5 records ]"
        );
    }

    #[test]
    fn test_header_filter_line_truncates_selection() {
        let theme = Theme::dark();
        let snap = snapshot();
        let lines = Header::new(&snap, &theme).to_lines();
        let filter = line_text(&lines[3]);
        assert!(filter.contains("Mode: Provider Focus"), "got: {filter}");
        assert!(filter.contains("Hours: 00:00-23:59"), "got: {filter}");
        assert!(filter.contains("Providers: P1"), "got: {filter}");
        assert!(filter.contains("Sites: S1, S2, S3, … (+2)"), "got: {filter}");
    }

    #[test]
    fn test_header_without_source_facts() {
        let theme = Theme::light();
        let ds = Dataset::new(vec![rec("P1", "S1")]);
        let snap = build_snapshot(&ds, &Controls::default(), SourceInfo::default());
        let lines = Header::new(&snap, &theme).to_lines();
        let info = line_text(&lines[2]);
        assert!(info.contains("unknown coverage"));
        assert!(info.contains("last update n/a"));
    }
}
