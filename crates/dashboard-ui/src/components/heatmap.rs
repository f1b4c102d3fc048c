use dashboard_runtime::core::formatting::format_optional;
use dashboard_runtime::data::pivot::PivotTable;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::components::bar::fit_width;
use crate::themes::Theme;

/// Glyph drawn for a present cell.
pub const CELL: &str = "██";
/// Glyph drawn for a pair with no observation.
pub const MISSING_CELL: &str = " ·";

/// Colour-bucketed grid of a [`PivotTable`].
///
/// Each present cell is coloured by its position between the table minimum
/// and maximum. Absent pairs are drawn with [`MISSING_CELL`], so they are
/// never confused with a low value.
pub struct Heatmap<'a> {
    pub pivot: &'a PivotTable,
    pub theme: &'a Theme,
    /// Display width of the row label column.
    pub label_width: usize,
}

impl<'a> Heatmap<'a> {
    pub fn new(pivot: &'a PivotTable, theme: &'a Theme) -> Self {
        let label_width = pivot
            .row_labels
            .iter()
            .map(|l| l.width())
            .max()
            .unwrap_or(0)
            .clamp(4, 16);
        Self {
            pivot,
            theme,
            label_width,
        }
    }

    /// Position of `value` on the colour scale, `0.0..=1.0`.
    pub fn fraction(&self, value: f64) -> f64 {
        let (Some(lo), Some(hi)) = (self.pivot.min(), self.pivot.max()) else {
            return 0.0;
        };
        if hi > lo {
            (value - lo) / (hi - lo)
        } else {
            0.5
        }
    }

    /// Column header, one line per row label, then a legend.
    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let mut lines = Vec::with_capacity(self.pivot.row_labels.len() + 2);

        let mut header = vec![Span::raw(" ".repeat(self.label_width + 1))];
        for label in &self.pivot.column_labels {
            header.push(Span::styled(fit_right(label, CELL.width()), self.theme.dim));
        }
        lines.push(Line::from(header));

        for (label, row) in self.pivot.row_labels.iter().zip(&self.pivot.cells) {
            let mut spans = vec![Span::styled(
                format!("{} ", fit_width(label, self.label_width)),
                self.theme.label,
            )];
            for cell in row {
                spans.push(match cell {
                    Some(v) => Span::styled(CELL, self.theme.heat_style(self.fraction(*v))),
                    None => Span::styled(MISSING_CELL, self.theme.heat_missing),
                });
            }
            lines.push(Line::from(spans));
        }

        lines.push(self.legend());
        lines
    }

    fn legend(&self) -> Line<'a> {
        let mut spans = vec![Span::styled(
            format!("{} ", format_optional(self.pivot.min(), 1)),
            self.theme.dim,
        )];
        for style in &self.theme.heat {
            spans.push(Span::styled(CELL, *style));
        }
        spans.push(Span::styled(
            format!(" {}", format_optional(self.pivot.max(), 1)),
            self.theme.dim,
        ));
        spans.push(Span::styled(
            format!("   {} no data", MISSING_CELL.trim()),
            self.theme.heat_missing,
        ));
        Line::from(spans)
    }
}

/// Right-align `text` in `width` columns, keeping its last characters.
fn fit_right(text: &str, width: usize) -> String {
    let w = text.width();
    if w >= width {
        let skip = text.chars().count().saturating_sub(width);
        text.chars().skip(skip).collect()
    } else {
        format!("{}{}", " ".repeat(width - w), text)
    }
}
