use dashboard_runtime::core::formatting::format_number;
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::themes::Theme;

/// Configuration controlling visual appearance of a bar.
pub struct BarConfig {
    /// Width in terminal columns of the bar portion (excluding labels).
    pub width: u16,
    /// Display width reserved for the leading label.
    pub label_width: usize,
    pub filled_char: char,
    pub empty_char: char,
    /// Decimals of the trailing value.
    pub decimals: u32,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            width: 30,
            label_width: 14,
            filled_char: '\u{2588}', // █  FULL BLOCK
            empty_char: '\u{2591}',  // ░  LIGHT SHADE
            decimals: 1,
        }
    }
}

// ── ValueBar ─────────────────────────────────────────────────────────────────

/// Horizontal bar showing `value` relative to the largest value in its
/// group, followed by the formatted value.
pub struct ValueBar<'a> {
    pub label: String,
    pub value: f64,
    /// Value drawn as a full bar.
    pub scale: f64,
    pub theme: &'a Theme,
    pub config: BarConfig,
}

impl<'a> ValueBar<'a> {
    pub fn new(label: impl Into<String>, value: f64, scale: f64, theme: &'a Theme) -> Self {
        Self {
            label: label.into(),
            value,
            scale,
            theme,
            config: BarConfig::default(),
        }
    }

    /// Share of the scale in percent, clamped to `[0.0, 100.0]`.
    pub fn percentage(&self) -> f64 {
        if self.scale > 0.0 && self.value.is_finite() {
            (self.value / self.scale * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// Render as `label [filled][empty] value`.
    pub fn to_line(&self) -> Line<'a> {
        let percentage = self.percentage();
        let filled = ((percentage / 100.0) * self.config.width as f64).round() as u16;
        let empty = self.config.width.saturating_sub(filled);

        let filled_str: String =
            std::iter::repeat_n(self.config.filled_char, filled as usize).collect();
        let empty_str: String =
            std::iter::repeat_n(self.config.empty_char, empty as usize).collect();

        Line::from(vec![
            Span::styled(
                format!("{} ", fit_width(&self.label, self.config.label_width)),
                self.theme.label,
            ),
            Span::styled(filled_str, self.theme.bar_style(percentage)),
            Span::styled(empty_str, self.theme.bar_empty),
            Span::styled(
                format!(" {}", format_number(self.value, self.config.decimals)),
                self.theme.bar_label,
            ),
        ])
    }
}

/// One bar per item, all sharing the largest value as scale.
pub fn bar_lines<'a>(
    items: &[(String, f64)],
    width: u16,
    decimals: u32,
    theme: &'a Theme,
) -> Vec<Line<'a>> {
    let scale = items.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let label_width = items
        .iter()
        .map(|(l, _)| l.width())
        .max()
        .unwrap_or(0)
        .min(24);
    items
        .iter()
        .map(|(label, value)| {
            let mut bar = ValueBar::new(label.clone(), *value, scale, theme);
            bar.config.width = width;
            bar.config.label_width = label_width;
            bar.config.decimals = decimals;
            bar.to_line()
        })
        .collect()
}

/// Pad or truncate `text` to exactly `width` display columns.
pub fn fit_width(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push_str(&" ".repeat(width - used));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_value_bar_half() {
        let theme = Theme::dark();
        let bar = ValueBar::new("P1-S1", 50.0, 100.0, &theme);
        let line = bar.to_line();
        assert_eq!(line.spans.len(), 4, "expected label, filled, empty, value");
        assert_eq!(line.spans[1].content.chars().count(), 15);
        assert!(line.spans[1].content.chars().all(|c| c == '█'));
        assert_eq!(line.spans[2].content.chars().count(), 15);
        assert_eq!(line.spans[3].content, " 50.0");
        assert_eq!(line.spans[1].style, theme.bar_medium);
    }

    #[test]
    fn test_value_bar_zero_scale() {
        let theme = Theme::dark();
        let bar = ValueBar::new("x", 5.0, 0.0, &theme);
        assert_eq!(bar.percentage(), 0.0);
        let line = bar.to_line();
        assert!(line.spans[1].content.is_empty());
        assert_eq!(line.spans[2].content.chars().count(), 30);
    }

    #[test]
    fn test_value_bar_full_uses_high_style() {
        let theme = Theme::dark();
        let line = ValueBar::new("x", 200.0, 200.0, &theme).to_line();
        assert_eq!(line.spans[1].content.chars().count(), 30);
        assert!(line.spans[2].content.is_empty());
        assert_eq!(line.spans[1].style, theme.bar_high);
    }

    #[test]
    fn test_bar_lines_share_scale() {
        let theme = Theme::dark();
        let items = vec![("long label".to_string(), 1000.0), ("b".to_string(), 250.0)];
        let lines = bar_lines(&items, 20, 0, &theme);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans[1].content.chars().count(), 20);
        assert_eq!(lines[1].spans[1].content.chars().count(), 5);
        // labels are padded to the widest one
        assert_eq!(lines[1].spans[0].content, format!("{:<10} ", "b"));
        assert!(text(&lines[0]).ends_with(" 1,000"));
    }

    #[test]
    fn test_fit_width_handles_wide_chars() {
        assert_eq!(fit_width("abc", 5), "abc  ");
        assert_eq!(fit_width("abcdef", 3), "abc");
        // a double-width character that does not fit is dropped
        assert_eq!(fit_width("a界", 2), "a ");
        assert_eq!(fit_width("界", 2).width(), 2);
    }
}
