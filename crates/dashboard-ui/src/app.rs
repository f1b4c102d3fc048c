//! Main application state and TUI event loop for the site dashboard.
//!
//! [`App`] owns the [`Session`], the theme, the active tab and the last
//! [`DashboardSnapshot`]. Every key press is mapped to an [`Action`], applied
//! to the session, and followed by a fresh snapshot.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Paragraph, Tabs},
    Frame, Terminal,
};
use tracing::{debug, warn};

use dashboard_runtime::core::error::Result;
use dashboard_runtime::core::models::FilterMode;
use dashboard_runtime::session::{HourBound, Session};
use dashboard_runtime::snapshot::DashboardSnapshot;

use crate::components::header::Header;
use crate::components::kpi::render_kpis;
use crate::themes::Theme;
use crate::views::{combinations, comparisons, data_table, heatmaps, site_analysis, time_series};

const HELP: &str = "Tab/1-6 view  m mode  p/s focus  c reset  [ ] { } hours  k metric  \
                    o/a sort  n site  d/D data sort  e export  q quit";

// ── Tab ───────────────────────────────────────────────────────────────────────

/// The dashboard views, in tab-bar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    TimeSeries,
    Heatmaps,
    Comparisons,
    SiteAnalysis,
    Combinations,
    DataTable,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::TimeSeries,
        Tab::Heatmaps,
        Tab::Comparisons,
        Tab::SiteAnalysis,
        Tab::Combinations,
        Tab::DataTable,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::TimeSeries => "Time Series",
            Tab::Heatmaps => "Heatmaps",
            Tab::Comparisons => "Provider Comparison",
            Tab::SiteAnalysis => "Site Analysis",
            Tab::Combinations => "Combinations",
            Tab::DataTable => "Data Table",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    pub fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    pub fn prev(self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }

    /// `'1'` selects the first tab.
    pub fn from_digit(c: char) -> Option<Tab> {
        let n = c.to_digit(10)? as usize;
        n.checked_sub(1).and_then(|i| Tab::ALL.get(i).copied())
    }
}

// ── Action ────────────────────────────────────────────────────────────────────

/// A user intent decoded from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextTab,
    PrevTab,
    SelectTab(Tab),
    CycleMode,
    CycleProvider,
    CycleSite,
    ResetSelection,
    ShiftHours(HourBound, i8),
    CycleMetric,
    CycleSort,
    ToggleAscending,
    CycleAnalysisSite,
    CycleDataSort,
    ToggleDataAscending,
    Export,
}

/// Decode a key press; `None` for unbound keys.
pub fn action_for(key: KeyEvent) -> Option<Action> {
    let action = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char('q') | KeyCode::Char('Q') => Action::Quit,
        KeyCode::Tab => Action::NextTab,
        KeyCode::BackTab => Action::PrevTab,
        KeyCode::Char(c @ '1'..='6') => Action::SelectTab(Tab::from_digit(c)?),
        KeyCode::Char('m') => Action::CycleMode,
        KeyCode::Char('p') => Action::CycleProvider,
        KeyCode::Char('s') => Action::CycleSite,
        KeyCode::Char('c') => Action::ResetSelection,
        KeyCode::Char('[') => Action::ShiftHours(HourBound::Start, -1),
        KeyCode::Char(']') => Action::ShiftHours(HourBound::Start, 1),
        KeyCode::Char('{') => Action::ShiftHours(HourBound::End, -1),
        KeyCode::Char('}') => Action::ShiftHours(HourBound::End, 1),
        KeyCode::Char('k') => Action::CycleMetric,
        KeyCode::Char('o') => Action::CycleSort,
        KeyCode::Char('a') => Action::ToggleAscending,
        KeyCode::Char('n') => Action::CycleAnalysisSite,
        KeyCode::Char('d') => Action::CycleDataSort,
        KeyCode::Char('D') => Action::ToggleDataAscending,
        KeyCode::Char('e') => Action::Export,
        _ => return None,
    };
    Some(action)
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the dashboard TUI.
pub struct App {
    session: Session,
    /// Active colour theme.
    pub theme: Theme,
    /// Tab currently drawn in the body.
    pub tab: Tab,
    /// Snapshot for the current controls.
    pub snapshot: DashboardSnapshot,
    /// Outcome of the last action, shown in the footer.
    pub status: String,
    /// Directory the `e` key writes exports into.
    pub export_dir: PathBuf,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
}

impl App {
    /// Build the app and its first snapshot. Fails when the data cannot be
    /// loaded.
    pub fn new(mut session: Session, theme_name: &str, export_dir: PathBuf) -> Result<Self> {
        let snapshot = session.snapshot()?;
        Ok(Self {
            session,
            theme: Theme::from_name(theme_name),
            tab: Tab::TimeSeries,
            snapshot,
            status: "Ready".to_string(),
            export_dir,
            should_quit: false,
        })
    }

    /// Run the interactive TUI until `q`, `Q` or `Ctrl+C`.
    ///
    /// Uses `crossterm::event::poll` with a 250 ms timeout so the loop stays
    /// on the current thread.
    pub fn run(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Apply the action bound to `key`, then refresh the snapshot.
    pub fn handle_key(&mut self, key: KeyEvent) {
        let Some(action) = action_for(key) else {
            return;
        };
        debug!(?action, "key action");

        let status = match self.apply(action) {
            Ok(Some(status)) => status,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, ?action, "action failed");
                format!("Error: {}", e)
            }
        };

        match self.session.snapshot() {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                self.status = status;
            }
            Err(e) => {
                warn!(error = %e, "snapshot refresh failed");
                self.status = format!("Error: {}", e);
            }
        }
    }

    /// Mutate the session for `action`. `Ok(None)` means nothing changed that
    /// needs a new snapshot.
    fn apply(&mut self, action: Action) -> Result<Option<String>> {
        let session = &mut self.session;
        let status = match action {
            Action::Quit => {
                self.should_quit = true;
                return Ok(None);
            }
            Action::NextTab | Action::PrevTab | Action::SelectTab(_) => {
                self.tab = match action {
                    Action::NextTab => self.tab.next(),
                    Action::PrevTab => self.tab.prev(),
                    Action::SelectTab(tab) => tab,
                    _ => self.tab,
                };
                return Ok(None);
            }
            Action::CycleMode => {
                session.cycle_mode();
                format!("Mode: {}", session.controls().mode)
            }
            Action::CycleProvider => {
                if session.controls().mode == FilterMode::SiteFocus {
                    "Providers follow the selected sites in Site Focus".to_string()
                } else {
                    session.cycle_provider()?;
                    format!("Provider: {}", focused(&session.controls().selection.providers))
                }
            }
            Action::CycleSite => {
                if session.controls().mode == FilterMode::ProviderFocus {
                    "Sites follow the selected providers in Provider Focus".to_string()
                } else {
                    session.cycle_site()?;
                    format!("Site: {}", focused(&session.controls().selection.sites))
                }
            }
            Action::ResetSelection => {
                session.reset_selection();
                format!("Selection reset to {} defaults", session.controls().mode)
            }
            Action::ShiftHours(bound, delta) => {
                if session.shift_hours(bound, delta) {
                    format!("Hours: {}", session.controls().selection.hour_range)
                } else {
                    "Hour range limit reached".to_string()
                }
            }
            Action::CycleMetric => {
                session.cycle_metric();
                format!("Metric: {}", session.controls().metric)
            }
            Action::CycleSort => {
                session.cycle_sort();
                format!("Combinations sorted by {}", session.controls().sort_by.column())
            }
            Action::ToggleAscending => {
                session.toggle_ascending();
                direction("Combinations", session.controls().ascending)
            }
            Action::CycleAnalysisSite => {
                session.cycle_analysis_site()?;
                match &session.controls().analysis_site {
                    Some(site) => format!("Analysing site {}", site),
                    None => "No site to analyse".to_string(),
                }
            }
            Action::CycleDataSort => {
                session.cycle_data_sort();
                format!("Data sorted by {}", session.controls().data_sort)
            }
            Action::ToggleDataAscending => {
                session.toggle_data_ascending();
                direction("Data", session.controls().data_ascending)
            }
            Action::Export => {
                let now = chrono::Local::now().naive_local();
                let paths = session.export(&self.export_dir, now)?;
                format!(
                    "Exported {} and {}",
                    file_name(&paths.filtered),
                    file_name(&paths.combinations)
                )
            }
        };
        Ok(Some(status))
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    /// Render the current application state into `frame`.
    pub fn render(&self, frame: &mut Frame) {
        let kpi_height = if self.snapshot.has_data() { 4 } else { 0 };
        let chunks = Layout::vertical([
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Length(kpi_height),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(frame.area());

        frame.render_widget(
            Paragraph::new(Text::from(Header::new(&self.snapshot, &self.theme).to_lines())),
            chunks[0],
        );
        self.render_tabs(frame, chunks[1]);
        self.render_body(frame, chunks[2], chunks[3]);
        self.render_footer(frame, chunks[4]);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles = Tab::ALL
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{} {}", i + 1, t.title()));
        let tabs = Tabs::new(titles)
            .select(self.tab.index())
            .style(self.theme.tab_inactive)
            .highlight_style(self.theme.tab_active)
            .divider(Span::styled("|", self.theme.separator));
        frame.render_widget(tabs, area);
    }

    fn render_body(&self, frame: &mut Frame, kpi_area: Rect, area: Rect) {
        let theme = &self.theme;
        let Some(views) = &self.snapshot.views else {
            let notice = self
                .snapshot
                .notice
                .as_deref()
                .unwrap_or("No data available for the selected filters");
            data_table::render_no_data(frame, area, notice, theme);
            return;
        };

        render_kpis(frame, kpi_area, &views.key_metrics, theme);
        let controls = &self.snapshot.controls;
        match self.tab {
            Tab::TimeSeries => time_series::render(frame, area, &views.time_series, theme),
            Tab::Heatmaps => heatmaps::render(frame, area, &views.heatmaps, theme),
            Tab::Comparisons => comparisons::render(frame, area, &views.comparisons, theme),
            Tab::SiteAnalysis => site_analysis::render(frame, area, &views.site_analysis, theme),
            Tab::Combinations => {
                combinations::render(frame, area, &views.combinations, controls, theme)
            }
            Tab::DataTable => {
                data_table::render_data_table(frame, area, &views.data_table, controls, theme)
            }
        }
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let mut status = vec![Span::styled(self.status.clone(), self.theme.info)];
        if let Some(info) = &self.snapshot.selection_info {
            status.push(Span::styled(format!("  {}", info), self.theme.dim));
        }
        let lines = vec![
            Line::from(status),
            Line::from(Span::styled(HELP, self.theme.dim)),
        ];
        frame.render_widget(Paragraph::new(Text::from(lines)), area);
    }
}

/// First code of an explicit selection.
fn focused(selection: &Option<Vec<String>>) -> &str {
    selection
        .as_ref()
        .and_then(|s| s.first())
        .map_or("none", String::as_str)
}

fn direction(what: &str, ascending: bool) -> String {
    let dir = if ascending { "ascending" } else { "descending" };
    format!("{} sorted {}", what, dir)
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
