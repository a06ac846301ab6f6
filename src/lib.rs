use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::path::PathBuf;
use std::sync::mpsc::Sender;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, TableState, Widget, Wrap};
use ratatui::{buffer::Buffer, layout::Rect};

pub mod chart_data;
pub mod cli;
pub mod config;
pub mod export;
pub mod filter;
pub mod loader;
pub mod widgets;

use chart_data::VehicleCharts;
use config::{AppConfig, Theme};
use filter::{FilterCriteria, FilterOutcome};
use loader::RefuelTable;
use widgets::charts::render_detail;
use widgets::controls::Controls;
use widgets::filter_panel::{render_filter_panel, FilterPanel, PanelFocus, SIDEBAR_WIDTH};
use widgets::summary::{render_summary, MISSING};
use widgets::text_input::{TextInput, TextInputEvent};

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "fueltui";

/// Default file name offered by the export prompt.
pub const DEFAULT_EXPORT_NAME: &str = "repostajes_filtrados.csv";

pub enum AppEvent {
    Key(KeyEvent),
    Open(PathBuf),
    Apply(FilterCriteria),
    Export(PathBuf),
    Exit,
    Crash(String),
    Resize(u16, u16), // resized (width, height)
}

/// Which pane receives navigation keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Sidebar,
    Summary,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum View {
    #[default]
    Summary,
    Detail,
}

#[derive(Default)]
pub struct ErrorModal {
    pub active: bool,
    pub message: String,
}

impl ErrorModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: String) {
        self.active = true;
        self.message = message;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.message.clear();
    }
}

/// Modal prompting for the CSV export path.
#[derive(Default)]
pub struct ExportPrompt {
    pub active: bool,
    pub input: TextInput,
}

impl ExportPrompt {
    pub fn open(&mut self) {
        self.active = true;
        self.input = TextInput::with_value(DEFAULT_EXPORT_NAME);
        self.input.set_focused(true);
    }

    pub fn close(&mut self) {
        self.active = false;
        self.input.clear();
    }
}

#[derive(Default)]
struct DebugState {
    enabled: bool,
    num_events: usize,
}

/// The detail view's data: one vehicle's charts.
struct Detail {
    label: String,
    charts: VehicleCharts,
}

pub struct App {
    events: Sender<AppEvent>,
    config: AppConfig,
    theme: Theme,
    debug: DebugState,
    sheet: Option<String>,
    table: Option<RefuelTable>,
    pub filter_panel: Option<FilterPanel>,
    outcome: Option<FilterOutcome>,
    pub summary_state: TableState,
    focus: Focus,
    view: View,
    detail: Option<Detail>,
    pub export_prompt: ExportPrompt,
    error_modal: ErrorModal,
    status: Option<String>,
}

impl App {
    pub fn new(events: Sender<AppEvent>) -> App {
        Self::new_with_config(events, Theme::default(), AppConfig::default())
    }

    pub fn new_with_config(events: Sender<AppEvent>, theme: Theme, config: AppConfig) -> App {
        App {
            events,
            config,
            theme,
            debug: DebugState::default(),
            sheet: None,
            table: None,
            filter_panel: None,
            outcome: None,
            summary_state: TableState::default(),
            focus: Focus::default(),
            view: View::default(),
            detail: None,
            export_prompt: ExportPrompt::default(),
            error_modal: ErrorModal::new(),
            status: None,
        }
    }

    pub fn send_event(&mut self, event: AppEvent) -> Result<()> {
        self.events.send(event)?;
        Ok(())
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    /// Worksheet selector used by subsequent `Open` events.
    pub fn set_sheet(&mut self, sheet: Option<String>) {
        self.sheet = sheet;
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn outcome(&self) -> Option<&FilterOutcome> {
        self.outcome.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_modal.active.then_some(self.error_modal.message.as_str())
    }

    /// Install a loaded table and rebuild the filter sidebar from it.
    /// Returns the sidebar's initial criteria (the table's observed extents,
    /// mirroring the reference's default control values).
    pub fn set_table(&mut self, table: RefuelTable) -> FilterCriteria {
        let panel = FilterPanel::from_table(&table);
        let criteria = panel.criteria();
        self.table = Some(table);
        self.filter_panel = Some(panel);
        self.outcome = None;
        self.detail = None;
        self.view = View::Summary;
        self.focus = Focus::Sidebar;
        criteria
    }

    /// Process one event; may return a follow-up event for the main loop to
    /// enqueue. `Exit` and `Crash` are the loop's to handle, not ours.
    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Open(path) => match RefuelTable::load(path, self.sheet.as_deref()) {
                Ok(table) => {
                    let rows = table.height();
                    let criteria = self.set_table(table);
                    self.status = Some(format!("Loaded {} rows from {}", rows, path.display()));
                    Some(AppEvent::Apply(criteria))
                }
                Err(e) => {
                    // A failed load leaves no partial data behind.
                    self.table = None;
                    self.filter_panel = None;
                    self.outcome = None;
                    self.error_modal.show(e.to_string());
                    None
                }
            },
            AppEvent::Apply(criteria) => {
                let Some(table) = &self.table else {
                    return None;
                };
                match filter::apply(table, criteria) {
                    Ok(outcome) => {
                        self.summary_state
                            .select((!outcome.summary.is_empty()).then_some(0));
                        self.outcome = Some(outcome);
                        self.view = View::Summary;
                        self.detail = None;
                    }
                    Err(e) => self.error_modal.show(e.to_string()),
                }
                None
            }
            AppEvent::Export(path) => {
                let Some(outcome) = &self.outcome else {
                    return None;
                };
                let mut df = outcome.filtered.clone();
                match export::write_csv(&mut df, path) {
                    Ok(()) => {
                        self.status =
                            Some(format!("Exported {} rows to {}", df.height(), path.display()));
                    }
                    Err(e) => self.error_modal.show(e.to_string()),
                }
                None
            }
            AppEvent::Resize(_, _) => None,
            AppEvent::Exit | AppEvent::Crash(_) => None,
        }
    }

    fn key(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        if self.error_modal.active {
            self.error_modal.hide();
            return None;
        }

        if self.export_prompt.active {
            return match self.export_prompt.input.input(key) {
                TextInputEvent::Submit => {
                    let value = self.export_prompt.input.value();
                    let value = value.trim().to_string();
                    self.export_prompt.close();
                    (!value.is_empty()).then(|| AppEvent::Export(PathBuf::from(value)))
                }
                TextInputEvent::Cancel => {
                    self.export_prompt.close();
                    None
                }
                TextInputEvent::None => None,
            };
        }

        if self.view == View::Detail {
            return match key.code {
                KeyCode::Esc | KeyCode::Backspace => {
                    self.view = View::Summary;
                    self.detail = None;
                    None
                }
                KeyCode::Char('q') => Some(AppEvent::Exit),
                KeyCode::Char('x') => {
                    self.export_prompt.open();
                    None
                }
                _ => None,
            };
        }

        // While a text field has focus, most keys edit the field.
        let editing = self.focus == Focus::Sidebar
            && self
                .filter_panel
                .as_ref()
                .map(|p| p.editing())
                .unwrap_or(false);
        if editing && !matches!(key.code, KeyCode::Tab | KeyCode::BackTab) {
            let panel = self.filter_panel.as_mut()?;
            let event = panel.focused_input_mut()?.input(key);
            return match event {
                TextInputEvent::Submit => Some(AppEvent::Apply(panel.criteria())),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Char('q') => Some(AppEvent::Exit),
            KeyCode::Tab => {
                self.cycle_focus(true);
                None
            }
            KeyCode::BackTab => {
                self.cycle_focus(false);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_cursor(1);
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_cursor(-1);
                None
            }
            KeyCode::Char(' ') => {
                if self.focus == Focus::Sidebar {
                    if let Some(panel) = self.filter_panel.as_mut() {
                        panel.toggle_selected();
                    }
                }
                None
            }
            KeyCode::Enter => match self.focus {
                Focus::Summary => {
                    self.open_detail();
                    None
                }
                Focus::Sidebar => {
                    if let Some(panel) = self.filter_panel.as_mut() {
                        panel.toggle_selected();
                    }
                    None
                }
            },
            KeyCode::Char('a') => self
                .filter_panel
                .as_ref()
                .map(|p| AppEvent::Apply(p.criteria())),
            KeyCode::Char('c') => {
                let panel = self.filter_panel.as_mut()?;
                panel.clear();
                Some(AppEvent::Apply(panel.criteria()))
            }
            KeyCode::Char('x') => {
                if self.outcome.is_some() {
                    self.export_prompt.open();
                }
                None
            }
            _ => None,
        }
    }

    /// Tab order: each sidebar section in turn, then the summary table.
    fn cycle_focus(&mut self, forward: bool) {
        let Some(panel) = self.filter_panel.as_mut() else {
            return;
        };
        match (self.focus, forward) {
            (Focus::Sidebar, true) => {
                if panel.focus == PanelFocus::DateEnd {
                    panel.next_focus(); // wraps; leave the panel parked at the start
                    self.focus = Focus::Summary;
                } else {
                    panel.next_focus();
                }
            }
            (Focus::Sidebar, false) => {
                if panel.focus == PanelFocus::FuelTypes {
                    self.focus = Focus::Summary;
                } else {
                    panel.prev_focus();
                }
            }
            (Focus::Summary, true) => {
                self.focus = Focus::Sidebar;
            }
            (Focus::Summary, false) => {
                self.focus = Focus::Sidebar;
                while panel.focus != PanelFocus::DateEnd {
                    panel.next_focus();
                }
            }
        }
    }

    fn move_cursor(&mut self, step: isize) {
        match self.focus {
            Focus::Sidebar => {
                if let Some(panel) = self.filter_panel.as_mut() {
                    if step > 0 {
                        panel.move_down();
                    } else {
                        panel.move_up();
                    }
                }
            }
            Focus::Summary => {
                let len = self
                    .outcome
                    .as_ref()
                    .map(|o| o.summary.len())
                    .unwrap_or(0);
                if len == 0 {
                    return;
                }
                let current = self.summary_state.selected().unwrap_or(0) as isize;
                let next = (current + step).rem_euclid(len as isize);
                self.summary_state.select(Some(next as usize));
            }
        }
    }

    /// Drill into the vehicle under the summary cursor.
    fn open_detail(&mut self) {
        let Some(outcome) = &self.outcome else {
            return;
        };
        let Some(index) = self.summary_state.selected() else {
            return;
        };
        let Some(entry) = outcome.summary.get(index) else {
            return;
        };
        let rows = match filter::vehicle_detail(&outcome.filtered, entry.vehicle.as_deref()) {
            Ok(rows) => rows,
            Err(e) => {
                self.error_modal.show(e.to_string());
                return;
            }
        };
        match VehicleCharts::build(&rows) {
            Ok(charts) => {
                self.detail = Some(Detail {
                    label: entry.vehicle.clone().unwrap_or_else(|| MISSING.to_string()),
                    charts,
                });
                self.view = View::Detail;
            }
            Err(e) => self.error_modal.show(e.to_string()),
        }
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut constraints = vec![Constraint::Fill(1), Constraint::Length(1)];
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);
        let main_area = layout[0];
        let controls_area = layout[1];

        if self.table.is_none() {
            Paragraph::new("No data loaded. Start fueltui with a workbook path.")
                .style(Style::default().fg(self.theme.get("text_secondary")))
                .centered()
                .render(main_area, buf);
        } else {
            let main = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Fill(1)])
                .split(main_area);

            if let Some(panel) = self.filter_panel.as_mut() {
                render_filter_panel(main[0], buf, panel, &self.theme);
            }

            match (&self.view, &self.detail) {
                (View::Detail, Some(detail)) => {
                    render_detail(
                        main[1],
                        buf,
                        &detail.label,
                        &detail.charts,
                        self.config.display.histogram_bins,
                        &self.theme,
                    );
                }
                _ => {
                    let summary = self
                        .outcome
                        .as_ref()
                        .map(|o| o.summary.as_slice())
                        .unwrap_or(&[]);
                    render_summary(
                        main[1],
                        buf,
                        summary,
                        &mut self.summary_state,
                        self.focus == Focus::Summary,
                        &self.theme,
                    );
                }
            }
        }

        let row_count = self
            .outcome
            .as_ref()
            .map(|o| o.filtered.height())
            .unwrap_or(0);
        let modal_active = self.error_modal.active || self.export_prompt.active;
        Controls::with_row_count(row_count)
            .with_dimmed(modal_active)
            .render(controls_area, buf);

        if self.debug.enabled {
            let status = self.status.as_deref().unwrap_or("");
            Paragraph::new(format!("events: {} | {}", self.debug.num_events, status))
                .style(Style::default().fg(self.theme.get("text_secondary")))
                .render(layout[2], buf);
        }

        if self.export_prompt.active {
            let popup = centered_rect(area, 50, 20);
            Clear.render(popup, buf);
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.get("border_active")))
                .title(" Export filtered rows to CSV ");
            let inner = block.inner(popup);
            block.render(popup, buf);
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Fill(1)])
                .split(inner);
            self.export_prompt.input.render(rows[0], buf);
            Paragraph::new("Enter to write, Esc to cancel")
                .style(Style::default().fg(self.theme.get("text_secondary")))
                .render(rows[1], buf);
        }

        if self.error_modal.active {
            let popup = centered_rect(area, 60, 30);
            Clear.render(popup, buf);
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Error ");
            let inner = block.inner(popup);
            block.render(popup, buf);
            Paragraph::new(self.error_modal.message.as_str())
                .wrap(Wrap { trim: false })
                .render(inner, buf);
        }
    }
}

fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use polars::prelude::*;
    use std::sync::mpsc;

    fn sample_table() -> RefuelTable {
        let df = df!(
            "vehiculo" => &["A1", "A1", "B2"],
            "fecha" => &["2024-01-01", "2024-02-01", "2024-01-15"],
            "tipo_combustible" => &["diesel", "diesel", "petrol"],
            "repostado" => &[40.0_f64, 38.0, 30.0],
            "distancia" => &[500.0_f64, 480.0, 300.0],
        )
        .unwrap();
        RefuelTable::from_dataframe(df).unwrap()
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn app_with_data() -> App {
        let (tx, _rx) = mpsc::channel();
        let mut app = App::new(tx);
        let criteria = app.set_table(sample_table());
        app.event(&AppEvent::Apply(criteria));
        app
    }

    #[test]
    fn apply_populates_outcome_and_selection() {
        let app = app_with_data();
        let outcome = app.outcome().unwrap();
        assert_eq!(outcome.filtered.height(), 3);
        assert_eq!(outcome.summary.len(), 2);
        assert_eq!(app.summary_state.selected(), Some(0));
    }

    #[test]
    fn open_on_missing_file_shows_error_and_no_table() {
        let (tx, _rx) = mpsc::channel();
        let mut app = App::new(tx);
        let follow_up = app.event(&AppEvent::Open(PathBuf::from("/no/such/file.xlsx")));
        assert!(follow_up.is_none());
        assert!(app.error_message().is_some());
        assert!(app.outcome().is_none());
    }

    #[test]
    fn q_exits_and_any_key_dismisses_error() {
        let mut app = app_with_data();
        assert!(matches!(app.event(&key(KeyCode::Char('q'))), Some(AppEvent::Exit)));

        app.error_modal.show("boom".to_string());
        assert!(app.event(&key(KeyCode::Char('q'))).is_none());
        assert!(app.error_message().is_none());
    }

    #[test]
    fn enter_on_summary_opens_detail_and_esc_returns() {
        let mut app = app_with_data();
        app.focus = Focus::Summary;
        app.event(&key(KeyCode::Enter));
        assert_eq!(app.view(), View::Detail);
        app.event(&key(KeyCode::Esc));
        assert_eq!(app.view(), View::Summary);
    }

    #[test]
    fn apply_with_filter_narrows_rows() {
        let mut app = app_with_data();
        let criteria = FilterCriteria {
            fuel_types: vec!["petrol".to_string()],
            ..Default::default()
        };
        app.event(&AppEvent::Apply(criteria));
        let outcome = app.outcome().unwrap();
        assert_eq!(outcome.filtered.height(), 1);
        assert_eq!(outcome.summary[0].vehicle.as_deref(), Some("B2"));
    }

    #[test]
    fn export_event_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut app = app_with_data();
        app.event(&AppEvent::Export(path.clone()));
        assert!(path.exists());
        assert!(app.status().unwrap().starts_with("Exported 3 rows"));
    }

    #[test]
    fn export_prompt_submit_emits_export_event() {
        let mut app = app_with_data();
        app.event(&key(KeyCode::Char('x')));
        assert!(app.export_prompt.active);
        let follow_up = app.event(&key(KeyCode::Enter));
        match follow_up {
            Some(AppEvent::Export(path)) => {
                assert_eq!(path, PathBuf::from(DEFAULT_EXPORT_NAME));
            }
            _ => panic!("expected an export event"),
        }
        assert!(!app.export_prompt.active);
    }

    #[test]
    fn tab_walks_from_sidebar_to_summary_and_back() {
        let mut app = app_with_data();
        assert_eq!(app.focus, Focus::Sidebar);
        for _ in 0..8 {
            app.event(&key(KeyCode::Tab));
        }
        assert_eq!(app.focus, Focus::Summary);
        app.event(&key(KeyCode::Tab));
        assert_eq!(app.focus, Focus::Sidebar);
    }

    #[test]
    fn renders_summary_and_detail_views() {
        let mut app = app_with_data();
        let area = Rect::new(0, 0, 120, 40);
        let mut buf = Buffer::empty(area);
        (&mut app).render(area, &mut buf);

        app.focus = Focus::Summary;
        app.event(&key(KeyCode::Enter));
        let mut buf = Buffer::empty(area);
        (&mut app).render(area, &mut buf);
    }
}
