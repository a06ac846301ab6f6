//! Filter sidebar: collects a complete `FilterCriteria` from its widget
//! state on every apply action. Nothing here touches the engine directly.

use chrono::NaiveDate;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, StatefulWidget, Widget},
};

use super::text_input::TextInput;
use crate::config::Theme;
use crate::filter::{FilterCriteria, RangeParameter};
use crate::loader::RefuelTable;

pub const SIDEBAR_WIDTH: u16 = 34;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    #[default]
    FuelTypes,
    VehicleTypes,
    Location,
    Parameter,
    RangeMin,
    RangeMax,
    DateStart,
    DateEnd,
}

/// State of the filter sidebar. Options and default bounds are derived from
/// the loaded table once; the user edits selections and free-text fields.
pub struct FilterPanel {
    pub fuel_options: Vec<String>,
    pub fuel_selected: Vec<bool>,
    pub fuel_state: ListState,

    pub vehicle_options: Vec<String>,
    pub vehicle_selected: Vec<bool>,
    pub vehicle_state: ListState,

    pub location: TextInput,

    /// Parameters whose column is present in the table.
    pub parameters: Vec<RangeParameter>,
    pub parameter_idx: usize,
    parameter_bounds: Vec<Option<(f64, f64)>>,

    pub range_min: TextInput,
    pub range_max: TextInput,

    pub date_start: TextInput,
    pub date_end: TextInput,
    default_dates: Option<(NaiveDate, NaiveDate)>,

    pub focus: PanelFocus,
}

impl FilterPanel {
    pub fn from_table(table: &RefuelTable) -> Self {
        let fuel_options = table.fuel_types().to_vec();
        let vehicle_options = table.vehicle_types().to_vec();

        let parameters: Vec<RangeParameter> = RangeParameter::ALL
            .into_iter()
            .filter(|p| table.has_column(p.column()))
            .collect();
        let parameter_bounds: Vec<Option<(f64, f64)>> = parameters
            .iter()
            .map(|p| table.numeric_bounds(p.column()))
            .collect();

        let default_dates = table
            .date_span()
            .map(|(start, end)| (start.date(), end.date()));

        let mut panel = Self {
            fuel_selected: vec![false; fuel_options.len()],
            fuel_options,
            fuel_state: ListState::default(),
            vehicle_selected: vec![false; vehicle_options.len()],
            vehicle_options,
            vehicle_state: ListState::default(),
            location: TextInput::new(),
            parameters,
            parameter_idx: 0,
            parameter_bounds,
            range_min: TextInput::new(),
            range_max: TextInput::new(),
            date_start: TextInput::new(),
            date_end: TextInput::new(),
            default_dates,
            focus: PanelFocus::default(),
        };
        if !panel.fuel_options.is_empty() {
            panel.fuel_state.select(Some(0));
        }
        if !panel.vehicle_options.is_empty() {
            panel.vehicle_state.select(Some(0));
        }
        panel.reset_range_inputs();
        panel.reset_date_inputs();
        panel.sync_input_focus();
        panel
    }

    /// Pre-fill the range inputs with the observed bounds of the selected
    /// parameter, like the reference's value slider.
    fn reset_range_inputs(&mut self) {
        let bounds = self
            .parameter_bounds
            .get(self.parameter_idx)
            .copied()
            .flatten();
        match bounds {
            Some((low, high)) => {
                self.range_min.set_value(&format_bound(low));
                self.range_max.set_value(&format_bound(high));
            }
            None => {
                self.range_min.clear();
                self.range_max.clear();
            }
        }
    }

    fn reset_date_inputs(&mut self) {
        match self.default_dates {
            Some((start, end)) => {
                self.date_start
                    .set_value(&start.format(DATE_FORMAT).to_string());
                self.date_end.set_value(&end.format(DATE_FORMAT).to_string());
            }
            None => {
                self.date_start.clear();
                self.date_end.clear();
            }
        }
    }

    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            PanelFocus::FuelTypes => PanelFocus::VehicleTypes,
            PanelFocus::VehicleTypes => PanelFocus::Location,
            PanelFocus::Location => PanelFocus::Parameter,
            PanelFocus::Parameter => PanelFocus::RangeMin,
            PanelFocus::RangeMin => PanelFocus::RangeMax,
            PanelFocus::RangeMax => PanelFocus::DateStart,
            PanelFocus::DateStart => PanelFocus::DateEnd,
            PanelFocus::DateEnd => PanelFocus::FuelTypes,
        };
        self.sync_input_focus();
    }

    pub fn prev_focus(&mut self) {
        self.focus = match self.focus {
            PanelFocus::FuelTypes => PanelFocus::DateEnd,
            PanelFocus::VehicleTypes => PanelFocus::FuelTypes,
            PanelFocus::Location => PanelFocus::VehicleTypes,
            PanelFocus::Parameter => PanelFocus::Location,
            PanelFocus::RangeMin => PanelFocus::Parameter,
            PanelFocus::RangeMax => PanelFocus::RangeMin,
            PanelFocus::DateStart => PanelFocus::RangeMax,
            PanelFocus::DateEnd => PanelFocus::DateStart,
        };
        self.sync_input_focus();
    }

    fn sync_input_focus(&mut self) {
        self.location.set_focused(self.focus == PanelFocus::Location);
        self.range_min
            .set_focused(self.focus == PanelFocus::RangeMin);
        self.range_max
            .set_focused(self.focus == PanelFocus::RangeMax);
        self.date_start
            .set_focused(self.focus == PanelFocus::DateStart);
        self.date_end.set_focused(self.focus == PanelFocus::DateEnd);
    }

    /// Whether key presses should edit text instead of navigating.
    pub fn editing(&self) -> bool {
        matches!(
            self.focus,
            PanelFocus::Location
                | PanelFocus::RangeMin
                | PanelFocus::RangeMax
                | PanelFocus::DateStart
                | PanelFocus::DateEnd
        )
    }

    pub fn focused_input_mut(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            PanelFocus::Location => Some(&mut self.location),
            PanelFocus::RangeMin => Some(&mut self.range_min),
            PanelFocus::RangeMax => Some(&mut self.range_max),
            PanelFocus::DateStart => Some(&mut self.date_start),
            PanelFocus::DateEnd => Some(&mut self.date_end),
            _ => None,
        }
    }

    pub fn move_down(&mut self) {
        match self.focus {
            PanelFocus::FuelTypes => move_cursor(&mut self.fuel_state, self.fuel_options.len(), 1),
            PanelFocus::VehicleTypes => {
                move_cursor(&mut self.vehicle_state, self.vehicle_options.len(), 1)
            }
            PanelFocus::Parameter => self.cycle_parameter(1),
            _ => {}
        }
    }

    pub fn move_up(&mut self) {
        match self.focus {
            PanelFocus::FuelTypes => move_cursor(&mut self.fuel_state, self.fuel_options.len(), -1),
            PanelFocus::VehicleTypes => {
                move_cursor(&mut self.vehicle_state, self.vehicle_options.len(), -1)
            }
            PanelFocus::Parameter => self.cycle_parameter(-1),
            _ => {}
        }
    }

    fn cycle_parameter(&mut self, step: isize) {
        if self.parameters.is_empty() {
            return;
        }
        let len = self.parameters.len() as isize;
        let next = (self.parameter_idx as isize + step).rem_euclid(len);
        self.parameter_idx = next as usize;
        self.reset_range_inputs();
    }

    /// Toggle the checkbox under the cursor of the focused list, or advance
    /// the parameter radio.
    pub fn toggle_selected(&mut self) {
        match self.focus {
            PanelFocus::FuelTypes => {
                if let Some(i) = self.fuel_state.selected() {
                    if let Some(slot) = self.fuel_selected.get_mut(i) {
                        *slot = !*slot;
                    }
                }
            }
            PanelFocus::VehicleTypes => {
                if let Some(i) = self.vehicle_state.selected() {
                    if let Some(slot) = self.vehicle_selected.get_mut(i) {
                        *slot = !*slot;
                    }
                }
            }
            PanelFocus::Parameter => self.cycle_parameter(1),
            _ => {}
        }
    }

    /// Drop every restriction: deselect all categories, clear the location,
    /// and reset ranges and dates to the table's observed extents.
    pub fn clear(&mut self) {
        self.fuel_selected.iter_mut().for_each(|s| *s = false);
        self.vehicle_selected.iter_mut().for_each(|s| *s = false);
        self.location.clear();
        self.parameter_idx = 0;
        self.reset_range_inputs();
        self.reset_date_inputs();
    }

    /// A complete criteria value from the current widget state. Unparsable
    /// numbers or dates impose no restriction.
    pub fn criteria(&self) -> FilterCriteria {
        let selected = |options: &[String], flags: &[bool]| -> Vec<String> {
            options
                .iter()
                .zip(flags)
                .filter(|(_, &on)| on)
                .map(|(v, _)| v.clone())
                .collect()
        };

        let location = self.location.value();
        let location = location.trim();

        let low = self.range_min.value().trim().parse::<f64>().ok();
        let high = self.range_max.value().trim().parse::<f64>().ok();
        let value_range = low.zip(high);

        FilterCriteria {
            fuel_types: selected(&self.fuel_options, &self.fuel_selected),
            vehicle_types: selected(&self.vehicle_options, &self.vehicle_selected),
            location_substring: (!location.is_empty()).then(|| location.to_string()),
            parameter: self.parameters.get(self.parameter_idx).copied(),
            value_range,
            date_start: parse_date(&self.date_start.value()),
            date_end: parse_date(&self.date_end.value()),
        }
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

fn format_bound(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{}", v)
    }
}

fn move_cursor(state: &mut ListState, len: usize, step: isize) {
    if len == 0 {
        return;
    }
    let current = state.selected().unwrap_or(0) as isize;
    let next = (current + step).rem_euclid(len as isize);
    state.select(Some(next as usize));
}

/// Render the sidebar: two checkbox lists, the location input, the parameter
/// radio, and the range/date inputs. The focused section's border lights up.
pub fn render_filter_panel(area: Rect, buf: &mut Buffer, panel: &mut FilterPanel, theme: &Theme) {
    let border_color = theme.get("border");
    let active_color = theme.get("border_active");
    let text_primary = theme.get("text_primary");
    let text_secondary = theme.get("text_secondary");

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Filters ");
    let inner = block.inner(area);
    block.render(area, buf);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Fuel type label
            Constraint::Min(4),    // Fuel type list
            Constraint::Length(1), // Vehicle type label
            Constraint::Min(4),    // Vehicle type list
            Constraint::Length(1), // Location label
            Constraint::Length(1), // Location input
            Constraint::Length(1), // Parameter label
            Constraint::Length(3), // Parameter radio (one line per option)
            Constraint::Length(1), // Range label
            Constraint::Length(1), // Range min
            Constraint::Length(1), // Range max
            Constraint::Length(1), // Date label
            Constraint::Length(1), // Date start
            Constraint::Length(1), // Date end
        ])
        .split(inner);

    let label_style = |focused: bool| {
        if focused {
            Style::default().fg(active_color)
        } else {
            Style::default().fg(text_primary)
        }
    };

    Paragraph::new("Fuel type:")
        .style(label_style(panel.focus == PanelFocus::FuelTypes))
        .render(rows[0], buf);
    render_checkbox_list(
        rows[1],
        buf,
        &panel.fuel_options,
        &panel.fuel_selected,
        &mut panel.fuel_state,
        panel.focus == PanelFocus::FuelTypes,
        active_color,
        text_secondary,
    );

    Paragraph::new("Vehicle type:")
        .style(label_style(panel.focus == PanelFocus::VehicleTypes))
        .render(rows[2], buf);
    render_checkbox_list(
        rows[3],
        buf,
        &panel.vehicle_options,
        &panel.vehicle_selected,
        &mut panel.vehicle_state,
        panel.focus == PanelFocus::VehicleTypes,
        active_color,
        text_secondary,
    );

    Paragraph::new("Location contains:")
        .style(label_style(panel.focus == PanelFocus::Location))
        .render(rows[4], buf);
    panel.location.render(rows[5], buf);

    Paragraph::new("Parameter:")
        .style(label_style(panel.focus == PanelFocus::Parameter))
        .render(rows[6], buf);
    let radio_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); 3])
        .split(rows[7]);
    for (idx, parameter) in panel.parameters.iter().enumerate().take(3) {
        let marker = if idx == panel.parameter_idx {
            "●"
        } else {
            "○"
        };
        let style = if idx == panel.parameter_idx || panel.focus == PanelFocus::Parameter {
            Style::default().fg(active_color)
        } else {
            Style::default().fg(text_secondary)
        };
        let cell = format!("{} {}", marker, parameter.label());
        Paragraph::new(Line::from(Span::styled(cell, style))).render(radio_rows[idx], buf);
    }

    Paragraph::new("Value range (min / max):")
        .style(label_style(
            panel.focus == PanelFocus::RangeMin || panel.focus == PanelFocus::RangeMax,
        ))
        .render(rows[8], buf);
    panel.range_min.render(rows[9], buf);
    panel.range_max.render(rows[10], buf);

    Paragraph::new("Dates (from / to):")
        .style(label_style(
            panel.focus == PanelFocus::DateStart || panel.focus == PanelFocus::DateEnd,
        ))
        .render(rows[11], buf);
    panel.date_start.render(rows[12], buf);
    panel.date_end.render(rows[13], buf);
}

#[allow(clippy::too_many_arguments)]
fn render_checkbox_list(
    area: Rect,
    buf: &mut Buffer,
    options: &[String],
    selected: &[bool],
    state: &mut ListState,
    focused: bool,
    active_color: ratatui::style::Color,
    text_color: ratatui::style::Color,
) {
    let items: Vec<ListItem> = options
        .iter()
        .zip(selected)
        .enumerate()
        .map(|(i, (name, &on))| {
            let marker = if on { "☑" } else { "☐" };
            let under_cursor = state.selected() == Some(i);
            let style = if under_cursor && focused {
                Style::default().fg(active_color)
            } else {
                Style::default().fg(text_color)
            };
            ListItem::new(Line::from(Span::styled(
                format!("{} {}", marker, name),
                style,
            )))
        })
        .collect();
    let list = List::new(items);
    StatefulWidget::render(list, area, buf, state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::RefuelTable;
    use polars::prelude::*;

    fn panel() -> FilterPanel {
        let df = df!(
            "vehiculo" => &["A1", "A1", "B2"],
            "fecha" => &["2024-01-01", "2024-02-01", "2024-01-15"],
            "tipo_combustible" => &["diesel", "diesel", "petrol"],
            "repostado" => &[40.0_f64, 38.0, 30.0],
        )
        .unwrap();
        FilterPanel::from_table(&RefuelTable::from_dataframe(df).unwrap())
    }

    #[test]
    fn options_and_defaults_come_from_the_table() {
        let panel = panel();
        assert_eq!(panel.fuel_options, vec!["diesel", "petrol"]);
        assert!(panel.vehicle_options.is_empty());
        assert_eq!(panel.parameters, vec![RangeParameter::Refueled]);
        assert_eq!(panel.range_min.value(), "30");
        assert_eq!(panel.range_max.value(), "40");
        assert_eq!(panel.date_start.value(), "2024-01-01");
        assert_eq!(panel.date_end.value(), "2024-02-01");
    }

    #[test]
    fn default_criteria_restricts_to_observed_extents_only() {
        let panel = panel();
        let criteria = panel.criteria();
        assert!(criteria.fuel_types.is_empty());
        assert!(criteria.location_substring.is_none());
        assert_eq!(criteria.value_range, Some((30.0, 40.0)));
        assert_eq!(
            criteria.date_start,
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
    }

    #[test]
    fn toggling_a_fuel_type_selects_it() {
        let mut panel = panel();
        panel.toggle_selected();
        let criteria = panel.criteria();
        assert_eq!(criteria.fuel_types, vec!["diesel"]);
        panel.toggle_selected();
        assert!(panel.criteria().fuel_types.is_empty());
    }

    #[test]
    fn unparsable_range_imposes_no_restriction() {
        let mut panel = panel();
        panel.range_min.set_value("abc");
        let criteria = panel.criteria();
        assert!(criteria.value_range.is_none());
    }

    #[test]
    fn focus_cycle_wraps_both_ways() {
        let mut panel = panel();
        assert_eq!(panel.focus, PanelFocus::FuelTypes);
        panel.prev_focus();
        assert_eq!(panel.focus, PanelFocus::DateEnd);
        panel.next_focus();
        assert_eq!(panel.focus, PanelFocus::FuelTypes);
    }

    #[test]
    fn clear_resets_every_section() {
        let mut panel = panel();
        panel.toggle_selected();
        panel.location.set_value("main");
        panel.date_start.set_value("2024-02-01");
        panel.clear();
        let criteria = panel.criteria();
        assert!(criteria.fuel_types.is_empty());
        assert!(criteria.location_substring.is_none());
        assert_eq!(criteria.date_start, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn renders_without_panic() {
        let mut panel = panel();
        let area = Rect::new(0, 0, SIDEBAR_WIDTH, 30);
        let mut buf = Buffer::empty(area);
        render_filter_panel(area, &mut buf, &mut panel, &Theme::default());
    }
}
