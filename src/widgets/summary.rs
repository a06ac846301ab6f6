//! Grouped-summary table: one row per vehicle with its refuel count.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, StatefulWidget, Table, TableState, Widget},
};

use crate::config::Theme;
use crate::filter::VehicleSummary;

/// Placeholder shown for a null vehicle id or a missing category.
pub const MISSING: &str = "(none)";

/// Render the summary table, or a neutral empty state when no rows match
/// the current filters.
pub fn render_summary(
    area: Rect,
    buf: &mut Buffer,
    summary: &[VehicleSummary],
    state: &mut TableState,
    focused: bool,
    theme: &Theme,
) {
    let border_color = if focused {
        theme.get("border_active")
    } else {
        theme.get("border")
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Vehicles by refuel count ");
    let inner = block.inner(area);
    block.render(area, buf);

    if summary.is_empty() {
        Paragraph::new("No results for the current filters")
            .style(Style::default().fg(theme.get("text_secondary")))
            .centered()
            .render(inner, buf);
        return;
    }

    let header = Row::new(vec![
        Cell::from("Vehicle"),
        Cell::from("Vehicle type"),
        Cell::from("Fuel type"),
        Cell::from("Refuels"),
    ])
    .style(
        Style::default()
            .fg(theme.get("table_header"))
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = summary
        .iter()
        .map(|entry| {
            Row::new(vec![
                Cell::from(entry.vehicle.as_deref().unwrap_or(MISSING).to_string()),
                Cell::from(entry.vehicle_type.as_deref().unwrap_or(MISSING).to_string()),
                Cell::from(entry.fuel_type.as_deref().unwrap_or(MISSING).to_string()),
                Cell::from(entry.refuel_count.to_string()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Fill(2),
            Constraint::Fill(2),
            Constraint::Fill(2),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .row_highlight_style(
        Style::default()
            .fg(theme.get("highlight"))
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

    StatefulWidget::render(table, inner, buf, state);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> Vec<VehicleSummary> {
        vec![
            VehicleSummary {
                vehicle: Some("A1".to_string()),
                vehicle_type: Some("truck".to_string()),
                fuel_type: Some("diesel".to_string()),
                refuel_count: 2,
            },
            VehicleSummary {
                vehicle: None,
                vehicle_type: None,
                fuel_type: None,
                refuel_count: 1,
            },
        ]
    }

    #[test]
    fn renders_rows_without_panic() {
        let area = Rect::new(0, 0, 60, 10);
        let mut buf = Buffer::empty(area);
        let mut state = TableState::default();
        state.select(Some(0));
        render_summary(
            area,
            &mut buf,
            &sample_summary(),
            &mut state,
            true,
            &Theme::default(),
        );
    }

    #[test]
    fn renders_empty_state_without_panic() {
        let area = Rect::new(0, 0, 60, 10);
        let mut buf = Buffer::empty(area);
        let mut state = TableState::default();
        render_summary(area, &mut buf, &[], &mut state, false, &Theme::default());
    }
}
