//! Detail view for one vehicle: refuel time series, three distribution
//! histograms, and the distance/refueled scatter plot.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    symbols,
    text::Span,
    widgets::{Axis, BarChart, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget},
};

use crate::chart_data::{bin, VehicleCharts};
use crate::config::Theme;

/// Render the whole detail layout: line chart on top, histograms in the
/// middle row, scatter at the bottom.
pub fn render_detail(
    area: Rect,
    buf: &mut Buffer,
    vehicle_label: &str,
    charts: &VehicleCharts,
    bins: usize,
    theme: &Theme,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Fill(4),
            Constraint::Fill(3),
            Constraint::Fill(3),
        ])
        .split(area);

    Paragraph::new(format!("Vehicle {} (Esc to go back)", vehicle_label))
        .style(
            Style::default()
                .fg(theme.get("table_header"))
                .bg(theme.get("controls_bg")),
        )
        .render(layout[0], buf);

    render_time_series(layout[1], buf, charts, theme);

    let histogram_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Fill(1),
            Constraint::Fill(1),
        ])
        .split(layout[2]);
    render_histogram(
        histogram_row[0],
        buf,
        "Refueled",
        charts.refueled.as_deref(),
        bins,
        theme,
    );
    render_histogram(
        histogram_row[1],
        buf,
        "Distance",
        charts.distance.as_deref(),
        bins,
        theme,
    );
    render_histogram(
        histogram_row[2],
        buf,
        "Consumption",
        charts.consumption.as_deref(),
        bins,
        theme,
    );

    render_scatter(layout[3], buf, charts, theme);
}

fn render_time_series(area: Rect, buf: &mut Buffer, charts: &VehicleCharts, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.get("border")))
        .title(" Refueled over time ");
    let inner = block.inner(area);
    block.render(area, buf);

    if charts.time_series.is_empty() {
        render_no_data(inner, buf, theme);
        return;
    }

    let (x_bounds, y_bounds) = point_bounds(&charts.time_series);
    let axis_label_style = Style::default().fg(theme.get("text_primary"));
    let x_labels = vec![
        Span::styled(format_date_label(x_bounds[0]), axis_label_style),
        Span::styled(
            format_date_label((x_bounds[0] + x_bounds[1]) / 2.0),
            axis_label_style,
        ),
        Span::styled(format_date_label(x_bounds[1]), axis_label_style),
    ];
    let y_labels = vec![
        Span::styled(format_axis_label(y_bounds[0]), axis_label_style),
        Span::styled(
            format_axis_label((y_bounds[0] + y_bounds[1]) / 2.0),
            axis_label_style,
        ),
        Span::styled(format_axis_label(y_bounds[1]), axis_label_style),
    ];

    let datasets = vec![Dataset::default()
        .name("repostado")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(theme.get("chart_line")))
        .data(&charts.time_series)];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .bounds(x_bounds)
                .style(Style::default().fg(theme.get("text_primary")))
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .bounds(y_bounds)
                .style(Style::default().fg(theme.get("text_primary")))
                .labels(y_labels),
        );
    chart.render(inner, buf);
}

fn render_histogram(
    area: Rect,
    buf: &mut Buffer,
    title: &str,
    values: Option<&[f64]>,
    bins: usize,
    theme: &Theme,
) {
    let histogram = values.and_then(|v| bin(v, bins));
    let title = match &histogram {
        Some(h) => format!(
            " {} [{} .. {}] ",
            title,
            format_axis_label(h.min),
            format_axis_label(h.max)
        ),
        None => format!(" {} ", title),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.get("border")))
        .title(title);
    let inner = block.inner(area);
    block.render(area, buf);

    let Some(histogram) = histogram else {
        render_no_data(inner, buf, theme);
        return;
    };

    let bars: Vec<(&str, u64)> = histogram
        .counts
        .iter()
        .map(|&count| ("", count as u64))
        .collect();
    // Squeeze the requested bin count into whatever width is available.
    let bar_width = (inner.width / bins.max(1) as u16).max(1);
    BarChart::default()
        .data(&bars)
        .bar_width(bar_width)
        .bar_gap(0)
        .bar_style(Style::default().fg(theme.get("chart_bar")))
        .value_style(Style::default().fg(theme.get("chart_bar")))
        .render(inner, buf);
}

fn render_scatter(area: Rect, buf: &mut Buffer, charts: &VehicleCharts, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.get("border")))
        .title(" Distance vs refueled ");
    let inner = block.inner(area);
    block.render(area, buf);

    if charts.scatter.is_empty() {
        render_no_data(inner, buf, theme);
        return;
    }

    let (x_bounds, y_bounds) = point_bounds(&charts.scatter);
    let axis_label_style = Style::default().fg(theme.get("text_primary"));
    let x_labels = vec![
        Span::styled(format_axis_label(x_bounds[0]), axis_label_style),
        Span::styled(
            format_axis_label((x_bounds[0] + x_bounds[1]) / 2.0),
            axis_label_style,
        ),
        Span::styled(format_axis_label(x_bounds[1]), axis_label_style),
    ];
    let y_labels = vec![
        Span::styled(format_axis_label(y_bounds[0]), axis_label_style),
        Span::styled(
            format_axis_label((y_bounds[0] + y_bounds[1]) / 2.0),
            axis_label_style,
        ),
        Span::styled(format_axis_label(y_bounds[1]), axis_label_style),
    ];

    let datasets = vec![Dataset::default()
        .name("distancia / repostado")
        .marker(symbols::Marker::Dot)
        .graph_type(GraphType::Scatter)
        .style(Style::default().fg(theme.get("chart_scatter")))
        .data(&charts.scatter)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .bounds(x_bounds)
                .style(Style::default().fg(theme.get("text_primary")))
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .bounds(y_bounds)
                .style(Style::default().fg(theme.get("text_primary")))
                .labels(y_labels),
        )
        .render(inner, buf);
}

fn render_no_data(area: Rect, buf: &mut Buffer, theme: &Theme) {
    Paragraph::new("(no data)")
        .style(Style::default().fg(theme.get("text_secondary")))
        .centered()
        .render(area, buf);
}

/// Axis bounds covering all points, padded when degenerate so ratatui never
/// sees an empty interval.
fn point_bounds(points: &[(f64, f64)]) -> ([f64; 2], [f64; 2]) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &(x, y) in points {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    let x_bounds = if x_max > x_min {
        [x_min, x_max]
    } else {
        [x_min - 0.5, x_min + 0.5]
    };
    let y_bounds = if y_max > y_min {
        [y_min, y_max]
    } else {
        [y_min - 0.5, y_min + 0.5]
    };
    (x_bounds, y_bounds)
}

fn format_axis_label(v: f64) -> String {
    if v.abs() >= 1e6 || (v.abs() < 1e-2 && v != 0.0) {
        format!("{:.2e}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Format an x-axis label for epoch-microsecond values.
fn format_date_label(v: f64) -> String {
    use chrono::{DateTime, Utc};
    DateTime::from_timestamp_micros(v.trunc() as i64)
        .map(|dt: DateTime<Utc>| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| format_axis_label(v))
}
