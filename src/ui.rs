//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).  Rendering is a pure function of
//! the latest [`RefreshState`](crate::refresh::RefreshState) snapshot, so
//! drawing the same state twice gives the same frame.
//!
//! ## For contributors
//!
//! * The layout is a vertical stack: header, services, incidents (only when
//!   there are any) and a one-line status bar.
//! * Status colours live in [`status_color`]; unknown statuses fall back to a
//!   neutral grey.
//! * [`ratatui`] is the TUI framework; see its docs for widget details.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::config::{APP_DESCRIPTION, APP_NAME};
use crate::refresh::Phase;
use crate::source::{IncidentKind, ServiceStatus};

/// Draw the complete UI for one frame.
///
/// Called once per tick from the main loop.  Delegates to helper functions
/// for each screen region.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let incidents_height = if app.incidents.is_empty() {
        0
    } else {
        app.incidents.len() as u16 + 2
    };

    let [header_area, main_area, incidents_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(incidents_height),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(frame, header_area);
    draw_services(app, frame, main_area);
    if !app.incidents.is_empty() {
        draw_incidents(app, frame, incidents_area);
    }
    draw_status_bar(app, frame, status_area);
}

/// Colour used for a status dot and label.
pub fn status_color(status: ServiceStatus) -> Color {
    match status {
        ServiceStatus::Operational => Color::Green,
        ServiceStatus::Degraded => Color::Yellow,
        ServiceStatus::Maintenance => Color::Blue,
        ServiceStatus::Down => Color::Red,
        ServiceStatus::Unknown => Color::DarkGray,
    }
}

/// Local wall-clock time of a check, or `"Never"`.
pub fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => "Never".into(),
    }
}

/// Human-readable refresh period: whole seconds when the interval is a
/// multiple of a second, milliseconds otherwise.
pub fn format_interval(interval: Duration) -> String {
    let millis = interval.as_millis();
    match millis {
        1000 => "1 second".into(),
        m if m % 1000 == 0 => format!("{} seconds", m / 1000),
        m => format!("{m} ms"),
    }
}

fn draw_header(frame: &mut Frame, area: Rect) {
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            APP_NAME,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(APP_DESCRIPTION, Style::default().fg(Color::Gray))),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(header, area);
}

/// Render the service groups, or a placeholder while there is nothing to show.
fn draw_services(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default().title(" Services ").borders(Borders::ALL);
    let state = &app.refresh;

    if state.data.is_empty() {
        let lines = match state.phase {
            Phase::Error => vec![
                Line::from(Span::styled(
                    "Failed to load services",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    state.error_message.clone().unwrap_or_default(),
                    Style::default().fg(Color::Gray),
                )),
                Line::from(Span::styled("Press r to retry", Style::default().fg(Color::DarkGray))),
            ],
            Phase::Ready => vec![Line::from(Span::styled(
                "No services configured",
                Style::default().fg(Color::Gray),
            ))],
            Phase::Idle | Phase::Loading => vec![Line::from(Span::styled(
                "Loading services…",
                Style::default().fg(Color::Gray),
            ))],
        };
        let placeholder = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(placeholder, area);
        return;
    }

    let mut rows: Vec<ListItem> = Vec::new();
    for group in &state.data {
        let status = group.status();
        rows.push(ListItem::new(Line::from(vec![
            Span::styled(
                group.title.as_str(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(status.label(), Style::default().fg(status_color(status))),
        ])));

        for check in &group.checks {
            let color = status_color(check.current_status);
            rows.push(ListItem::new(Line::from(vec![
                Span::styled("  ● ", Style::default().fg(color)),
                Span::styled(format!("{:<24}", check.name), Style::default().fg(Color::White)),
                Span::raw(" "),
                Span::styled(
                    format!("{:<12}", check.current_status.label()),
                    Style::default().fg(color),
                ),
                Span::styled(
                    format!("Last checked: {}", format_timestamp(check.last_checked_at)),
                    Style::default().fg(Color::DarkGray),
                ),
            ])));
        }
    }

    let list = List::new(rows)
        .block(block)
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    let row = app.selected_row();
    app.list_state.select(row);
    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn draw_incidents(app: &App, frame: &mut Frame, area: Rect) {
    let rows: Vec<ListItem> = app
        .incidents
        .iter()
        .map(|incident| {
            let tag = match incident.kind {
                IncidentKind::Warning => Color::Yellow,
                IncidentKind::Info => Color::Cyan,
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("[{}]", incident.service_name),
                    Style::default().fg(tag).add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::styled(incident.message.as_str(), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();

    let list = List::new(rows).block(Block::default().title(" Incidents ").borders(Borders::ALL));
    frame.render_widget(list, area);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let status_style = match app.refresh.phase {
        Phase::Error => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::Yellow),
    };

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(app.status_text(), status_style),
        Span::raw("  "),
        Span::styled(
            format!("Auto-refreshing every {}", format_interval(app.poll_interval)),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(
            format!("Updated {}", format_timestamp(app.refresh.last_updated)),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  q: quit  r: refresh  ↑/↓: scroll"),
    ];
    if let Some(check) = app.selected_check() {
        if let Some(url) = &check.url {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(url.as_str(), Style::default().fg(Color::Cyan)));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
