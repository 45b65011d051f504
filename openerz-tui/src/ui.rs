use chrono::{Local, NaiveDate};
use openerz_core::{normalize::normalize, scheduler::SensorReading, wizard::Step};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
};

use crate::app::{App, Screen};

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    let header = Paragraph::new("openerz – next waste pickups")
        .block(Block::default().borders(Borders::ALL).title("Open ERZ"));
    frame.render_widget(header, *header_area);

    match app.screen {
        Screen::Entries => draw_entries(frame, app, *content_area),
        Screen::Wizard => draw_wizard(frame, app, *content_area),
        Screen::Sensors => draw_sensors(frame, app, *content_area),
    }

    let nav_hint = match app.screen {
        Screen::Entries => "↑/↓ move · Enter open · a add · d remove · r refresh · q/Ctrl-C quit",
        Screen::Wizard => "↑/↓ move · Space toggle · Enter confirm · r retry · Esc cancel",
        Screen::Sensors => "r refresh · Esc/←/b back · q/Ctrl-C quit",
    };

    let status_text = if app.is_loading {
        format!("Loading… · {nav_hint}")
    } else if let Some(msg) = &app.error_message {
        format!("{msg} · {nav_hint}")
    } else {
        nav_hint.to_owned()
    };

    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_loading {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn draw_entries(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let registry = app.service.registry();

    let items = if registry.is_empty() {
        vec![ListItem::new("No jurisdictions configured yet. Press a to add one.")]
    } else {
        registry
            .iter()
            .enumerate()
            .map(|(idx, registered)| {
                let prefix = if idx == app.entry_list_index { "> " } else { "  " };
                ListItem::new(format!(
                    "{prefix}{} ({} streams)",
                    registered.entry.title,
                    registered.entry.waste_types.len()
                ))
            })
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Configured jurisdictions"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !registry.is_empty() {
        state.select(Some(app.entry_list_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_wizard(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(form) = app.form.as_ref() else {
        let paragraph = Paragraph::new("Loading options…")
            .block(Block::default().borders(Borders::ALL).title("Add jurisdiction"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    };

    let placeholder = |key: &str| form.placeholders.get(key).map_or("", String::as_str);
    let title = match form.step {
        Step::Region => format!("{} · Select region (1/3)", placeholder("name")),
        Step::Area => format!("{} · Select area of {} (2/3)", placeholder("name"), placeholder("region")),
        Step::Types => {
            let place = [placeholder("region"), placeholder("area")]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            format!("{} · Select waste types for {place} (3/3)", placeholder("name"))
        }
        Step::Done | Step::Aborted => placeholder("name").to_owned(),
    };

    let items = if form.options.is_empty() {
        vec![ListItem::new("No options available.")]
    } else {
        form.options
            .iter()
            .enumerate()
            .map(|(idx, option)| {
                let marker = match (form.multiple, app.checked.contains(&idx)) {
                    (true, true) => "[x] ",
                    (true, false) => "[ ] ",
                    (false, _) => "",
                };
                ListItem::new(format!("{marker}{}", option.label))
            })
            .collect()
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !form.options.is_empty() {
        state.select(Some(app.option_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_sensors(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(registered) = app
        .selected_entry
        .and_then(|id| app.service.registry().get(id))
    else {
        let paragraph = Paragraph::new("Entry no longer exists.")
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    };

    let title = format!(
        "{} · next pickups within {} days (Esc/←/b to go back)",
        registered.entry.title,
        registered.scheduler.lookahead_days()
    );

    let today = Local::now().date_naive();
    let readings: Vec<SensorReading> = registered
        .scheduler
        .stream_keys()
        .filter_map(|key| registered.scheduler.reading(key))
        .collect();

    let rows = readings.into_iter().map(|reading| {
        let (date, relative) = reading.state.map_or_else(
            || ("–".to_owned(), "none scheduled".to_owned()),
            |date| (date.format("%a %d.%m.%Y").to_string(), relative_day_label(date, today)),
        );
        let details = reading
            .attributes
            .values()
            .cloned()
            .collect::<Vec<_>>()
            .join(" · ");
        let refreshed = reading.last_refresh.map_or_else(
            || "never".to_owned(),
            |at| at.with_timezone(&Local).format("%d.%m. %H:%M").to_string(),
        );

        let mut style = Style::default();
        if reading.state == Some(today) {
            style = style.fg(Color::Green).add_modifier(Modifier::BOLD);
        } else if reading.state.is_none() {
            style = style.fg(Color::DarkGray);
        }

        Row::new(vec![
            Cell::from(normalize(&reading.display_key)),
            Cell::from(date),
            Cell::from(relative),
            Cell::from(details),
            Cell::from(refreshed),
        ])
        .style(style)
    });

    let column_widths = [
        Constraint::Length(18),
        Constraint::Length(16),
        Constraint::Length(16),
        Constraint::Min(20),
        Constraint::Length(14),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Stream", "Date", "In", "Details", "Refreshed"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(1);

    frame.render_widget(table, area);
}

fn relative_day_label(date: NaiveDate, today: NaiveDate) -> String {
    let delta = (date - today).num_days();
    match delta {
        0 => "today".to_owned(),
        1 => "tomorrow".to_owned(),
        days if days > 1 => format!("in {days} days"),
        -1 => "yesterday".to_owned(),
        days => format!("{} days ago", days.abs()),
    }
}
