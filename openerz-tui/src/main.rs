//! Terminal host for openerz: configure jurisdictions with the wizard and watch
//! the next pickup of every selected waste stream.

mod app;
mod config;
mod input;
mod ui;

use std::{
    fs::File,
    io,
    sync::{Arc, Mutex},
    time::{Duration as StdDuration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use openerz_core::{model::EntryId, service::OpenErzService, wizard::StepOutcome};
use openerz_provider::OpenErzCatalog;
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::Settings;
use crate::input::Action;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load(&config::config_path())?;

    // The terminal belongs to the UI, so logs go to a file.
    let log_file = File::options()
        .create(true)
        .append(true)
        .open(&settings.log_file)
        .with_context(|| format!("failed to open {}", settings.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_err| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    // HTTP + service setup
    let client = Client::builder().user_agent(&settings.user_agent).build()?;
    let catalog = Arc::new(OpenErzCatalog::with_base_url(client, &settings.base_url));
    let mut service = OpenErzService::new(catalog, settings.lookahead_days);

    for entry in config::load_entries(&settings.entries_file)? {
        if let Err(err) = service.add_entry(entry) {
            warn!(error = %err, "skipping persisted entry");
        }
    }
    info!(entries = service.registry().len(), "configuration loaded");

    let app = App::new(service);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app, &settings).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

async fn run(terminal: &mut Term, mut app: App, settings: &Settings) -> Result<()> {
    // Every entry is refreshed before it is first shown, then on each poll.
    let poll_interval = settings.poll_interval();
    let mut last_poll: Option<Instant> = None;

    loop {
        if last_poll.is_none_or(|at| at.elapsed() >= poll_interval) {
            last_poll = Some(Instant::now());
            for id in app.entry_ids() {
                refresh(terminal, &mut app, id).await?;
            }
        }

        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
        {
            let action = input::handle_key_event(key, &mut app);

            match action {
                Action::Quit => break,
                Action::None => {}
                Action::StartWizard => {
                    app.start_wizard();
                    present_step(terminal, &mut app, settings).await?;
                }
                Action::RetryStep => {
                    present_step(terminal, &mut app, settings).await?;
                }
                Action::SubmitStep => {
                    let Some(input) = app.current_input() else {
                        continue;
                    };
                    let Some(wizard) = app.wizard.as_mut() else {
                        continue;
                    };

                    app.is_loading = true;
                    let outcome = wizard.submit(input).await;
                    app.is_loading = false;

                    finish_step(terminal, &mut app, settings, outcome).await?;
                }
                Action::RefreshEntry => {
                    let target = app.selected_entry.or_else(|| app.highlighted_entry());
                    let Some(id) = target else {
                        app.error_message = Some("Select an entry first".into());
                        continue;
                    };
                    refresh(terminal, &mut app, id).await?;
                }
                Action::RemoveEntry => {
                    let Some(id) = app.highlighted_entry() else {
                        continue;
                    };
                    match app.service.remove_entry(id) {
                        Ok(entry) => {
                            app.entry_list_index = app.entry_list_index.saturating_sub(1);
                            app.error_message = None;
                            persist(&app, settings);
                            info!(title = %entry.title, "entry removed by user");
                        }
                        Err(err) => {
                            app.error_message = Some(format!("Remove failed: {err}"));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

async fn present_step(terminal: &mut Term, app: &mut App, settings: &Settings) -> Result<()> {
    if app.wizard.is_none() {
        return Ok(());
    }

    app.is_loading = true;
    terminal.draw(|frame| ui::draw(frame, app))?;

    let Some(wizard) = app.wizard.as_mut() else {
        return Ok(());
    };
    let outcome = wizard.present().await;
    app.is_loading = false;

    finish_step(terminal, app, settings, outcome).await
}

async fn finish_step(
    terminal: &mut Term,
    app: &mut App,
    settings: &Settings,
    outcome: StepOutcome,
) -> Result<()> {
    let Some(result) = app.apply_outcome(outcome) else {
        return Ok(());
    };

    match app.service.configure(result) {
        Ok(id) => {
            persist(app, settings);
            refresh(terminal, app, id).await?;
        }
        Err(err) => {
            app.error_message = Some(format!("Could not add entry: {err}"));
        }
    }
    Ok(())
}

async fn refresh(terminal: &mut Term, app: &mut App, id: EntryId) -> Result<()> {
    app.is_loading = true;
    terminal.draw(|frame| ui::draw(frame, app))?;

    let report = app.service.refresh_entry(id).await;
    app.is_loading = false;

    match report {
        Ok(results) => {
            let failed: Vec<String> = results
                .iter()
                .filter_map(|(key, result)| result.as_ref().err().map(|_err| key.to_string()))
                .collect();
            app.error_message = if failed.is_empty() {
                None
            } else {
                Some(format!("Refresh failed for {}", failed.join(", ")))
            };
        }
        Err(err) => {
            app.error_message = Some(format!("Refresh failed: {err}"));
        }
    }
    Ok(())
}

fn persist(app: &App, settings: &Settings) {
    if let Err(err) = config::save_entries(&settings.entries_file, app.service.entries()) {
        warn!(error = %err, "failed to persist entries");
    }
}
