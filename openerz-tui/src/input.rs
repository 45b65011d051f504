use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Screen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Quit,
    /// Start a wizard session and present its first step
    StartWizard,
    /// Present the current wizard step again, re-fetching its options
    RetryStep,
    /// Submit the highlighted or checked options
    SubmitStep,
    /// Refresh every stream of the highlighted or opened entry
    RefreshEntry,
    /// Remove the highlighted entry
    RemoveEntry,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Char, Down, Enter, Esc, Left, Right, Up};

    // Global quit shortcuts
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    if key.code == Char('q') && key.modifiers.is_empty() && app.screen != Screen::Wizard {
        return Action::Quit;
    }

    let mut action = Action::None;

    match app.screen {
        Screen::Entries => match key.code {
            Up | Char('k') => {
                app.entry_list_index = app.entry_list_index.saturating_sub(1);
            }
            Down | Char('j') => {
                if app.entry_list_index + 1 < app.service.registry().len() {
                    app.entry_list_index += 1;
                }
            }
            Enter | Right => {
                app.open_highlighted_entry();
            }
            Char('a') => {
                action = Action::StartWizard;
            }
            Char('d') => {
                action = Action::RemoveEntry;
            }
            Char('r') => {
                action = Action::RefreshEntry;
            }
            _ => {}
        },

        Screen::Wizard => match key.code {
            Up | Char('k') => {
                app.option_index = app.option_index.saturating_sub(1);
            }
            Down | Char('j') => {
                let count = app.form.as_ref().map_or(0, |form| form.options.len());
                if app.option_index + 1 < count {
                    app.option_index += 1;
                }
            }
            Char(' ') => {
                app.toggle_current_option();
            }
            Char('r') => {
                action = Action::RetryStep;
            }
            Enter => {
                action = Action::SubmitStep;
            }
            Esc => {
                app.cancel_wizard();
            }
            _ => {}
        },

        Screen::Sensors => match key.code {
            Char('r') => {
                action = Action::RefreshEntry;
            }
            Left | Esc | Char('b') => {
                app.screen = Screen::Entries;
                app.selected_entry = None;
            }
            _ => {}
        },
    }
    action
}
